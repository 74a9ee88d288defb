//! Hybrid fusion, alpha boundaries, and MMR/diversity re-ranking over a
//! shared in-process engine (no project layer involved).

use std::sync::Arc;

use kbcore::{Document, DocumentRepository, EmbeddingCache, EmbeddingModel, HybridQueryEngine, MockEmbedder, SearchMode};

const DIM: usize = 32;

fn seeded_engine() -> HybridQueryEngine {
    let repository = Arc::new(DocumentRepository::new());
    let embedding_cache = Arc::new(EmbeddingCache::new(16));
    let embedder: Arc<MockEmbedder> = Arc::new(MockEmbedder::new(DIM));

    let docs = [
        ("d1", "rust memory safety ownership borrowing"),
        ("d2", "rust concurrency fearless threads"),
        ("d3", "python dynamic typing interpreter"),
        ("d4", "javascript event loop async"),
    ];

    for (doc_id, content) in docs {
        let embedding = kbcore::EmbeddingModel::embed(embedder.as_ref(), content).unwrap();
        embedding_cache.put(doc_id, embedding);
        repository.add_document(Document {
            doc_id: doc_id.to_string(),
            content: content.to_string(),
            name: doc_id.to_string(),
            path: String::new(),
            metadata: Default::default(),
        });
    }

    HybridQueryEngine::new(repository, embedding_cache, embedder, 0.5)
}

#[test]
fn alpha_zero_ranks_by_keyword_overlap_alone() {
    let engine = seeded_engine();
    let (hybrid, degraded) = engine.search_hybrid("rust ownership", Some(0.0), 2, true).unwrap();
    assert!(!degraded);

    let hybrid_ids: Vec<&str> = hybrid.iter().map(|r| r.document.doc_id.as_str()).collect();
    assert_eq!(hybrid_ids, vec!["d1", "d2"]);
}

#[test]
fn keyword_search_ranks_exact_term_overlap_highest() {
    let engine = seeded_engine();
    let results = engine.search_keyword("rust ownership borrowing");
    assert_eq!(results[0].document.doc_id, "d1");
}

#[test]
fn empty_query_returns_no_results_in_every_mode() {
    let engine = seeded_engine();
    assert!(engine.search_keyword("   ").is_empty());
    assert!(engine.search_vector("", 5, true).unwrap().0.is_empty());
    assert!(engine.search_hybrid("", None, 5, true).unwrap().0.is_empty());
}

#[test]
fn mmr_with_lambda_one_matches_pure_relevance_order() {
    let engine = seeded_engine();
    let mmr = engine.search_with_mmr("rust", 1.0, 4, SearchMode::Keyword).unwrap();
    let plain = engine.search_keyword("rust");
    let mmr_ids: Vec<&str> = mmr.iter().map(|r| r.document.doc_id.as_str()).collect();
    let plain_ids: Vec<&str> = plain.iter().take(mmr.len()).map(|r| r.document.doc_id.as_str()).collect();
    assert_eq!(mmr_ids, plain_ids);
}

#[test]
fn diversity_filtering_never_exceeds_top_k() {
    let engine = seeded_engine();
    let results = engine.search_with_diversity("rust", 0.9, 2, SearchMode::Hybrid).unwrap();
    assert!(results.len() <= 2);
}
