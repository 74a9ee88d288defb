use super::*;
use std::sync::Arc;
use std::thread;

fn doc(id: &str, content: &str) -> Document {
    Document {
        doc_id: id.to_string(),
        content: content.to_string(),
        name: id.to_string(),
        path: String::new(),
        metadata: HashMap::new(),
    }
}

#[test]
fn index_document_consistency() {
    let repo = DocumentRepository::new();
    repo.add_document(doc("d1", "audio video data"));
    repo.add_document(doc("d2", "video only"));

    let stats = repo.get_stats();
    assert_eq!(stats.documents, 2);

    let snapshot = repo.get_index_snapshot(&["video".to_string()]);
    let doc_ids = &snapshot["video"];
    assert_eq!(doc_ids.len(), 2);
    for id in doc_ids {
        assert!(repo.get_document(id).is_some());
    }
}

#[test]
fn get_documents_by_ids_skips_missing() {
    let repo = DocumentRepository::new();
    repo.add_document(doc("d1", "hello"));
    let results = repo.get_documents_by_ids(&["d1".to_string(), "missing".to_string()]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc_id, "d1");
}

#[test]
fn delete_document_prunes_index() {
    let repo = DocumentRepository::new();
    repo.add_document(doc("d1", "audio video"));
    repo.add_document(doc("d2", "audio"));
    assert!(repo.delete_document("d1"));

    let snapshot = repo.get_index_snapshot(&["video".to_string(), "audio".to_string()]);
    assert!(!snapshot.contains_key("video"));
    assert_eq!(snapshot["audio"], vec!["d2".to_string()]);
}

#[test]
fn snapshot_isolation_under_concurrent_write() {
    let repo = Arc::new(DocumentRepository::new());
    for i in 0..10 {
        repo.add_document(doc(&format!("d{i}"), "audio video data"));
    }

    let repo_writer = Arc::clone(&repo);
    let writer = thread::spawn(move || {
        repo_writer.add_document(doc("doc_new", "audio"));
    });

    // Whether this snapshot contains doc_new is a race with the writer
    // thread, but it must never observe a torn write: every doc_id in the
    // snapshot must resolve to an actual document.
    let snapshot = repo.get_index_snapshot(&["audio".to_string()]);
    for id in &snapshot["audio"] {
        assert!(repo.get_document(id).is_some());
    }

    writer.join().unwrap();

    let snapshot_after = repo.get_index_snapshot(&["audio".to_string()]);
    assert!(snapshot_after["audio"].contains(&"doc_new".to_string()));
}

#[test]
fn many_concurrent_readers_and_one_writer_never_see_a_partial_write() {
    let repo = Arc::new(DocumentRepository::new());
    for i in 0..50 {
        repo.add_document(doc(&format!("d{i}"), "term shared"));
    }

    let writer_repo = Arc::clone(&repo);
    let writer = thread::spawn(move || {
        for i in 50..100 {
            writer_repo.add_document(doc(&format!("d{i}"), "term shared"));
        }
    });

    let mut readers = Vec::new();
    for _ in 0..8 {
        let reader_repo = Arc::clone(&repo);
        readers.push(thread::spawn(move || {
            for _ in 0..20 {
                let snapshot = reader_repo.get_index_snapshot(&["term".to_string()]);
                if let Some(ids) = snapshot.get("term") {
                    for id in ids {
                        assert!(reader_repo.get_document(id).is_some());
                    }
                }
            }
        }));
    }

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(repo.get_stats().documents, 100);
}
