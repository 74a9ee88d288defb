//! Acronym and synonym query expansion.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Result of expanding a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    /// The query as given.
    pub original: String,
    /// Original query plus every expansion term appended.
    pub expanded: String,
    /// Every term added by expansion, in order.
    pub expansion_terms: Vec<String>,
    /// `token -> synonyms` used for this query.
    pub synonym_expansions: HashMap<String, Vec<String>>,
    /// `token -> expansion` used for this query.
    pub acronym_expansions: HashMap<String, String>,
    /// Total number of expansion terms added.
    pub total_expansions: usize,
}

/// A synonym lookup. The built-in lexicon is a fixed `HashMap`; callers may
/// supply their own to integrate an external thesaurus.
pub trait SynonymLexicon: Send + Sync {
    /// Returns the synonyms known for `token`, or an empty list if none (or
    /// if the lexicon is unavailable — this must never fail the expansion).
    fn synonyms_for(&self, token: &str) -> Vec<String>;
}

/// A lexicon with no entries. Used when no external thesaurus is wired in.
pub struct EmptyLexicon;

impl SynonymLexicon for EmptyLexicon {
    fn synonyms_for(&self, _token: &str) -> Vec<String> {
        Vec::new()
    }
}

fn default_acronyms() -> HashMap<String, String> {
    [
        ("ML", "machine learning"),
        ("AI", "artificial intelligence"),
        ("NLP", "natural language processing"),
        ("API", "application programming interface"),
        ("DB", "database"),
        ("UI", "user interface"),
        ("UX", "user experience"),
        ("CPU", "central processing unit"),
        ("GPU", "graphics processing unit"),
        ("HTTP", "hypertext transfer protocol"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Expands a raw query into additional acronym and synonym terms.
///
/// Disabled (`enabled = false`) or an empty query short-circuits to
/// `expanded == original` with no expansions.
pub struct QueryExpander {
    enabled: bool,
    max_expansions_per_token: usize,
    acronyms: RwLock<HashMap<String, String>>,
    lexicon: Box<dyn SynonymLexicon>,
}

impl QueryExpander {
    /// Creates an expander with the built-in acronym lexicon and no synonym
    /// source.
    pub fn new(enabled: bool, max_expansions_per_token: usize) -> Self {
        Self {
            enabled,
            max_expansions_per_token,
            acronyms: RwLock::new(default_acronyms()),
            lexicon: Box::new(EmptyLexicon),
        }
    }

    /// Creates an expander using a caller-supplied synonym lexicon.
    pub fn with_lexicon(
        enabled: bool,
        max_expansions_per_token: usize,
        lexicon: Box<dyn SynonymLexicon>,
    ) -> Self {
        Self {
            enabled,
            max_expansions_per_token,
            acronyms: RwLock::new(default_acronyms()),
            lexicon,
        }
    }

    /// Adds or overrides an acronym mapping at runtime.
    pub fn add_acronym(&self, token: &str, expansion: &str) {
        self.acronyms
            .write()
            .insert(token.to_uppercase(), expansion.to_string());
    }

    /// Removes an acronym mapping. Returns whether it was present.
    pub fn remove_acronym(&self, token: &str) -> bool {
        self.acronyms.write().remove(&token.to_uppercase()).is_some()
    }

    /// Expands `query`.
    pub fn expand(&self, query: &str) -> ExpandedQuery {
        if !self.enabled || query.trim().is_empty() {
            return ExpandedQuery {
                original: query.to_string(),
                expanded: query.to_string(),
                expansion_terms: Vec::new(),
                synonym_expansions: HashMap::new(),
                acronym_expansions: HashMap::new(),
                total_expansions: 0,
            };
        }

        let acronyms = self.acronyms.read();
        let mut expansion_terms = Vec::new();
        let mut synonym_expansions = HashMap::new();
        let mut acronym_expansions = HashMap::new();

        for token in query.split_whitespace() {
            let upper = token.to_uppercase();
            if let Some(expansion) = acronyms.get(&upper) {
                acronym_expansions.insert(token.to_string(), expansion.clone());
                for word in expansion.split_whitespace() {
                    expansion_terms.push(word.to_string());
                }
            }

            let synonyms = self.lexicon.synonyms_for(token);
            if !synonyms.is_empty() {
                let capped: Vec<String> = synonyms
                    .into_iter()
                    .take(self.max_expansions_per_token)
                    .collect();
                expansion_terms.extend(capped.iter().cloned());
                synonym_expansions.insert(token.to_string(), capped);
            }
        }

        let expanded = if expansion_terms.is_empty() {
            query.to_string()
        } else {
            format!("{query} {}", expansion_terms.join(" "))
        };

        ExpandedQuery {
            original: query.to_string(),
            total_expansions: expansion_terms.len(),
            expanded,
            expansion_terms,
            synonym_expansions,
            acronym_expansions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLexicon;
    impl SynonymLexicon for FixedLexicon {
        fn synonyms_for(&self, token: &str) -> Vec<String> {
            if token == "fast" {
                vec!["quick".to_string(), "rapid".to_string(), "speedy".to_string()]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn disabled_bypasses_expansion() {
        let expander = QueryExpander::new(false, 5);
        let result = expander.expand("ML models");
        assert_eq!(result.expanded, result.original);
        assert_eq!(result.total_expansions, 0);
    }

    #[test]
    fn empty_query_short_circuits() {
        let expander = QueryExpander::new(true, 5);
        let result = expander.expand("   ");
        assert_eq!(result.expanded, "   ");
        assert_eq!(result.total_expansions, 0);
    }

    #[test]
    fn acronym_expansion_adds_terms() {
        let expander = QueryExpander::new(true, 5);
        let result = expander.expand("ML basics");
        assert!(result.expanded.contains("machine learning"));
        assert_eq!(
            result.acronym_expansions.get("ML"),
            Some(&"machine learning".to_string())
        );
    }

    #[test]
    fn runtime_override_replaces_builtin() {
        let expander = QueryExpander::new(true, 5);
        expander.add_acronym("ML", "maximum likelihood");
        let result = expander.expand("ML estimate");
        assert_eq!(
            result.acronym_expansions.get("ML"),
            Some(&"maximum likelihood".to_string())
        );
    }

    #[test]
    fn synonym_expansion_capped_at_max() {
        let expander = QueryExpander::with_lexicon(true, 2, Box::new(FixedLexicon));
        let result = expander.expand("fast car");
        assert_eq!(result.synonym_expansions["fast"].len(), 2);
    }

    #[test]
    fn missing_lexicon_entries_are_skipped_silently() {
        let expander = QueryExpander::with_lexicon(true, 5, Box::new(FixedLexicon));
        let result = expander.expand("slow car");
        assert!(result.synonym_expansions.is_empty());
        assert_eq!(result.expanded, "slow car");
    }
}
