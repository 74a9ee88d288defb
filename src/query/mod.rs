//! Query preprocessing: acronym and synonym expansion.

pub mod expander;

pub use expander::{EmptyLexicon, ExpandedQuery, QueryExpander, SynonymLexicon};
