//! Structured error kinds for the search and indexing pipelines.
//!
//! Component functions fail by raising one of these kinds (wrapped in
//! `anyhow::Error`); `main` has exactly three catch sites (out-of-memory,
//! index error, everything else), each with its own diagnostic template.

use thiserror::Error;

pub const BUG_REPORT_URL: &str = "https://github.com/sahara-bio/sahara/issues";

#[derive(Debug, Error)]
pub enum SearchError {
    /// Unreadable or corrupt index, or an index incompatible with the query.
    #[error("index error: {0}")]
    Index(String),

    /// Unparseable query file or alphabet mismatch.
    #[error("query error: {0}")]
    Query(String),

    /// Incompatible option combination.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Out of memory (detected at an allocation-sizing checkpoint).
    #[error("out of memory")]
    ResourceExhausted,

    /// LCA walk reached the sentinel node without meeting.
    #[error("taxonomy error: {0}")]
    Taxonomy(String),
}

impl SearchError {
    pub fn index(msg: impl Into<String>) -> Self {
        SearchError::Index(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        SearchError::Query(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        SearchError::Config(msg.into())
    }

    pub fn taxonomy(msg: impl Into<String>) -> Self {
        SearchError::Taxonomy(msg.into())
    }
}
