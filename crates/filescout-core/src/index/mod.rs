//! Similarity index abstraction for FileScout.
//!
//! The [`SimilarityIndex`] trait is the contract the search core needs from a
//! vector store: ranked nearest-neighbor lookup with an optional structured
//! pre-filter, plus unranked retrieval by filter. The search core treats it as
//! a candidate generator only. Backends may apply the filter loosely, and
//! ranking is by semantic similarity, never by date or size.
//!
//! Implementations must be `Send + Sync`; the index is built once at startup
//! and shared read-only between requests.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::filter::FilterExpr;
use crate::models::{FileMetadata, Record};

/// A ranked hit returned by [`SimilarityIndex::query`].
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Record id.
    pub id: String,
    /// Cosine similarity to the sub-query.
    pub score: f32,
    /// The record's searchable text.
    pub document: String,
    pub metadata: FileMetadata,
}

/// Abstract nearest-neighbor backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`query`](SimilarityIndex::query) | Top-`k` candidates per query text |
/// | [`get`](SimilarityIndex::get) | All records matching a filter, unranked |
/// | [`len`](SimilarityIndex::len) | Number of indexed records |
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Rank records against each text in `texts`.
    ///
    /// Returns one candidate list per input text, in input order, each
    /// holding at most `top_k` entries. `filter = None` means unfiltered.
    async fn query(
        &self,
        texts: &[String],
        top_k: usize,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<Vec<Candidate>>>;

    /// Return every record matching `filter`, in id order.
    async fn get(&self, filter: Option<&FilterExpr>) -> Result<Vec<Record>>;

    /// Number of indexed records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
