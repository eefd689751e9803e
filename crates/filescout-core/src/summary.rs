//! Compact description of a result set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::FileMetadata;

/// Placeholder `document_summary` for an empty set.
pub const NO_FILES_FOUND: &str = "No files found";

/// Summary returned to the caller alongside every search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub number_of_matches: usize,
    pub query_passed: String,
    /// Titles joined with `/`, in result order.
    pub document_summary: String,
    /// Most recent creation date in the set; `null` when empty.
    pub latest_document_created_at: Option<NaiveDate>,
}

impl ResultSummary {
    /// Summary for a search that found nothing or failed.
    pub fn empty(query: &str) -> Self {
        Self {
            number_of_matches: 0,
            query_passed: query.to_string(),
            document_summary: NO_FILES_FOUND.to_string(),
            latest_document_created_at: None,
        }
    }
}

/// Summarize `records` (already filtered and sorted).
///
/// Records whose creation date does not parse still count and contribute
/// their title; they are simply ignored for the latest-date computation.
pub fn summarize(query: &str, records: &[FileMetadata]) -> ResultSummary {
    if records.is_empty() {
        return ResultSummary::empty(query);
    }

    let titles: Vec<&str> = records.iter().map(|m| m.file_title.as_str()).collect();
    let latest = records.iter().filter_map(|m| m.created_date().ok()).max();

    ResultSummary {
        number_of_matches: records.len(),
        query_passed: query.to_string(),
        document_summary: titles.join("/"),
        latest_document_created_at: latest,
    }
}
