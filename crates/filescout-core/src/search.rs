//! Search entry points: similar-records search and link search.
//!
//! Both functions operate entirely through the [`SimilarityIndex`] trait and
//! never return an error. Every failure (bad date, bad enum value, index
//! error) is converted into an outcome with `success = false` and the error
//! text, so callers branch on [`OutcomeKind`] instead of handling faults.
//!
//! # Similar-records pipeline
//!
//! 1. Resolve the loosely typed [`SimilarRecordsParams`] into a
//!    [`SimilarRecordsRequest`] (dates, enums, sizes, count).
//! 2. Split the query into sub-queries ([`split_query`]).
//! 3. Build the pre-filter ([`build_filter`]); withheld when `contextual`.
//! 4. Query the index once with every sub-query.
//! 5. Refine the first candidate set, or the de-duplicated union of all sets
//!    under [`SubQueryPolicy::Union`].

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::filter::{build_filter, web_link_filter, Constraints};
use crate::index::{Candidate, SimilarityIndex};
use crate::models::{parse_iso_date, FileMetadata, FileSource, FileType};
use crate::refine::{refine, DateWindow};
use crate::split::{split_query, SplitMode};
use crate::summary::ResultSummary;

/// Value accepted for "no restriction" on enum and size parameters.
pub const ANY: &str = "any";

/// How multiple sub-queries are combined before refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQueryPolicy {
    /// Refine only the first sub-query's candidates.
    #[default]
    First,
    /// Merge all candidate sets in sub-query order, de-duplicated by id.
    Union,
}

/// Retrieval tuning, decoupled from application config.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Candidates requested from the index per sub-query.
    pub top_k: usize,
    pub split_mode: SplitMode,
    pub sub_query_policy: SubQueryPolicy,
    /// Window used when the request omits a date.
    pub default_window: DateWindow,
    pub default_nfiles: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            split_mode: SplitMode::Word,
            sub_query_policy: SubQueryPolicy::First,
            default_window: DateWindow {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
                end: NaiveDate::from_ymd_opt(2024, 9, 29).unwrap_or(NaiveDate::MAX),
            },
            default_nfiles: 10,
        }
    }
}

/// A number that may arrive as an integer, a float (function-calling models
/// often send `3.0`), a numeric string, or `"any"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseInt {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseInt {
    /// `Ok(None)` for `"any"`; otherwise a non-negative integer.
    pub fn resolve(&self, name: &str) -> Result<Option<u64>> {
        let n = match self {
            LooseInt::Int(n) => *n as f64,
            LooseInt::Float(f) => *f,
            LooseInt::Text(s) if s.trim().eq_ignore_ascii_case(ANY) => return Ok(None),
            LooseInt::Text(s) => s
                .trim()
                .parse::<f64>()
                .with_context(|| format!("{} must be an integer or \"any\", got '{}'", name, s))?,
        };
        if !n.is_finite() || n < 0.0 || n.fract() != 0.0 {
            bail!("{} must be a non-negative integer, got {}", name, n);
        }
        Ok(Some(n as u64))
    }
}

/// Parameters of `search_for_similar_records` as the agent sends them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarRecordsParams {
    pub query: String,
    #[serde(default)]
    pub file_source: Option<String>,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub file_size: Option<LooseInt>,
    #[serde(default)]
    pub nfiles_to_return: Option<LooseInt>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub contextual: bool,
}

/// Validated, typed form of [`SimilarRecordsParams`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarRecordsRequest {
    pub query: String,
    pub constraints: Constraints,
    pub window: DateWindow,
    pub nfiles: usize,
}

impl SimilarRecordsParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Validate and type every parameter, applying defaults from `settings`.
    pub fn resolve(&self, settings: &SearchSettings) -> Result<SimilarRecordsRequest> {
        if self.query.trim().is_empty() {
            bail!("query must not be empty");
        }

        let start = match self.start_date.as_deref() {
            Some(s) => parse_iso_date(s).context("start_date")?,
            None => settings.default_window.start,
        };
        let end = match self.end_date.as_deref() {
            Some(s) => parse_iso_date(s).context("end_date")?,
            None => settings.default_window.end,
        };

        let source = match self.file_source.as_deref() {
            None => None,
            Some(s) if s.trim().eq_ignore_ascii_case(ANY) => None,
            Some(s) => Some(s.parse::<FileSource>()?),
        };
        let extension = match self.file_extension.as_deref() {
            None => None,
            Some(s) if s.trim().eq_ignore_ascii_case(ANY) => None,
            Some(s) => Some(s.parse::<FileType>()?),
        };
        let size = match &self.file_size {
            None => None,
            Some(v) => v.resolve("file_size")?,
        };
        let nfiles = match &self.nfiles_to_return {
            None => settings.default_nfiles,
            Some(v) => v
                .resolve("nfiles_to_return")?
                .map(|n| n as usize)
                .unwrap_or(settings.default_nfiles),
        };
        if nfiles == 0 {
            bail!("nfiles_to_return must be >= 1");
        }

        Ok(SimilarRecordsRequest {
            query: self.query.clone(),
            constraints: Constraints {
                source,
                extension,
                size,
                contextual: self.contextual,
            },
            window: DateWindow { start, end },
            nfiles,
        })
    }
}

/// Tri-state result of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Found,
    Empty,
    Failed,
}

/// Success signal returned with every similar-records search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchStatus {
    pub success: bool,
    pub outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

/// Response of [`search_similar_records`].
#[derive(Debug, Clone, Serialize)]
pub struct SimilarRecordsResponse {
    /// Refined records, ascending by creation date.
    pub records: Vec<FileMetadata>,
    pub summary: ResultSummary,
    pub status: SearchStatus,
    /// Sub-queries submitted to the index.
    pub sub_queries: Vec<String>,
    /// Candidates the index returned for each sub-query.
    pub sub_query_candidates: Vec<usize>,
    /// Pre-filter in the index's wire form, if any constraint was set.
    pub filter: Option<Value>,
}

impl SimilarRecordsResponse {
    /// Response for a request that could not be run.
    pub fn failed(query: &str, err: &anyhow::Error) -> Self {
        Self {
            records: Vec::new(),
            summary: ResultSummary::empty(query),
            status: SearchStatus {
                success: false,
                outcome: OutcomeKind::Failed,
                exception: Some(format!("{:#}", err)),
            },
            sub_queries: Vec::new(),
            sub_query_candidates: Vec::new(),
            filter: None,
        }
    }
}

/// Search for records similar to `params.query` under its constraints.
///
/// Never fails: errors become a response with `status.success = false`.
pub async fn search_similar_records<I>(
    index: &I,
    settings: &SearchSettings,
    params: &SimilarRecordsParams,
) -> SimilarRecordsResponse
where
    I: SimilarityIndex + ?Sized,
{
    let result = match params.resolve(settings) {
        Ok(req) => run_similar(index, settings, &req).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(resp) => {
            info!(
                query = %params.query,
                sub_queries = resp.sub_queries.len(),
                matches = resp.summary.number_of_matches,
                "similar-records search"
            );
            resp
        }
        Err(e) => {
            warn!(query = %params.query, error = %format!("{:#}", e), "similar-records search failed");
            SimilarRecordsResponse::failed(&params.query, &e)
        }
    }
}

async fn run_similar<I>(
    index: &I,
    settings: &SearchSettings,
    req: &SimilarRecordsRequest,
) -> Result<SimilarRecordsResponse>
where
    I: SimilarityIndex + ?Sized,
{
    let sub_queries = split_query(&req.query, settings.split_mode);
    let filter = build_filter(&req.constraints);
    let index_filter = if req.constraints.contextual {
        None
    } else {
        filter.as_ref()
    };

    let sets = index
        .query(&sub_queries, settings.top_k, index_filter)
        .await
        .context("similarity index query failed")?;
    let sub_query_candidates: Vec<usize> = sets.iter().map(Vec::len).collect();

    let candidates: Vec<FileMetadata> = match settings.sub_query_policy {
        SubQueryPolicy::First => sets
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.metadata)
            .collect(),
        SubQueryPolicy::Union => union_candidates(sets),
    };

    let refined = refine(
        &req.query,
        &candidates,
        &req.constraints,
        &req.window,
        req.nfiles,
    )?;

    let outcome = if refined.records.is_empty() {
        OutcomeKind::Empty
    } else {
        OutcomeKind::Found
    };

    Ok(SimilarRecordsResponse {
        records: refined.records,
        summary: refined.summary,
        status: SearchStatus {
            success: true,
            outcome,
            exception: None,
        },
        sub_queries,
        sub_query_candidates,
        filter: filter.map(|f| f.to_value()),
    })
}

fn union_candidates(sets: Vec<Vec<Candidate>>) -> Vec<FileMetadata> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for c in sets.into_iter().flatten() {
        if seen.insert(c.id.clone()) {
            merged.push(c.metadata);
        }
    }
    merged
}

/// Message reported when link search finds nothing.
pub const NO_MATCHING_LINK: &str = "no matching link";

/// Found/not-found signal for link search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    #[serde(rename = "link retrieved")]
    pub link_retrieved: bool,
    pub message: Option<String>,
}

/// Response of [`search_links`].
#[derive(Debug, Clone, Serialize)]
pub struct LinkSearchResponse {
    /// The most recently created matching link.
    pub record: Option<FileMetadata>,
    pub status: LinkStatus,
    pub outcome: OutcomeKind,
}

/// Find the most recent web link matching `query`.
///
/// The query is split like a similar-records query and only the first
/// sub-query's candidates are considered. Uses the fixed filter
/// `source = web AND file_type = "web link"` and returns the last record after
/// sorting candidates by creation date.
pub async fn search_links<I>(index: &I, settings: &SearchSettings, query: &str) -> LinkSearchResponse
where
    I: SimilarityIndex + ?Sized,
{
    match run_links(index, settings, query).await {
        Ok(Some(record)) => {
            info!(query, title = %record.file_title, "link search");
            LinkSearchResponse {
                record: Some(record),
                status: LinkStatus {
                    link_retrieved: true,
                    message: None,
                },
                outcome: OutcomeKind::Found,
            }
        }
        Ok(None) => {
            info!(query, "link search found nothing");
            LinkSearchResponse {
                record: None,
                status: LinkStatus {
                    link_retrieved: false,
                    message: Some(NO_MATCHING_LINK.to_string()),
                },
                outcome: OutcomeKind::Empty,
            }
        }
        Err(e) => {
            warn!(query, error = %format!("{:#}", e), "link search failed");
            LinkSearchResponse {
                record: None,
                status: LinkStatus {
                    link_retrieved: false,
                    message: Some(format!("{:#}", e)),
                },
                outcome: OutcomeKind::Failed,
            }
        }
    }
}

async fn run_links<I>(
    index: &I,
    settings: &SearchSettings,
    query: &str,
) -> Result<Option<FileMetadata>>
where
    I: SimilarityIndex + ?Sized,
{
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }

    let sub_queries = split_query(query, settings.split_mode);
    let filter = web_link_filter();
    let sets = index
        .query(&sub_queries, settings.top_k, Some(&filter))
        .await
        .context("similarity index query failed")?;
    let candidates: Vec<FileMetadata> = sets
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.metadata)
        .collect();

    let constraints = Constraints {
        source: Some(FileSource::Web),
        extension: Some(FileType::WebLink),
        ..Default::default()
    };
    let everything = DateWindow {
        start: NaiveDate::MIN,
        end: NaiveDate::MAX,
    };
    let refined = refine(query, &candidates, &constraints, &everything, 1)?;
    Ok(refined.records.into_iter().next())
}
