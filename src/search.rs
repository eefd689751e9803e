//! CLI front-ends for `scout search`, `scout links` and `scout list`.
//!
//! Each command builds the index from the configured corpus, runs one
//! operation through the core, and prints either a human-readable listing or
//! the raw JSON response (`--json`). A search whose outcome is `failed` exits
//! non-zero after printing.

use anyhow::{bail, Result};

use filescout_core::filter::{build_filter, Constraints};
use filescout_core::index::SimilarityIndex;
use filescout_core::models::{FileMetadata, FileSource, FileType};
use filescout_core::search::{
    search_links, search_similar_records, LooseInt, OutcomeKind, SimilarRecordsParams, ANY,
};

use crate::config::Config;
use crate::ingest::build_index;

/// Flags of `scout search`.
#[derive(Debug, Default, Clone)]
pub struct SearchArgs {
    pub source: Option<String>,
    pub extension: Option<String>,
    pub size: Option<String>,
    pub limit: Option<usize>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub contextual: bool,
    pub json: bool,
}

impl SearchArgs {
    fn into_params(self, query: &str) -> SimilarRecordsParams {
        SimilarRecordsParams {
            query: query.to_string(),
            file_source: self.source,
            file_extension: self.extension,
            file_size: self.size.map(LooseInt::Text),
            nfiles_to_return: self.limit.map(|n| LooseInt::Int(n as i64)),
            start_date: self.start,
            end_date: self.end,
            contextual: self.contextual,
        }
    }
}

pub async fn run_search(config: &Config, query: &str, args: SearchArgs) -> Result<()> {
    let settings = config.search_settings()?;
    let index = build_index(config).await?;
    let json = args.json;
    let params = args.into_params(query);

    let resp = search_similar_records(&index, &settings, &params).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        match resp.status.outcome {
            OutcomeKind::Failed => {}
            OutcomeKind::Empty => println!("No files found."),
            OutcomeKind::Found => {
                if resp.sub_queries.len() > 1 {
                    println!("Sub-queries: {}", resp.sub_queries.join(" | "));
                }
                if let Some(filter) = &resp.filter {
                    println!("Filter: {}", filter);
                }
                let latest = resp
                    .summary
                    .latest_document_created_at
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "{} match(es) for \"{}\", latest {}",
                    resp.summary.number_of_matches, resp.summary.query_passed, latest
                );
                println!();
                for (i, meta) in resp.records.iter().enumerate() {
                    print_file(i + 1, meta);
                }
            }
        }
    }

    if let Some(exception) = resp.status.exception {
        bail!("search failed: {}", exception);
    }
    Ok(())
}

pub async fn run_links(config: &Config, query: &str, json: bool) -> Result<()> {
    let settings = config.search_settings()?;
    let index = build_index(config).await?;

    let resp = search_links(&index, &settings, query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else if let Some(meta) = &resp.record {
        println!("{}", meta.file_title);
        println!("    {}", meta.file_url);
        println!("    created: {}", meta.file_created_at);
    } else if resp.outcome == OutcomeKind::Empty {
        println!("No matching link.");
    }

    if resp.outcome == OutcomeKind::Failed {
        bail!(
            "link search failed: {}",
            resp.status.message.unwrap_or_default()
        );
    }
    Ok(())
}

/// Parse CLI constraint flags; `"any"` and absence both mean unconstrained.
pub fn parse_constraints(
    source: Option<&str>,
    extension: Option<&str>,
    size: Option<&str>,
) -> Result<Constraints> {
    let is_any = |s: &str| s.trim().eq_ignore_ascii_case(ANY);
    let source = match source {
        Some(s) if !is_any(s) => Some(s.parse::<FileSource>()?),
        _ => None,
    };
    let extension = match extension {
        Some(s) if !is_any(s) => Some(s.parse::<FileType>()?),
        _ => None,
    };
    let size = match size {
        Some(s) => LooseInt::Text(s.to_string()).resolve("size")?,
        None => None,
    };
    Ok(Constraints {
        source,
        extension,
        size,
        contextual: false,
    })
}

/// `scout list`: every record matching the index pre-filter, in id order.
pub async fn run_list(config: &Config, constraints: &Constraints) -> Result<()> {
    let index = build_index(config).await?;
    let filter = build_filter(constraints);
    let records = index.get(filter.as_ref()).await?;

    if records.is_empty() {
        println!("No files found.");
        return Ok(());
    }
    for record in &records {
        println!(
            "{:>5}  {:<13} {:<9} {:<20} {}",
            record.id,
            record.metadata.source,
            record.metadata.file_type,
            record.metadata.file_created_at,
            record.metadata.file_title
        );
    }
    println!();
    println!("{} record(s)", records.len());
    Ok(())
}

fn print_file(rank: usize, meta: &FileMetadata) {
    println!(
        "{}. {}  [{}, {}, {} bytes]",
        rank, meta.file_title, meta.source, meta.file_type, meta.file_size
    );
    println!("    created: {}  author: {}", meta.file_created_at, meta.author);
    println!("    location: {}", meta.file_location_at_source);
    println!("    url: {}", meta.file_url);
}
