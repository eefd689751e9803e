//! Corpus statistics for `scout stats`.
//!
//! Counts records per source and per file type, total size, and the span of
//! creation dates. Gives a quick check that the CSV loaded as expected before
//! pointing an agent at it.

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use filescout_core::models::{FileSource, FileType, Record};

use crate::config::Config;
use crate::ingest::load_records;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub total: usize,
    pub total_bytes: u64,
    pub by_source: BTreeMap<FileSource, usize>,
    pub by_type: BTreeMap<FileType, usize>,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    /// Records whose `file_created_at` does not parse; search never returns them.
    pub undated: usize,
}

pub fn compute_stats(records: &[Record]) -> CorpusStats {
    let mut stats = CorpusStats {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        let meta = &record.metadata;
        stats.total_bytes = stats.total_bytes.saturating_add(meta.file_size);
        *stats.by_source.entry(meta.source).or_default() += 1;
        *stats.by_type.entry(meta.file_type).or_default() += 1;

        match meta.created_date() {
            Ok(d) => {
                stats.earliest = Some(stats.earliest.map_or(d, |e| e.min(d)));
                stats.latest = Some(stats.latest.map_or(d, |l| l.max(d)));
            }
            Err(_) => stats.undated += 1,
        }
    }

    stats
}

/// Run the stats command: load the corpus and print a summary.
///
/// Reads the CSV only; no embeddings are computed.
pub fn run_stats(config: &Config) -> Result<()> {
    let records = load_records(&config.data.path)?;
    let stats = compute_stats(&records);

    let span = match (stats.earliest, stats.latest) {
        (Some(e), Some(l)) => format!("{} .. {}", e, l),
        _ => "n/a".to_string(),
    };

    println!("FileScout — Corpus Stats");
    println!("========================");
    println!();
    println!("  Corpus:      {}", config.data.path.display());
    println!("  Records:     {}", stats.total);
    println!("  Total size:  {}", format_bytes(stats.total_bytes));
    println!("  Created:     {}", span);
    if stats.undated > 0 {
        println!("  Undated:     {}", stats.undated);
    }

    if !stats.by_source.is_empty() {
        println!();
        println!("  {:<16} {:>8}", "SOURCE", "RECORDS");
        println!("  {}", "-".repeat(25));
        for (source, count) in &stats.by_source {
            println!("  {:<16} {:>8}", source, count);
        }
    }

    if !stats.by_type.is_empty() {
        println!();
        println!("  {:<16} {:>8}", "TYPE", "RECORDS");
        println!("  {}", "-".repeat(25));
        for (file_type, count) in &stats.by_type {
            println!("  {:<16} {:>8}", file_type, count);
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
