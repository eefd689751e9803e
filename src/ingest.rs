//! Corpus bootstrap: CSV rows → [`Record`]s → in-memory index.
//!
//! Rows are mapped by header name. Row order assigns ids `"1"..="N"`, and the
//! `generated_insights` column becomes the searchable text. Any malformed row
//! aborts ingestion with the offending line number; a partially loaded corpus
//! is never served.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

use filescout_core::index::memory::InMemoryIndex;
use filescout_core::models::{FileMetadata, FileSource, FileType, Record};

use crate::config::Config;
use crate::embedding::create_embedder;

/// One CSV row as written by the corpus export.
#[derive(Debug, Deserialize)]
struct CsvRow {
    author: String,
    source: String,
    file_title: String,
    file_size: String,
    file_type: String,
    file_location_at_source: String,
    file_created_at: String,
    file_last_updated_at: String,
    file_url: String,
    generated_insights: String,
}

impl CsvRow {
    fn into_record(self, id: usize) -> Result<Record> {
        let source: FileSource = self.source.parse()?;
        let file_type: FileType = self.file_type.parse()?;
        let file_size = parse_size(&self.file_size)?;

        Ok(Record {
            id: id.to_string(),
            searchable_text: self.generated_insights,
            metadata: FileMetadata {
                author: self.author,
                source,
                file_title: self.file_title,
                file_size,
                file_type,
                file_location_at_source: self.file_location_at_source,
                file_created_at: self.file_created_at,
                file_last_updated_at: self.file_last_updated_at,
                file_url: self.file_url,
            },
        })
    }
}

/// Sizes may be exported as `1200` or `1200.0`.
fn parse_size(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        _ => Err(anyhow!("invalid file_size '{}'", raw)),
    }
}

/// Parse records from CSV text with a header row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, row) in rdr.deserialize::<CsvRow>().enumerate() {
        // Line 1 is the header.
        let line = i + 2;
        let row = row.with_context(|| format!("malformed CSV row at line {}", line))?;
        let record = row
            .into_record(i + 1)
            .with_context(|| format!("invalid CSV row at line {}", line))?;
        records.push(record);
    }
    Ok(records)
}

/// Read every record from the CSV file at `path`.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open corpus file: {}", path.display()))?;
    read_records(file).with_context(|| format!("Failed to load corpus: {}", path.display()))
}

/// Load the corpus named in `config` and build the index. Called once at
/// startup; the returned index is read-only.
pub async fn build_index(config: &Config) -> Result<InMemoryIndex> {
    let records = load_records(&config.data.path)?;
    let embedder = create_embedder(&config.embedding)?;
    let model = embedder.model_name().to_string();
    let index = InMemoryIndex::build(records, embedder).await?;
    info!(
        records = index.records().len(),
        model = %model,
        path = %config.data.path.display(),
        "index built"
    );
    Ok(index)
}
