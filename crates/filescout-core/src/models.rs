//! Core data models used throughout FileScout.
//!
//! A [`Record`] is one corpus entry (a file or a web link). Its
//! [`FileMetadata`] travels through the similarity index unchanged, so the
//! date fields stay as the strings the corpus was ingested with and are only
//! parsed when the refiner needs them.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Where a file lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSource {
    Web,
    GoogleDrive,
    Avoma,
}

impl FileSource {
    pub const ALL: [FileSource; 3] = [FileSource::Web, FileSource::GoogleDrive, FileSource::Avoma];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileSource::Web => "web",
            FileSource::GoogleDrive => "google_drive",
            FileSource::Avoma => "avoma",
        }
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FileSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        FileSource::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| {
                anyhow!(
                    "invalid file source '{}'. Must be web, google_drive, or avoma.",
                    s
                )
            })
    }
}

/// File format, including the pseudo-type used for plain web links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "docx")]
    Docx,
    #[serde(rename = "pptx")]
    Pptx,
    #[serde(rename = "xlsx")]
    Xlsx,
    #[serde(rename = "web link")]
    WebLink,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Pdf,
        FileType::Docx,
        FileType::Pptx,
        FileType::Xlsx,
        FileType::WebLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Pptx => "pptx",
            FileType::Xlsx => "xlsx",
            FileType::WebLink => "web link",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        FileType::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| {
                anyhow!(
                    "invalid file extension '{}'. Must be web link, pdf, docx, pptx, or xlsx.",
                    s
                )
            })
    }
}

/// Structured metadata stored alongside every record in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub author: String,
    pub source: FileSource,
    pub file_title: String,
    pub file_size: u64,
    pub file_type: FileType,
    pub file_location_at_source: String,
    /// Creation timestamp as ingested (`YYYY-MM-DD` or a datetime).
    pub file_created_at: String,
    pub file_last_updated_at: String,
    pub file_url: String,
}

impl FileMetadata {
    /// Calendar date the file was created.
    pub fn created_date(&self) -> Result<NaiveDate> {
        parse_record_date(&self.file_created_at)
    }
}

/// One corpus entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Sequential id assigned at ingestion (`"1"`, `"2"`, ...).
    pub id: String,
    /// Text the embedding is computed from.
    pub searchable_text: String,
    pub metadata: FileMetadata,
}

/// Parse a request date. Only `YYYY-MM-DD` is accepted.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid date '{}' (expected YYYY-MM-DD): {}", s, e))
}

/// Parse a stored timestamp down to its calendar date.
///
/// Accepts a bare date, `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]`
/// and RFC 3339.
pub fn parse_record_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    bail!("unparseable file_created_at '{}'", s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_roundtrips_through_str() {
        for s in FileSource::ALL {
            assert_eq!(s.as_str().parse::<FileSource>().unwrap(), s);
        }
        assert!("dropbox".parse::<FileSource>().is_err());
    }

    #[test]
    fn test_web_link_serde_name() {
        let json = serde_json::to_string(&FileType::WebLink).unwrap();
        assert_eq!(json, "\"web link\"");
        let back: FileType = serde_json::from_str("\"web link\"").unwrap();
        assert_eq!(back, FileType::WebLink);
        assert_eq!("web link".parse::<FileType>().unwrap(), FileType::WebLink);
    }

    #[test]
    fn test_parse_record_date_formats() {
        let want = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_record_date("2024-03-05").unwrap(), want);
        assert_eq!(parse_record_date("2024-03-05 14:22:11").unwrap(), want);
        assert_eq!(parse_record_date("2024-03-05 14:22:11.123456").unwrap(), want);
        assert_eq!(parse_record_date("2024-03-05T14:22:11").unwrap(), want);
        assert_eq!(parse_record_date("2024-03-05T14:22:11+00:00").unwrap(), want);
        assert!(parse_record_date("last tuesday").is_err());
    }

    #[test]
    fn test_parse_iso_date_strict() {
        assert!(parse_iso_date("2024-01-01").is_ok());
        assert!(parse_iso_date("not-a-date").is_err());
        assert!(parse_iso_date("2024-01-01 10:00:00").is_err());
    }
}
