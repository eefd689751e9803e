//! Constraint building and the index's native filter grammar.
//!
//! Callers describe what they want with a [`Constraints`] value. The
//! [`build_filter`] function turns it into a [`FilterExpr`], the boolean
//! expression tree the similarity index evaluates before ranking. The wire
//! form is the Chroma-style JSON produced by [`FilterExpr::to_value`]:
//!
//! ```json
//! {"$and": [{"source": "web"}, {"file_size": {"$lte": 3}}]}
//! ```
//!
//! The pre-filter is coarse. The refiner re-applies every constraint after
//! retrieval with its own comparison rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{FileMetadata, FileSource, FileType};

/// Typed, independently optional search constraints. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub source: Option<FileSource>,
    pub extension: Option<FileType>,
    /// Size bound in the caller's unit.
    pub size: Option<u64>,
    /// Withhold the pre-filter from the index and rely on refinement alone.
    #[serde(default)]
    pub contextual: bool,
}

impl Constraints {
    /// Number of active constraint dimensions.
    pub fn active(&self) -> usize {
        [
            self.source.is_some(),
            self.extension.is_some(),
            self.size.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }
}

/// Metadata fields the index can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Source,
    FileType,
    FileSize,
}

impl FilterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::Source => "source",
            FilterField::FileType => "file_type",
            FilterField::FileSize => "file_size",
        }
    }
}

/// Comparison operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Int(u64),
}

impl FilterValue {
    fn to_value(&self) -> Value {
        match self {
            FilterValue::Text(s) => Value::String(s.clone()),
            FilterValue::Int(n) => Value::from(*n),
        }
    }
}

/// Boolean filter expression in the index's grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Eq { field: FilterField, value: FilterValue },
    Lte { field: FilterField, value: FilterValue },
    And(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn eq(field: FilterField, value: FilterValue) -> Self {
        FilterExpr::Eq { field, value }
    }

    /// Number of atomic predicates in the tree.
    pub fn predicate_count(&self) -> usize {
        match self {
            FilterExpr::And(nodes) => nodes.iter().map(FilterExpr::predicate_count).sum(),
            _ => 1,
        }
    }

    /// Serialize to the Chroma-style `where` document.
    pub fn to_value(&self) -> Value {
        match self {
            FilterExpr::Eq { field, value } => {
                serde_json::json!({ field.as_str(): value.to_value() })
            }
            FilterExpr::Lte { field, value } => {
                serde_json::json!({ field.as_str(): { "$lte": value.to_value() } })
            }
            FilterExpr::And(nodes) => {
                serde_json::json!({ "$and": nodes.iter().map(FilterExpr::to_value).collect::<Vec<_>>() })
            }
        }
    }

    /// Evaluate the expression against a record's metadata.
    pub fn matches(&self, meta: &FileMetadata) -> bool {
        match self {
            FilterExpr::And(nodes) => nodes.iter().all(|n| n.matches(meta)),
            FilterExpr::Eq { field, value } => lookup(meta, *field) == *value,
            FilterExpr::Lte { field, value } => match (lookup(meta, *field), value) {
                (FilterValue::Int(have), FilterValue::Int(bound)) => have <= *bound,
                (FilterValue::Text(have), FilterValue::Text(bound)) => have <= *bound,
                _ => false,
            },
        }
    }
}

fn lookup(meta: &FileMetadata, field: FilterField) -> FilterValue {
    match field {
        FilterField::Source => FilterValue::Text(meta.source.as_str().to_string()),
        FilterField::FileType => FilterValue::Text(meta.file_type.as_str().to_string()),
        FilterField::FileSize => FilterValue::Int(meta.file_size),
    }
}

/// Build the index pre-filter for `constraints`.
///
/// Returns `None` when nothing is constrained; the caller must then query
/// the index with no filter at all rather than an empty one. A single
/// predicate is returned bare; two or more are wrapped in `$and`.
pub fn build_filter(constraints: &Constraints) -> Option<FilterExpr> {
    let mut predicates = Vec::with_capacity(3);

    if let Some(source) = constraints.source {
        predicates.push(FilterExpr::eq(
            FilterField::Source,
            FilterValue::Text(source.as_str().to_string()),
        ));
    }
    if let Some(ext) = constraints.extension {
        predicates.push(FilterExpr::eq(
            FilterField::FileType,
            FilterValue::Text(ext.as_str().to_string()),
        ));
    }
    if let Some(size) = constraints.size {
        predicates.push(FilterExpr::Lte {
            field: FilterField::FileSize,
            value: FilterValue::Int(size),
        });
    }

    match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ => Some(FilterExpr::And(predicates)),
    }
}

/// The fixed filter used by link search: `source = web AND file_type = web link`.
pub fn web_link_filter() -> FilterExpr {
    FilterExpr::And(vec![
        FilterExpr::eq(
            FilterField::Source,
            FilterValue::Text(FileSource::Web.as_str().to_string()),
        ),
        FilterExpr::eq(
            FilterField::FileType,
            FilterValue::Text(FileType::WebLink.as_str().to_string()),
        ),
    ])
}
