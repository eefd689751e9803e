//! Agent-callable tools.
//!
//! The two retrieval entry points are exposed to the conversational agent as
//! function-calling tools. Each tool carries a JSON Schema that doubles as the
//! function declaration handed to the model (`scout tools` prints them) and
//! as the contract enforced by [`validate_params`] before execution.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  ┌──────────────────────┐ ┌───────────┐  │
//! │  │search_for_similar_   │ │search_for_│  │
//! │  │records               │ │links      │  │
//! │  └──────────────────────┘ └───────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     POST /tools/{name} → ToolContext → SimilarityIndex
//! ```
//!
//! Search failures are part of the tool result (`status.success = false`),
//! and so is any optional parameter of the wrong shape. Only a body that is
//! not an object, or lacks a required string field, is rejected outright
//! with [`InvalidParams`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use filescout_core::index::SimilarityIndex;
use filescout_core::search::{
    search_links, search_similar_records, LinkSearchResponse, SearchSettings,
    SimilarRecordsParams, SimilarRecordsResponse,
};

/// A tool the agent can discover and call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name (`POST /tools/{name}`) and function name in declarations.
    fn name(&self) -> &str;

    /// One-line description the model uses to pick the tool.
    fn description(&self) -> &str;

    /// Function-calling JSON Schema for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with parameters already checked by [`validate_params`].
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Shared read-only state handed to every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    pub index: Arc<dyn SimilarityIndex>,
    pub settings: SearchSettings,
}

impl ToolContext {
    pub fn new(index: Arc<dyn SimilarityIndex>, settings: SearchSettings) -> Self {
        Self { index, settings }
    }

    pub async fn similar_records(&self, params: &SimilarRecordsParams) -> SimilarRecordsResponse {
        search_similar_records(self.index.as_ref(), &self.settings, params).await
    }

    pub async fn links(&self, query: &str) -> LinkSearchResponse {
        search_links(self.index.as_ref(), &self.settings, query).await
    }
}

/// The invocation itself is malformed; the server answers 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidParams(pub String);

impl fmt::Display for InvalidParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvalidParams {}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    InvalidParams(message.into()).into()
}

/// Entry in `GET /tools/list` and `scout tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// `search_for_similar_records`: ranked, filtered, date-windowed search.
pub struct SimilarRecordsTool;

#[async_trait]
impl Tool for SimilarRecordsTool {
    fn name(&self) -> &str {
        "search_for_similar_records"
    }

    fn description(&self) -> &str {
        "Search the company file corpus for files relevant to the query. \
         Optionally restrict by source, file type, minimum size and creation date window. \
         Returns the matching files' metadata ordered by creation date, plus a summary."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What the user is looking for. Several topics may be joined with 'and' or 'or'."
                },
                "file_source": {
                    "type": "string",
                    "enum": ["any", "web", "google_drive", "avoma"],
                    "description": "Where the file is stored.",
                    "default": "any"
                },
                "file_extension": {
                    "type": "string",
                    "enum": ["any", "web link", "pdf", "docx", "pptx", "xlsx"],
                    "description": "File type.",
                    "default": "any"
                },
                "file_size": {
                    "type": ["integer", "string"],
                    "description": "Size in MB, or \"any\".",
                    "default": "any"
                },
                "nfiles_to_return": {
                    "type": ["integer", "string"],
                    "description": "Maximum number of files to return.",
                    "default": 10
                },
                "start_date": {
                    "type": "string",
                    "description": "Earliest creation date, YYYY-MM-DD."
                },
                "end_date": {
                    "type": "string",
                    "description": "Latest creation date, YYYY-MM-DD."
                },
                "contextual": {
                    "type": "boolean",
                    "description": "Rank without the metadata pre-filter; constraints still apply to the results.",
                    "default": false
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or_default().to_string();
        let resp = match serde_json::from_value::<SimilarRecordsParams>(params) {
            Ok(params) => ctx.similar_records(&params).await,
            Err(e) => {
                let err = anyhow::Error::new(e).context("invalid parameters");
                warn!(query = %query, error = %format!("{:#}", err), "similar-records search failed");
                SimilarRecordsResponse::failed(&query, &err)
            }
        };
        serde_json::to_value(&resp).context("failed to encode response")
    }
}

/// `search_for_links`: the most recent matching web link.
pub struct LinkSearchTool;

#[async_trait]
impl Tool for LinkSearchTool {
    fn name(&self) -> &str {
        "search_for_links"
    }

    fn description(&self) -> &str {
        "Find the most recent web page link matching the query."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Description of the page being looked for."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = params["query"]
            .as_str()
            .ok_or_else(|| invalid("parameter 'query' must be a string"))?;
        let resp = ctx.links(query).await;
        serde_json::to_value(&resp).context("failed to encode response")
    }
}

/// Registry of the tools served to agents.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry holding both retrieval tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SimilarRecordsTool));
        registry.register(Box::new(LinkSearchTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Function declarations for every registered tool.
    pub fn declarations(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check the shape of an invocation: `params` must be an object holding
/// every required field with its declared type. Optional fields are not
/// checked here; a bad value there comes back as a failed search rather than
/// a rejected call.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let obj = params.as_object().ok_or_else(|| {
        invalid(format!(
            "parameters must be a JSON object, got {}",
            json_type_name(params)
        ))
    })?;

    let empty = serde_json::Map::new();
    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .unwrap_or(&empty);
    let required = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>())
        .unwrap_or_default();

    for field in required {
        let value = obj
            .get(field)
            .ok_or_else(|| invalid(format!("missing required parameter: {}", field)))?;
        let Some(expected) = properties.get(field).and_then(|p| p["type"].as_str()) else {
            continue;
        };
        if !type_matches(expected, value) {
            return Err(invalid(format!(
                "parameter '{}' must be of type '{}', got {}",
                field,
                expected,
                json_type_name(value)
            )));
        }
    }

    Ok(params.clone())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        // Function-calling models routinely send integral floats.
        "integer" => value.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filescout_core::embedding::HashingEmbedder;
    use filescout_core::index::memory::InMemoryIndex;
    use filescout_core::models::{FileMetadata, FileSource, FileType, Record};

    async fn context() -> ToolContext {
        let records = vec![
            Record {
                id: "1".into(),
                searchable_text: "Pricing page for the product".into(),
                metadata: FileMetadata {
                    author: "Ana".into(),
                    source: FileSource::Web,
                    file_title: "Pricing".into(),
                    file_size: 0,
                    file_type: FileType::WebLink,
                    file_location_at_source: "/pricing".into(),
                    file_created_at: "2024-03-01".into(),
                    file_last_updated_at: "2024-03-01".into(),
                    file_url: "https://example.com/pricing".into(),
                },
            },
            Record {
                id: "2".into(),
                searchable_text: "Quarterly roadmap deck".into(),
                metadata: FileMetadata {
                    author: "Bo".into(),
                    source: FileSource::GoogleDrive,
                    file_title: "Roadmap".into(),
                    file_size: 3_000_000,
                    file_type: FileType::Pptx,
                    file_location_at_source: "product".into(),
                    file_created_at: "2024-04-10 08:00:00".into(),
                    file_last_updated_at: "2024-04-11 08:00:00".into(),
                    file_url: "http://example.com/roadmap.pptx".into(),
                },
            },
        ];
        let index = InMemoryIndex::build(records, Arc::new(HashingEmbedder::new(128)))
            .await
            .unwrap();
        ToolContext::new(Arc::new(index), SearchSettings::default())
    }

    #[test]
    fn test_registry_builtins() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 2);
        assert!(registry.find("search_for_similar_records").is_some());
        assert!(registry.find("search_for_links").is_some());
        assert!(registry.find("search").is_none());
    }

    #[test]
    fn test_declarations_carry_enums() {
        let decls = ToolRegistry::with_builtins().declarations();
        let props = &decls[0].parameters["properties"];
        assert_eq!(
            props["file_source"]["enum"],
            json!(["any", "web", "google_drive", "avoma"])
        );
        assert_eq!(
            props["file_extension"]["enum"],
            json!(["any", "web link", "pdf", "docx", "pptx", "xlsx"])
        );
    }

    #[test]
    fn test_validate_params() {
        let schema = SimilarRecordsTool.parameters_schema();
        assert!(validate_params(&schema, &json!({"query": "x"})).is_ok());
        assert!(validate_params(&schema, &json!({"query": "x", "file_size": "any"})).is_ok());
        assert!(validate_params(&schema, &json!({"query": "x", "nfiles_to_return": 3.0})).is_ok());

        // Optional fields are the search layer's business.
        assert!(validate_params(&schema, &json!({"query": "x", "contextual": "yes"})).is_ok());
        assert!(validate_params(&schema, &json!({"query": "x", "file_size": 2.5})).is_ok());

        let err = validate_params(&schema, &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: query"));
        assert!(err.downcast_ref::<InvalidParams>().is_some());

        let err = validate_params(&schema, &json!(["query"])).unwrap_err();
        assert!(err.to_string().contains("JSON object"));

        let err = validate_params(&schema, &json!({"query": 5})).unwrap_err();
        assert!(err.downcast_ref::<InvalidParams>().is_some());
    }

    #[tokio::test]
    async fn test_mistyped_optional_fields_fail_the_search() {
        let ctx = context().await;
        for params in [
            json!({"query": "roadmap", "contextual": "yes"}),
            json!({"query": "roadmap", "file_size": 2.5}),
            json!({"query": "roadmap", "file_source": 5}),
        ] {
            let out = SimilarRecordsTool.execute(params.clone(), &ctx).await.unwrap();
            assert_eq!(out["status"]["success"], json!(false), "{}", params);
            assert_eq!(out["status"]["outcome"], json!("failed"));
            assert_eq!(out["summary"]["query_passed"], json!("roadmap"));
        }
    }

    #[tokio::test]
    async fn test_link_tool_rejects_non_string_query() {
        let ctx = context().await;
        let err = LinkSearchTool
            .execute(json!({"query": 5}), &ctx)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<InvalidParams>().is_some());
    }

    #[tokio::test]
    async fn test_similar_records_tool_reports_failure_in_result() {
        let ctx = context().await;
        let out = SimilarRecordsTool
            .execute(json!({"query": "roadmap", "start_date": "not-a-date"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["status"]["success"], json!(false));
        assert_eq!(out["summary"]["number_of_matches"], json!(0));
    }

    #[tokio::test]
    async fn test_link_tool_uses_spaced_status_key() {
        let ctx = context().await;
        let out = LinkSearchTool
            .execute(json!({"query": "pricing page"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["status"]["link retrieved"], json!(true));
        assert_eq!(out["record"]["file_title"], json!("Pricing"));
    }
}
