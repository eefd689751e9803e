//! HTTP tool server.
//!
//! Exposes the retrieval tools to an agent loop over a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List registered tools with their schemas |
//! | `POST` | `/tools/{name}` | Call a tool by name |
//! | `GET`  | `/health` | Status, version and indexed record count |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "missing required parameter: query" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `tool_error` (500).
//! A search that fails (bad date, bad enum, mistyped optional field, index
//! error) is **not** an HTTP error: it comes back as 200 with
//! `status.success = false` in the result.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::config::Config;
use crate::ingest::build_index;
use crate::tools::{validate_params, InvalidParams, ToolContext, ToolInfo, ToolRegistry};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<ToolContext>,
    pub tools: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(ctx: ToolContext, tools: ToolRegistry) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tools: Arc::new(tools),
        }
    }
}

/// Build the router. Separate from [`run_server`] so tests can drive it
/// without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Load the corpus, build the index, and serve until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let settings = config.search_settings()?;
    let index = build_index(config).await?;
    let ctx = ToolContext::new(Arc::new(index), settings);
    let registry = ToolRegistry::with_builtins();

    for t in registry.tools() {
        info!(tool = t.name(), "registered tool");
    }

    let app = router(AppState::new(ctx, registry));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "tool server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error".to_string(),
        message: message.into(),
    }
}

/// [`InvalidParams`] is the caller's fault; anything else raised by a tool is
/// a server-side failure.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let msg = format!("{}: {:#}", tool_name, err);
    if err.downcast_ref::<InvalidParams>().is_some() {
        bad_request(msg)
    } else {
        tool_error(msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    records: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        records: state.ctx.index.len(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.declarations(),
    })
}

// ============ POST /tools/{name} ============

/// Look up the tool, validate the body against its schema, and execute.
///
/// Returns `404` for an unknown tool and `400` for a body that is not valid
/// JSON, is not an object, or lacks a required string field.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let Json(params) = body.map_err(|e| bad_request(e.body_text()))?;

    let validated = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| classify_tool_error(&name, e))?;

    debug!(tool = %name, "tool call");
    let result = tool
        .execute(validated, &state.ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}
