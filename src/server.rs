//! HTTP boundary for the recommendation engine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/recommend` | Recommend up to 3 events for a free-text query |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Response Contract
//!
//! `POST /recommend` takes `{"user_input": string}` and answers with one of:
//!
//! - `400 {"error": "Please provide a valid user input."}` — empty or
//!   missing input; nothing else runs.
//! - `200 {"message": "No events found for <Month>."}` — a month was
//!   mentioned but the catalog has no rows for it.
//! - `200 {"message": "No relevant events found."}` — nothing scored above
//!   the similarity threshold.
//! - `200 {"events": [...]}` — 1 to 3 full catalog rows, ranked.
//!
//! A provider failure surfaces as `500 {"error": ...}`; partial results
//! are never returned.
//!
//! # CORS
//!
//! Browser access is restricted to the origins listed in
//! `[server].allowed_origins`. An empty list allows no cross-origin
//! callers.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;
use crate::engine::{Engine, Outcome};

/// Shared application state passed to route handlers via Axum's `State`.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

/// Build the application router. Split out from [`run_server`] so tests
/// can drive the same routes on an ephemeral listener.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/recommend", post(handle_recommend))
        .route("/health", get(handle_health))
        .with_state(AppState { engine })
}

/// CORS layer restricted to the configured origin allow-list.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid allowed origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config, engine: Arc<Engine>) -> Result<()> {
    let cors = cors_layer(&config.server.allowed_origins)?;
    let app = router(engine).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "recommendation server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Error that converts into the flat `{"error": message}` JSON shape.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

// ============ GET /health ============

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============ POST /recommend ============

/// Handler for `POST /recommend`.
///
/// Input presence is validated here, before the engine runs, so an empty
/// query never reaches the providers.
async fn handle_recommend(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_input = body
        .get("user_input")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("");

    if user_input.is_empty() {
        return Err(bad_request("Please provide a valid user input."));
    }

    let outcome = state.engine.recommend(user_input).await.map_err(|e| {
        tracing::error!(error = %e, "recommendation failed");
        internal(e.to_string())
    })?;

    let response = match outcome {
        Outcome::NoEventsForMonth(month) => serde_json::json!({
            "message": format!("No events found for {}.", month),
        }),
        Outcome::NoMatches => serde_json::json!({
            "message": "No relevant events found.",
        }),
        Outcome::Events(events) => {
            let rows: Vec<serde_json::Value> = events
                .into_iter()
                .map(|e| serde_json::Value::Object(e.record.fields))
                .collect();
            serde_json::json!({ "events": rows })
        }
    };

    Ok(Json(response))
}
