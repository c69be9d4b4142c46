// src/api.rs
//! Admin control surface. Shares only the on-disk documents with the crawl
//! core: every request re-reads the JSON files, so edits made here are picked
//! up by the next run without any in-process coordination.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::{self, AppConfig};
use crate::crawl;
use crate::metrics::Metrics;
use crate::output;

const ADMIN_KEY_HEADER: &str = "x-admin-key";
const ENV_ADMIN_KEY: &str = "ADMIN_ACCESS_KEY";

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<AppConfig>,
    pub admin_key: Arc<String>,
}

pub fn create_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/status", get(status))
        .route("/sources", get(get_sources).post(add_source))
        .route("/sources/{name}", delete(delete_source))
        .route("/topics", get(get_topics).put(put_topics))
        .route("/visuals", get(get_visuals).post(update_visuals))
        .route("/refresh", post(refresh))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_key,
        ));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", admin)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Bind the control surface, including the Prometheus exposition route.
pub async fn serve(cfg: AppConfig, port: u16) -> anyhow::Result<()> {
    let metrics = Metrics::init(cfg.crawl.window_hours);

    let admin_key = std::env::var(ENV_ADMIN_KEY).unwrap_or_default();
    if admin_key.is_empty() {
        warn!("{ENV_ADMIN_KEY} not set; all /api requests will be rejected");
    }

    let state = AppState {
        cfg: Arc::new(cfg),
        admin_key: Arc::new(admin_key),
    };
    let router = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "control surface listening");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn require_admin_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let presented = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    let authorized = !state.admin_key.is_empty() && presented == Some(state.admin_key.as_str());
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized"})),
        )
            .into_response();
    }
    next.run(req).await
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let snapshot_path = state.cfg.snapshot_path();
    let snapshot = output::read_snapshot(&snapshot_path).ok();
    let snapshot_modified = std::fs::metadata(&snapshot_path)
        .and_then(|m| m.modified())
        .ok()
        .map(|t| {
            chrono::DateTime::<Utc>::from(t)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        });
    Json(json!({
        "timestamp": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        "status": "Healthy",
        "sources_count": state.cfg.load_sources().len(),
        "topics_count": state.cfg.load_topics().len(),
        "snapshot_items": snapshot.map(|s| s.len()),
        "snapshot_modified": snapshot_modified,
    }))
}

async fn get_sources(State(state): State<AppState>) -> Json<Value> {
    let doc = config::read_json_doc(&state.cfg.sources_path()).unwrap_or_else(|| json!({}));
    Json(doc)
}

#[derive(serde::Deserialize)]
struct AddSource {
    name: Option<String>,
    url: Option<String>,
}

async fn add_source(
    State(state): State<AppState>,
    Json(body): Json<AddSource>,
) -> impl IntoResponse {
    let (Some(name), Some(url)) = (
        body.name.filter(|s| !s.trim().is_empty()),
        body.url.filter(|s| !s.trim().is_empty()),
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Name and URL required"})),
        );
    };

    let mut doc = config::read_json_doc(&state.cfg.sources_path())
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    doc.insert(name.clone(), Value::String(url));
    if let Err(e) = config::write_json_doc(&state.cfg.sources_path(), &Value::Object(doc)) {
        warn!(error = ?e, "failed to write sources document");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "write failed"})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({"message": format!("Source {name} added")})),
    )
}

async fn delete_source(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let mut doc = config::read_json_doc(&state.cfg.sources_path())
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    if doc.shift_remove(&name).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Source not found"})),
        );
    }
    if let Err(e) = config::write_json_doc(&state.cfg.sources_path(), &Value::Object(doc)) {
        warn!(error = ?e, "failed to write sources document");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "write failed"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"message": format!("Source {name} removed")})),
    )
}

async fn get_topics(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"topics": state.cfg.load_topics()}))
}

#[derive(serde::Deserialize)]
struct TopicsDoc {
    topics: Vec<String>,
}

async fn put_topics(
    State(state): State<AppState>,
    Json(body): Json<TopicsDoc>,
) -> impl IntoResponse {
    let doc = json!({"topics": body.topics});
    if let Err(e) = config::write_json_doc(&state.cfg.preferences_path(), &doc) {
        warn!(error = ?e, "failed to write preferences document");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "write failed"})),
        );
    }
    (StatusCode::OK, Json(doc))
}

async fn get_visuals(State(state): State<AppState>) -> Json<Value> {
    let doc =
        config::read_json_doc(&state.cfg.visuals_path()).unwrap_or_else(config::default_visuals);
    Json(doc)
}

/// Merge semantics: provided keys overwrite, absent keys keep their value.
async fn update_visuals(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let Value::Object(patch) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "expected an object"})),
        );
    };

    let mut current = config::read_json_doc(&state.cfg.visuals_path())
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_else(|| {
            config::default_visuals()
                .as_object()
                .cloned()
                .unwrap_or_default()
        });
    for (k, v) in patch {
        current.insert(k, v);
    }
    let merged = Value::Object(current);
    if let Err(e) = config::write_json_doc(&state.cfg.visuals_path(), &merged) {
        warn!(error = ?e, "failed to write visual settings");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "write failed"})),
        );
    }
    (StatusCode::OK, Json(merged))
}

/// Kick off one personalized crawl in the background; results land in the
/// shared snapshot, not in this response.
async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    let cfg = state.cfg.clone();
    tokio::spawn(async move {
        match crawl::run_topics(&cfg).await {
            Ok(n) => info!(items = n, "admin-triggered crawl finished"),
            Err(e) => warn!(error = ?e, "admin-triggered crawl failed"),
        }
    });
    (
        StatusCode::ACCEPTED,
        Json(json!({"message": "crawl started"})),
    )
}
