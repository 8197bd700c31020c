use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use folio_core::persist::{load_snapshot, IndexPaths};
use folio_core::{top_n, Error as CoreError, Snapshot, SnapshotHandle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_field")]
    pub field: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_field() -> String { folio_core::features::DESCRIPTION.to_string() }
fn default_k() -> usize { folio_core::DEFAULT_TOP_N }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub field: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f64,
    pub id: String,
    pub title: String,
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths_root: PathBuf,
    pub snapshot: Arc<SnapshotHandle>,
    pub admin_token: Option<String>,
}

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, String)>;

pub fn build_app(index_dir: String) -> Result<Router> {
    let snapshot = load_snapshot(&IndexPaths::new(&index_dir))?;
    tracing::info!(index_dir = %index_dir, num_docs = snapshot.num_docs(), "loaded snapshot");
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(build_app_with(snapshot, PathBuf::from(index_dir), admin_token))
}

/// Router over an already loaded snapshot. `index_dir` is where `/admin/reload` reads from.
pub fn build_app_with(snapshot: Snapshot, index_dir: PathBuf, admin_token: Option<String>) -> Router {
    let app_state = AppState { index_paths_root: index_dir, snapshot: Arc::new(SnapshotHandle::new(snapshot)), admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snap = state.snapshot.load();
    let fields: Vec<&str> = snap.field_names().collect();
    Json(serde_json::json!({ "status": "ok", "num_docs": snap.num_docs(), "fields": fields }))
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<SearchResponse> {
    let start = std::time::Instant::now();
    let snap = state.snapshot.load();
    let ranked = snap.search(&params.field, &params.q).map_err(core_error)?;
    let total_hits = ranked.len();
    let k = params.k.clamp(1, 100);

    let results = top_n(ranked, k)
        .into_iter()
        .filter_map(|hit| {
            let meta = snap.doc(hit.doc_id)?;
            Some(SearchHit { doc_id: hit.doc_id, score: hit.score, id: meta.external_id.clone(), title: meta.title.clone() })
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(q = %params.q, field = %params.field, total_hits, "search");
    Ok(Json(SearchResponse { query: params.q, field: params.field, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> ApiResult<serde_json::Value> {
    let snap = state.snapshot.load();
    let meta = snap.doc(doc_id).ok_or((StatusCode::NOT_FOUND, format!("doc {doc_id} not found")))?;
    let signals = snap.signals();
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "id": meta.external_id,
        "title": meta.title,
        "rating": signals.rating[doc_id as usize],
        "thumbs": signals.thumbs[doc_id as usize],
    })))
}

/// Load the snapshot on disk and publish it. In-flight searches finish on the snapshot they started with.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<serde_json::Value> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_paths_root);
    let loaded = tokio::task::spawn_blocking(move || load_snapshot(&paths))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let next = loaded.map_err(|e| {
        tracing::error!(error = %e, "reload failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let num_docs = next.num_docs();
    let prev = state.snapshot.swap(next);
    Ok(Json(serde_json::json!({ "num_docs": num_docs, "previous_num_docs": prev.num_docs() })))
}

fn core_error(e: CoreError) -> (StatusCode, String) {
    let status = match e {
        CoreError::UnknownField(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
