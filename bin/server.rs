// Punto Registro - Web Server
// Thin HTTP adapter over the record store. One mutex around the store
// keeps a single writer in flight, which is all the core supports.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use punto_registro::{
    ActionKind, HistoryEntry, HistoryFilter, JsonFileGateway, NewPoint, PointFilter, PointUpdate,
    RecordStore, StoreError,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<RecordStore>>,
}

impl AppState {
    fn store(&self) -> std::sync::MutexGuard<'_, RecordStore> {
        self.store.lock().expect("store lock poisoned")
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_options: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            total: None,
            error: None,
            valid_options: None,
        }
    }

    fn with_total(data: T, total: usize) -> Self {
        Self {
            total: Some(total),
            ..Self::ok(data)
        }
    }
}

/// Map a store error onto a status code plus the standard envelope.
/// Reference errors carry the currently valid ids so the caller can retry.
fn error_response(err: StoreError) -> (StatusCode, Json<ApiResponse<Value>>) {
    let status = match &err {
        StoreError::Validation { .. } | StoreError::InvalidReference { .. } => {
            StatusCode::BAD_REQUEST
        }
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let valid_options = match &err {
        StoreError::InvalidReference { valid, .. } => Some(valid.clone()),
        _ => None,
    };
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            total: None,
            error: Some(err.to_string()),
            valid_options,
        }),
    )
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiResponse<Value>>) {
    error_response(StoreError::Validation {
        message: message.into(),
    })
}

#[derive(Deserialize, Default)]
struct HistoryQuery {
    point_id: Option<String>,
    action: Option<String>,
    actor: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    fn into_filter(self) -> Result<HistoryFilter, String> {
        let action = match self.action {
            Some(raw) => Some(
                ActionKind::parse(&raw)
                    .ok_or_else(|| format!("unknown action '{}' (creation|update|deletion)", raw))?,
            ),
            None => None,
        };
        Ok(HistoryFilter {
            point_id: self.point_id,
            action,
            actor: self.actor,
            from: self.from,
            to: self.to,
        })
    }
}

#[derive(Deserialize, Default)]
struct ActorBody {
    actor: Option<String>,
}

#[derive(Serialize)]
struct PointHistory {
    point: punto_registro::CollectionPoint,
    history: Vec<HistoryEntry>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now(),
    })))
}

/// GET /api/points - List points with optional category/state/subcategory filters
async fn list_points(
    State(state): State<AppState>,
    Query(filter): Query<PointFilter>,
) -> impl IntoResponse {
    let store = state.store();
    let points: Vec<_> = store.list(&filter).into_iter().cloned().collect();
    let total = points.len();
    Json(ApiResponse::with_total(points, total))
}

/// GET /api/points/:id - Get one point
async fn get_point(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let store = state.store();
    match store.get(&id) {
        Some(point) => (StatusCode::OK, Json(ApiResponse::ok(point.clone()))).into_response(),
        None => error_response(StoreError::NotFound { id }).into_response(),
    }
}

/// POST /api/points - Create a point
async fn create_point(
    State(state): State<AppState>,
    Json(input): Json<NewPoint>,
) -> impl IntoResponse {
    let mut store = state.store();
    match store.create(input) {
        Ok(point) => (StatusCode::CREATED, Json(ApiResponse::ok(point))).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

/// PUT /api/points/:id - Apply a partial update; the response reports the
/// applied field differences alongside the updated point.
async fn update_point(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<PointUpdate>,
) -> impl IntoResponse {
    let mut store = state.store();
    match store.update(&id, patch) {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::ok(outcome))).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

/// DELETE /api/points/:id - Remove a point (its history is retained)
async fn delete_point(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ActorBody>>,
) -> impl IntoResponse {
    let actor = body.and_then(|Json(b)| b.actor);
    let mut store = state.store();
    match store.delete(&id, actor) {
        Ok(point) => (StatusCode::OK, Json(ApiResponse::ok(point))).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

/// GET /api/points/:id/history - A point and its entries, newest first
async fn point_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store();
    let Some(point) = store.get(&id).cloned() else {
        return error_response(StoreError::NotFound { id }).into_response();
    };

    let history: Vec<HistoryEntry> = store
        .history(&HistoryFilter::for_point(&id))
        .into_iter()
        .cloned()
        .collect();
    let total = history.len();
    (
        StatusCode::OK,
        Json(ApiResponse::with_total(PointHistory { point, history }, total)),
    )
        .into_response()
}

/// GET /api/history - Query the full ledger, newest first
async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(message) => return bad_request(message).into_response(),
    };

    let store = state.store();
    let entries: Vec<HistoryEntry> = store.history(&filter).into_iter().cloned().collect();
    let total = entries.len();
    (StatusCode::OK, Json(ApiResponse::with_total(entries, total))).into_response()
}

/// GET /api/taxonomy/categories
async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store();
    Json(ApiResponse::ok(store.taxonomy().categories.clone()))
}

/// GET /api/taxonomy/states
async fn list_states(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store();
    Json(ApiResponse::ok(store.taxonomy().states.clone()))
}

/// GET /api/stats - Aggregate statistics over the live set
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store();
    Json(ApiResponse::ok(store.statistics()))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("Punto Registro - Web Server");

    let data_path = std::env::var("DATA_PATH").unwrap_or_else(|_| "data/db.json".to_string());
    let gateway = JsonFileGateway::new(&data_path);

    if !gateway.exists() {
        eprintln!("Dataset not found at {}", data_path);
        eprintln!("Run: cargo run -- seed {}", data_path);
        eprintln!("to create it first.");
        std::process::exit(1);
    }

    let store = RecordStore::open(Box::new(gateway)).expect("Failed to load dataset");
    println!("Dataset loaded: {}", data_path);

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/points", get(list_points).post(create_point))
        .route(
            "/points/:id",
            get(get_point).put(update_point).delete(delete_point),
        )
        .route("/points/:id/history", get(point_history))
        .route("/history", get(list_history))
        .route("/taxonomy/categories", get(list_categories))
        .route("/taxonomy/states", get(list_states))
        .route("/stats", get(get_stats))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    println!("Server running on http://localhost:{}", port);
    println!("  API: http://localhost:{}/api/points", port);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
