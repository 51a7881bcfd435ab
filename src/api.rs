// 🌐 Local-Data API - serves the local ledger slice over HTTP
// GET /api/health
// GET /api/local-data?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::db::get_local_data;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn error_response(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDataQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

impl LocalDataQuery {
    fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let parse = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|text| NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok())
        };
        Some((parse(&self.start_date)?, parse(&self.end_date)?))
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/local-data - Local rows for an inclusive date span
async fn local_data(State(state): State<AppState>, Query(query): Query<LocalDataQuery>) -> Response {
    let Some((start, end)) = query.range() else {
        warn!(?query, "rejected local data request");
        return error_response(StatusCode::BAD_REQUEST, "Invalid date parameters");
    };

    // a poisoned lock still guards a usable connection
    let conn = state.db.lock().unwrap_or_else(PoisonError::into_inner);

    match get_local_data(&conn, start, end) {
        Ok(file) => (StatusCode::OK, Json(file)).into_response(),
        Err(e) => {
            error!("Error getting local data: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Build the application router, everything under `/api`
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/local-data", get(local_data))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
