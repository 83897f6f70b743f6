pub mod assignments;
pub mod bills;
pub mod lookups;
pub mod profiles;
pub mod requests;
pub mod support;
pub mod ws;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::listing::ListParams;
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(requests::router())
        .merge(assignments::router())
        .merge(bills::router())
        .merge(profiles::router())
        .merge(lookups::router())
        .merge(support::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub(crate) fn list_params(
    state: &AppState,
    params: &HashMap<String, String>,
    equality_fields: &[&str],
    substring_fields: &[&str],
) -> Result<ListParams, AppError> {
    ListParams::from_query(
        params,
        equality_fields,
        substring_fields,
        state.default_page_size,
        state.max_page_size,
    )
}

pub(crate) fn non_empty(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    requests: usize,
    vendors: usize,
    bills: usize,
    open_support_queries: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let open_support_queries = state
        .support_queries
        .iter()
        .filter(|entry| entry.value().resolved_at.is_none())
        .count();

    Json(HealthResponse {
        status: "ok",
        requests: state.requests.len(),
        vendors: state.vendors.len(),
        bills: state.bills.len(),
        open_support_queries,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
