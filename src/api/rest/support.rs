use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::{list_params, non_empty};
use crate::engine::listing::Page;
use crate::error::AppError;
use crate::models::support::{QueryOrigin, QueryStatus, SupportQuery};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/support/queries/", post(create_query).get(list_queries))
        .route("/api/support/queries/:id/resolve/", post(resolve_query))
}

#[derive(Deserialize)]
pub struct CreateQueryRequest {
    pub raised_by: QueryOrigin,
    pub raiser_name: String,
    pub subject: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ResolveQueryRequest {
    pub response: String,
}

async fn create_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateQueryRequest>,
) -> Result<Json<SupportQuery>, AppError> {
    let query = SupportQuery {
        id: Uuid::new_v4(),
        raised_by: payload.raised_by,
        raiser_name: non_empty(&payload.raiser_name, "raiser_name")?,
        subject: non_empty(&payload.subject, "subject")?,
        message: non_empty(&payload.message, "message")?,
        status: QueryStatus::Open,
        response: None,
        created_at: Utc::now(),
        resolved_at: None,
    };

    state.support_queries.insert(query.id, query.clone());
    info!(query_id = %query.id, raised_by = ?query.raised_by, "support query opened");
    Ok(Json(query))
}

async fn list_queries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<SupportQuery>>, AppError> {
    let params = list_params(
        &state,
        &params,
        &["raised_by", "status"],
        &["raiser_name", "subject"],
    )?;

    let mut queries: Vec<SupportQuery> = state
        .support_queries
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    queries.sort_by_key(|query| (query.created_at, query.id));

    Ok(Json(params.apply(queries)))
}

async fn resolve_query(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveQueryRequest>,
) -> Result<Json<SupportQuery>, AppError> {
    let response = non_empty(&payload.response, "response")?;

    let mut query = state
        .support_queries
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("support query {} not found", id)))?;

    if query.status == QueryStatus::Resolved {
        return Err(AppError::Conflict(format!("support query {id} is already resolved")));
    }

    query.status = QueryStatus::Resolved;
    query.response = Some(response);
    query.resolved_at = Some(Utc::now());

    info!(query_id = %id, "support query resolved");
    Ok(Json(query.clone()))
}
