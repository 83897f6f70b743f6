use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::api::rest::list_params;
use crate::engine::assignment::{
    assign_vendors, unassign, update_assignment_status, AssignVendorsRequest,
    UpdateAssignmentStatus,
};
use crate::engine::listing::Page;
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/assign-vendor/", post(create_assignments))
        .route(
            "/api/customer/requestservices/:id/assignments/:assignment_id/",
            patch(update_status).delete(remove_assignment),
        )
        .route("/api/vendor/:id/assignments/", get(vendor_assignments))
}

async fn create_assignments(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AssignVendorsRequest>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    Ok(Json(assign_vendors(&state, payload)?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path((request_id, assignment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateAssignmentStatus>,
) -> Result<Json<Assignment>, AppError> {
    Ok(Json(update_assignment_status(
        &state,
        request_id,
        assignment_id,
        payload,
    )?))
}

async fn remove_assignment(
    State(state): State<Arc<AppState>>,
    Path((request_id, assignment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    unassign(&state, request_id, assignment_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The vendor dashboard: every assignment held by one vendor.
async fn vendor_assignments(
    State(state): State<Arc<AppState>>,
    Path(vendor_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Assignment>>, AppError> {
    if !state.vendors.contains_key(&vendor_id) {
        return Err(AppError::NotFound(format!("vendor {} not found", vendor_id)));
    }

    let params = list_params(&state, &params, &["status", "request_id"], &["service"])?;

    let mut assignments: Vec<Assignment> = state
        .requests
        .iter()
        .flat_map(|entry| {
            entry
                .value()
                .assignments
                .iter()
                .filter(|assignment| assignment.vendor_id == vendor_id)
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect();
    assignments.sort_by_key(|assignment| (assignment.assigned_at, assignment.id));

    Ok(Json(params.apply(assignments)))
}
