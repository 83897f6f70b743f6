use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::list_params;
use crate::engine::billing::{
    generate_bill, import_legacy_bill, update_bill_status, CreateBillRequest, ImportBillRequest,
};
use crate::engine::listing::Page;
use crate::error::AppError;
use crate::models::bill::{Bill, BillStatus};
use crate::state::AppState;

const EQUALITY_FIELDS: &[&str] = &["status", "payment_type", "vendor_id", "request_id"];
const SUBSTRING_FIELDS: &[&str] = &["customer_name", "category"];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/billing/", post(create_bill).get(list_bills))
        .route("/api/billing/import/", post(import_bill))
        .route("/api/billing/:id/", get(get_bill).put(update_status))
}

#[derive(Deserialize)]
pub struct UpdateBillStatusRequest {
    pub status: BillStatus,
}

async fn create_bill(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBillRequest>,
) -> Result<Json<Bill>, AppError> {
    Ok(Json(generate_bill(&state, payload)?))
}

async fn import_bill(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ImportBillRequest>,
) -> Result<Json<Bill>, AppError> {
    Ok(Json(import_legacy_bill(&state, payload)?))
}

async fn list_bills(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Bill>>, AppError> {
    let params = list_params(&state, &params, EQUALITY_FIELDS, SUBSTRING_FIELDS)?;

    let mut bills: Vec<Bill> = state
        .bills
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    bills.sort_by_key(|bill| (bill.created_at, bill.id));

    Ok(Json(params.apply(bills)))
}

async fn get_bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bill>, AppError> {
    let bill = state
        .bills
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("bill {} not found", id)))?;

    Ok(Json(bill.value().clone()))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBillStatusRequest>,
) -> Result<Json<Bill>, AppError> {
    Ok(Json(update_bill_status(&state, id, payload.status)?))
}
