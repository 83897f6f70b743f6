use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::{list_params, non_empty};
use crate::engine::assignment::{
    attach_assignments, cancel_request, normalize_services, PlannedAssignment,
};
use crate::engine::listing::Page;
use crate::error::AppError;
use crate::models::event::DeskEvent;
use crate::models::legacy::LegacyAssignment;
use crate::models::request::{RequestStatus, Requester, ServiceRequest};
use crate::state::AppState;

const EQUALITY_FIELDS: &[&str] = &["status", "state", "district", "block", "schedule_date"];
const SUBSTRING_FIELDS: &[&str] = &["name", "mobile", "service", "vendor_id"];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/customer/requestservices/",
            post(create_request).get(list_requests),
        )
        .route("/api/customer/requestservices/import/", post(import_request))
        .route(
            "/api/customer/requestservices/:id/",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/api/customer/requestservices/:id/cancel/", post(cancel))
        .route(
            "/api/customer/requestservices/:id/available-services/",
            get(available_services),
        )
}

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub requester: Requester,
    pub request_for_services: Vec<String>,
    pub schedule_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct UpdateServiceRequest {
    #[serde(default)]
    pub requester: Option<Requester>,
    #[serde(default)]
    pub request_for_services: Option<Vec<String>>,
    #[serde(default)]
    pub schedule_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ImportServiceRequest {
    pub requester: Requester,
    pub request_for_services: Vec<String>,
    pub schedule_date: NaiveDate,
    #[serde(default)]
    pub assignments: Vec<LegacyAssignment>,
}

fn validate_requester(requester: Requester) -> Result<Requester, AppError> {
    Ok(Requester {
        name: non_empty(&requester.name, "name")?,
        mobile: non_empty(&requester.mobile, "mobile")?,
        email: requester
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty()),
        address: requester.address.trim().to_string(),
        state: requester.state.trim().to_string(),
        district: requester.district.trim().to_string(),
        block: requester.block.trim().to_string(),
    })
}

fn requested_services(services: Vec<String>) -> Result<Vec<String>, AppError> {
    if services.is_empty() {
        return Err(AppError::BadRequest("no services requested".to_string()));
    }
    normalize_services(services)
}

fn new_request(
    requester: Requester,
    services: Vec<String>,
    schedule_date: NaiveDate,
) -> Result<ServiceRequest, AppError> {
    let now = Utc::now();
    Ok(ServiceRequest {
        id: Uuid::new_v4(),
        requester: validate_requester(requester)?,
        request_for_services: requested_services(services)?,
        schedule_date,
        status: RequestStatus::Pending,
        assignments: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateServiceRequest>,
) -> Result<Json<ServiceRequest>, AppError> {
    let request = new_request(
        payload.requester,
        payload.request_for_services,
        payload.schedule_date,
    )?;

    state.requests.insert(request.id, request.clone());
    state.refresh_open_requests_gauge();
    info!(request_id = %request.id, services = ?request.request_for_services, "service request created");

    Ok(Json(request))
}

async fn import_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ImportServiceRequest>,
) -> Result<Json<ServiceRequest>, AppError> {
    let mut request = new_request(
        payload.requester,
        payload.request_for_services,
        payload.schedule_date,
    )?;

    let planned = payload
        .assignments
        .into_iter()
        .map(|legacy| -> Result<PlannedAssignment, AppError> {
            let migrated = legacy.migrate()?;
            Ok(PlannedAssignment {
                vendor_id: migrated.vendor_id,
                vendor_name: migrated.vendor_name,
                vendor_mobile: migrated.vendor_mobile,
                services: normalize_services(migrated.services)?,
                status: migrated.status,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !planned.is_empty() {
        attach_assignments(&mut request, planned)?;
    }

    state.requests.insert(request.id, request.clone());
    state.refresh_open_requests_gauge();
    info!(
        request_id = %request.id,
        assignments = request.assignments.len(),
        status = request.status.as_str(),
        "legacy service request imported"
    );

    Ok(Json(request))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<ServiceRequest>>, AppError> {
    let params = list_params(&state, &params, EQUALITY_FIELDS, SUBSTRING_FIELDS)?;

    let mut requests: Vec<ServiceRequest> = state
        .requests
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    requests.sort_by_key(|request| (request.created_at, request.id));

    Ok(Json(params.apply(requests)))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceRequest>, AppError> {
    let request = state
        .requests
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {} not found", id)))?;

    Ok(Json(request.value().clone()))
}

async fn update_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceRequest>, AppError> {
    let requester = payload.requester.map(validate_requester).transpose()?;
    let services = payload
        .request_for_services
        .map(requested_services)
        .transpose()?;

    let (updated, previous) = {
        let mut request = state
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("request {} not found", id)))?;

        if request.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "request {id} is {}",
                request.status.as_str()
            )));
        }
        let previous = request.status;

        if let Some(services) = services {
            let kept: HashSet<&str> = services.iter().map(String::as_str).collect();
            if let Some(missing) = request
                .assigned_services()
                .into_iter()
                .find(|service| !kept.contains(service))
            {
                return Err(AppError::Conflict(format!(
                    "service {missing} is assigned and cannot be removed"
                )));
            }
            request.request_for_services = services;
        }
        if let Some(requester) = requester {
            request.requester = requester;
        }
        if let Some(schedule_date) = payload.schedule_date {
            request.schedule_date = schedule_date;
        }

        request.refresh_status();
        request.updated_at = Utc::now();
        (request.clone(), previous)
    };

    info!(request_id = %id, status = updated.status.as_str(), "service request updated");
    if updated.status != previous {
        state.publish(DeskEvent::RequestStatusChanged {
            request_id: id,
            status: updated.status,
        });
        state.refresh_open_requests_gauge();
    }

    Ok(Json(updated))
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .requests
        .remove_if(&id, |_, request| request.status == RequestStatus::Pending)
        .ok_or_else(|| {
            if state.requests.contains_key(&id) {
                AppError::Conflict(format!("request {id} is no longer pending"))
            } else {
                AppError::NotFound(format!("request {} not found", id))
            }
        })?;

    state.refresh_open_requests_gauge();
    info!(request_id = %id, "service request deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceRequest>, AppError> {
    Ok(Json(cancel_request(&state, id)?))
}

async fn available_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<String>>, AppError> {
    let request = state
        .requests
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {} not found", id)))?;

    if request.status.is_terminal() {
        return Ok(Json(Vec::new()));
    }

    Ok(Json(request.unassigned_services()))
}
