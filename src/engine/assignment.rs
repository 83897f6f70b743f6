use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::event::DeskEvent;
use crate::models::request::{RequestStatus, ServiceRequest};
use crate::state::AppState;

/// One vendor and the sub-services handed to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorServices {
    pub vendor_unique_id: Uuid,
    pub request_for_services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignVendorsRequest {
    pub request_id: Uuid,
    pub assignments: Vec<VendorServices>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAssignmentStatus {
    pub vendor_id: Uuid,
    pub status: AssignmentStatus,
}

/// An assignment that passed vendor lookup and waits for the request checks.
#[derive(Debug, Clone)]
pub struct PlannedAssignment {
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub vendor_mobile: String,
    pub services: Vec<String>,
    pub status: AssignmentStatus,
}

/// Trims service names and rejects blanks and duplicates.
pub fn normalize_services(services: Vec<String>) -> Result<Vec<String>, AppError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(services.len());

    for service in services {
        let service = service.trim().to_string();
        if service.is_empty() {
            return Err(AppError::BadRequest("service name cannot be empty".to_string()));
        }
        if !seen.insert(service.clone()) {
            return Err(AppError::BadRequest(format!("service {service} listed twice")));
        }
        normalized.push(service);
    }

    Ok(normalized)
}

pub fn assign_vendors(
    state: &AppState,
    submission: AssignVendorsRequest,
) -> Result<Vec<Assignment>, AppError> {
    let start = Instant::now();
    let request_id = submission.request_id;
    let result = apply_submission(state, submission);

    let outcome = match &result {
        Ok(_) => "success",
        Err(err) => err.outcome_label(),
    };
    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();

    if let Err(err) = &result {
        warn!(request_id = %request_id, error = %err, "vendor assignment rejected");
    }

    result
}

fn apply_submission(
    state: &AppState,
    submission: AssignVendorsRequest,
) -> Result<Vec<Assignment>, AppError> {
    if submission.assignments.is_empty() {
        return Err(AppError::BadRequest("vendor not selected".to_string()));
    }

    let mut vendors_seen = HashSet::new();
    let mut planned = Vec::with_capacity(submission.assignments.len());

    for pair in submission.assignments {
        if !vendors_seen.insert(pair.vendor_unique_id) {
            return Err(AppError::BadRequest(format!(
                "vendor {} selected more than once",
                pair.vendor_unique_id
            )));
        }

        if pair.request_for_services.is_empty() {
            return Err(AppError::BadRequest(format!(
                "no services selected for vendor {}",
                pair.vendor_unique_id
            )));
        }

        let services = normalize_services(pair.request_for_services)?;

        let vendor = state
            .vendors
            .get(&pair.vendor_unique_id)
            .ok_or_else(|| AppError::NotFound(format!("vendor {} not found", pair.vendor_unique_id)))?;

        if !vendor.active {
            return Err(AppError::Conflict(format!("vendor {} is inactive", vendor.id)));
        }

        planned.push(PlannedAssignment {
            vendor_id: vendor.id,
            vendor_name: vendor.name.clone(),
            vendor_mobile: vendor.mobile.clone(),
            services,
            status: AssignmentStatus::Assigned,
        });
    }

    let (created, status) = {
        let mut request = state
            .requests
            .get_mut(&submission.request_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("request {} not found", submission.request_id))
            })?;

        let created = attach_assignments(&mut request, planned)?;
        (created, request.status)
    };

    for assignment in &created {
        info!(
            request_id = %assignment.request_id,
            vendor_id = %assignment.vendor_id,
            services = ?assignment.services,
            "vendor assigned"
        );
        state.publish(DeskEvent::AssignmentCreated(assignment.clone()));
    }
    state.publish(DeskEvent::RequestStatusChanged {
        request_id: submission.request_id,
        status,
    });
    state.refresh_open_requests_gauge();

    Ok(created)
}

/// Validates every planned assignment against the request and appends them
/// all, or none. Callers hold the request's map guard for the duration.
pub fn attach_assignments(
    request: &mut ServiceRequest,
    planned: Vec<PlannedAssignment>,
) -> Result<Vec<Assignment>, AppError> {
    if request.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "request {} is {}",
            request.id,
            request.status.as_str()
        )));
    }

    let requested: HashSet<&str> = request
        .request_for_services
        .iter()
        .map(String::as_str)
        .collect();
    let already_assigned = request.assigned_services();
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut vendors_seen = HashSet::new();

    for plan in &planned {
        if !vendors_seen.insert(plan.vendor_id) {
            return Err(AppError::BadRequest(format!(
                "vendor {} selected more than once",
                plan.vendor_id
            )));
        }

        if plan.services.is_empty() {
            return Err(AppError::BadRequest(format!(
                "no services selected for vendor {}",
                plan.vendor_id
            )));
        }

        if request.assignment_for_vendor(plan.vendor_id).is_some() {
            return Err(AppError::Conflict(format!(
                "vendor {} is already assigned to request {}",
                plan.vendor_id, request.id
            )));
        }

        for service in &plan.services {
            if !requested.contains(service.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "service {service} was not requested"
                )));
            }
            if already_assigned.contains(service.as_str()) {
                return Err(AppError::Conflict(format!(
                    "service {service} is already assigned"
                )));
            }
            if !claimed.insert(service.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "service {service} selected for more than one vendor"
                )));
            }
        }
    }

    let now = Utc::now();
    let created: Vec<Assignment> = planned
        .into_iter()
        .map(|plan| Assignment {
            id: Uuid::new_v4(),
            request_id: request.id,
            vendor_id: plan.vendor_id,
            vendor_name: plan.vendor_name,
            vendor_mobile: plan.vendor_mobile,
            services: plan.services,
            status: plan.status,
            assigned_at: now,
            updated_at: now,
        })
        .collect();

    request.assignments.extend(created.iter().cloned());
    request.refresh_status();
    request.updated_at = now;

    Ok(created)
}

pub fn update_assignment_status(
    state: &AppState,
    request_id: Uuid,
    assignment_id: Uuid,
    update: UpdateAssignmentStatus,
) -> Result<Assignment, AppError> {
    let (assignment, previous, status) = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        if request.status == RequestStatus::Cancelled {
            return Err(AppError::Conflict(format!("request {request_id} is cancelled")));
        }

        let now = Utc::now();
        let assignment = request
            .assignments
            .iter_mut()
            .find(|assignment| assignment.id == assignment_id)
            .ok_or_else(|| AppError::NotFound(format!("assignment {assignment_id} not found")))?;

        if assignment.vendor_id != update.vendor_id {
            return Err(AppError::Forbidden(format!(
                "assignment {assignment_id} belongs to another vendor"
            )));
        }

        if !assignment.status.can_transition_to(update.status) {
            return Err(AppError::Conflict(format!(
                "assignment cannot move from {} to {}",
                assignment.status.as_str(),
                update.status.as_str()
            )));
        }

        if assignment.status == update.status {
            return Ok(assignment.clone());
        }

        assignment.status = update.status;
        assignment.updated_at = now;
        let assignment = assignment.clone();

        let previous = request.status;
        request.refresh_status();
        request.updated_at = now;
        (assignment, previous, request.status)
    };

    info!(
        request_id = %request_id,
        assignment_id = %assignment_id,
        status = assignment.status.as_str(),
        "assignment status updated"
    );
    state.publish(DeskEvent::AssignmentUpdated(assignment.clone()));
    if previous != status {
        state.publish(DeskEvent::RequestStatusChanged { request_id, status });
        state.refresh_open_requests_gauge();
    }

    Ok(assignment)
}

/// Removes an open assignment; its services return to the pool.
pub fn unassign(state: &AppState, request_id: Uuid, assignment_id: Uuid) -> Result<(), AppError> {
    let status = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        if request.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "request {request_id} is {}",
                request.status.as_str()
            )));
        }

        let position = request
            .assignments
            .iter()
            .position(|assignment| assignment.id == assignment_id)
            .ok_or_else(|| AppError::NotFound(format!("assignment {assignment_id} not found")))?;

        if request.assignments[position].status == AssignmentStatus::Completed {
            return Err(AppError::Conflict(format!(
                "assignment {assignment_id} is already completed"
            )));
        }

        request.assignments.remove(position);
        request.refresh_status();
        request.updated_at = Utc::now();
        request.status
    };

    info!(request_id = %request_id, assignment_id = %assignment_id, "vendor unassigned");
    state.publish(DeskEvent::AssignmentRemoved {
        request_id,
        assignment_id,
    });
    state.publish(DeskEvent::RequestStatusChanged { request_id, status });
    state.refresh_open_requests_gauge();

    Ok(())
}

pub fn cancel_request(state: &AppState, request_id: Uuid) -> Result<ServiceRequest, AppError> {
    let request = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        match request.status {
            RequestStatus::Cancelled => return Ok(request.clone()),
            RequestStatus::Completed => {
                return Err(AppError::Conflict(format!(
                    "request {request_id} is already completed"
                )));
            }
            RequestStatus::Pending | RequestStatus::Assigned => {}
        }

        request.status = RequestStatus::Cancelled;
        request.updated_at = Utc::now();
        request.clone()
    };

    info!(request_id = %request_id, "request cancelled");
    state.publish(DeskEvent::RequestStatusChanged {
        request_id,
        status: RequestStatus::Cancelled,
    });
    state.refresh_open_requests_gauge();

    Ok(request)
}
