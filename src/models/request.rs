use std::borrow::Cow;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::listing::Filterable;
use crate::models::assignment::{Assignment, AssignmentStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    pub state: String,
    pub district: String,
    pub block: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub requester: Requester,
    pub request_for_services: Vec<String>,
    pub schedule_date: NaiveDate,
    pub status: RequestStatus,
    pub assignments: Vec<Assignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn assigned_services(&self) -> HashSet<&str> {
        self.assignments
            .iter()
            .flat_map(|assignment| assignment.services.iter().map(String::as_str))
            .collect()
    }

    /// Requested services not yet held by any assignment, in request order.
    pub fn unassigned_services(&self) -> Vec<String> {
        let taken = self.assigned_services();
        self.request_for_services
            .iter()
            .filter(|service| !taken.contains(service.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_fully_assigned(&self) -> bool {
        let taken = self.assigned_services();
        self.request_for_services
            .iter()
            .all(|service| taken.contains(service.as_str()))
    }

    pub fn assignment_for_vendor(&self, vendor_id: Uuid) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|assignment| assignment.vendor_id == vendor_id)
    }

    /// Derives the status from the assignments. Cancellation sticks.
    pub fn refresh_status(&mut self) {
        if self.status == RequestStatus::Cancelled {
            return;
        }

        self.status = if self.assignments.is_empty() {
            RequestStatus::Pending
        } else if self.is_fully_assigned()
            && self
                .assignments
                .iter()
                .all(|assignment| assignment.status == AssignmentStatus::Completed)
        {
            RequestStatus::Completed
        } else {
            RequestStatus::Assigned
        };
    }
}

impl Filterable for ServiceRequest {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "name" => Some(Cow::Borrowed(&self.requester.name)),
            "mobile" => Some(Cow::Borrowed(&self.requester.mobile)),
            "state" => Some(Cow::Borrowed(&self.requester.state)),
            "district" => Some(Cow::Borrowed(&self.requester.district)),
            "block" => Some(Cow::Borrowed(&self.requester.block)),
            "service" => Some(Cow::Owned(self.request_for_services.join(","))),
            "schedule_date" => Some(Cow::Owned(self.schedule_date.to_string())),
            "vendor_id" => Some(Cow::Owned(
                self.assignments
                    .iter()
                    .map(|assignment| assignment.vendor_id.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            )),
            _ => None,
        }
    }
}
