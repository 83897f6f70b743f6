use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::listing::Filterable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Assigned,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Completed => "completed",
        }
    }

    /// Re-applying the current status is allowed and changes nothing.
    pub fn can_transition_to(&self, next: AssignmentStatus) -> bool {
        matches!(
            (self, next),
            (AssignmentStatus::Assigned, AssignmentStatus::Completed)
                | (AssignmentStatus::Assigned, AssignmentStatus::Assigned)
                | (AssignmentStatus::Completed, AssignmentStatus::Completed)
        )
    }
}

/// A subset of a request's services bound to one vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub request_id: Uuid,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub vendor_mobile: String,
    pub services: Vec<String>,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Filterable for Assignment {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "request_id" => Some(Cow::Owned(self.request_id.to_string())),
            "vendor_id" => Some(Cow::Owned(self.vendor_id.to_string())),
            "vendor_name" => Some(Cow::Borrowed(&self.vendor_name)),
            "service" => Some(Cow::Owned(self.services.join(","))),
            _ => None,
        }
    }
}
