use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::listing::Filterable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QueryOrigin {
    Customer,
    Vendor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QueryStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportQuery {
    pub id: Uuid,
    pub raised_by: QueryOrigin,
    pub raiser_name: String,
    pub subject: String,
    pub message: String,
    pub status: QueryStatus,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Filterable for SupportQuery {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "raised_by" => Some(Cow::Borrowed(match self.raised_by {
                QueryOrigin::Customer => "Customer",
                QueryOrigin::Vendor => "Vendor",
            })),
            "status" => Some(Cow::Borrowed(match self.status {
                QueryStatus::Open => "Open",
                QueryStatus::Resolved => "Resolved",
            })),
            "raiser_name" => Some(Cow::Borrowed(&self.raiser_name)),
            "subject" => Some(Cow::Borrowed(&self.subject)),
            _ => None,
        }
    }
}
