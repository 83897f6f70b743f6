use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::listing::Filterable;
use crate::models::vendor::Location;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub address: String,
    pub location: Location,
    pub registered_at: DateTime<Utc>,
}

impl Filterable for Customer {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "name" => Some(Cow::Borrowed(&self.name)),
            "mobile" => Some(Cow::Borrowed(&self.mobile)),
            "state" => Some(Cow::Borrowed(&self.location.state)),
            "district" => Some(Cow::Borrowed(&self.location.district)),
            "block" => Some(Cow::Borrowed(&self.location.block)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StaffRole {
    Admin,
    Staff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: StaffRole,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

impl Filterable for StaffMember {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "name" => Some(Cow::Borrowed(&self.name)),
            "email" => Some(Cow::Borrowed(&self.email)),
            "role" => Some(Cow::Borrowed(match self.role {
                StaffRole::Admin => "Admin",
                StaffRole::Staff => "Staff",
            })),
            "active" => Some(Cow::Borrowed(if self.active { "true" } else { "false" })),
            _ => None,
        }
    }
}
