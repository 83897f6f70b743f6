use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::listing::Filterable;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub state: String,
    pub district: String,
    pub block: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub categories: Vec<String>,
    pub location: Location,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

impl Filterable for Vendor {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "name" => Some(Cow::Borrowed(&self.name)),
            "mobile" => Some(Cow::Borrowed(&self.mobile)),
            "category" => Some(Cow::Owned(self.categories.join(","))),
            "state" => Some(Cow::Borrowed(&self.location.state)),
            "district" => Some(Cow::Borrowed(&self.location.district)),
            "block" => Some(Cow::Borrowed(&self.location.block)),
            "active" => Some(Cow::Borrowed(if self.active { "true" } else { "false" })),
            _ => None,
        }
    }
}
