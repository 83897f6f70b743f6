//! Positional records written by the old dashboards.
//!
//! Assignments were stored as `[services, vendor_id, vendor_name, status, vendor_mobile]`
//! and bill lines as `[category, description, amount, gst_value, total]`, where
//! `gst_value` was a percentage when `<= 100` and an absolute amount otherwise.
//! Import converts both into named records once; nothing downstream sees the
//! heuristic.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::billing::LineItemInput;
use crate::error::AppError;
use crate::models::assignment::AssignmentStatus;

const PERCENT_CEILING: Decimal = Decimal::ONE_HUNDRED;
const PERCENT_SCALE: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyAssignment(
    pub Vec<String>,
    pub String,
    pub String,
    pub String,
    pub String,
);

#[derive(Debug, Clone, PartialEq)]
pub struct MigratedAssignment {
    pub services: Vec<String>,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub status: AssignmentStatus,
    pub vendor_mobile: String,
}

impl LegacyAssignment {
    pub fn migrate(self) -> Result<MigratedAssignment, AppError> {
        let LegacyAssignment(services, vendor_id, vendor_name, status, vendor_mobile) = self;

        let vendor_id = Uuid::parse_str(vendor_id.trim())
            .map_err(|err| AppError::BadRequest(format!("invalid legacy vendor id {vendor_id}: {err}")))?;

        let status = match status.trim().to_ascii_lowercase().as_str() {
            "assigned" | "pending" => AssignmentStatus::Assigned,
            "completed" => AssignmentStatus::Completed,
            other => {
                return Err(AppError::BadRequest(format!(
                    "unknown legacy assignment status: {other}"
                )));
            }
        };

        Ok(MigratedAssignment {
            services: services.into_iter().map(|s| s.trim().to_string()).collect(),
            vendor_id,
            vendor_name,
            status,
            vendor_mobile,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyLineItem(
    pub String,
    pub String,
    pub Decimal,
    pub Decimal,
    pub Decimal,
);

impl LegacyLineItem {
    pub fn recorded_total(&self) -> Decimal {
        self.4
    }

    pub fn migrate(self) -> Result<LineItemInput, AppError> {
        let LegacyLineItem(category, description, amount, gst_value, _total) = self;

        let gst_percent = if gst_value > PERCENT_CEILING {
            if amount.is_zero() {
                return Err(AppError::BadRequest(format!(
                    "legacy line item {category}: absolute gst {gst_value} on a zero amount"
                )));
            }
            (gst_value * Decimal::ONE_HUNDRED / amount)
                .round_dp_with_strategy(PERCENT_SCALE, RoundingStrategy::MidpointAwayFromZero)
                .normalize()
        } else {
            gst_value
        };

        Ok(LineItemInput {
            category,
            description,
            amount,
            gst_percent,
        })
    }
}
