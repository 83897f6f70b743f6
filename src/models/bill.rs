use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::listing::Filterable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillStatus {
    Pending,
    Unpaid,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "Pending",
            BillStatus::Unpaid => "Unpaid",
            BillStatus::Paid => "Paid",
        }
    }

    pub fn can_transition_to(&self, next: BillStatus) -> bool {
        *self == next
            || matches!(
                (self, next),
                (BillStatus::Pending, BillStatus::Unpaid)
                    | (BillStatus::Pending, BillStatus::Paid)
                    | (BillStatus::Unpaid, BillStatus::Paid)
            )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentType {
    Cash,
    Online,
    Upi,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "Cash",
            PaymentType::Online => "Online",
            PaymentType::Upi => "Upi",
        }
    }
}

/// `gst_percent` is always a percentage; `gst_amount` is derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub category: String,
    pub description: String,
    pub amount: Decimal,
    pub gst_percent: Decimal,
    pub gst_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub request_id: Uuid,
    pub vendor_id: Uuid,
    pub customer_name: String,
    pub bill_items: Vec<LineItem>,
    pub amount: Decimal,
    /// GST lives on the line items; the bill-level field stays zero.
    pub gst: Decimal,
    pub total_payment: Decimal,
    pub payment_type: PaymentType,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Filterable for Bill {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "payment_type" => Some(Cow::Borrowed(self.payment_type.as_str())),
            "customer_name" => Some(Cow::Borrowed(&self.customer_name)),
            "vendor_id" => Some(Cow::Owned(self.vendor_id.to_string())),
            "request_id" => Some(Cow::Owned(self.request_id.to_string())),
            "category" => Some(Cow::Owned(
                self.bill_items
                    .iter()
                    .map(|item| item.category.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BillStatus;

    #[test]
    fn paid_bill_is_terminal() {
        assert!(BillStatus::Pending.can_transition_to(BillStatus::Unpaid));
        assert!(BillStatus::Unpaid.can_transition_to(BillStatus::Paid));
        assert!(BillStatus::Paid.can_transition_to(BillStatus::Paid));
        assert!(!BillStatus::Paid.can_transition_to(BillStatus::Unpaid));
        assert!(!BillStatus::Unpaid.can_transition_to(BillStatus::Pending));
    }
}
