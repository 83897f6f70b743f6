use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::AssignmentStatus;
use crate::models::bill::{Bill, BillStatus, LineItem, PaymentType};
use crate::models::event::DeskEvent;
use crate::models::legacy::LegacyLineItem;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    pub gst_percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBillRequest {
    pub request_id: Uuid,
    pub vendor_id: Uuid,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub status: Option<BillStatus>,
    pub bill_items: Vec<LineItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBillRequest {
    pub request_id: Uuid,
    pub vendor_id: Uuid,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub payment_type: PaymentType,
    pub status: BillStatus,
    pub bill_items: Vec<LegacyLineItem>,
}

/// Rounds to whole paise, half away from zero, always carrying two places.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

pub fn price_line_item(input: LineItemInput) -> Result<LineItem, AppError> {
    let category = input.category.trim().to_string();
    if category.is_empty() {
        return Err(AppError::BadRequest("line item category cannot be empty".to_string()));
    }
    if input.amount < Decimal::ZERO {
        return Err(AppError::BadRequest(format!(
            "line item {category}: amount cannot be negative"
        )));
    }
    if input.gst_percent < Decimal::ZERO || input.gst_percent > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(format!(
            "line item {category}: gst percent must be between 0 and 100"
        )));
    }

    let amount = round_money(input.amount);
    let gst_amount = round_money(amount * input.gst_percent / Decimal::ONE_HUNDRED);

    Ok(LineItem {
        category,
        description: input.description.trim().to_string(),
        amount,
        gst_percent: input.gst_percent.normalize(),
        gst_amount,
        total: round_money(amount + gst_amount),
    })
}

/// Bill-level totals: (amount, total_payment). GST stays on the items.
pub fn bill_totals(items: &[LineItem]) -> (Decimal, Decimal) {
    let amount = items.iter().map(|item| item.amount).sum();
    let total = items.iter().map(|item| item.total).sum();
    (round_money(amount), round_money(total))
}

pub fn generate_bill(state: &AppState, payload: CreateBillRequest) -> Result<Bill, AppError> {
    let items = payload
        .bill_items
        .into_iter()
        .map(price_line_item)
        .collect::<Result<Vec<_>, _>>();

    let result = items.and_then(|items| {
        store_bill(
            state,
            BillDraft {
                request_id: payload.request_id,
                vendor_id: payload.vendor_id,
                customer_name: payload.customer_name,
                payment_type: payload.payment_type,
                status: payload.status.unwrap_or(BillStatus::Pending),
                items,
            },
        )
    });

    record_outcome(state, &result);
    result
}

/// Migrates a bill written with positional line items.
pub fn import_legacy_bill(state: &AppState, payload: ImportBillRequest) -> Result<Bill, AppError> {
    let mut items = Vec::with_capacity(payload.bill_items.len());
    for legacy in payload.bill_items {
        let recorded = legacy.recorded_total();
        let item = price_line_item(legacy.migrate()?)?;
        if (item.total - recorded).abs() > Decimal::new(1, 2) {
            warn!(
                category = %item.category,
                recorded = %recorded,
                recomputed = %item.total,
                "legacy line item total differs from recomputed total"
            );
        }
        items.push(item);
    }

    let result = store_bill(
        state,
        BillDraft {
            request_id: payload.request_id,
            vendor_id: payload.vendor_id,
            customer_name: payload.customer_name,
            payment_type: payload.payment_type,
            status: payload.status,
            items,
        },
    );

    record_outcome(state, &result);
    result
}

struct BillDraft {
    request_id: Uuid,
    vendor_id: Uuid,
    customer_name: Option<String>,
    payment_type: PaymentType,
    status: BillStatus,
    items: Vec<LineItem>,
}

fn store_bill(state: &AppState, draft: BillDraft) -> Result<Bill, AppError> {
    if draft.items.is_empty() {
        return Err(AppError::BadRequest("bill needs at least one line item".to_string()));
    }

    // Held exclusively so two bills for one request cannot interleave.
    let request = state
        .requests
        .get_mut(&draft.request_id)
        .ok_or_else(|| AppError::NotFound(format!("request {} not found", draft.request_id)))?;

    let assignment = request.assignment_for_vendor(draft.vendor_id).ok_or_else(|| {
        AppError::NotFound(format!(
            "vendor {} has no assignment on request {}",
            draft.vendor_id, draft.request_id
        ))
    })?;

    if assignment.status != AssignmentStatus::Completed {
        return Err(AppError::Conflict(format!(
            "assignment for vendor {} is not completed",
            draft.vendor_id
        )));
    }

    let duplicate = state.bills.iter().any(|entry| {
        entry.request_id == draft.request_id && entry.vendor_id == draft.vendor_id
    });
    if duplicate {
        return Err(AppError::Conflict(format!(
            "request {} already has a bill for vendor {}",
            draft.request_id, draft.vendor_id
        )));
    }

    let customer_name = draft
        .customer_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| request.requester.name.clone());

    let (amount, total_payment) = bill_totals(&draft.items);
    let now = Utc::now();
    let bill = Bill {
        id: Uuid::new_v4(),
        request_id: draft.request_id,
        vendor_id: draft.vendor_id,
        customer_name,
        bill_items: draft.items,
        amount,
        gst: round_money(Decimal::ZERO),
        total_payment,
        payment_type: draft.payment_type,
        status: draft.status,
        created_at: now,
        updated_at: now,
    };

    state.bills.insert(bill.id, bill.clone());
    drop(request);

    info!(
        bill_id = %bill.id,
        request_id = %bill.request_id,
        vendor_id = %bill.vendor_id,
        total_payment = %bill.total_payment,
        "bill generated"
    );
    state.publish(DeskEvent::BillCreated(bill.clone()));

    Ok(bill)
}

fn record_outcome(state: &AppState, result: &Result<Bill, AppError>) {
    match result {
        Ok(bill) => {
            state
                .metrics
                .bills_generated_total
                .with_label_values(&["success"])
                .inc();
            state
                .metrics
                .billed_total_payment
                .inc_by(bill.total_payment.to_f64().unwrap_or(0.0));
        }
        Err(err) => {
            state
                .metrics
                .bills_generated_total
                .with_label_values(&[err.outcome_label()])
                .inc();
            warn!(error = %err, "bill generation rejected");
        }
    }
}

pub fn update_bill_status(
    state: &AppState,
    bill_id: Uuid,
    status: BillStatus,
) -> Result<Bill, AppError> {
    let bill = {
        let mut bill = state
            .bills
            .get_mut(&bill_id)
            .ok_or_else(|| AppError::NotFound(format!("bill {bill_id} not found")))?;

        if !bill.status.can_transition_to(status) {
            return Err(AppError::Conflict(format!(
                "bill cannot move from {} to {}",
                bill.status.as_str(),
                status.as_str()
            )));
        }
        if bill.status == status {
            return Ok(bill.clone());
        }

        bill.status = status;
        bill.updated_at = Utc::now();
        bill.clone()
    };

    info!(bill_id = %bill_id, status = status.as_str(), "bill status updated");
    state.publish(DeskEvent::BillUpdated(bill.clone()));

    Ok(bill)
}
