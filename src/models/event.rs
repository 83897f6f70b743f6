use serde::Serialize;
use uuid::Uuid;

use crate::models::assignment::Assignment;
use crate::models::bill::Bill;
use crate::models::request::RequestStatus;

/// Change notifications pushed to websocket subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DeskEvent {
    AssignmentCreated(Assignment),
    AssignmentUpdated(Assignment),
    AssignmentRemoved { request_id: Uuid, assignment_id: Uuid },
    RequestStatusChanged { request_id: Uuid, status: RequestStatus },
    BillCreated(Bill),
    BillUpdated(Bill),
}
