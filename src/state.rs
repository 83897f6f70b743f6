use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::models::bill::Bill;
use crate::models::event::DeskEvent;
use crate::models::profile::{Customer, StaffMember};
use crate::models::request::ServiceRequest;
use crate::models::support::SupportQuery;
use crate::models::vendor::Vendor;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub requests: DashMap<Uuid, ServiceRequest>,
    pub vendors: DashMap<Uuid, Vendor>,
    pub customers: DashMap<Uuid, Customer>,
    pub staff: DashMap<Uuid, StaffMember>,
    /// Lowercased staff email to member id.
    pub staff_emails: DashMap<String, Uuid>,
    pub bills: DashMap<Uuid, Bill>,
    pub support_queries: DashMap<Uuid, SupportQuery>,
    pub events_tx: broadcast::Sender<DeskEvent>,
    pub metrics: Metrics,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            requests: DashMap::new(),
            vendors: DashMap::new(),
            customers: DashMap::new(),
            staff: DashMap::new(),
            staff_emails: DashMap::new(),
            bills: DashMap::new(),
            support_queries: DashMap::new(),
            events_tx,
            metrics: Metrics::new(),
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    pub fn publish(&self, event: DeskEvent) {
        // No subscribers is the common case.
        let _ = self.events_tx.send(event);
    }

    pub fn refresh_open_requests_gauge(&self) {
        let open = self
            .requests
            .iter()
            .filter(|entry| !entry.value().status.is_terminal())
            .count();
        self.metrics.open_requests.set(open as i64);
    }
}
