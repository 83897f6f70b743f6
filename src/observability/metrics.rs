use prometheus::{
    Counter, Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub bills_generated_total: IntCounterVec,
    pub billed_total_payment: Counter,
    pub open_requests: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Vendor assignment submissions by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of assignment validation and apply in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let bills_generated_total = IntCounterVec::new(
            Opts::new("bills_generated_total", "Bill generation attempts by outcome"),
            &["outcome"],
        )
        .expect("valid bills_generated_total metric");

        let billed_total_payment = Counter::new(
            "billed_total_payment",
            "Sum of total_payment over generated bills",
        )
        .expect("valid billed_total_payment metric");

        let open_requests = IntGauge::new(
            "open_requests",
            "Service requests that are neither completed nor cancelled",
        )
        .expect("valid open_requests metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(bills_generated_total.clone()))
            .expect("register bills_generated_total");
        registry
            .register(Box::new(billed_total_payment.clone()))
            .expect("register billed_total_payment");
        registry
            .register(Box::new(open_requests.clone()))
            .expect("register open_requests");

        Self {
            registry,
            assignments_total,
            assignment_latency_seconds,
            bills_generated_total,
            billed_total_payment,
            open_requests,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
