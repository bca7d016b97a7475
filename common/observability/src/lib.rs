use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};

/// Outcome labels for `pricing_recalculations_total`.
pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_ERROR: &str = "error";
pub const OUTCOME_SUPERSEDED: &str = "superseded";

#[derive(Clone)]
pub struct PricingMetrics {
    pub registry: Registry,
    pub recalculations_total: IntCounterVec,
    pub debounced_edits: IntCounter,
    pub rejected_edits: IntCounter,
    pub calculation_seconds: Histogram,
}

impl PricingMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let recalculations_total = IntCounterVec::new(
            prometheus::Opts::new(
                "pricing_recalculations_total",
                "Completed pricing recalculations by outcome"
            ),
            &["outcome"]
        ).unwrap();
        let debounced_edits = IntCounter::new(
            "pricing_debounced_edits_total",
            "Scheduled recalculations cancelled because a newer edit arrived first",
        ).unwrap();
        let rejected_edits = IntCounter::new(
            "pricing_rejected_edits_total",
            "Linked-field edits rejected while the other field was committing",
        ).unwrap();
        let calculation_seconds = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "pricing_calculation_seconds",
                "Duration of a pricing backend calculation"
            ).buckets(vec![0.0005,0.001,0.005,0.01,0.05,0.1,0.25,0.5,1.0])
        ).unwrap();
        let _ = registry.register(Box::new(recalculations_total.clone()));
        let _ = registry.register(Box::new(debounced_edits.clone()));
        let _ = registry.register(Box::new(rejected_edits.clone()));
        let _ = registry.register(Box::new(calculation_seconds.clone()));
        PricingMetrics { registry, recalculations_total, debounced_edits, rejected_edits, calculation_seconds }
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.recalculations_total.with_label_values(&[outcome]).inc();
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.recalculations_total.with_label_values(&[outcome]).get()
    }

    /// Prometheus text exposition of every registered family.
    pub fn render(&self) -> String {
        use prometheus::{Encoder, TextEncoder};
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("# metrics encode error: {e}\n");
        }
        String::from_utf8_lossy(&buf).to_string()
    }
}

impl Default for PricingMetrics {
    fn default() -> Self { Self::new() }
}
