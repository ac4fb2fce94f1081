//! Prometheus metrics for Presence-Chain.
//!
//! All metrics follow the naming convention: `pc_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SCAN METRICS
    // =========================================================================

    /// Scans processed, by outcome
    pub static ref SCANS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("pc_scan_processed_total", "Total scans processed"),
        &["result"]  // TRANSFERRED, MARKED_DIRECT, REJECTED_STALE, ...
    ).expect("metric creation failed");

    /// Scan handling duration
    pub static ref SCAN_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pc_scan_duration_seconds",
            "Time spent processing one scan"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // CHAIN METRICS
    // =========================================================================

    /// Chains seeded, by kind
    pub static ref CHAINS_SEEDED: CounterVec = CounterVec::new(
        Opts::new("pc_chain_seeded_total", "Total chains seeded"),
        &["kind"]
    ).expect("metric creation failed");

    /// Chains closed, by reason
    pub static ref CHAINS_CLOSED: CounterVec = CounterVec::new(
        Opts::new("pc_chain_closed_total", "Total chains closed"),
        &["reason"]
    ).expect("metric creation failed");

    /// Successful holder transfers
    pub static ref TRANSFERS: Counter = Counter::new(
        "pc_chain_transfers_total",
        "Total accepted holder-to-holder transfers"
    ).expect("metric creation failed");

    /// Tokens reissued because the live one expired
    pub static ref TOKENS_REFRESHED: Counter = Counter::new(
        "pc_token_refreshed_total",
        "Total expired tokens replaced on demand"
    ).expect("metric creation failed");

    /// Broadcast codes issued, by kind
    pub static ref BROADCAST_CODES_ISSUED: CounterVec = CounterVec::new(
        Opts::new("pc_broadcast_codes_issued_total", "Total broadcast codes issued"),
        &["kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // SNAPSHOT METRICS
    // =========================================================================

    /// Snapshots taken
    pub static ref SNAPSHOTS_TAKEN: Counter = Counter::new(
        "pc_snapshot_taken_total",
        "Total spot-check snapshots captured"
    ).expect("metric creation failed");

    // =========================================================================
    // NOTIFICATION METRICS
    // =========================================================================

    /// Events the notification sink failed to deliver
    pub static ref NOTIFY_FAILURES: Counter = Counter::new(
        "pc_notify_failures_total",
        "Total events the notification sink rejected"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Scans
        Box::new(SCANS_TOTAL.clone()),
        Box::new(SCAN_DURATION.clone()),
        // Chains
        Box::new(CHAINS_SEEDED.clone()),
        Box::new(CHAINS_CLOSED.clone()),
        Box::new(TRANSFERS.clone()),
        Box::new(TOKENS_REFRESHED.clone()),
        Box::new(BROADCAST_CODES_ISSUED.clone()),
        // Snapshots
        Box::new(SNAPSHOTS_TAKEN.clone()),
        // Notifications
        Box::new(NOTIFY_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
