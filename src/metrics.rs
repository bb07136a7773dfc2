use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, IntCounterVec, TextEncoder, register_counter, register_gauge,
    register_int_counter_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("key_rotator_requests_total", "Total number of HTTP requests").unwrap();
    pub static ref KEYS_DISPENSED: IntCounterVec = register_int_counter_vec!(
        "key_rotator_keys_dispensed_total",
        "Keys handed out, by key fingerprint",
        &["key"]
    )
    .unwrap();
    pub static ref USAGE_REPORTS: IntCounterVec = register_int_counter_vec!(
        "key_rotator_usage_reports_total",
        "Usage reports accepted, by key fingerprint",
        &["key"]
    )
    .unwrap();
    pub static ref RATE_LIMIT_REJECTIONS: Counter = register_counter!(
        "key_rotator_rate_limit_rejections_total",
        "Key requests refused because every key was at its limit"
    )
    .unwrap();
    pub static ref PRUNED_TIMESTAMPS: Counter = register_counter!(
        "key_rotator_pruned_timestamps_total",
        "Usage timestamps dropped by the prune worker"
    )
    .unwrap();
    pub static ref CONFIGURED_KEYS: Gauge =
        register_gauge!("key_rotator_configured_keys", "Number of configured keys").unwrap();
}

// Prometheus text format of every registered metric
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
