//! Prometheus metrics recording.

use crate::service::Warning;
use metrics::counter;
use metrics::histogram;
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records an identification and the warnings it carried.
pub fn record_identification(warnings: &[Warning], latency_ms: u64) {
    counter!("charid_identifications_total").increment(1);
    for warning in warnings {
        counter!("charid_identification_warnings_total", "warning" => warning.as_str())
            .increment(1);
    }
    histogram!("charid_identification_latency_seconds").record(latency_ms as f64 / 1000.0);
}

/// Records a successful registration.
pub fn record_registration(backend: &'static str) {
    counter!("charid_registrations_total", "backend" => backend).increment(1);
}

/// Records a request rejected by the rate limiter.
pub fn record_throttled() {
    counter!("charid_throttled_requests_total").increment(1);
}
