//! Prometheus metrics for the refiller.
//!
//! [`Metrics`] is registered as a notification observer, so every event the
//! monitor reports is also counted here.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use monitor::{Level, Notification, Notifier};
use store::{RefillRequest, Status};

/// Aggregated metrics for the refiller.
///
/// Metrics are registered with the global metrics registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        describe_counter!(
            "refiller_phase_completed_total",
            "Refill phases completed, by phase"
        );
        describe_counter!(
            "refiller_refills_succeeded_total",
            "Refills that reached inbound_received"
        );
        describe_counter!(
            "refiller_refills_failed_total",
            "Refills that failed at submission"
        );
        describe_counter!(
            "refiller_resets_total",
            "Running refills reset because the faucet reported none in progress"
        );
        describe_gauge!(
            "refiller_progress_percent",
            "Progress of the current refill request"
        );
        describe_gauge!(
            "refiller_running",
            "1 while a refill request is running"
        );
    }

    /// Mirror the request into the gauges.
    pub fn set_request(&self, request: &RefillRequest) {
        gauge!("refiller_progress_percent").set(f64::from(request.progress));
        gauge!("refiller_running").set(if request.status == Status::Running {
            1.0
        } else {
            0.0
        });
    }
}

impl Notifier for Metrics {
    fn notify(&self, notification: &Notification) {
        match (notification.level, notification.phase) {
            (Level::Success, _) => {
                counter!("refiller_refills_succeeded_total").increment(1);
            }
            (Level::Error, _) => {
                counter!("refiller_refills_failed_total").increment(1);
            }
            (Level::Info, Some(phase)) => {
                counter!("refiller_phase_completed_total", "phase" => phase.as_str())
                    .increment(1);
            }
            (Level::Info, None) => {
                counter!("refiller_resets_total").increment(1);
            }
        }
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
