//! Prometheus exposition for the client counters
//!
//! The health check has no HTTP surface, so the rendered text exposition is
//! written to the log when the run finishes.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return a handle for rendering.
///
/// Must run before the pipeline sends anything, or the first attempts are lost.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
