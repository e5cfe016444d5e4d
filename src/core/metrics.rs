use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_session_started(resumed: bool) {
    let mode = if resumed { "resumed" } else { "fresh" };
    metrics::counter!("proctor_sessions_started_total", "mode" => mode).increment(1);
}

pub(crate) fn record_violation(kind: &'static str) {
    metrics::counter!("proctor_violations_total", "kind" => kind).increment(1);
}

pub(crate) fn record_section_submission(reason: &'static str) {
    metrics::counter!("proctor_section_submissions_total", "reason" => reason).increment(1);
}

pub(crate) fn record_session_submission(outcome: &'static str) {
    metrics::counter!("proctor_session_submissions_total", "outcome" => outcome).increment(1);
}
