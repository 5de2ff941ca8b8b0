//! Prometheus registry for post-processing counters.
//!
//! # Design
//! - Collectors are registered once and shared behind an `Arc`.
//! - Label values come from stable, lower-case identifiers so dashboards stay consistent.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder, core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    runs_total: IntCounter,
    outcomes_total: IntCounterVec,
    steps_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    active_releases: IntGauge,
    last_run_ms: IntGauge,
    config_reload_failures_total: IntCounter,
}

/// Point-in-time view of the post-processing gauges and counters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Runs started since the process launched.
    pub runs_total: u64,
    /// Releases relocated successfully.
    pub processed_total: u64,
    /// Staging entries skipped.
    pub skipped_total: u64,
    /// Staging entries that failed.
    pub failed_total: u64,
    /// Releases currently being relocated.
    pub active_releases: i64,
    /// Wall-clock duration of the most recent run in milliseconds.
    pub last_run_ms: i64,
    /// Configuration reloads rejected while watching.
    pub config_reload_failures_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the post-processing collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let runs_total = build("postprocess_runs_total", || {
            IntCounter::with_opts(Opts::new(
                "postprocess_runs_total",
                "Post-processing runs started",
            ))
        })?;
        let outcomes_total = build("postprocess_outcomes_total", || {
            IntCounterVec::new(
                Opts::new(
                    "postprocess_outcomes_total",
                    "Staging entries by post-processing outcome",
                ),
                &["outcome"],
            )
        })?;
        let steps_total = build("postprocess_steps_total", || {
            IntCounterVec::new(
                Opts::new(
                    "postprocess_steps_total",
                    "Relocation steps executed by status",
                ),
                &["step", "status"],
            )
        })?;
        let events_emitted_total = build("events_emitted_total", || {
            IntCounterVec::new(
                Opts::new("events_emitted_total", "Domain events emitted by type"),
                &["type"],
            )
        })?;
        let active_releases = build("postprocess_active_releases", || {
            IntGauge::with_opts(Opts::new(
                "postprocess_active_releases",
                "Releases currently being relocated",
            ))
        })?;
        let last_run_ms = build("postprocess_last_run_ms", || {
            IntGauge::with_opts(Opts::new(
                "postprocess_last_run_ms",
                "Duration of the most recent post-processing run (ms)",
            ))
        })?;
        let config_reload_failures_total = build("config_reload_failures_total", || {
            IntCounter::with_opts(Opts::new(
                "config_reload_failures_total",
                "Configuration reloads rejected by validation",
            ))
        })?;

        register(&registry, "postprocess_runs_total", &runs_total)?;
        register(&registry, "postprocess_outcomes_total", &outcomes_total)?;
        register(&registry, "postprocess_steps_total", &steps_total)?;
        register(&registry, "events_emitted_total", &events_emitted_total)?;
        register(&registry, "postprocess_active_releases", &active_releases)?;
        register(&registry, "postprocess_last_run_ms", &last_run_ms)?;
        register(
            &registry,
            "config_reload_failures_total",
            &config_reload_failures_total,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                runs_total,
                outcomes_total,
                steps_total,
                events_emitted_total,
                active_releases,
                last_run_ms,
                config_reload_failures_total,
            }),
        })
    }

    /// Count a started post-processing run.
    pub fn inc_run(&self) {
        self.inner.runs_total.inc();
    }

    /// Count one staging entry outcome (`processed`, `skipped`, `failed`).
    pub fn inc_outcome(&self, outcome: &str) {
        self.inner
            .outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the relocation step counter.
    pub fn inc_step(&self, step: &str, status: &str) {
        self.inner
            .steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Adjust the in-flight release gauge by `delta`.
    pub fn add_active_releases(&self, delta: i64) {
        self.inner.active_releases.add(delta);
    }

    /// Record how long the latest run took.
    pub fn observe_run_duration(&self, duration: Duration) {
        self.inner
            .last_run_ms
            .set(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
    }

    /// Count a rejected configuration reload.
    pub fn inc_config_reload_failure(&self) {
        self.inner.config_reload_failures_total.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the post-processing collectors.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let outcome = |label: &str| self.inner.outcomes_total.with_label_values(&[label]).get();
        MetricsSnapshot {
            runs_total: self.inner.runs_total.get(),
            processed_total: outcome("processed"),
            skipped_total: outcome("skipped"),
            failed_total: outcome("failed"),
            active_releases: self.inner.active_releases.get(),
            last_run_ms: self.inner.last_run_ms.get(),
            config_reload_failures_total: self.inner.config_reload_failures_total.get(),
        }
    }
}

fn build<C>(
    name: &'static str,
    factory: impl FnOnce() -> prometheus::Result<C>,
) -> Result<C> {
    factory().map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_run();
        metrics.inc_outcome("processed");
        metrics.inc_outcome("processed");
        metrics.inc_outcome("skipped");
        metrics.inc_outcome("failed");
        metrics.inc_step("copy_content", "completed");
        metrics.inc_event("release_processed");
        metrics.add_active_releases(3);
        metrics.add_active_releases(-1);
        metrics.observe_run_duration(Duration::from_millis(250));
        metrics.inc_config_reload_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs_total, 1);
        assert_eq!(snapshot.processed_total, 2);
        assert_eq!(snapshot.skipped_total, 1);
        assert_eq!(snapshot.failed_total, 1);
        assert_eq!(snapshot.active_releases, 2);
        assert_eq!(snapshot.last_run_ms, 250);
        assert_eq!(snapshot.config_reload_failures_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("postprocess_steps_total"));
        assert!(rendered.contains("events_emitted_total"));
        Ok(())
    }

    #[test]
    fn run_duration_saturates_on_large_values() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.observe_run_duration(Duration::from_secs(u64::MAX / 2));
        assert_eq!(metrics.snapshot().last_run_ms, i64::MAX);
        Ok(())
    }
}
