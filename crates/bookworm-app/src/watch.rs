//! Interval-driven post-processing.
//!
//! Each tick reloads configuration and runs the pipeline once. A run is never
//! interrupted by shutdown; the signal is observed between runs.

use std::future::Future;
use std::io;
use std::time::Duration;

use bookworm_events::Event;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::bootstrap::AppServices;
use crate::error::{AppError, AppResult};
use crate::sink::publish_event;

impl AppServices {
    /// Run the pipeline every `watch_interval_secs` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the shutdown signal itself fails.
    pub async fn watch<F>(&self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = io::Result<()>>,
    {
        tokio::pin!(shutdown);
        let mut period = self.config.snapshot().watch_interval_secs;
        let mut ticker = time::interval(Duration::from_secs(period));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = period, "watching staging area");

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    signal.map_err(|source| AppError::Io { operation: "watch.shutdown_signal", source })?;
                    info!("shutdown requested; leaving watch loop");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.refresh_config();
                    let snapshot = self.config.snapshot();
                    if let Err(err) = self.pipeline.run(&snapshot.postprocess).await {
                        warn!(error = %err.detail(), "scheduled run failed; retrying next interval");
                    }
                    if snapshot.watch_interval_secs != period {
                        period = snapshot.watch_interval_secs;
                        let every = Duration::from_secs(period);
                        ticker = time::interval_at(Instant::now() + every, every);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        info!(interval_secs = period, "watch interval updated");
                    }
                }
            }
        }
    }

    fn refresh_config(&self) {
        match self.config.reload() {
            Ok(true) => publish_event(
                &self.events,
                &self.metrics,
                Event::SettingsChanged {
                    description: "configuration reloaded".to_string(),
                },
            ),
            Ok(false) => {}
            Err(err) => {
                self.metrics.inc_config_reload_failure();
                warn!(error = %err, "configuration reload rejected; keeping previous snapshot");
            }
        }
    }
}
