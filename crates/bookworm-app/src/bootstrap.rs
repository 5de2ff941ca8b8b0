//! Service wiring and command dispatch.

use std::sync::Arc;

use bookworm_config::ConfigService;
use bookworm_events::EventBus;
use bookworm_library::JsonRecordStore;
use bookworm_postprocess::{PostProcessPipeline, RunReport};
use bookworm_telemetry::{
    GlobalContextGuard, LoggingConfig, Metrics, init_logging, log_format_from_str,
};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Command};
use crate::error::{AppError, AppResult};
use crate::sink::EventBusSink;

/// Build identifier recorded on the application span: `BOOKWORM_BUILD_SHA` at
/// compile time, otherwise the package version.
pub(crate) const BUILD_ID: &str = match option_env!("BOOKWORM_BUILD_SHA") {
    Some(sha) => sha,
    None => env!("CARGO_PKG_VERSION"),
};

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every candidate was processed or skipped.
    Clean,
    /// At least one candidate failed.
    Failures,
}

impl RunStatus {
    /// Status for a finished run.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        if report.has_failures() {
            Self::Failures
        } else {
            Self::Clean
        }
    }

    /// Process exit code.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Failures => 2,
        }
    }
}

/// Long-lived services shared by every command.
#[derive(Clone)]
pub struct AppServices {
    pub(crate) config: ConfigService,
    pub(crate) events: EventBus,
    pub(crate) metrics: Metrics,
    pub(crate) pipeline: PostProcessPipeline,
}

impl AppServices {
    /// Wire the record store, event bus, metrics, and pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if metrics cannot be registered or the record store cannot be opened.
    pub async fn build(config: ConfigService) -> AppResult<Self> {
        let snapshot = config.snapshot();
        let events = EventBus::new();
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let store = JsonRecordStore::open(snapshot.store_path.clone())
            .await
            .map_err(|err| AppError::library("store.open", err))?;
        info!(path = %store.path().display(), "record store opened");
        let sink = EventBusSink::new(events.clone(), metrics.clone());
        let pipeline = PostProcessPipeline::new(
            Arc::new(store),
            Arc::new(sink),
            events.clone(),
            metrics.clone(),
        );
        Ok(Self {
            config,
            events,
            metrics,
            pipeline,
        })
    }

    /// Shared event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Shared metrics registry.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one command to completion; `watch` stops on Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error when a run fails as a whole or the shutdown signal cannot be installed.
    pub async fn execute(&self, command: Command) -> AppResult<RunStatus> {
        match command {
            Command::Run => {
                let policy = self.config.snapshot().postprocess.clone();
                let report = self
                    .pipeline
                    .run(&policy)
                    .await
                    .map_err(|err| AppError::postprocess("postprocess.run", err))?;
                Ok(RunStatus::from_report(&report))
            }
            Command::Reconcile => {
                let policy = self.config.snapshot().postprocess.clone();
                let report = self
                    .pipeline
                    .reconcile(&policy)
                    .await
                    .map_err(|err| AppError::postprocess("postprocess.reconcile", err))?;
                Ok(RunStatus::from_report(&report))
            }
            Command::Watch => {
                self.watch(tokio::signal::ctrl_c()).await?;
                Ok(RunStatus::Clean)
            }
        }
    }
}

/// Entry point: load configuration, install logging, and run `cli.command`.
///
/// # Errors
///
/// Returns an error if configuration, logging, or service wiring fails, or if
/// the command fails as a whole.
pub async fn run_app(cli: Cli) -> AppResult<RunStatus> {
    let config =
        ConfigService::load(cli.config.clone()).map_err(|err| AppError::config("config.load", err))?;
    let snapshot = config.snapshot();
    init_logging(&LoggingConfig {
        level: &snapshot.log_level,
        format: log_format_from_str(snapshot.log_format.as_deref()),
        build_sha: BUILD_ID,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new(cli.command.label());

    info!(
        command = cli.command.label(),
        staging_root = %snapshot.postprocess.staging_root.display(),
        destination_root = %snapshot.postprocess.destination_root.display(),
        "bookworm starting"
    );

    let services = AppServices::build(config).await?;
    let logger = spawn_event_logger(services.events());
    let result = services.execute(cli.command).await;

    if !logger.is_finished() {
        logger.abort();
    }
    if let Err(err) = logger.await
        && !err.is_cancelled()
    {
        warn!(error = %err, "event logger task join failed");
    }
    match &result {
        Ok(status) => info!(exit_code = status.exit_code(), "bookworm finished"),
        Err(err) => warn!(error = %err.detail(), "bookworm finished with an error"),
    }
    result
}

fn spawn_event_logger(events: &EventBus) -> JoinHandle<()> {
    let mut stream = events.subscribe(None);
    tokio::spawn(async move {
        while let Some(envelope) = stream.next().await {
            debug!(
                event_id = envelope.id,
                event_kind = envelope.event.kind(),
                run_id = ?envelope.event.run_id(),
                "event published"
            );
        }
    })
}
