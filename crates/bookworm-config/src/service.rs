//! Live configuration snapshots with reload notifications.
//!
//! # Design
//! - The current document lives in a `tokio::sync::watch` channel as an `Arc<AppConfig>`.
//! - `reload` re-reads the source and only notifies watchers when the document changed.
//! - A failed reload leaves the previous snapshot in place.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::error::ConfigResult;
use crate::loader::{EnvSource, ProcessEnv, load_config_from};
use crate::model::AppConfig;
use crate::validate::validate_config;

/// Owner of the current configuration snapshot.
#[derive(Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    env: Arc<dyn EnvSource + Send + Sync>,
    sender: Arc<watch::Sender<Arc<AppConfig>>>,
}

impl ConfigService {
    /// Load the initial snapshot from `path` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial document cannot be loaded or validated.
    pub fn load(path: Option<PathBuf>) -> ConfigResult<Self> {
        Self::with_env(path, Arc::new(ProcessEnv))
    }

    /// Load the initial snapshot using a custom override source.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial document cannot be loaded or validated.
    pub fn with_env(
        path: Option<PathBuf>,
        env: Arc<dyn EnvSource + Send + Sync>,
    ) -> ConfigResult<Self> {
        let config = load_config_from(path.as_deref(), env.as_ref())?;
        let (sender, _) = watch::channel(Arc::new(config));
        Ok(Self {
            path,
            env,
            sender: Arc::new(sender),
        })
    }

    /// Current configuration snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AppConfig> {
        self.sender.borrow().clone()
    }

    /// Re-read the configuration source, returning whether the snapshot changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded or validated; the
    /// previous snapshot is retained in that case.
    pub fn reload(&self) -> ConfigResult<bool> {
        let config = load_config_from(self.path.as_deref(), self.env.as_ref())?;
        Ok(self.publish(config))
    }

    /// Replace the snapshot with an in-memory document.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn replace(&self, config: AppConfig) -> ConfigResult<bool> {
        validate_config(&config)?;
        Ok(self.publish(config))
    }

    /// Watch for future snapshots.
    #[must_use]
    pub fn subscribe(&self) -> ConfigWatcher {
        ConfigWatcher {
            receiver: self.sender.subscribe(),
        }
    }

    fn publish(&self, config: AppConfig) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if **current == config {
                false
            } else {
                *current = Arc::new(config);
                true
            }
        });
        if changed {
            info!("configuration snapshot updated");
        }
        changed
    }
}

/// Receives configuration snapshots as they change.
pub struct ConfigWatcher {
    receiver: watch::Receiver<Arc<AppConfig>>,
}

impl ConfigWatcher {
    /// Wait for the next changed snapshot; `None` once the service is dropped.
    pub async fn next(&mut self) -> Option<Arc<AppConfig>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Snapshot currently visible to this watcher.
    #[must_use]
    pub fn current(&self) -> Arc<AppConfig> {
        self.receiver.borrow().clone()
    }
}
