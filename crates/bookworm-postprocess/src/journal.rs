//! Per-release relocation journal.
//!
//! Every relocation records its steps in `<destination_root>/.bookworm/<guid>.json`.
//! A journal whose content copy completed but whose record update did not marks a
//! release that reached the library without the store knowing; reconciliation
//! picks those up on a later pass.
//!
//! Nothing reaches disk until the source has been verified. Once the content copy
//! completes, journal write failures are logged and never fail the relocation.
//! Closed journals are deleted, so the directory only holds open work.

use std::fs;
use std::path::{Path, PathBuf};

use bookworm_telemetry::Metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{PostProcessError, PostProcessResult};
use crate::relocate::create_tree;

/// Directory under the destination root that holds journals.
pub const JOURNAL_DIR_NAME: &str = ".bookworm";
const JOURNAL_SUFFIX: &str = ".json";
const DEFAULT_DIRECTORY_MODE: u32 = 0o755;

/// Ordered steps of a single release's post-processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Confirm the staging directory still exists.
    VerifySource,
    /// Create the library directory tree.
    CreateDestination,
    /// Copy the release content.
    CopyContent,
    /// Remove the staging copy.
    RemoveOriginal,
    /// Save the book and release records.
    PersistState,
    /// Write the metadata sidecar.
    WriteMetadata,
    /// Close the journal.
    Finalise,
}

impl StepKind {
    /// Stable identifier used in journals and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VerifySource => "verify_source",
            Self::CreateDestination => "create_destination",
            Self::CopyContent => "copy_content",
            Self::RemoveOriginal => "remove_original",
            Self::PersistState => "persist_state",
            Self::WriteMetadata => "write_metadata",
            Self::Finalise => "finalise",
        }
    }
}

/// State of a journal step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step began.
    Started,
    /// The step finished successfully.
    Completed,
    /// The step failed.
    Failed,
    /// The step did not apply.
    Skipped,
}

impl StepStatus {
    /// Stable identifier used in journals and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One step entry in a journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step identifier (see [`StepKind::as_str`]).
    pub name: String,
    /// Latest status.
    pub status: StepStatus,
    /// Optional detail, typically an error message.
    pub detail: Option<String>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

/// Serialized journal contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Release being relocated.
    pub release_guid: String,
    /// Book owning the release.
    pub book_id: String,
    /// Staging directory the content came from.
    pub source: PathBuf,
    /// Library directory receiving the content.
    pub destination: PathBuf,
    /// Set once every step has run.
    pub completed: bool,
    /// When the journal was opened.
    pub started_at: DateTime<Utc>,
    /// When any step last changed.
    pub updated_at: DateTime<Utc>,
    /// Step history in first-seen order.
    pub steps: Vec<StepRecord>,
}

impl JournalRecord {
    /// Latest status recorded for `step`.
    #[must_use]
    pub fn step_status(&self, step: StepKind) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|record| record.name == step.as_str())
            .map(|record| record.status)
    }

    /// Whether content reached the library but the records were never updated.
    #[must_use]
    pub fn needs_reconciliation(&self) -> bool {
        !self.completed
            && self.step_status(StepKind::CopyContent) == Some(StepStatus::Completed)
            && self.step_status(StepKind::PersistState) != Some(StepStatus::Completed)
    }

    fn update_step(&mut self, step: StepKind, status: StepStatus, detail: Option<String>) -> bool {
        let now = Utc::now();
        let mut updated = false;
        if let Some(record) = self
            .steps
            .iter_mut()
            .find(|record| record.name == step.as_str())
        {
            if record.status != status || record.detail != detail {
                record.status = status;
                record.detail = detail;
                record.updated_at = now;
                updated = true;
            }
        } else {
            self.steps.push(StepRecord {
                name: step.as_str().to_string(),
                status,
                detail,
                updated_at: now,
            });
            updated = true;
        }
        if updated {
            self.updated_at = now;
        }
        updated
    }
}

/// How a successful step ended.
pub(crate) enum StepOutcome<T> {
    Completed(T),
    Skipped(T, Option<String>),
}

/// How step changes reach disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Persistence {
    /// Kept in memory until the source is verified.
    Held,
    /// Write failures are returned to the caller.
    Strict,
    /// Content is in the library; write failures are only logged.
    BestEffort,
}

/// Live journal for one release; persists on every change when attached to a file.
#[derive(Clone)]
pub struct Journal {
    path: Option<PathBuf>,
    record: JournalRecord,
    metrics: Option<Metrics>,
    persistence: Persistence,
    directory_mode: u32,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("record", &self.record)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

impl Journal {
    /// Start a journal stored under `journal_dir`.
    ///
    /// The file is first written when [`Journal::arm`] is called.
    #[must_use]
    pub fn create(
        journal_dir: &Path,
        release_guid: &str,
        book_id: &str,
        source: &Path,
        destination: &Path,
    ) -> Self {
        let mut journal = Self::detached(release_guid, book_id, source, destination);
        journal.path = Some(journal_path(journal_dir, release_guid));
        journal
    }

    /// Start a journal that is only kept in memory.
    #[must_use]
    pub fn detached(release_guid: &str, book_id: &str, source: &Path, destination: &Path) -> Self {
        let now = Utc::now();
        Self {
            path: None,
            record: JournalRecord {
                release_guid: release_guid.to_string(),
                book_id: book_id.to_string(),
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
                completed: false,
                started_at: now,
                updated_at: now,
                steps: Vec::new(),
            },
            metrics: None,
            persistence: Persistence::Held,
            directory_mode: DEFAULT_DIRECTORY_MODE,
        }
    }

    /// Resume a journal read from disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: &Path) -> PostProcessResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|source| PostProcessError::journal("journal.read", path, source))?;
        let record: JournalRecord = serde_json::from_str(&raw)
            .map_err(|source| PostProcessError::journal_format("journal.parse", path, source))?;
        let copied = matches!(
            record.step_status(StepKind::CopyContent),
            Some(StepStatus::Completed)
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            record,
            metrics: None,
            persistence: if copied {
                Persistence::BestEffort
            } else {
                Persistence::Strict
            },
            directory_mode: DEFAULT_DIRECTORY_MODE,
        })
    }

    /// Count step transitions in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Permission bits for the journal directory when it has to be created.
    #[must_use]
    pub const fn with_directory_mode(mut self, mode: u32) -> Self {
        self.directory_mode = mode;
        self
    }

    /// Start writing the journal to disk, flushing everything recorded so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be written.
    pub fn arm(&mut self) -> PostProcessResult<()> {
        if self.persistence != Persistence::Held {
            return Ok(());
        }
        self.persistence = Persistence::Strict;
        self.persist()
    }

    /// Recorded state.
    #[must_use]
    pub const fn record(&self) -> &JournalRecord {
        &self.record
    }

    /// File backing the journal, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current state to disk when attached to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal directory or file cannot be written.
    pub fn persist(&self) -> PostProcessResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            create_tree(parent, self.directory_mode)
                .map_err(|source| PostProcessError::journal("journal.create_dir", parent, source))?;
        }
        let encoded = serde_json::to_vec_pretty(&self.record)
            .map_err(|source| PostProcessError::journal_format("journal.serialize", path, source))?;
        let staged = path.with_extension("json.tmp");
        fs::write(&staged, encoded)
            .map_err(|source| PostProcessError::journal("journal.write", &staged, source))?;
        fs::rename(&staged, path)
            .map_err(|source| PostProcessError::journal("journal.rename", path, source))
    }

    /// Mark the journal complete and delete its file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn finalise(&mut self) -> PostProcessResult<()> {
        self.record.completed = true;
        if self
            .record
            .update_step(StepKind::Finalise, StepStatus::Completed, None)
        {
            self.count_step(StepKind::Finalise, StepStatus::Completed);
        }
        self.discard()
    }

    /// Delete the journal file without completing it.
    ///
    /// Used when nothing is left to reconcile: the relocation failed before any
    /// content reached the library, or the release no longer needs processing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn discard(&mut self) -> PostProcessResult<()> {
        self.persistence = Persistence::Held;
        let Some(path) = &self.path else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "relocation journal closed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PostProcessError::journal("journal.remove", path, err)),
        }
    }

    /// Run `op` as `step`, recording start, success, and failure.
    ///
    /// Steps already completed in this journal are not re-run; `None` is returned instead.
    pub(crate) fn execute_step<T, F>(&mut self, step: StepKind, op: F) -> PostProcessResult<Option<T>>
    where
        F: FnOnce() -> PostProcessResult<StepOutcome<T>>,
    {
        if self.record.step_status(step) == Some(StepStatus::Completed) {
            return Ok(None);
        }
        self.record_step(step, StepStatus::Started, None)?;
        match op() {
            Ok(StepOutcome::Completed(value)) => {
                if step == StepKind::CopyContent {
                    self.persistence = Persistence::BestEffort;
                }
                self.record_success(step, StepStatus::Completed, None);
                Ok(Some(value))
            }
            Ok(StepOutcome::Skipped(value, detail)) => {
                self.record_success(step, StepStatus::Skipped, detail.as_deref());
                Ok(Some(value))
            }
            Err(err) => {
                self.record_failure(step, &err);
                Err(err)
            }
        }
    }

    /// Record `err` as the failure of `step`; persistence problems are logged, not raised.
    pub(crate) fn record_failure(&mut self, step: StepKind, err: &PostProcessError) {
        let detail = err.detail();
        if let Err(record_err) = self.record_step(step, StepStatus::Failed, Some(&detail)) {
            error!(
                error = %record_err,
                step = step.as_str(),
                release_guid = %self.record.release_guid,
                "failed to persist journal failure step"
            );
        }
    }

    /// A step whose effect already happened; failing to record it does not undo it.
    fn record_success(&mut self, step: StepKind, status: StepStatus, detail: Option<&str>) {
        if let Err(err) = self.record_step(step, status, detail) {
            warn!(
                error = %err.detail(),
                step = step.as_str(),
                release_guid = %self.record.release_guid,
                "failed to persist journal step"
            );
        }
    }

    pub(crate) fn record_step(
        &mut self,
        step: StepKind,
        status: StepStatus,
        detail: Option<&str>,
    ) -> PostProcessResult<()> {
        let changed = self
            .record
            .update_step(step, status, detail.map(str::to_string));
        if !changed {
            return Ok(());
        }
        self.count_step(step, status);
        match self.persistence {
            Persistence::Held => Ok(()),
            Persistence::Strict => self.persist(),
            Persistence::BestEffort => {
                if let Err(err) = self.persist() {
                    warn!(
                        error = %err.detail(),
                        step = step.as_str(),
                        release_guid = %self.record.release_guid,
                        "journal write failed after content reached the library"
                    );
                }
                Ok(())
            }
        }
    }

    fn count_step(&self, step: StepKind, status: StepStatus) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_step(step.as_str(), status.as_str());
        }
    }
}

/// Location of the journal for `release_guid`.
#[must_use]
pub fn journal_path(journal_dir: &Path, release_guid: &str) -> PathBuf {
    journal_dir.join(format!("{release_guid}{JOURNAL_SUFFIX}"))
}

/// Journal directory for a destination root.
#[must_use]
pub fn journal_dir(destination_root: &Path) -> PathBuf {
    destination_root.join(JOURNAL_DIR_NAME)
}

/// List journal files in `journal_dir`; a missing directory yields nothing.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be listed.
pub fn list_journals(journal_dir: &Path) -> PostProcessResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(journal_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(PostProcessError::journal("journal.list", journal_dir, err)),
    };
    let mut paths = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|source| PostProcessError::journal("journal.list", journal_dir, source))?;
        let path = entry.path();
        if path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(JOURNAL_SUFFIX) && !name.starts_with('.'))
            && path.is_file()
        {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

    fn temp_dir() -> TestResult<TempDir> {
        Ok(tempfile::Builder::new()
            .prefix("bookworm-journal-")
            .tempdir()?)
    }

    #[test]
    fn execute_step_records_failure_status() -> TestResult<()> {
        let mut journal = Journal::detached("G1", "B1", Path::new("/s"), Path::new("/d"));
        let result: PostProcessResult<Option<()>> =
            journal.execute_step(StepKind::VerifySource, || {
                Err(PostProcessError::SourceMissing {
                    path: PathBuf::from("/s"),
                })
            });
        assert!(matches!(result, Err(PostProcessError::SourceMissing { .. })));
        let record = &journal.record().steps[0];
        assert_eq!(record.status, StepStatus::Failed);
        assert_eq!(record.detail.as_deref(), Some("release source missing"));
        Ok(())
    }

    #[test]
    fn completed_steps_are_not_rerun() -> TestResult<()> {
        let mut journal = Journal::detached("G1", "B1", Path::new("/s"), Path::new("/d"));
        let first = journal.execute_step(StepKind::CopyContent, || Ok(StepOutcome::Completed(1)))?;
        let second = journal.execute_step(StepKind::CopyContent, || Ok(StepOutcome::Completed(2)))?;
        assert_eq!(first, Some(1));
        assert_eq!(second, None);
        Ok(())
    }

    #[test]
    fn persisted_journal_round_trips_and_flags_gap() -> TestResult<()> {
        let root = temp_dir()?;
        let dir = journal_dir(root.path());
        let mut journal = Journal::create(&dir, "G1", "B1", Path::new("/s"), Path::new("/d"));
        journal.arm()?;
        journal.execute_step(StepKind::CopyContent, || Ok(StepOutcome::Completed(())))?;
        journal.record_failure(
            StepKind::PersistState,
            &PostProcessError::WorkerPoolClosed,
        );

        let listed = list_journals(&dir)?;
        assert_eq!(listed, vec![journal_path(&dir, "G1")]);
        let mut loaded = Journal::load(&listed[0])?;
        assert!(loaded.record().needs_reconciliation());

        loaded.finalise()?;
        assert!(loaded.record().completed);
        assert!(list_journals(&dir)?.is_empty());
        Ok(())
    }

    #[test]
    fn held_journal_touches_nothing_until_armed() -> TestResult<()> {
        let root = temp_dir()?;
        let library = root.path().join("library");
        let dir = journal_dir(&library);
        let mut journal = Journal::create(&dir, "G2", "B1", Path::new("/s"), Path::new("/d"));

        let result: PostProcessResult<Option<()>> =
            journal.execute_step(StepKind::VerifySource, || {
                Err(PostProcessError::SourceMissing {
                    path: PathBuf::from("/s"),
                })
            });

        assert!(result.is_err());
        assert_eq!(
            journal.record().step_status(StepKind::VerifySource),
            Some(StepStatus::Failed)
        );
        assert!(!library.exists());

        journal.arm()?;
        assert!(journal_path(&dir, "G2").is_file());
        Ok(())
    }

    #[test]
    fn writes_after_copy_are_best_effort() -> TestResult<()> {
        let root = temp_dir()?;
        let dir = journal_dir(root.path());
        let mut journal = Journal::create(&dir, "G3", "B1", Path::new("/s"), Path::new("/d"));
        journal.arm()?;
        journal.execute_step(StepKind::CopyContent, || Ok(StepOutcome::Completed(())))?;

        fs::remove_dir_all(&dir)?;
        fs::write(&dir, b"not a directory")?;

        let removed =
            journal.execute_step(StepKind::RemoveOriginal, || Ok(StepOutcome::Completed(true)))?;
        assert_eq!(removed, Some(true));
        journal.record_step(StepKind::PersistState, StepStatus::Completed, None)?;
        assert_eq!(
            journal.record().step_status(StepKind::RemoveOriginal),
            Some(StepStatus::Completed)
        );
        Ok(())
    }

    #[test]
    fn discard_removes_the_file_once() -> TestResult<()> {
        let root = temp_dir()?;
        let dir = journal_dir(root.path());
        let mut journal = Journal::create(&dir, "G4", "B1", Path::new("/s"), Path::new("/d"));
        journal.arm()?;
        assert_eq!(list_journals(&dir)?.len(), 1);

        journal.discard()?;
        journal.discard()?;
        assert!(list_journals(&dir)?.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn journal_directory_uses_configured_mode() -> TestResult<()> {
        use std::os::unix::fs::PermissionsExt;

        let root = temp_dir()?;
        let dir = journal_dir(&root.path().join("library"));
        let mut journal = Journal::create(&dir, "G5", "B1", Path::new("/s"), Path::new("/d"))
            .with_directory_mode(0o700);
        journal.arm()?;

        let mode = fs::metadata(&dir)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
        Ok(())
    }

    #[test]
    fn missing_journal_dir_lists_nothing() -> TestResult<()> {
        let root = temp_dir()?;
        assert!(list_journals(&root.path().join("absent"))?.is_empty());
        Ok(())
    }
}
