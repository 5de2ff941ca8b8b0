//! Release post-processing runs.
//!
//! # Design
//! - One run at a time: runs and reconciliation passes share an async mutex, so two
//!   passes never pick up the same staging directory.
//! - The staging scan is sequential; matched releases fan out over a `JoinSet`
//!   bounded by a `Semaphore` sized from the policy.
//! - Filesystem work runs on blocking workers and is never cancelled midway.
//! - A release failure becomes an outcome; only staging or policy problems fail the run.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Instant;

use bookworm_config::PostProcessPolicy;
use bookworm_events::{Event, EventBus};
use bookworm_library::{Book, BookStatus, RecordStore, Release, ReleaseStatus};
use bookworm_telemetry::{Metrics, with_run_context};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{PostProcessError, PostProcessResult};
use crate::journal::{Journal, StepKind, StepStatus, journal_dir, list_journals};
use crate::matcher::{ReleaseMatcher, extract_release_guid};
use crate::metadata::MetadataWriter;
use crate::outcome::{FailedRelease, ProcessOutcome, ProcessedRelease, RunReport, SkipReason};
use crate::pattern::{destination_for, resolve};
use crate::relocate::{FileRelocator, RelocateOptions};
use crate::sink::CompletionSink;

const HEALTH_COMPONENT: &str = "postprocess";

/// Orchestrates discovery, matching, relocation, persistence, and signalling.
#[derive(Clone)]
pub struct PostProcessPipeline {
    store: Arc<dyn RecordStore>,
    matcher: ReleaseMatcher,
    sink: Arc<dyn CompletionSink>,
    events: EventBus,
    metrics: Metrics,
    relocator: FileRelocator,
    run_lock: Arc<Mutex<()>>,
    health_degraded: Arc<StdMutex<bool>>,
}

/// Values derived from the policy once per run.
struct RunSettings {
    run_id: Uuid,
    staging_root: PathBuf,
    destination_root: PathBuf,
    journal_dir: PathBuf,
    folder_pattern: String,
    options: RelocateOptions,
    parallelism: usize,
    writer: MetadataWriter,
}

impl RunSettings {
    fn from_policy(run_id: Uuid, policy: &PostProcessPolicy) -> PostProcessResult<Self> {
        for (field, root) in [
            ("staging_root", &policy.staging_root),
            ("destination_root", &policy.destination_root),
        ] {
            if !root.is_absolute() {
                return Err(PostProcessError::InvalidPolicy {
                    field,
                    reason: "not_absolute",
                    value: Some(root.display().to_string()),
                });
            }
        }
        let directory_mode =
            policy
                .directory_mode_bits()
                .map_err(|_| PostProcessError::InvalidPolicy {
                    field: "directory_mode",
                    reason: "not_octal",
                    value: Some(policy.directory_mode.clone()),
                })?;
        Ok(Self {
            run_id,
            staging_root: policy.staging_root.clone(),
            destination_root: policy.destination_root.clone(),
            journal_dir: journal_dir(&policy.destination_root),
            folder_pattern: policy.folder_pattern.clone(),
            options: RelocateOptions {
                keep_original: policy.keep_original,
                directory_mode,
            },
            parallelism: policy.parallelism.max(1),
            writer: MetadataWriter::new(policy.metadata_file_name.clone()),
        })
    }
}

impl PostProcessPipeline {
    /// Build a pipeline over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn CompletionSink>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            matcher: ReleaseMatcher::new(Arc::clone(&store)),
            store,
            sink,
            events,
            metrics,
            relocator: FileRelocator::default(),
            run_lock: Arc::new(Mutex::new(())),
            health_degraded: Arc::new(StdMutex::new(false)),
        }
    }

    /// Replace the relocator, e.g. to customise staging cleanup.
    #[must_use]
    pub fn with_relocator(mut self, relocator: FileRelocator) -> Self {
        self.relocator = relocator;
        self
    }

    /// Whether the last run failed at the run level.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        *self.lock_health_flag()
    }

    /// Process the staging area once.
    ///
    /// When `policy.reconcile_on_run` is set, interrupted relocations are repaired
    /// first and their outcomes lead the report.
    ///
    /// # Errors
    ///
    /// Returns an error when the policy is unusable, the staging root cannot be
    /// listed, or the journal directory cannot be read. Per-release failures are
    /// reported as [`ProcessOutcome::Failed`] instead.
    pub async fn run(&self, policy: &PostProcessPolicy) -> PostProcessResult<RunReport> {
        let _guard = self.run_lock.lock().await;
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        self.metrics.inc_run();
        self.publish_event(Event::PostProcessStarted { run_id });
        info!(run_id = %run_id, staging_root = %policy.staging_root.display(), "post-processing started");

        let result = with_run_context(run_id, self.run_locked(run_id, policy)).await;
        self.metrics.observe_run_duration(started.elapsed());
        self.conclude(run_id, result)
    }

    /// Repair interrupted relocations without scanning the staging area.
    ///
    /// # Errors
    ///
    /// Returns an error when the policy is unusable or the journal directory
    /// cannot be read.
    pub async fn reconcile(&self, policy: &PostProcessPolicy) -> PostProcessResult<RunReport> {
        let _guard = self.run_lock.lock().await;
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, "reconciliation started");
        let result = with_run_context(run_id, async {
            let settings = RunSettings::from_policy(run_id, policy)?;
            let outcomes = self.reconcile_journals(&settings).await?;
            Ok(RunReport { run_id, outcomes })
        })
        .await;
        self.conclude(run_id, result)
    }

    async fn run_locked(
        &self,
        run_id: Uuid,
        policy: &PostProcessPolicy,
    ) -> PostProcessResult<RunReport> {
        let settings = Arc::new(RunSettings::from_policy(run_id, policy)?);
        let mut outcomes = Vec::new();
        if policy.reconcile_on_run {
            outcomes.extend(self.reconcile_journals(&settings).await?);
        }

        let root = settings.staging_root.clone();
        let candidates = blocking("scan.staging", move || list_candidates(&root)).await?;
        debug!(count = candidates.len(), "staging directories discovered");

        outcomes.extend(self.process_candidates(&settings, candidates).await?);
        Ok(RunReport { run_id, outcomes })
    }

    fn conclude(
        &self,
        run_id: Uuid,
        result: PostProcessResult<RunReport>,
    ) -> PostProcessResult<RunReport> {
        match result {
            Ok(report) => {
                for outcome in &report.outcomes {
                    self.metrics.inc_outcome(outcome.label());
                }
                if report.outcomes.is_empty() {
                    info!(run_id = %run_id, "no eligible content");
                }
                info!(
                    run_id = %run_id,
                    processed = report.processed(),
                    skipped = report.skipped(),
                    failed = report.failed(),
                    "post-processing finished"
                );
                self.publish_event(Event::PostProcessCompleted {
                    run_id,
                    processed: report.processed(),
                    skipped: report.skipped(),
                    failed: report.failed(),
                });
                self.mark_recovered();
                Ok(report)
            }
            Err(err) => {
                let detail = err.detail();
                error!(run_id = %run_id, error = %detail, "post-processing run failed");
                self.mark_degraded(&detail);
                Err(err)
            }
        }
    }

    async fn process_candidates(
        &self,
        settings: &Arc<RunSettings>,
        candidates: Vec<PathBuf>,
    ) -> PostProcessResult<Vec<ProcessOutcome>> {
        let semaphore = Arc::new(Semaphore::new(settings.parallelism));
        let claimed = Arc::new(StdMutex::new(HashSet::new()));
        let mut tasks = JoinSet::new();
        let mut directories = HashMap::new();

        for directory in candidates {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| PostProcessError::WorkerPoolClosed)?;
            let pipeline = self.clone();
            let task_settings = Arc::clone(settings);
            let task_claimed = Arc::clone(&claimed);
            let task_directory = directory.clone();
            let handle = tasks.spawn(with_run_context(settings.run_id, async move {
                let _permit = permit;
                pipeline
                    .process_candidate(&task_settings, &task_claimed, task_directory)
                    .await
            }));
            directories.insert(handle.id(), directory);
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Some(outcome))) => outcomes.push(outcome),
                Ok((_, None)) => {}
                Err(source) => {
                    let directory = directories.remove(&source.id()).unwrap_or_default();
                    outcomes.push(self.fail(
                        settings,
                        None,
                        directory,
                        PostProcessError::Join {
                            operation: "postprocess.release_task",
                            source,
                        },
                    ));
                }
            }
        }
        Ok(outcomes)
    }

    async fn process_candidate(
        &self,
        settings: &RunSettings,
        claimed: &StdMutex<HashSet<String>>,
        directory: PathBuf,
    ) -> Option<ProcessOutcome> {
        let release = match self.matcher.match_directory(&directory).await {
            Ok(Some(release)) => release,
            Ok(None) => return None,
            Err(error) => return Some(self.fail(settings, None, directory, error)),
        };

        if !claim(claimed, &release.guid) {
            return Some(self.skip(settings, release, SkipReason::DuplicateRelease));
        }

        let book = match self.store.find_book(&release.book_id).await {
            Ok(Some(book)) => book,
            Ok(None) => {
                let reason = SkipReason::BookMissing {
                    book_id: release.book_id.clone(),
                };
                return Some(self.skip(settings, release, reason));
            }
            Err(source) => {
                let error = PostProcessError::Store {
                    operation: "process.find_book",
                    source,
                };
                return Some(self.fail(settings, Some(release), directory, error));
            }
        };

        if book.status != BookStatus::Snatched {
            let reason = SkipReason::NotSnatched {
                status: book.status,
            };
            return Some(self.skip(settings, release, reason));
        }

        self.metrics.add_active_releases(1);
        let outcome = self.relocate_release(settings, book, release, directory).await;
        self.metrics.add_active_releases(-1);
        Some(outcome)
    }

    async fn relocate_release(
        &self,
        settings: &RunSettings,
        book: Book,
        release: Release,
        source: PathBuf,
    ) -> ProcessOutcome {
        info!(release_guid = %release.guid, title = %release.title, "processing release");

        let destination = resolve(
            &settings.folder_pattern,
            &book.author_name,
            &book.title,
            book.published,
        )
        .and_then(|folder| destination_for(&settings.destination_root, &folder));
        let Some(destination) = destination else {
            let error = PostProcessError::InvalidPolicy {
                field: "folder_pattern",
                reason: "resolved_empty",
                value: Some(settings.folder_pattern.clone()),
            };
            return self.fail(settings, Some(release), source, error);
        };

        let journal = Journal::create(
            &settings.journal_dir,
            &release.guid,
            &book.id,
            &source,
            &destination,
        )
        .with_directory_mode(settings.options.directory_mode)
        .with_metrics(self.metrics.clone());
        let relocator = self.relocator.clone();
        let options = settings.options;
        let task_source = source.clone();
        let relocated = blocking("relocate", move || {
            let mut journal = journal;
            let report = relocator.relocate(&task_source, &destination, options, &mut journal);
            Ok((journal, report))
        })
        .await;

        match relocated {
            Ok((journal, Ok(report))) => {
                self.finish_release(
                    settings,
                    journal,
                    book,
                    release,
                    report.destination,
                    report.cleanup_error,
                    false,
                )
                .await
            }
            Ok((mut journal, Err(error))) => {
                close_journal(&mut journal, "relocation failed before content reached the library");
                self.fail(settings, Some(release), source, error)
            }
            Err(error) => self.fail(settings, Some(release), source, error),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish_release(
        &self,
        settings: &RunSettings,
        mut journal: Journal,
        mut book: Book,
        mut release: Release,
        destination: PathBuf,
        cleanup_error: Option<PostProcessError>,
        reconciled: bool,
    ) -> ProcessOutcome {
        let previous = release.clone();
        book.status = BookStatus::Downloaded;
        release.status = ReleaseStatus::Downloaded;
        release.directory = Some(destination.clone());

        if let Err(error) = self.persist_records(&mut journal, &book, &release).await {
            return self.fail(settings, Some(previous), destination, error);
        }

        self.sink.on_processed(&book, &release);
        info!(
            title = %book.title,
            directory = %destination.display(),
            reconciled,
            "finished processing book"
        );

        let metadata_error = self
            .write_metadata(settings, &mut journal, &book, &destination)
            .await
            .err();
        if let Err(err) = journal.finalise() {
            warn!(error = %err.detail(), "failed to close relocation journal");
        }

        ProcessOutcome::Processed(Box::new(ProcessedRelease {
            book,
            release,
            destination,
            cleanup_error,
            metadata_error,
            reconciled,
        }))
    }

    async fn persist_records(
        &self,
        journal: &mut Journal,
        book: &Book,
        release: &Release,
    ) -> PostProcessResult<()> {
        note_step(journal, StepKind::PersistState, StepStatus::Started);
        let saved = async {
            self.store
                .save_book(book)
                .await
                .map_err(|source| PostProcessError::PersistenceFailed {
                    operation: "persist.save_book",
                    source,
                })?;
            self.store
                .save_release(release)
                .await
                .map_err(|source| PostProcessError::PersistenceFailed {
                    operation: "persist.save_release",
                    source,
                })
        }
        .await;
        match saved {
            Ok(()) => {
                note_step(journal, StepKind::PersistState, StepStatus::Completed);
                Ok(())
            }
            Err(err) => {
                journal.record_failure(StepKind::PersistState, &err);
                Err(err)
            }
        }
    }

    async fn write_metadata(
        &self,
        settings: &RunSettings,
        journal: &mut Journal,
        book: &Book,
        destination: &Path,
    ) -> PostProcessResult<PathBuf> {
        note_step(journal, StepKind::WriteMetadata, StepStatus::Started);
        let writer = settings.writer.clone();
        let task_book = book.clone();
        let task_destination = destination.to_path_buf();
        let written = blocking("metadata.write", move || {
            writer.write(Some(&task_book), &task_destination)
        })
        .await;
        match written {
            Ok(path) => {
                note_step(journal, StepKind::WriteMetadata, StepStatus::Completed);
                Ok(path)
            }
            Err(err) => {
                warn!(
                    book_id = %book.id,
                    directory = %destination.display(),
                    error = %err.detail(),
                    "metadata sidecar not written"
                );
                journal.record_failure(StepKind::WriteMetadata, &err);
                Err(err)
            }
        }
    }

    async fn reconcile_journals(
        &self,
        settings: &RunSettings,
    ) -> PostProcessResult<Vec<ProcessOutcome>> {
        let dir = settings.journal_dir.clone();
        let paths = blocking("reconcile.list", move || list_journals(&dir)).await?;
        let mut outcomes = Vec::new();
        for path in paths {
            let mut journal = match Journal::load(&path) {
                Ok(journal) => journal.with_metrics(self.metrics.clone()),
                Err(err) => {
                    warn!(path = %path.display(), error = %err.detail(), "skipping unreadable journal");
                    continue;
                }
            };
            // No relocation is in flight while the run lock is held.
            if !journal.record().needs_reconciliation() {
                close_journal(&mut journal, "nothing to reconcile");
                continue;
            }
            if let Some(outcome) = self.reconcile_one(settings, journal).await {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }

    async fn reconcile_one(
        &self,
        settings: &RunSettings,
        mut journal: Journal,
    ) -> Option<ProcessOutcome> {
        let record = journal.record().clone();
        let release = match self.store.find_release(&record.release_guid).await {
            Ok(Some(release)) => release,
            Ok(None) => {
                warn!(release_guid = %record.release_guid, "journaled release no longer exists");
                close_journal(&mut journal, "release no longer exists");
                return None;
            }
            Err(source) => {
                let error = PostProcessError::Store {
                    operation: "reconcile.find_release",
                    source,
                };
                return Some(self.fail(settings, None, record.destination, error));
            }
        };
        let book = match self.store.find_book(&release.book_id).await {
            Ok(Some(book)) => book,
            Ok(None) => {
                warn!(book_id = %release.book_id, "journaled book no longer exists");
                close_journal(&mut journal, "book no longer exists");
                return None;
            }
            Err(source) => {
                let error = PostProcessError::Store {
                    operation: "reconcile.find_book",
                    source,
                };
                return Some(self.fail(settings, Some(release), record.destination, error));
            }
        };

        if book.status != BookStatus::Snatched {
            info!(
                release_guid = %release.guid,
                status = %book.status,
                "book is no longer snatched; nothing to reconcile"
            );
            close_journal(&mut journal, "book is no longer snatched");
            return None;
        }
        if !record.destination.is_dir() {
            warn!(
                release_guid = %release.guid,
                destination = %record.destination.display(),
                "relocated content is gone; nothing to reconcile"
            );
            close_journal(&mut journal, "destination is missing");
            return None;
        }

        info!(release_guid = %release.guid, "reconciling interrupted relocation");
        let cleanup_error = self
            .finish_cleanup(settings, &mut journal, &record.source)
            .await;
        let outcome = self
            .finish_release(
                settings,
                journal,
                book,
                release,
                record.destination,
                cleanup_error,
                true,
            )
            .await;
        Some(outcome)
    }

    async fn finish_cleanup(
        &self,
        settings: &RunSettings,
        journal: &mut Journal,
        source: &Path,
    ) -> Option<PostProcessError> {
        let pending = journal.record().step_status(StepKind::RemoveOriginal)
            != Some(StepStatus::Completed);
        if settings.options.keep_original || !pending || !source.is_dir() {
            return None;
        }
        note_step(journal, StepKind::RemoveOriginal, StepStatus::Started);
        let relocator = self.relocator.clone();
        let task_source = source.to_path_buf();
        match blocking("reconcile.cleanup", move || relocator.remove_original(&task_source)).await
        {
            Ok(()) => {
                note_step(journal, StepKind::RemoveOriginal, StepStatus::Completed);
                None
            }
            Err(err) => {
                warn!(source = %source.display(), error = %err.detail(), "staging copy could not be removed");
                journal.record_failure(StepKind::RemoveOriginal, &err);
                Some(err)
            }
        }
    }

    fn skip(&self, settings: &RunSettings, release: Release, reason: SkipReason) -> ProcessOutcome {
        info!(release_guid = %release.guid, reason = %reason, "release skipped");
        self.publish_event(Event::ReleaseSkipped {
            run_id: settings.run_id,
            release_guid: release.guid.clone(),
            reason: reason.as_str().to_string(),
        });
        ProcessOutcome::Skipped { release, reason }
    }

    fn fail(
        &self,
        settings: &RunSettings,
        release: Option<Release>,
        directory: PathBuf,
        error: PostProcessError,
    ) -> ProcessOutcome {
        let detail = error.detail();
        error!(
            release_guid = release.as_ref().map_or("", |r| r.guid.as_str()),
            directory = %directory.display(),
            error = %detail,
            "release processing failed"
        );
        self.publish_event(Event::ReleaseFailed {
            run_id: settings.run_id,
            release_guid: release.as_ref().map(|r| r.guid.clone()),
            directory: directory.display().to_string(),
            message: detail,
        });
        ProcessOutcome::Failed(Box::new(FailedRelease {
            release,
            directory,
            error,
        }))
    }

    fn mark_degraded(&self, detail: &str) {
        let mut guard = self.lock_health_flag();
        if *guard {
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                detail = detail,
                "post-processing still degraded"
            );
        } else {
            *guard = true;
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                detail = detail,
                "post-processing degraded"
            );
            self.publish_event(Event::HealthChanged {
                degraded: vec![HEALTH_COMPONENT.to_string()],
            });
        }
    }

    fn mark_recovered(&self) {
        let mut guard = self.lock_health_flag();
        if std::mem::take(&mut *guard) {
            drop(guard);
            self.publish_event(Event::HealthChanged { degraded: vec![] });
            info!(component = HEALTH_COMPONENT, "post-processing recovered");
        }
    }

    fn publish_event(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        if let Err(error) = self.events.publish(event) {
            debug!(
                event_id = error.event_id(),
                event_kind = error.event_kind(),
                error = %error,
                "event had no live subscribers"
            );
        }
    }

    fn lock_health_flag(&self) -> MutexGuard<'_, bool> {
        match self.health_degraded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("post-processing health mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

fn claim(claimed: &StdMutex<HashSet<String>>, guid: &str) -> bool {
    let mut guard = match claimed.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.insert(guid.to_string())
}

fn close_journal(journal: &mut Journal, reason: &str) {
    if let Err(err) = journal.discard() {
        warn!(
            release_guid = %journal.record().release_guid,
            reason,
            error = %err.detail(),
            "failed to close relocation journal"
        );
    }
}

fn note_step(journal: &mut Journal, step: StepKind, status: StepStatus) {
    if let Err(err) = journal.record_step(step, status, None) {
        warn!(
            step = step.as_str(),
            status = status.as_str(),
            error = %err.detail(),
            "failed to persist journal step"
        );
    }
}

async fn blocking<T, F>(operation: &'static str, op: F) -> PostProcessResult<T>
where
    F: FnOnce() -> PostProcessResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(op)
        .await
        .map_err(|source| PostProcessError::Join { operation, source })?
}

/// Directories under `root`; descent stops at directories carrying a release token.
fn list_candidates(root: &Path) -> PostProcessResult<Vec<PathBuf>> {
    fs::read_dir(root).map_err(|source| PostProcessError::StagingUnavailable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable staging entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let tokenised = entry
            .file_name()
            .to_str()
            .and_then(extract_release_guid)
            .is_some();
        candidates.push(entry.into_path());
        if tokenised {
            walker.skip_current_dir();
        }
    }
    candidates.sort();
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

    fn temp_dir() -> TestResult<TempDir> {
        Ok(tempfile::Builder::new()
            .prefix("bookworm-pipeline-")
            .tempdir()?)
    }

    #[test]
    fn candidates_stop_at_tokenised_directories() -> TestResult<()> {
        let root = temp_dir()?;
        let staging = root.path();
        fs::create_dir_all(staging.join("Book.bw(A1)").join("inner.bw(B2)"))?;
        fs::create_dir_all(staging.join("misc").join("Nested.bw(C3)"))?;
        fs::write(staging.join("loose.bw(D4)"), b"file, not dir")?;

        let found = list_candidates(staging)?;
        assert_eq!(
            found,
            vec![
                staging.join("Book.bw(A1)"),
                staging.join("misc"),
                staging.join("misc").join("Nested.bw(C3)"),
            ]
        );
        Ok(())
    }

    #[test]
    fn unreadable_staging_root_is_a_run_failure() {
        let result = list_candidates(Path::new("/nonexistent/bookworm/staging"));
        assert!(matches!(
            result,
            Err(PostProcessError::StagingUnavailable { .. })
        ));
    }

    #[test]
    fn relative_roots_are_rejected() {
        let policy = PostProcessPolicy {
            staging_root: PathBuf::from("staging"),
            destination_root: PathBuf::from("/library"),
            ..PostProcessPolicy::default()
        };
        assert!(matches!(
            RunSettings::from_policy(Uuid::nil(), &policy),
            Err(PostProcessError::InvalidPolicy {
                field: "staging_root",
                ..
            })
        ));
    }

    #[test]
    fn claims_are_exclusive() {
        let claimed = StdMutex::new(HashSet::new());
        assert!(claim(&claimed, "A1"));
        assert!(!claim(&claimed, "A1"));
        assert!(claim(&claimed, "B2"));
    }
}
