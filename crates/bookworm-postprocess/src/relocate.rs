//! Moves release content from staging into the library.
//!
//! # Design
//! - Four ordered steps: verify source, create destination, copy, remove original.
//! - Each step is journaled; a failure stops the sequence and leaves earlier effects in place.
//! - The journal reaches disk only after the source is verified.
//! - Once the copy completes, cleanup and journal problems are warnings only.
//! - Symbolic links are recreated at the destination, not followed.
//! - All operations are blocking; callers run them on a blocking worker.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{PostProcessError, PostProcessResult};
use crate::journal::{Journal, StepKind, StepOutcome};

/// Options applied to a single relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocateOptions {
    /// Leave the staging directory in place after copying.
    pub keep_original: bool,
    /// Permission bits for directories created at the destination.
    pub directory_mode: u32,
}

/// Result of a successful relocation.
#[derive(Debug)]
pub struct RelocationReport {
    /// Library directory now holding the content.
    pub destination: PathBuf,
    /// Whether the staging directory was removed.
    pub source_removed: bool,
    /// Cleanup failure, downgraded to a warning.
    pub cleanup_error: Option<PostProcessError>,
}

type RemoveTree = dyn Fn(&Path) -> io::Result<()> + Send + Sync;

/// Performs the relocation sequence.
#[derive(Clone)]
pub struct FileRelocator {
    remove_tree: Arc<RemoveTree>,
}

impl Default for FileRelocator {
    fn default() -> Self {
        Self {
            remove_tree: Arc::new(|path: &Path| fs::remove_dir_all(path)),
        }
    }
}

impl FileRelocator {
    /// Relocator using a custom removal routine for the staging copy.
    #[must_use]
    pub fn with_cleanup<F>(remove_tree: F) -> Self
    where
        F: Fn(&Path) -> io::Result<()> + Send + Sync + 'static,
    {
        Self {
            remove_tree: Arc::new(remove_tree),
        }
    }

    /// Remove a staging copy left behind by an interrupted relocation.
    pub(crate) fn remove_original(&self, source: &Path) -> PostProcessResult<()> {
        (self.remove_tree)(source).map_err(|err| PostProcessError::CleanupFailed {
            path: source.to_path_buf(),
            source: err,
        })
    }

    /// Relocate `source` to `destination`, journaling each step.
    ///
    /// # Errors
    ///
    /// - [`PostProcessError::SourceMissing`] when `source` is gone; nothing is written.
    /// - [`PostProcessError::DestinationCreateFailed`] when the tree cannot be created.
    /// - [`PostProcessError::CopyFailed`] when copying fails; partial content stays.
    /// - [`PostProcessError::Journal`] when the journal cannot be written before the copy.
    pub fn relocate(
        &self,
        source: &Path,
        destination: &Path,
        options: RelocateOptions,
        journal: &mut Journal,
    ) -> PostProcessResult<RelocationReport> {
        journal.execute_step(StepKind::VerifySource, || {
            if source.is_dir() {
                Ok(StepOutcome::Completed(()))
            } else {
                Err(PostProcessError::SourceMissing {
                    path: source.to_path_buf(),
                })
            }
        })?;
        journal.arm()?;

        info!(
            source = %source.display(),
            destination = %destination.display(),
            "relocating release"
        );

        journal.execute_step(StepKind::CreateDestination, || {
            debug!(directory = %destination.display(), "creating destination directory");
            create_tree(destination, options.directory_mode)
                .map(StepOutcome::Completed)
                .map_err(|source| PostProcessError::DestinationCreateFailed {
                    path: destination.to_path_buf(),
                    source,
                })
        })?;

        journal.execute_step(StepKind::CopyContent, || {
            debug!(from = %source.display(), to = %destination.display(), "copying release");
            copy_tree(source, destination, options.directory_mode).map(StepOutcome::Completed)
        })?;

        let mut cleanup_error = None;
        let removal = journal.execute_step(StepKind::RemoveOriginal, || {
            if options.keep_original {
                return Ok(StepOutcome::Skipped(false, Some("keep_original".to_string())));
            }
            debug!(directory = %source.display(), "removing original release directory");
            self.remove_original(source)
                .map(|()| StepOutcome::Completed(true))
        });
        let source_removed = match removal {
            Ok(removed) => removed.unwrap_or(!options.keep_original),
            Err(err) => {
                warn!(
                    source = %source.display(),
                    error = %err.detail(),
                    "release relocated but staging copy could not be removed"
                );
                let removed = !source.exists();
                cleanup_error = Some(err);
                removed
            }
        };

        Ok(RelocationReport {
            destination: destination.to_path_buf(),
            source_removed,
            cleanup_error,
        })
    }
}

pub(crate) fn create_tree(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path)
}

fn copy_tree(source: &Path, destination: &Path, mode: u32) -> PostProcessResult<()> {
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(source).to_path_buf();
            PostProcessError::copy("copy_tree.walk", path, io::Error::other(err))
        })?;
        let relative = entry.path().strip_prefix(source).map_err(|_| {
            PostProcessError::copy(
                "copy_tree.strip_prefix",
                entry.path(),
                io::Error::new(io::ErrorKind::InvalidInput, "entry outside source"),
            )
        })?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            create_tree(&target, mode)
                .map_err(|err| PostProcessError::copy("copy_tree.create_dir", &target, err))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            create_tree(parent, mode)
                .map_err(|err| PostProcessError::copy("copy_tree.create_parent", parent, err))?;
        }
        if entry.file_type().is_symlink() {
            copy_link(entry.path(), &target, mode)?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|err| PostProcessError::copy("copy_tree.copy_entry", &target, err))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(link: &Path, target: &Path, _mode: u32) -> PostProcessResult<()> {
    let points_to = fs::read_link(link)
        .map_err(|err| PostProcessError::copy("copy_tree.read_link", link, err))?;
    std::os::unix::fs::symlink(&points_to, target)
        .map_err(|err| PostProcessError::copy("copy_tree.symlink", target, err))
}

#[cfg(not(unix))]
fn copy_link(link: &Path, target: &Path, mode: u32) -> PostProcessResult<()> {
    if link.is_dir() {
        return copy_tree(link, target, mode);
    }
    fs::copy(link, target)
        .map(|_| ())
        .map_err(|err| PostProcessError::copy("copy_tree.copy_link", target, err))
}
