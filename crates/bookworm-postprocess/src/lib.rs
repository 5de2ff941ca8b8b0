#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Release post-processing: moves completed downloads from the staging area into
//! the library, updates their records, and writes a metadata sidecar.
//!
//! Layout: `pipeline.rs` (run orchestration and reconciliation), `matcher.rs`
//! (directory to release lookup), `pattern.rs` (folder naming), `relocate.rs`
//! (copy and cleanup), `journal.rs` (on-disk step log), `metadata.rs` (OPF
//! writer), `outcome.rs` (run report), `sink.rs` (completion signal), `error.rs`.

pub mod error;
pub mod journal;
pub mod matcher;
pub mod metadata;
pub mod outcome;
pub mod pattern;
pub mod pipeline;
pub mod relocate;
pub mod sink;

pub use error::{PostProcessError, PostProcessResult};
pub use journal::{
    JOURNAL_DIR_NAME, Journal, JournalRecord, StepKind, StepRecord, StepStatus, journal_dir,
    journal_path, list_journals,
};
pub use matcher::{ReleaseMatcher, extract_release_guid};
pub use metadata::{MetadataWriter, render_opf};
pub use outcome::{FailedRelease, ProcessOutcome, ProcessedRelease, RunReport, SkipReason};
pub use pattern::{destination_for, resolve, sanitize};
pub use pipeline::PostProcessPipeline;
pub use relocate::{FileRelocator, RelocateOptions, RelocationReport};
pub use sink::{CompletionSink, NoopSink};
