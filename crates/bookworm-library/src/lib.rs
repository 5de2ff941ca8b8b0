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

//! Library records (books and releases) and the store abstraction they live behind.
//!
//! Layout: `model.rs` (records and statuses), `store.rs` (`RecordStore` trait),
//! `memory.rs` (in-process store), `json.rs` (snapshot-file store), `error.rs`.

pub mod error;
pub mod json;
pub mod memory;
pub mod model;
pub mod store;

pub use error::{LibraryError, LibraryResult};
pub use json::JsonRecordStore;
pub use memory::InMemoryRecordStore;
pub use model::{Book, BookStatus, Release, ReleaseStatus};
pub use store::RecordStore;
