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

//! Bookworm application wiring.
//!
//! Layout: `cli.rs` (arguments), `bootstrap.rs` (service wiring and command
//! dispatch), `watch.rs` (interval loop), `sink.rs` (completion events), `error.rs`.

pub mod bootstrap;
pub mod cli;
pub mod error;
pub mod sink;
pub mod watch;

pub use bootstrap::{AppServices, RunStatus, run_app};
pub use cli::{Cli, Command};
pub use error::{AppError, AppResult};
pub use sink::EventBusSink;
