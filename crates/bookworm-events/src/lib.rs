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

//! Typed event bus shared by the Bookworm services.
//!
//! The bus assigns sequential identifiers and keeps a bounded replay ring so
//! subscribers that reconnect can resume from the last id they saw. Delivery is
//! backed by `tokio::broadcast`; when the channel overflows the oldest events
//! are dropped.
//!
//! Layout: `payloads.rs` (event enum and envelope), `routing.rs` (`EventBus`),
//! `error.rs` (publish failures).

pub mod error;
pub mod payloads;
pub mod routing;

pub use error::{EventBusError, EventBusResult};
pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
pub use routing::{EventBus, EventStream};
