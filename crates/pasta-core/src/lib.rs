//! pasta-core library.
//!
//! Per-channel in-memory structures for a chat bot: a bounded
//! [`ledger::EventLedger`] of recent messages and a
//! [`window::DuplicateWindow`] that recognizes copypasta.
//!
//! # Conventions
//!
//! - **Time**: every operation takes the current instant from the caller.
//!   Instants must be non-decreasing per instance.
//! - **Errors**: Use `anyhow::Result` in loaders; typed errors live in [`error`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod channel;
pub mod config;
pub mod error;
pub mod expiry;
pub mod ledger;
pub mod message;
pub mod transcript;
pub mod window;

pub use channel::{Channel, Channels, Ingested};
pub use error::{Error, ErrorCode, NotCopypasta};
pub use ledger::{EventLedger, Record};
pub use message::Message;
pub use window::DuplicateWindow;
