#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Telemetry primitives shared across the uploader workspace.
//!
//! Layout: `init.rs` (subscriber installation and log formats), `context.rs`
//! (process-wide span guard), `error.rs` (telemetry error type).

pub mod context;
pub mod error;
pub mod init;

pub use context::{GlobalContextGuard, record_app_mode};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
