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

//! Remote analytics service contract and its HTTP implementation.
//!
//! Layout: `service.rs` (`ReplayService` trait and value types), `client.rs`
//! (`Sc2ReplayStatsClient` over reqwest), `error.rs` (`ApiError`).

pub mod client;
pub mod error;
pub mod service;

pub use client::Sc2ReplayStatsClient;
pub use error::{ApiError, ApiResult};
pub use service::{ReplayService, ReplayStatus, RequestId};
