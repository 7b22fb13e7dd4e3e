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

//! Replay detection, upload and status tracking.
//!
//! Layout: `resolver.rs` (replay directory discovery and operator prompt),
//! `watcher.rs` (filesystem subscription and replay filter), `stability.rs`
//! (write-completion detector), `upload.rs` (upload orchestrator), `poller.rs`
//! (status poller and dispatcher), `pipeline.rs` (supervisor), `naming.rs`
//! (display names), `model.rs` (stage values), `error.rs` (`PipelineError`).

pub mod error;
pub mod model;
pub mod naming;
pub mod pipeline;
pub mod poller;
pub mod resolver;
pub mod stability;
pub mod upload;
pub mod watcher;

pub use error::{PipelineError, PipelineResult, error_chain};
pub use model::{CandidateFile, StableReplay, UploadRequest, WatchPath};
pub use naming::{display_name, split_filepath};
pub use pipeline::{PipelineDeps, ReplayPipeline};
pub use poller::{PollOutcome, PollState, StatusPoller, spawn_poll_dispatcher};
pub use resolver::{PathResolver, Resolution, choose_root};
pub use stability::{
    FsProbe, Sample, SizeProbe, StabilityPolicy, StabilitySampler, StabilityTracker,
    wait_until_stable, wait_until_stable_within,
};
pub use upload::UploadOrchestrator;
pub use watcher::{DirectoryWatcher, ReplayFilter, WatchMessage};
