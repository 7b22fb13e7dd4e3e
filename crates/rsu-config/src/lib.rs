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

//! File-backed configuration for the replay uploader.
//!
//! Layout: `model.rs` (typed config document), `defaults.rs` (default values),
//! `validate.rs` (validation and API key format checks), `loader.rs`
//! (`ConfigStore` load/save), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigStore, default_config_path};
pub use model::{LoggingSettings, PipelineSettings, UploaderConfig};
pub use validate::{mask_api_key, valid_api_key};
