//! Default values for the configuration document.
//!
//! # Design
//! - Centralize timing and threshold defaults so the pipeline and the CLI agree.

/// Root of the remote analytics API.
pub const API_ROOT: &str = "https://api.sc2replaystats.com";
/// Directory name under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "sc2-rsu";
/// File name of the configuration document.
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Interval between file size samples while waiting for a replay to settle.
pub const STABILITY_INTERVAL_MS: u64 = 250;
/// Replays at or below this size are still being written (smallest seen is ~27 KB).
pub const MIN_REPLAY_BYTES: u64 = 26 * 1024;
/// Interval between status queries for an accepted upload.
pub const STATUS_INTERVAL_MS: u64 = 1_000;
/// Filename suffix shared by `.SC2Replay` files but not by `.writeCacheBackup` siblings.
pub const REPLAY_SUFFIX: &str = "eplay";
/// Request timeout for the remote API client.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
