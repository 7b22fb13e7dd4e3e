//! Values passed between pipeline stages.
//!
//! # Design
//! - Each stage consumes the previous stage's value by move so a replay cannot be
//!   uploaded twice from the same detection.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use rsu_api::RequestId;

/// Directory that receives replay files for one account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchPath(PathBuf);

impl WatchPath {
    /// Wrap a resolved directory.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Borrow the directory path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl Display for WatchPath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0.display())
    }
}

/// File observed through a create notification, not yet known to be complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Full path of the created file.
    pub path: PathBuf,
}

impl CandidateFile {
    /// Candidate for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Candidate that stopped growing after exceeding the minimum replay size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableReplay {
    /// Full path of the replay.
    pub path: PathBuf,
    /// Size observed on the sample that ended detection.
    pub size_bytes: u64,
    /// Number of size samples taken.
    pub samples: u32,
}

/// Accepted upload handed from the orchestrator to the status poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Identifier issued by the service.
    pub rqid: RequestId,
    /// Display name of the replay (its map name).
    pub map: String,
    /// Replay path the request was created from.
    pub path: PathBuf,
}
