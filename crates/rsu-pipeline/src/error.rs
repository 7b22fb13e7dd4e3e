//! # Design
//!
//! - Only startup failures are modelled here; per-file failures are reported as events.
//! - Keep messages constant and carry paths and operations in fields.

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline startup operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that prevent the pipeline from starting.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The installation scan found nothing that looks like a replays root.
    #[error("unable to automatically determine the path to your replays directory")]
    NoCandidateRoots {
        /// Directory the scan started from.
        scan_root: PathBuf,
    },
    /// The scan root itself could not be enumerated.
    #[error("replay directory scan failed")]
    Scan {
        /// Directory the scan started from.
        scan_root: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// A directory needed for resolution could not be read.
    #[error("replay directory enumeration failed")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Account directories were found but none holds a multiplayer replay folder.
    #[error("no replay directories to watch")]
    NoWatchPaths {
        /// Root that was enumerated.
        root: PathBuf,
    },
    /// The operator prompt closed before a valid choice was made.
    #[error("replay directory selection aborted")]
    SelectionAborted,
    /// The account naming pattern failed to compile.
    #[error("account pattern failed to compile")]
    Pattern {
        /// Underlying regex error.
        source: regex::Error,
    },
    /// The filesystem notification backend could not be created.
    #[error("failed to setup fswatcher")]
    WatchInit {
        /// Underlying notify error.
        source: notify::Error,
    },
    /// A watch path could not be registered.
    #[error("failed to watch replay directory")]
    WatchRegister {
        /// Directory that failed registration.
        path: PathBuf,
        /// Underlying notify error.
        source: notify::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Render an error and all of its sources on one line.
#[must_use]
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(rendered, ": {cause}");
        source = cause.source();
    }
    rendered
}
