//! Contract between the pipeline and the remote analytics service.

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use async_trait::async_trait;

use crate::error::ApiResult;

/// Opaque identifier returned by the service for an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RequestId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Current verdict of the service for a submitted replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStatus {
    /// Not processed yet; ask again later.
    Pending,
    /// Processing finished; carries the resolved replay identifier.
    Processed(String),
}

impl ReplayStatus {
    /// Build a status from the raw resolved value, where empty means pending.
    #[must_use]
    pub fn from_resolved(value: Option<String>) -> Self {
        match value {
            Some(value) if !value.trim().is_empty() => Self::Processed(value),
            _ => Self::Pending,
        }
    }
}

/// Remote analytics service used by the upload orchestrator and status poller.
///
/// Implementations must tolerate concurrent calls from many tasks.
#[async_trait]
pub trait ReplayService: Send + Sync {
    /// Submit the replay at `path`, reading its bytes at call time.
    async fn upload_replay(&self, path: &Path) -> ApiResult<RequestId>;

    /// Query the processing status of a previously accepted upload.
    async fn replay_status(&self, rqid: &RequestId) -> ApiResult<ReplayStatus>;
}
