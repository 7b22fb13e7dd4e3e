//! Status polling for accepted uploads.
//!
//! # Design
//! - One poller task per accepted upload; each queries at a fixed interval, sleeping
//!   before every query, until the service reports a replay id or a query fails.
//! - A failed query ends tracking for that upload; there is no retry or attempt cap.

use std::sync::Arc;
use std::time::Duration;

use rsu_api::{ApiError, ApiResult, ReplayService, ReplayStatus};
use rsu_events::{Event, EventBus};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::error_chain;
use crate::model::UploadRequest;

/// Lifecycle of a single upload's status tracking.
#[derive(Debug)]
pub enum PollState {
    /// Accepted, not queried yet.
    Submitted,
    /// The service reported the replay as still pending.
    Polling {
        /// Queries issued so far.
        attempts: u32,
    },
    /// The service resolved the replay.
    Succeeded {
        /// Queries issued so far.
        attempts: u32,
        /// Identifier of the processed replay.
        replay_id: String,
    },
    /// A query failed.
    Failed {
        /// Queries issued so far.
        attempts: u32,
        /// Error returned by the failing query.
        error: ApiError,
    },
}

impl PollState {
    /// Number of queries issued.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Submitted => 0,
            Self::Polling { attempts }
            | Self::Succeeded { attempts, .. }
            | Self::Failed { attempts, .. } => *attempts,
        }
    }

    /// Whether tracking has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }

    /// Apply one query response. Terminal states are unchanged.
    #[must_use]
    pub fn advance(self, response: ApiResult<ReplayStatus>) -> Self {
        if self.is_terminal() {
            return self;
        }
        let attempts = self.attempts().saturating_add(1);
        match response {
            Ok(ReplayStatus::Pending) => Self::Polling { attempts },
            Ok(ReplayStatus::Processed(replay_id)) => Self::Succeeded {
                attempts,
                replay_id,
            },
            Err(error) => Self::Failed { attempts, error },
        }
    }
}

/// Terminal result of polling one upload.
#[derive(Debug)]
pub enum PollOutcome {
    /// The replay was processed.
    Processed {
        /// Identifier assigned by the service.
        replay_id: String,
        /// Queries issued.
        attempts: u32,
    },
    /// A status query failed and tracking stopped.
    Failed {
        /// Error from the failing query.
        error: ApiError,
        /// Queries issued.
        attempts: u32,
    },
}

impl PollOutcome {
    /// Queries issued before the outcome was reached.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Processed { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Polls the service for one upload at a time.
pub struct StatusPoller {
    service: Arc<dyn ReplayService>,
    events: EventBus,
    interval: Duration,
}

impl StatusPoller {
    /// Poller querying every `interval`.
    #[must_use]
    pub fn new(service: Arc<dyn ReplayService>, events: EventBus, interval: Duration) -> Self {
        Self {
            service,
            events,
            interval,
        }
    }

    /// Track `request` until the service resolves it or a query fails.
    pub async fn poll(&self, request: UploadRequest) -> PollOutcome {
        let mut state = PollState::Submitted;
        loop {
            sleep(self.interval).await;
            let response = self.service.replay_status(&request.rqid).await;
            state = state.advance(response);

            match state {
                PollState::Submitted => {}
                PollState::Polling { attempts } => {
                    debug!(rqid = %request.rqid, map = %request.map, attempts, "replay not processed yet");
                    self.events.publish(Event::StatusPending {
                        rqid: request.rqid.to_string(),
                        attempt: attempts,
                    });
                }
                PollState::Succeeded {
                    attempts,
                    replay_id,
                } => {
                    info!(
                        rqid = %request.rqid,
                        map = %request.map,
                        replay_id = %replay_id,
                        "sc2replaystats processed replay"
                    );
                    self.events.publish(Event::ReplayProcessed {
                        rqid: request.rqid.to_string(),
                        map: request.map.clone(),
                        replay_id: replay_id.clone(),
                    });
                    return PollOutcome::Processed {
                        replay_id,
                        attempts,
                    };
                }
                PollState::Failed { attempts, error } => {
                    let message = error_chain(&error);
                    error!(rqid = %request.rqid, map = %request.map, error = %message, "failed to check replay status");
                    self.events.publish(Event::StatusFailed {
                        rqid: request.rqid.to_string(),
                        map: request.map.clone(),
                        message,
                    });
                    return PollOutcome::Failed { error, attempts };
                }
            }
        }
    }
}

impl std::fmt::Debug for StatusPoller {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StatusPoller")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Spawn a task that starts one poller per request received on `requests`.
///
/// The task ends once the channel closes and every started poller has finished.
#[must_use]
pub fn spawn_poll_dispatcher(
    poller: Arc<StatusPoller>,
    mut requests: mpsc::UnboundedReceiver<UploadRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut active = JoinSet::new();
        loop {
            tokio::select! {
                request = requests.recv() => {
                    let Some(request) = request else { break };
                    let poller = Arc::clone(&poller);
                    active.spawn(async move { poller.poll(request).await });
                }
                Some(joined) = active.join_next(), if !active.is_empty() => {
                    if let Err(err) = joined {
                        warn!(error = %err, "status poller task ended abnormally");
                    }
                }
            }
        }

        while let Some(joined) = active.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "status poller task ended abnormally");
            }
        }
    })
}
