//! Submits stable replays and hands accepted uploads to the status poller.

use std::sync::Arc;

use rsu_api::{ReplayService, RequestId};
use rsu_events::{Event, EventBus};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::error_chain;
use crate::model::{StableReplay, UploadRequest};
use crate::naming::display_name;

/// Uploads one replay per call and forwards the resulting request identifier.
pub struct UploadOrchestrator {
    service: Arc<dyn ReplayService>,
    events: EventBus,
    handoff: mpsc::UnboundedSender<UploadRequest>,
}

impl UploadOrchestrator {
    /// Orchestrator that forwards accepted uploads on `handoff`.
    #[must_use]
    pub fn new(
        service: Arc<dyn ReplayService>,
        events: EventBus,
        handoff: mpsc::UnboundedSender<UploadRequest>,
    ) -> Self {
        Self {
            service,
            events,
            handoff,
        }
    }

    /// Upload `replay` once; failures are logged and published, never retried.
    ///
    /// Returns the request identifier when the service accepted the upload.
    pub async fn submit(&self, replay: StableReplay) -> Option<RequestId> {
        let map = display_name(&replay.path);
        debug!(map = %map, size_bytes = replay.size_bytes, "uploading replay");

        match self.service.upload_replay(&replay.path).await {
            Ok(rqid) => {
                info!(rqid = %rqid, map = %map, "sc2replaystats accepted replay");
                self.events.publish(Event::UploadAccepted {
                    rqid: rqid.to_string(),
                    map: map.clone(),
                });
                let request = UploadRequest {
                    rqid: rqid.clone(),
                    map,
                    path: replay.path,
                };
                if self.handoff.send(request).is_err() {
                    warn!(rqid = %rqid, "status poller stopped; processing will not be tracked");
                }
                Some(rqid)
            }
            Err(err) => {
                let message = error_chain(&err);
                error!(map = %map, error = %message, "failed to upload replay");
                self.events.publish(Event::UploadFailed { map, message });
                None
            }
        }
    }
}

impl std::fmt::Debug for UploadOrchestrator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("UploadOrchestrator")
            .finish_non_exhaustive()
    }
}
