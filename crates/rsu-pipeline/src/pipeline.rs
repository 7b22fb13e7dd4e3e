//! Supervisor wiring watcher, stability detector, orchestrator and pollers.
//!
//! # Design
//! - Each candidate gets its own task; a path already being detected or uploaded is
//!   not dispatched again until that task finishes.
//! - Accepted uploads travel to the poll dispatcher over a channel.
//! - Shutdown closes the watcher and stops dispatching; tasks already running are
//!   abandoned with the runtime.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rsu_api::ReplayService;
use rsu_config::PipelineSettings;
use rsu_events::{Event, EventBus};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PipelineResult;
use crate::model::{CandidateFile, UploadRequest, WatchPath};
use crate::poller::{StatusPoller, spawn_poll_dispatcher};
use crate::stability::{FsProbe, SizeProbe, StabilityPolicy, wait_until_stable};
use crate::upload::UploadOrchestrator;
use crate::watcher::{DirectoryWatcher, ReplayFilter, WatchMessage};

/// Collaborators the pipeline is built from.
pub struct PipelineDeps {
    /// Remote analytics service.
    pub service: Arc<dyn ReplayService>,
    /// Bus receiving every pipeline event.
    pub events: EventBus,
    /// Timing and filtering configuration.
    pub settings: PipelineSettings,
}

/// Paths with a detection or upload in progress.
#[derive(Debug, Clone, Default)]
struct InFlight {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlight {
    fn claim(&self, path: &Path) -> Option<InFlightClaim> {
        let inserted = self
            .paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf());
        inserted.then(|| InFlightClaim {
            paths: Arc::clone(&self.paths),
            path: path.to_path_buf(),
        })
    }
}

/// Releases its path when dropped.
struct InFlightClaim {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

#[derive(Clone)]
struct Dispatcher {
    probe: Arc<dyn SizeProbe>,
    policy: StabilityPolicy,
    orchestrator: Arc<UploadOrchestrator>,
    events: EventBus,
    in_flight: InFlight,
}

impl Dispatcher {
    fn dispatch(&self, candidate: CandidateFile) -> Option<JoinHandle<()>> {
        let Some(claim) = self.in_flight.claim(&candidate.path) else {
            debug!(path = %candidate.path.display(), "replay already in progress");
            return None;
        };

        info!(path = %candidate.path.display(), "new replay detected");
        self.events.publish(Event::ReplayDetected {
            path: candidate.path.display().to_string(),
        });

        let this = self.clone();
        Some(tokio::spawn(async move {
            let _claim = claim;
            let stable = wait_until_stable(this.probe.as_ref(), candidate, &this.policy).await;
            debug!(
                path = %stable.path.display(),
                size_bytes = stable.size_bytes,
                samples = stable.samples,
                "replay finished writing"
            );
            this.events.publish(Event::ReplayStable {
                path: stable.path.display().to_string(),
                size_bytes: stable.size_bytes,
            });
            this.orchestrator.submit(stable).await;
        }))
    }
}

/// Replay detection and upload pipeline.
pub struct ReplayPipeline {
    dispatcher: Dispatcher,
    filter: ReplayFilter,
    poller: Arc<StatusPoller>,
    requests: mpsc::UnboundedReceiver<UploadRequest>,
}

impl ReplayPipeline {
    /// Build a pipeline that samples file sizes from the filesystem.
    #[must_use]
    pub fn new(deps: PipelineDeps) -> Self {
        let PipelineDeps {
            service,
            events,
            settings,
        } = deps;
        let (handoff, requests) = mpsc::unbounded_channel();
        let orchestrator = Arc::new(UploadOrchestrator::new(
            Arc::clone(&service),
            events.clone(),
            handoff,
        ));
        let poller = Arc::new(StatusPoller::new(
            service,
            events.clone(),
            settings.status_interval(),
        ));

        Self {
            dispatcher: Dispatcher {
                probe: Arc::new(FsProbe),
                policy: StabilityPolicy::from_settings(&settings),
                orchestrator,
                events,
                in_flight: InFlight::default(),
            },
            filter: ReplayFilter::new(settings.replay_suffix),
            poller,
            requests,
        }
    }

    /// Replace the size source used by the stability detector.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn SizeProbe>) -> Self {
        self.dispatcher.probe = probe;
        self
    }

    /// Watch `paths` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Fails when the watcher cannot be created or a path cannot be registered.
    pub async fn run<F>(self, paths: &[WatchPath], shutdown: F) -> PipelineResult<()>
    where
        F: Future<Output = ()>,
    {
        let (watcher, messages) = DirectoryWatcher::start(paths)?;
        let events = self.dispatcher.events.clone();
        events.publish(Event::WatchStarted {
            paths: paths.iter().map(ToString::to_string).collect(),
        });
        info!(paths = paths.len(), "watching for new replays");

        let handle = self.spawn(messages);
        shutdown.await;

        info!("shutting down replay watcher");
        watcher.close();
        if let Err(err) = handle.await {
            warn!(error = %err, "replay event loop ended abnormally");
        }
        Ok(())
    }

    /// Drive the pipeline from `messages` on a background task.
    ///
    /// The task returns once `messages` closes; detection, upload and polling
    /// tasks it started keep running.
    #[must_use]
    pub fn spawn(self, mut messages: mpsc::UnboundedReceiver<WatchMessage>) -> JoinHandle<()> {
        let Self {
            dispatcher,
            filter,
            poller,
            requests,
        } = self;
        drop(spawn_poll_dispatcher(poller, requests));

        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                match message {
                    WatchMessage::Event(event) => {
                        for candidate in filter.candidates(&event) {
                            drop(dispatcher.dispatch(candidate));
                        }
                    }
                    WatchMessage::Error(message) => {
                        warn!(error = %message, "fswatcher error");
                        dispatcher.events.publish(Event::WatchError { message });
                    }
                }
            }
            debug!("replay watcher channel closed");
        })
    }
}

impl std::fmt::Debug for ReplayPipeline {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ReplayPipeline")
            .field("filter", &self.filter)
            .field("policy", &self.dispatcher.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_are_exclusive_until_dropped() {
        let in_flight = InFlight::default();
        let path = Path::new("/m/Equilibrium LE.SC2Replay");

        let claim = in_flight.claim(path);
        assert!(claim.is_some());
        assert!(in_flight.claim(path).is_none());
        assert!(in_flight.claim(Path::new("/m/other.SC2Replay")).is_some());

        drop(claim);
        assert!(in_flight.claim(path).is_some());
    }
}
