//! Write-completion detection for newly created replays.
//!
//! # Design
//! - The game writes replays incrementally; a file is complete once it exceeds the
//!   minimum replay size and a sample shows no growth since the previous one.
//! - Samples that fail or sit at or below the minimum are ignored, so detection has
//!   no deadline. Callers that need one wrap [`wait_until_stable`] in a timeout.
//! - Time comes from `tokio::time`, so paused-clock tests drive the sampling loop.

use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use rsu_config::PipelineSettings;
use tokio::time::sleep;
use tracing::trace;

use crate::model::{CandidateFile, StableReplay};

/// Source of file sizes for the detector.
#[async_trait]
pub trait SizeProbe: Send + Sync {
    /// Current size of the file at `path`.
    async fn size(&self, path: &Path) -> io::Result<u64>;
}

/// Probe backed by filesystem metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

#[async_trait]
impl SizeProbe for FsProbe {
    async fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }
}

/// Sampling cadence and size threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityPolicy {
    /// Delay before each sample.
    pub interval: Duration,
    /// A file must be strictly larger than this before it can be stable.
    pub min_bytes: u64,
}

impl StabilityPolicy {
    /// Policy from pipeline settings.
    #[must_use]
    pub const fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            interval: settings.stability_interval(),
            min_bytes: settings.min_replay_bytes,
        }
    }
}

/// Classification of one size sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// The size could not be read.
    Unavailable,
    /// At or below the minimum replay size.
    BelowThreshold(u64),
    /// Larger than every earlier sample.
    Growing(u64),
    /// Above the threshold and not larger than the previous maximum.
    Stable(u64),
}

/// Tracks the largest size seen above the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityTracker {
    min_bytes: u64,
    last_size: u64,
}

impl StabilityTracker {
    /// Tracker with no samples recorded.
    #[must_use]
    pub const fn new(min_bytes: u64) -> Self {
        Self {
            min_bytes,
            last_size: 0,
        }
    }

    /// Largest size recorded so far.
    #[must_use]
    pub const fn last_size(&self) -> u64 {
        self.last_size
    }

    /// Feed one sample; `None` means the size could not be read.
    pub fn observe(&mut self, size: Option<u64>) -> Sample {
        match size {
            None => Sample::Unavailable,
            Some(size) if size <= self.min_bytes => Sample::BelowThreshold(size),
            Some(size) if size > self.last_size => {
                self.last_size = size;
                Sample::Growing(size)
            }
            Some(size) => Sample::Stable(size),
        }
    }
}

/// Sampling loop for one candidate; each [`step`](Self::step) waits one interval.
#[derive(Debug)]
pub struct StabilitySampler<'a, P: ?Sized> {
    probe: &'a P,
    candidate: CandidateFile,
    policy: StabilityPolicy,
    tracker: StabilityTracker,
    samples: u32,
}

impl<'a, P> StabilitySampler<'a, P>
where
    P: SizeProbe + ?Sized,
{
    /// Sampler for `candidate` with no samples taken.
    #[must_use]
    pub const fn new(probe: &'a P, candidate: CandidateFile, policy: StabilityPolicy) -> Self {
        Self {
            probe,
            candidate,
            tracker: StabilityTracker::new(policy.min_bytes),
            policy,
            samples: 0,
        }
    }

    /// Samples taken so far.
    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    /// Sleep one interval, take a sample and return the replay if it is now stable.
    pub async fn step(&mut self) -> Option<StableReplay> {
        sleep(self.policy.interval).await;
        self.samples = self.samples.saturating_add(1);

        let path = &self.candidate.path;
        let size = match self.probe.size(path).await {
            Ok(size) => Some(size),
            Err(err) => {
                trace!(path = %path.display(), error = %err, "replay size unavailable");
                None
            }
        };

        match self.tracker.observe(size) {
            Sample::Stable(size_bytes) => Some(StableReplay {
                path: path.clone(),
                size_bytes,
                samples: self.samples,
            }),
            sample => {
                trace!(path = %path.display(), ?sample, "replay still being written");
                None
            }
        }
    }
}

/// Sample `candidate` every `policy.interval` until it is stable, with no deadline.
///
/// The first sample is taken one interval after the call.
pub async fn wait_until_stable<P>(
    probe: &P,
    candidate: CandidateFile,
    policy: &StabilityPolicy,
) -> StableReplay
where
    P: SizeProbe + ?Sized,
{
    let mut sampler = StabilitySampler::new(probe, candidate, *policy);
    loop {
        if let Some(stable) = sampler.step().await {
            return stable;
        }
    }
}

/// Like [`wait_until_stable`], but gives up after `max_samples` samples.
pub async fn wait_until_stable_within<P>(
    probe: &P,
    candidate: CandidateFile,
    policy: &StabilityPolicy,
    max_samples: u32,
) -> Option<StableReplay>
where
    P: SizeProbe + ?Sized,
{
    let mut sampler = StabilitySampler::new(probe, candidate, *policy);
    while sampler.samples() < max_samples {
        if let Some(stable) = sampler.step().await {
            return Some(stable);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::{Instant, timeout};

    const MIN: u64 = 26 * 1024;

    /// Replays a fixed sequence of sizes, repeating the last one forever.
    struct ScriptedProbe {
        sizes: Mutex<VecDeque<io::Result<u64>>>,
        last: Mutex<Option<u64>>,
    }

    impl ScriptedProbe {
        fn new(sizes: Vec<io::Result<u64>>) -> Self {
            Self {
                sizes: Mutex::new(sizes.into()),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl SizeProbe for ScriptedProbe {
        async fn size(&self, _path: &Path) -> io::Result<u64> {
            let next = self.sizes.lock().expect("probe lock").pop_front();
            let mut last = self.last.lock().expect("probe lock");
            match next {
                Some(Ok(size)) => {
                    *last = Some(size);
                    Ok(size)
                }
                Some(Err(err)) => Err(err),
                None => last.ok_or_else(|| io::Error::from(io::ErrorKind::NotFound)),
            }
        }
    }

    fn policy() -> StabilityPolicy {
        StabilityPolicy {
            interval: Duration::from_millis(250),
            min_bytes: MIN,
        }
    }

    #[test]
    fn tracker_requires_strictly_more_than_threshold() {
        let mut tracker = StabilityTracker::new(MIN);
        assert_eq!(tracker.observe(Some(MIN)), Sample::BelowThreshold(MIN));
        assert_eq!(tracker.observe(Some(MIN)), Sample::BelowThreshold(MIN));
        assert_eq!(tracker.observe(Some(MIN + 1)), Sample::Growing(MIN + 1));
        assert_eq!(tracker.observe(Some(MIN + 1)), Sample::Stable(MIN + 1));
    }

    #[test]
    fn tracker_ignores_failures_and_small_samples() {
        let mut tracker = StabilityTracker::new(MIN);
        assert_eq!(tracker.observe(Some(40_000)), Sample::Growing(40_000));
        assert_eq!(tracker.observe(None), Sample::Unavailable);
        assert_eq!(tracker.observe(Some(10)), Sample::BelowThreshold(10));
        assert_eq!(tracker.last_size(), 40_000);
        assert_eq!(tracker.observe(Some(39_000)), Sample::Stable(39_000));
    }

    #[tokio::test(start_paused = true)]
    async fn detects_stability_after_growth_stops() {
        let probe = ScriptedProbe::new(vec![
            Ok(10_000),
            Ok(30_000),
            Err(io::Error::other("locked")),
            Ok(40_960),
            Ok(40_960),
        ]);
        let started = Instant::now();

        let stable = wait_until_stable(
            &probe,
            CandidateFile::new("/m/Oceanborn LE.SC2Replay"),
            &policy(),
        )
        .await;

        assert_eq!(stable.size_bytes, 40_960);
        assert_eq!(stable.samples, 5);
        assert_eq!(started.elapsed(), Duration::from_millis(5 * 250));
    }

    #[tokio::test(start_paused = true)]
    async fn file_at_threshold_never_stabilizes() {
        let probe = ScriptedProbe::new(vec![Ok(MIN)]);
        let outcome = timeout(
            Duration::from_secs(60),
            wait_until_stable(&probe, CandidateFile::new("/m/tiny.SC2Replay"), &policy()),
        )
        .await;
        assert!(outcome.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_sampling_gives_up_below_threshold() {
        let probe = ScriptedProbe::new(vec![Ok(1_024), Ok(20_000), Ok(MIN)]);
        let started = Instant::now();

        let outcome = wait_until_stable_within(
            &probe,
            CandidateFile::new("/m/short.SC2Replay"),
            &policy(),
            8,
        )
        .await;

        assert_eq!(outcome, None);
        assert_eq!(started.elapsed(), Duration::from_millis(8 * 250));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_sampling_returns_stable_replay() {
        let probe = ScriptedProbe::new(vec![Ok(30_000), Ok(30_000)]);
        let outcome = wait_until_stable_within(
            &probe,
            CandidateFile::new("/m/done.SC2Replay"),
            &policy(),
            8,
        )
        .await;

        assert_eq!(outcome.map(|stable| stable.samples), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_file_is_retried_indefinitely() {
        let probe = ScriptedProbe::new(Vec::new());
        let outcome = timeout(
            Duration::from_secs(60),
            wait_until_stable(&probe, CandidateFile::new("/m/gone.SC2Replay"), &policy()),
        )
        .await;
        assert!(outcome.is_err());
    }
}
