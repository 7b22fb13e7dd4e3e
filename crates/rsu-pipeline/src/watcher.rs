//! Filesystem change subscription for replay directories.
//!
//! The notify backend runs its callback on its own thread; messages are forwarded
//! into an unbounded tokio channel that the pipeline drains. Dropping the
//! [`DirectoryWatcher`] closes the subscription and, with it, the channel.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::model::{CandidateFile, WatchPath};

/// Message delivered from the notification backend.
#[derive(Debug)]
pub enum WatchMessage {
    /// A filesystem event for one of the watched directories.
    Event(Event),
    /// A backend error; the subscription keeps running.
    Error(String),
}

/// Active subscription on a set of replay directories.
pub struct DirectoryWatcher {
    inner: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DirectoryWatcher")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Subscribe to every path in `paths`, non-recursively.
    ///
    /// # Errors
    ///
    /// Fails when the backend cannot be created or any path cannot be registered.
    pub fn start(
        paths: &[WatchPath],
    ) -> PipelineResult<(Self, mpsc::UnboundedReceiver<WatchMessage>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                let message = match result {
                    Ok(event) => WatchMessage::Event(event),
                    Err(err) => WatchMessage::Error(err.to_string()),
                };
                // The receiver is gone once the pipeline has shut down.
                let _ = tx.send(message);
            },
            Config::default(),
        )
        .map_err(|source| PipelineError::WatchInit { source })?;

        let mut watcher = Self {
            inner,
            watched: Vec::with_capacity(paths.len()),
        };
        for path in paths {
            watcher.add(path.as_path())?;
        }
        Ok((watcher, rx))
    }

    /// Add another directory to the subscription.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::WatchRegister`] when the backend rejects `path`.
    pub fn add(&mut self, path: &Path) -> PipelineResult<()> {
        self.inner
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| PipelineError::WatchRegister {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "watching replays directory");
        self.watched.push(path.to_path_buf());
        Ok(())
    }

    /// Directories currently registered.
    #[must_use]
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Close the subscription; the message channel ends once buffered messages drain.
    pub fn close(self) {
        debug!(paths = self.watched.len(), "closing replay directory watcher");
        drop(self.inner);
    }
}

/// Keeps create and rename-into notifications whose file name ends with a configured suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFilter {
    suffix: String,
}

impl ReplayFilter {
    /// Filter matching names that end with `suffix`.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Whether `path` names a replay file.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(&self.suffix))
    }

    /// Candidate replays carried by `event`.
    ///
    /// Creations qualify for every path they carry. Renames qualify for their
    /// destination only, so a staging file renamed onto a replay name is picked up.
    #[must_use]
    pub fn candidates(&self, event: &Event) -> Vec<CandidateFile> {
        let paths: Vec<&PathBuf> = match event.kind {
            EventKind::Create(_) => event.paths.iter().collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                event.paths.first().into_iter().collect()
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                event.paths.last().into_iter().collect()
            }
            _ => return Vec::new(),
        };
        paths
            .into_iter()
            .filter(|path| self.matches(path))
            .map(CandidateFile::new)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use notify::event::{CreateKind, RemoveKind};
    use std::time::Duration;
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_creations_with_suffix_are_candidates() {
        let filter = ReplayFilter::new("eplay");
        let create = EventKind::Create(CreateKind::File);

        assert_eq!(
            filter.candidates(&event(create, "/m/Equilibrium LE.SC2Replay")),
            vec![CandidateFile::new("/m/Equilibrium LE.SC2Replay")]
        );
        assert!(filter.candidates(&event(create, "/m/notes.txt")).is_empty());
        assert!(
            filter
                .candidates(&event(create, "/m/Equilibrium LE.SC2Replay.writeCacheBackup"))
                .is_empty()
        );
        assert!(
            filter
                .candidates(&event(EventKind::Modify(ModifyKind::Any), "/m/a.SC2Replay"))
                .is_empty()
        );
        assert!(
            filter
                .candidates(&event(EventKind::Remove(RemoveKind::File), "/m/a.SC2Replay"))
                .is_empty()
        );
    }

    #[test]
    fn renames_onto_a_replay_name_are_candidates() {
        let filter = ReplayFilter::new("eplay");
        let staged = "/m/Oceanborn LE.SC2Replay.writeCacheBackup";
        let replay = "/m/Oceanborn LE.SC2Replay";

        let rename_to = EventKind::Modify(ModifyKind::Name(RenameMode::To));
        assert_eq!(
            filter.candidates(&event(rename_to, replay)),
            vec![CandidateFile::new(replay)]
        );

        let both = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from(staged))
            .add_path(PathBuf::from(replay));
        assert_eq!(filter.candidates(&both), vec![CandidateFile::new(replay)]);

        let rename_from = EventKind::Modify(ModifyKind::Name(RenameMode::From));
        assert!(filter.candidates(&event(rename_from, replay)).is_empty());

        let moved_away = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from(replay))
            .add_path(PathBuf::from("/m/archive.zip"));
        assert!(filter.candidates(&moved_away).is_empty());
    }

    #[test]
    fn missing_directory_fails_registration() {
        let result = DirectoryWatcher::start(&[WatchPath::new("/definitely/not/watched")]);
        assert!(matches!(result, Err(PipelineError::WatchRegister { .. })));
    }

    #[tokio::test]
    async fn created_files_are_forwarded() -> Result<()> {
        let temp = TempDir::new()?;
        let (watcher, mut rx) = DirectoryWatcher::start(&[WatchPath::new(temp.path())])?;
        assert_eq!(watcher.watched(), &[temp.path().to_path_buf()]);

        let replay = temp.path().join("Oceanborn LE.SC2Replay");
        std::fs::write(&replay, b"replay")?;

        let filter = ReplayFilter::new("eplay");
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(message) = rx.recv().await {
                if let WatchMessage::Event(event) = message
                    && !filter.candidates(&event).is_empty()
                {
                    return true;
                }
            }
            false
        })
        .await?;
        assert!(found);

        watcher.close();
        Ok(())
    }

    #[tokio::test]
    async fn renamed_files_are_forwarded() -> Result<()> {
        let temp = TempDir::new()?;
        let staged = temp.path().join("Oceanborn LE.SC2Replay.writeCacheBackup");
        std::fs::write(&staged, vec![0_u8; 40_000])?;

        let (watcher, mut rx) = DirectoryWatcher::start(&[WatchPath::new(temp.path())])?;
        let replay = temp.path().join("Oceanborn LE.SC2Replay");
        std::fs::rename(&staged, &replay)?;

        let filter = ReplayFilter::new("eplay");
        let found = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(message) = rx.recv().await {
                if let WatchMessage::Event(event) = message
                    && filter
                        .candidates(&event)
                        .iter()
                        .any(|candidate| candidate.path == replay)
                {
                    return true;
                }
            }
            false
        })
        .await?;
        assert!(found);

        watcher.close();
        Ok(())
    }
}
