//! Replay directory discovery.
//!
//! # Design
//! - A replays root is an `Accounts` directory directly under a `StarCraft II` directory.
//! - Accounts are laid out as `<numeric account id>/<toon>` where a toon looks like
//!   `2-S2-1-1234567`; each contributes `Replays/Multiplayer` when that directory exists.
//! - The operator prompt is generic over reader and writer so it can be driven from tests.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::error::{PipelineError, PipelineResult};
use crate::model::WatchPath;

const ROOT_DIR_NAME: &str = "Accounts";
const INSTALL_DIR_NAME: &str = "StarCraft II";
const TOON_PATTERN: &str = r"^\d+-S2-\d+-\d+$";
const REPLAYS_DIR: &str = "Replays";
const MULTIPLAYER_DIR: &str = "Multiplayer";

/// Outcome of resolving the directories to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Replays root the watch paths were derived from.
    pub root: PathBuf,
    /// Existing multiplayer replay directories, one per account.
    pub watch_paths: Vec<WatchPath>,
    /// Whether `root` was found by scanning rather than taken from configuration.
    pub discovered: bool,
}

/// Locates replay directories on disk.
#[derive(Debug, Clone)]
pub struct PathResolver {
    scan_root: PathBuf,
    toon: Regex,
}

impl PathResolver {
    /// Resolver that scans from `scan_root` when no usable root is configured.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Pattern`] if the account pattern fails to compile.
    pub fn new(scan_root: impl Into<PathBuf>) -> PipelineResult<Self> {
        let toon = Regex::new(TOON_PATTERN).map_err(|source| PipelineError::Pattern { source })?;
        Ok(Self {
            scan_root: scan_root.into(),
            toon,
        })
    }

    /// Resolver that scans from the user's home directory, or `/` when it is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Pattern`] if the account pattern fails to compile.
    pub fn from_home() -> PipelineResult<Self> {
        Self::new(dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")))
    }

    /// Directory the installation scan starts from.
    #[must_use]
    pub fn scan_root(&self) -> &Path {
        &self.scan_root
    }

    /// Resolve the watch paths, prompting through `input`/`output` when the scan is ambiguous.
    ///
    /// A configured root is used as-is when it is an existing directory; otherwise
    /// the installation scan runs and [`Resolution::discovered`] is set so the
    /// caller can persist the chosen root.
    ///
    /// # Errors
    ///
    /// Fails when no candidate root exists, the filesystem cannot be enumerated,
    /// the prompt is closed, or the chosen root yields no watch paths.
    pub fn resolve<R: BufRead, W: Write>(
        &self,
        configured: Option<&Path>,
        input: R,
        output: W,
    ) -> PipelineResult<Resolution> {
        let (root, discovered) = match configured {
            Some(root) if root.is_dir() => (root.to_path_buf(), false),
            other => {
                if let Some(root) = other {
                    warn!(root = %root.display(), "configured replays root is not a directory, scanning");
                }
                let candidates = self.find_replay_roots()?;
                (choose_root(&candidates, input, output)?, true)
            }
        };

        let watch_paths = self.watch_paths(&root)?;
        if watch_paths.is_empty() {
            return Err(PipelineError::NoWatchPaths { root });
        }
        Ok(Resolution {
            root,
            watch_paths,
            discovered,
        })
    }

    /// Scan below the scan root for installation `Accounts` directories.
    ///
    /// Unreadable subdirectories are skipped; matches are not descended into.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Scan`] when the scan root itself cannot be read and
    /// [`PipelineError::NoCandidateRoots`] when nothing matches.
    pub fn find_replay_roots(&self) -> PipelineResult<Vec<PathBuf>> {
        info!(scan_root = %self.scan_root.display(), "searching for replays directory");
        let mut roots = Vec::new();
        let mut walker = WalkDir::new(&self.scan_root).follow_links(false).into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) if source.depth() == 0 => {
                    return Err(PipelineError::Scan {
                        scan_root: self.scan_root.clone(),
                        source,
                    });
                }
                Err(err) => {
                    trace!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() && is_replay_root(entry.path()) {
                debug!(root = %entry.path().display(), "found replays root candidate");
                roots.push(entry.into_path());
                walker.skip_current_dir();
            }
        }

        if roots.is_empty() {
            return Err(PipelineError::NoCandidateRoots {
                scan_root: self.scan_root.clone(),
            });
        }
        roots.sort();
        Ok(roots)
    }

    /// Account directories (`<root>/<id>/<toon>`) below `root`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] when `root` cannot be listed.
    pub fn enumerate_accounts(&self, root: &Path) -> PipelineResult<Vec<PathBuf>> {
        let mut accounts = Vec::new();
        for account in subdirectories(root)
            .map_err(|source| PipelineError::io("read_replays_root", root, source))?
        {
            if !is_numeric(&account) {
                continue;
            }
            let toons = match subdirectories(&account) {
                Ok(toons) => toons,
                Err(err) => {
                    warn!(path = %account.display(), error = %err, "skipping unreadable account directory");
                    continue;
                }
            };
            accounts.extend(toons.into_iter().filter(|toon| self.is_toon(toon)));
        }
        accounts.sort();
        Ok(accounts)
    }

    /// Existing `Replays/Multiplayer` directories for every account below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] when `root` cannot be listed.
    pub fn watch_paths(&self, root: &Path) -> PipelineResult<Vec<WatchPath>> {
        Ok(self
            .enumerate_accounts(root)?
            .into_iter()
            .map(|account| account.join(REPLAYS_DIR).join(MULTIPLAYER_DIR))
            .filter(|path| path.is_dir())
            .map(WatchPath::new)
            .collect())
    }

    fn is_toon(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.toon.is_match(name))
    }
}

/// Ask the operator to pick one of `candidates`, re-prompting until the answer is valid.
///
/// A single candidate is returned without prompting.
///
/// # Errors
///
/// Returns [`PipelineError::NoCandidateRoots`] for an empty list and
/// [`PipelineError::SelectionAborted`] when `input` closes or the prompt cannot be written.
pub fn choose_root<R: BufRead, W: Write>(
    candidates: &[PathBuf],
    mut input: R,
    mut output: W,
) -> PipelineResult<PathBuf> {
    match candidates {
        [] => {
            return Err(PipelineError::NoCandidateRoots {
                scan_root: PathBuf::new(),
            });
        }
        [only] => return Ok(only.clone()),
        _ => {}
    }

    write_menu(&mut output, candidates).map_err(|_| PipelineError::SelectionAborted)?;
    let mut line = String::new();
    loop {
        write!(output, "Your Choice [1-{}]: ", candidates.len())
            .and_then(|()| output.flush())
            .map_err(|_| PipelineError::SelectionAborted)?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .map_err(|_| PipelineError::SelectionAborted)?;
        if read == 0 {
            return Err(PipelineError::SelectionAborted);
        }

        match line.trim().parse::<usize>() {
            Ok(choice) if (1..=candidates.len()).contains(&choice) => {
                return Ok(candidates[choice - 1].clone());
            }
            _ => debug!(answer = line.trim(), "invalid replays root choice"),
        }
    }
}

fn write_menu<W: Write>(output: &mut W, candidates: &[PathBuf]) -> std::io::Result<()> {
    writeln!(
        output,
        "Found {} possible replays directories. Please choose the one to watch:",
        candidates.len()
    )?;
    for (index, candidate) in candidates.iter().enumerate() {
        writeln!(output, "  [{}] {}", index + 1, candidate.display())?;
    }
    Ok(())
}

fn is_replay_root(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == ROOT_DIR_NAME)
        && path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|name| name == INSTALL_DIR_NAME)
}

fn is_numeric(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| !name.is_empty() && name.bytes().all(|byte| byte.is_ascii_digit()))
}

fn subdirectories(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Cursor;
    use tempfile::TempDir;

    const TOON: &str = "2-S2-1-1234567";

    fn install(base: &Path, account: &str, toon: &str) -> Result<PathBuf> {
        let root = base.join(INSTALL_DIR_NAME).join(ROOT_DIR_NAME);
        let multiplayer = root
            .join(account)
            .join(toon)
            .join(REPLAYS_DIR)
            .join(MULTIPLAYER_DIR);
        fs::create_dir_all(&multiplayer)?;
        Ok(root)
    }

    #[test]
    fn configured_root_skips_scan() -> Result<()> {
        let temp = TempDir::new()?;
        let root = install(temp.path(), "11111", TOON)?;
        let resolver = PathResolver::new("/nonexistent-scan-root")?;

        let resolution = resolver.resolve(Some(&root), Cursor::new(""), Vec::new())?;

        assert!(!resolution.discovered);
        assert_eq!(resolution.root, root);
        assert_eq!(
            resolution.watch_paths,
            vec![WatchPath::new(
                root.join("11111").join(TOON).join("Replays/Multiplayer")
            )]
        );
        Ok(())
    }

    #[test]
    fn invalid_root_falls_back_to_scan() -> Result<()> {
        let temp = TempDir::new()?;
        let root = install(&temp.path().join("Games"), "11111", TOON)?;
        let resolver = PathResolver::new(temp.path())?;

        let resolution = resolver.resolve(
            Some(Path::new("/definitely/not/here")),
            Cursor::new(""),
            Vec::new(),
        )?;

        assert!(resolution.discovered);
        assert_eq!(resolution.root, root);
        Ok(())
    }

    #[test]
    fn accounts_filter_by_layout() -> Result<()> {
        let temp = TempDir::new()?;
        let root = install(temp.path(), "11111", TOON)?;
        install(temp.path(), "11111", "3-S2-2-99")?;
        fs::create_dir_all(root.join("11111").join("Cache"))?;
        fs::create_dir_all(root.join("notes").join(TOON))?;
        fs::create_dir_all(root.join("22222").join("1-S2-1-5"))?;

        let resolver = PathResolver::new(temp.path())?;
        let accounts = resolver.enumerate_accounts(&root)?;
        assert_eq!(
            accounts,
            vec![
                root.join("11111").join(TOON),
                root.join("11111").join("3-S2-2-99"),
                root.join("22222").join("1-S2-1-5"),
            ]
        );

        // The last account has no multiplayer folder.
        assert_eq!(resolver.watch_paths(&root)?.len(), 2);
        Ok(())
    }

    #[test]
    fn scan_without_install_is_an_error() -> Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir_all(temp.path().join("Documents").join(ROOT_DIR_NAME))?;
        let resolver = PathResolver::new(temp.path())?;

        assert!(matches!(
            resolver.find_replay_roots(),
            Err(PipelineError::NoCandidateRoots { .. })
        ));
        Ok(())
    }

    #[test]
    fn unreadable_scan_root_is_an_error() -> Result<()> {
        let resolver = PathResolver::new("/definitely/not/a/scan/root")?;
        assert!(matches!(
            resolver.find_replay_roots(),
            Err(PipelineError::Scan { .. })
        ));
        Ok(())
    }

    #[test]
    fn root_without_multiplayer_folders_is_rejected() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path().join(INSTALL_DIR_NAME).join(ROOT_DIR_NAME);
        fs::create_dir_all(root.join("11111").join(TOON))?;
        let resolver = PathResolver::new(temp.path())?;

        assert!(matches!(
            resolver.resolve(Some(&root), Cursor::new(""), Vec::new()),
            Err(PipelineError::NoWatchPaths { .. })
        ));
        Ok(())
    }

    #[test]
    fn prompt_repeats_until_valid_choice() -> Result<()> {
        let candidates = vec![PathBuf::from("/a/Accounts"), PathBuf::from("/b/Accounts")];
        let mut output = Vec::new();

        let chosen = choose_root(&candidates, Cursor::new("zero\n7\n2\n"), &mut output)?;

        assert_eq!(chosen, PathBuf::from("/b/Accounts"));
        let transcript = String::from_utf8(output)?;
        assert_eq!(transcript.matches("Your Choice [1-2]: ").count(), 3);
        assert!(transcript.contains("[1] /a/Accounts"));
        Ok(())
    }

    #[test]
    fn prompt_eof_aborts() {
        let candidates = vec![PathBuf::from("/a/Accounts"), PathBuf::from("/b/Accounts")];
        assert!(matches!(
            choose_root(&candidates, Cursor::new("nope\n"), Vec::new()),
            Err(PipelineError::SelectionAborted)
        ));
    }

    #[test]
    fn single_candidate_needs_no_prompt() -> Result<()> {
        let mut output = Vec::new();
        let chosen = choose_root(&[PathBuf::from("/only/Accounts")], Cursor::new(""), &mut output)?;
        assert_eq!(chosen, PathBuf::from("/only/Accounts"));
        assert!(output.is_empty());
        Ok(())
    }
}
