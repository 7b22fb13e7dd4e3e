//! Path splitting used to derive operator-facing replay names.

use std::path::{Path, PathBuf};

/// Split `path` into its directory, file stem and extension (without the dot).
///
/// Missing components come back empty.
#[must_use]
pub fn split_filepath(path: &Path) -> (PathBuf, String, String) {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, stem, ext)
}

/// Name used in logs and events for a replay; the game names replay files after the map.
#[must_use]
pub fn display_name(path: &Path) -> String {
    let (_, stem, _) = split_filepath(path);
    if stem.is_empty() {
        path.display().to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_replay_path() {
        let (dir, stem, ext) =
            split_filepath(Path::new("/Accounts/1/2-S2-1-3/Replays/Multiplayer/Equilibrium LE (2).SC2Replay"));
        assert_eq!(dir, Path::new("/Accounts/1/2-S2-1-3/Replays/Multiplayer"));
        assert_eq!(stem, "Equilibrium LE (2)");
        assert_eq!(ext, "SC2Replay");
    }

    #[test]
    fn backup_files_keep_inner_extension_in_stem() {
        let (_, stem, ext) = split_filepath(Path::new("Goldenaura LE.SC2Replay.writeCacheBackup"));
        assert_eq!(stem, "Goldenaura LE.SC2Replay");
        assert_eq!(ext, "writeCacheBackup");
    }

    #[test]
    fn display_name_falls_back_to_full_path() {
        assert_eq!(display_name(Path::new("Oceanborn LE.SC2Replay")), "Oceanborn LE");
        assert_eq!(display_name(Path::new("/")), "/");
    }
}
