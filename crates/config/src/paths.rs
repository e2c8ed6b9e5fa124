use std::path::{Path, PathBuf};

use tracing::warn;

/// Name of the per-user data directory under the home directory.
pub const DATA_DIR_NAME: &str = ".skillet";

/// Env var that relocates the data directory.
pub const HOME_ENV: &str = "SKILLET_HOME";

/// The current user's home directory.
///
/// Falls back to `.` when the platform cannot report one.
pub fn home_dir() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().to_path_buf(),
        None => {
            warn!("could not determine home directory, using current directory");
            PathBuf::from(".")
        },
    }
}

/// Per-user data directory: `$SKILLET_HOME` or `~/.skillet`.
pub fn data_dir() -> PathBuf {
    match std::env::var_os(HOME_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir().join(DATA_DIR_NAME),
    }
}

/// Expand a leading `~` against `home`. Other paths are returned unchanged.
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_tilde_prefix() {
        let home = Path::new("/home/dev");
        assert_eq!(
            expand_home("~/.claude/skills", home),
            PathBuf::from("/home/dev/.claude/skills")
        );
        assert_eq!(expand_home("~", home), PathBuf::from("/home/dev"));
    }

    #[test]
    fn leaves_other_paths_alone() {
        let home = Path::new("/home/dev");
        assert_eq!(
            expand_home(".claude/skills", home),
            PathBuf::from(".claude/skills")
        );
        assert_eq!(expand_home("/opt/skills", home), PathBuf::from("/opt/skills"));
        assert_eq!(expand_home("~other/x", home), PathBuf::from("~other/x"));
    }
}
