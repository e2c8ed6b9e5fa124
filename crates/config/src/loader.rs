use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::SkilletConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "skillet.toml",
    "skillet.yaml",
    "skillet.yml",
    "skillet.json",
];

/// Env var overriding `directory.url`.
pub const DIRECTORY_URL_ENV: &str = "SKILLET_DIRECTORY_URL";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<SkilletConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply env
/// overrides.
///
/// Search order:
/// 1. `./skillet.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/skillet/skillet.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SkilletConfig::default()` if no config file is found.
pub fn discover_and_load() -> SkilletConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                SkilletConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            SkilletConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Apply environment overrides using the given lookup.
pub fn apply_env_overrides(config: &mut SkilletConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(DIRECTORY_URL_ENV).filter(|u| !u.trim().is_empty()) {
        debug!(%url, "directory url overridden from environment");
        config.directory.url = url;
    }
}

/// Returns the user-global config directory (`~/.config/skillet/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "skillet").map(|d| d.config_dir().to_path_buf())
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists());
    if local.is_some() {
        return local;
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<SkilletConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
