//! Config schema types (directory listing, install defaults, agent overrides).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default location of the public skill directory listing.
pub const DEFAULT_DIRECTORY_URL: &str = "https://skillet.dev/directory.json";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkilletConfig {
    pub directory: DirectoryConfig,
    pub install: InstallConfig,
    /// Per-agent overrides keyed by agent id. Unknown ids add new agents.
    pub agents: BTreeMap<String, AgentOverride>,
}

/// Directory-listing client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub url: String,
    /// Request timeout. Defaults to 5 seconds.
    pub timeout_secs: u64,
    /// How long a successful fetch is served from cache. Defaults to 5 minutes.
    pub cache_ttl_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DIRECTORY_URL.into(),
            timeout_secs: 5,
            cache_ttl_secs: 300,
        }
    }
}

/// Defaults applied when installing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Branch used when a source does not name one. Defaults to `main`.
    pub default_branch: String,
    /// Deploy through central storage + symlinks instead of copying.
    pub symlink: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".into(),
            symlink: false,
        }
    }
}

/// Overrides for one agent entry. Every field is optional; unset fields keep
/// the built-in value. New agents must set at least `skills_dir` and
/// `global_skills_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOverride {
    /// Set to `false` to drop a built-in agent.
    pub enabled: bool,
    pub display_name: Option<String>,
    pub skills_dir: Option<String>,
    pub global_skills_dir: Option<String>,
    pub commands_dir: Option<String>,
    pub global_commands_dir: Option<String>,
    pub install_dir: Option<String>,
}

impl Default for AgentOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            display_name: None,
            skills_dir: None,
            global_skills_dir: None,
            commands_dir: None,
            global_commands_dir: None,
            install_dir: None,
        }
    }
}
