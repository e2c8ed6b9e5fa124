//! Configuration: the agent table, config-file loading, and home/data dirs.
//!
//! Config files: `skillet.toml`, `skillet.yaml`, or `skillet.json`
//! Searched in `./` then `~/.config/skillet/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod agents;
pub mod env_subst;
pub mod loader;
pub mod paths;
pub mod schema;

pub use {
    agents::{AgentConfig, AgentRegistry},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    paths::{DATA_DIR_NAME, HOME_ENV, data_dir, expand_home, home_dir},
    schema::{AgentOverride, DirectoryConfig, InstallConfig, SkilletConfig},
};
