//! Filesystem layout: scope roots, lockfile locations, central storage and
//! per-agent target paths.

use std::path::{Path, PathBuf};

use skillet_config::{AgentConfig, DATA_DIR_NAME};

use crate::types::{AssetKind, Scope};

/// Name of the lockfile in both scopes.
pub const LOCKFILE_NAME: &str = "skills.lock";

/// Central storage for symlink deployments, relative to a scope root.
pub const STORAGE_DIR: &str = ".agents";

/// Extension of command manifests.
pub const COMMAND_EXT: &str = "md";

/// The directories every path is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    /// User home; `~` in agent paths expands against it.
    pub home: PathBuf,
    /// Global scope root (`~/.skillet` unless relocated).
    pub data: PathBuf,
    /// Project scope root.
    pub project: PathBuf,
}

impl Roots {
    pub fn new(home: impl Into<PathBuf>, project: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            data: home.join(DATA_DIR_NAME),
            home,
            project: project.into(),
        }
    }

    /// Roots for the running process: real home, `$SKILLET_HOME` or
    /// `~/.skillet`, and the current directory.
    pub fn detect() -> std::io::Result<Self> {
        Ok(Self {
            home: skillet_config::home_dir(),
            data: skillet_config::data_dir(),
            project: std::env::current_dir()?,
        })
    }

    pub fn scope_root(&self, scope: Scope) -> &Path {
        match scope {
            Scope::Global => &self.data,
            Scope::Project => &self.project,
        }
    }

    pub fn lockfile_path(&self, scope: Scope) -> PathBuf {
        self.scope_root(scope).join(LOCKFILE_NAME)
    }

    /// `<scope root>/.agents/skills` or `<scope root>/.agents/commands`.
    pub fn storage_dir(&self, scope: Scope, kind: AssetKind) -> PathBuf {
        let sub = match kind {
            AssetKind::Skill => "skills",
            AssetKind::Command => "commands",
        };
        self.scope_root(scope).join(STORAGE_DIR).join(sub)
    }

    /// Where the central copy of `name` lives.
    pub fn storage_path(&self, scope: Scope, kind: AssetKind, name: &str) -> PathBuf {
        self.storage_dir(scope, kind).join(file_name(kind, name))
    }

    /// The agent's skills or commands directory for `scope`, if it has one.
    pub fn agent_dir(&self, agent: &AgentConfig, scope: Scope, kind: AssetKind) -> Option<PathBuf> {
        match (kind, scope) {
            (AssetKind::Skill, Scope::Global) => Some(agent.global_skills_dir(&self.home)),
            (AssetKind::Skill, Scope::Project) => Some(agent.project_skills_dir(&self.project)),
            (AssetKind::Command, Scope::Global) => agent.global_commands_dir(&self.home),
            (AssetKind::Command, Scope::Project) => agent.project_commands_dir(&self.project),
        }
    }

    /// Deployment target for `name` inside the agent's directory.
    pub fn target_path(
        &self,
        agent: &AgentConfig,
        scope: Scope,
        kind: AssetKind,
        name: &str,
    ) -> Option<PathBuf> {
        self.agent_dir(agent, scope, kind)
            .map(|dir| dir.join(file_name(kind, name)))
    }
}

fn file_name(kind: AssetKind, name: &str) -> String {
    match kind {
        AssetKind::Skill => name.to_string(),
        AssetKind::Command => format!("{name}.{COMMAND_EXT}"),
    }
}
