//! The table of supported coding agents and where each one reads skills and
//! commands from.
//!
//! Project paths are relative to a project root; global paths start with `~`
//! and are expanded against the user's home directory at lookup time.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    paths::expand_home,
    schema::{AgentOverride, SkilletConfig},
};

/// Static description of one agent's on-disk layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Stable identifier, e.g. `claude-code`.
    pub id: String,
    pub display_name: String,
    /// Project-relative skills directory.
    pub skills_dir: String,
    /// Home-relative skills directory (`~/...`).
    pub global_skills_dir: String,
    pub commands_dir: Option<String>,
    pub global_commands_dir: Option<String>,
    /// Directory whose presence means the agent is installed.
    pub install_dir: String,
}

impl AgentConfig {
    pub fn project_skills_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.skills_dir)
    }

    pub fn global_skills_dir(&self, home: &Path) -> PathBuf {
        expand_home(&self.global_skills_dir, home)
    }

    pub fn project_commands_dir(&self, project_root: &Path) -> Option<PathBuf> {
        self.commands_dir.as_ref().map(|d| project_root.join(d))
    }

    pub fn global_commands_dir(&self, home: &Path) -> Option<PathBuf> {
        self.global_commands_dir
            .as_ref()
            .map(|d| expand_home(d, home))
    }

    pub fn supports_commands(&self) -> bool {
        self.commands_dir.is_some() || self.global_commands_dir.is_some()
    }

    /// Installation-detection probe: the agent's install dir exists.
    pub fn is_installed(&self, home: &Path) -> bool {
        expand_home(&self.install_dir, home).exists()
    }

    fn apply(&mut self, ov: &AgentOverride) {
        if let Some(v) = &ov.display_name {
            self.display_name = v.clone();
        }
        if let Some(v) = &ov.skills_dir {
            self.skills_dir = v.clone();
        }
        if let Some(v) = &ov.global_skills_dir {
            self.global_skills_dir = v.clone();
        }
        if ov.commands_dir.is_some() {
            self.commands_dir = ov.commands_dir.clone();
        }
        if ov.global_commands_dir.is_some() {
            self.global_commands_dir = ov.global_commands_dir.clone();
        }
        if let Some(v) = &ov.install_dir {
            self.install_dir = v.clone();
        }
    }
}

/// (id, display name, skills, global skills, commands, global commands, install dir)
type BuiltinRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    Option<&'static str>,
    Option<&'static str>,
    &'static str,
);

const BUILTIN_AGENTS: &[BuiltinRow] = &[
    (
        "claude-code",
        "Claude Code",
        ".claude/skills",
        "~/.claude/skills",
        Some(".claude/commands"),
        Some("~/.claude/commands"),
        "~/.claude",
    ),
    (
        "codex",
        "Codex",
        ".codex/skills",
        "~/.codex/skills",
        None,
        None,
        "~/.codex",
    ),
    (
        "cursor",
        "Cursor",
        ".cursor/skills",
        "~/.cursor/skills",
        Some(".cursor/commands"),
        Some("~/.cursor/commands"),
        "~/.cursor",
    ),
    (
        "opencode",
        "OpenCode",
        ".opencode/skill",
        "~/.config/opencode/skill",
        Some(".opencode/command"),
        Some("~/.config/opencode/command"),
        "~/.config/opencode",
    ),
    (
        "gemini",
        "Gemini CLI",
        ".gemini/skills",
        "~/.gemini/skills",
        None,
        None,
        "~/.gemini",
    ),
    (
        "copilot",
        "GitHub Copilot",
        ".github/skills",
        "~/.copilot/skills",
        None,
        None,
        "~/.copilot",
    ),
    (
        "windsurf",
        "Windsurf",
        ".windsurf/skills",
        "~/.codeium/windsurf/skills",
        None,
        None,
        "~/.codeium/windsurf",
    ),
    (
        "goose",
        "Goose",
        ".goose/skills",
        "~/.config/goose/skills",
        None,
        None,
        "~/.config/goose",
    ),
    (
        "roo",
        "Roo Code",
        ".roo/skills",
        "~/.roo/skills",
        Some(".roo/commands"),
        Some("~/.roo/commands"),
        "~/.roo",
    ),
    (
        "kilo",
        "Kilo Code",
        ".kilocode/skills",
        "~/.kilocode/skills",
        None,
        None,
        "~/.kilocode",
    ),
    (
        "factory",
        "Droid",
        ".factory/skills",
        "~/.factory/skills",
        Some(".factory/commands"),
        Some("~/.factory/commands"),
        "~/.factory",
    ),
    (
        "trae",
        "Trae",
        ".trae/skills",
        "~/.trae/skills",
        None,
        None,
        "~/.trae",
    ),
    (
        "qwen",
        "Qwen Code",
        ".qwen/skills",
        "~/.qwen/skills",
        None,
        None,
        "~/.qwen",
    ),
];

/// Ordered, read-only set of agents known to this process.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentConfig>,
}

impl AgentRegistry {
    pub fn new(agents: Vec<AgentConfig>) -> Self {
        Self { agents }
    }

    /// The built-in agent table.
    pub fn builtin() -> Self {
        let agents = BUILTIN_AGENTS
            .iter()
            .map(
                |(id, name, skills, global_skills, commands, global_commands, install)| {
                    AgentConfig {
                        id: (*id).into(),
                        display_name: (*name).into(),
                        skills_dir: (*skills).into(),
                        global_skills_dir: (*global_skills).into(),
                        commands_dir: commands.map(Into::into),
                        global_commands_dir: global_commands.map(Into::into),
                        install_dir: (*install).into(),
                    }
                },
            )
            .collect();
        Self { agents }
    }

    /// Built-ins with the config file's `[agents.*]` overrides applied.
    pub fn from_config(config: &SkilletConfig) -> Self {
        let mut registry = Self::builtin();
        for (id, ov) in &config.agents {
            if !ov.enabled {
                registry.agents.retain(|a| &a.id != id);
                debug!(agent = %id, "agent disabled by config");
                continue;
            }
            if let Some(existing) = registry.agents.iter_mut().find(|a| &a.id == id) {
                existing.apply(ov);
                continue;
            }
            let (Some(skills_dir), Some(global_skills_dir)) =
                (ov.skills_dir.clone(), ov.global_skills_dir.clone())
            else {
                warn!(agent = %id, "custom agent needs skills_dir and global_skills_dir, skipping");
                continue;
            };
            registry.agents.push(AgentConfig {
                id: id.clone(),
                display_name: ov.display_name.clone().unwrap_or_else(|| id.clone()),
                install_dir: ov
                    .install_dir
                    .clone()
                    .unwrap_or_else(|| global_skills_dir.clone()),
                skills_dir,
                global_skills_dir,
                commands_dir: ov.commands_dir.clone(),
                global_commands_dir: ov.global_commands_dir.clone(),
            });
        }
        registry
    }

    pub fn get(&self, id: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentConfig> {
        self.agents.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agents whose install directory exists under `home`.
    pub fn detect_installed(&self, home: &Path) -> Vec<&AgentConfig> {
        self.agents.iter().filter(|a| a.is_installed(home)).collect()
    }

    /// Unique project-relative skills directories, in table order.
    pub fn unique_skills_dirs(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for agent in &self.agents {
            if !seen.contains(&agent.skills_dir.as_str()) {
                seen.push(&agent.skills_dir);
            }
        }
        seen
    }

    /// Unique project-relative commands directories, in table order.
    pub fn unique_commands_dirs(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for dir in self.agents.iter().filter_map(|a| a.commands_dir.as_deref()) {
            if !seen.contains(&dir) {
                seen.push(dir);
            }
        }
        seen
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_unique_ids() {
        let registry = AgentRegistry::builtin();
        let mut ids = registry.ids();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert!(registry.get("claude-code").unwrap().supports_commands());
        assert!(!registry.get("codex").unwrap().supports_commands());
    }

    #[test]
    fn dirs_resolve_per_scope() {
        let registry = AgentRegistry::builtin();
        let claude = registry.get("claude-code").unwrap();
        assert_eq!(
            claude.project_skills_dir(Path::new("/work/app")),
            PathBuf::from("/work/app/.claude/skills")
        );
        assert_eq!(
            claude.global_skills_dir(Path::new("/home/dev")),
            PathBuf::from("/home/dev/.claude/skills")
        );
        assert_eq!(
            claude.global_commands_dir(Path::new("/home/dev")),
            Some(PathBuf::from("/home/dev/.claude/commands"))
        );
    }

    #[test]
    fn config_overrides_disable_and_add_agents() {
        let mut config = SkilletConfig::default();
        config.agents.insert(
            "codex".into(),
            AgentOverride {
                enabled: false,
                ..Default::default()
            },
        );
        config.agents.insert(
            "cursor".into(),
            AgentOverride {
                display_name: Some("Cursor IDE".into()),
                ..Default::default()
            },
        );
        config.agents.insert(
            "acme".into(),
            AgentOverride {
                skills_dir: Some(".acme/skills".into()),
                global_skills_dir: Some("~/.acme/skills".into()),
                ..Default::default()
            },
        );
        config.agents.insert("broken".into(), AgentOverride::default());

        let registry = AgentRegistry::from_config(&config);
        assert!(registry.get("codex").is_none());
        assert_eq!(registry.get("cursor").unwrap().display_name, "Cursor IDE");
        let acme = registry.get("acme").unwrap();
        assert_eq!(acme.display_name, "acme");
        assert_eq!(acme.install_dir, "~/.acme/skills");
        assert!(registry.get("broken").is_none());
    }

    #[test]
    fn detect_installed_checks_install_dir() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".cursor")).unwrap();
        let registry = AgentRegistry::builtin();
        let detected: Vec<&str> = registry
            .detect_installed(home.path())
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(detected, vec!["cursor"]);
    }

    #[test]
    fn unique_dirs_are_deduplicated() {
        let registry = AgentRegistry::new(vec![
            AgentConfig {
                id: "a".into(),
                display_name: "A".into(),
                skills_dir: ".shared/skills".into(),
                global_skills_dir: "~/.a/skills".into(),
                commands_dir: Some(".shared/commands".into()),
                global_commands_dir: None,
                install_dir: "~/.a".into(),
            },
            AgentConfig {
                id: "b".into(),
                display_name: "B".into(),
                skills_dir: ".shared/skills".into(),
                global_skills_dir: "~/.b/skills".into(),
                commands_dir: Some(".shared/commands".into()),
                global_commands_dir: None,
                install_dir: "~/.b".into(),
            },
        ]);
        assert_eq!(registry.unique_skills_dirs(), vec![".shared/skills"]);
        assert_eq!(registry.unique_commands_dirs(), vec![".shared/commands"]);
    }
}
