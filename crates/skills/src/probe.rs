//! Live filesystem probe for installations.
//!
//! Nothing about installations is persisted; every query looks at the
//! agents' directories as they are right now.

use std::path::Path;

use {skillet_config::AgentRegistry, tracing::debug};

use crate::{
    parse::SKILL_MANIFEST,
    paths::{COMMAND_EXT, Roots},
    types::{AssetKind, Installation, Scope},
};

/// Answers "where is this asset installed?".
pub trait InstallationProbe: Send + Sync {
    /// Every agent entry whose name matches `name` case-insensitively.
    fn find_installations(&self, name: &str, kind: AssetKind, scope: Scope) -> Vec<Installation>;

    /// The entry still resolves and, for skills, contains a manifest.
    fn is_valid(&self, installation: &Installation) -> bool;

    fn valid_installations(&self, name: &str, kind: AssetKind, scope: Scope) -> Vec<Installation> {
        self.find_installations(name, kind, scope)
            .into_iter()
            .filter(|i| self.is_valid(i))
            .collect()
    }
}

/// Probe backed by the real agent directories.
#[derive(Debug, Clone)]
pub struct FsProbe {
    roots: Roots,
    agents: AgentRegistry,
}

impl FsProbe {
    pub fn new(roots: Roots, agents: AgentRegistry) -> Self {
        Self { roots, agents }
    }
}

impl InstallationProbe for FsProbe {
    fn find_installations(&self, name: &str, kind: AssetKind, scope: Scope) -> Vec<Installation> {
        let wanted = name.to_lowercase();
        let mut found = Vec::new();
        for agent in self.agents.iter() {
            let Some(dir) = self.roots.agent_dir(agent, scope, kind) else {
                continue;
            };
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                let file_name = entry.file_name().to_string_lossy().to_lowercase();
                let matches = match kind {
                    AssetKind::Skill => {
                        (file_type.is_dir() || file_type.is_symlink()) && file_name == wanted
                    },
                    AssetKind::Command => {
                        (file_type.is_file() || file_type.is_symlink())
                            && file_name
                                .strip_suffix(COMMAND_EXT)
                                .and_then(|s| s.strip_suffix('.'))
                                == Some(wanted.as_str())
                    },
                };
                if matches {
                    found.push(Installation {
                        agent: agent.id.clone(),
                        kind,
                        scope,
                        path: entry.path(),
                    });
                    break;
                }
            }
        }
        debug!(%name, %kind, %scope, count = found.len(), "probed installations");
        found
    }

    fn is_valid(&self, installation: &Installation) -> bool {
        is_valid_path(&installation.path, installation.kind)
    }
}

/// Validity of an installed path, following symlinks.
pub fn is_valid_path(path: &Path, kind: AssetKind) -> bool {
    match kind {
        AssetKind::Skill => path.join(SKILL_MANIFEST).is_file(),
        AssetKind::Command => path.is_file(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::HashSet, path::PathBuf, sync::Mutex};

    use super::*;
    use crate::types::LockKey;

    /// Probe answering from an in-memory set of installed keys.
    #[derive(Default)]
    pub(crate) struct StaticProbe {
        installed: Mutex<HashSet<(LockKey, Scope)>>,
    }

    impl StaticProbe {
        pub(crate) fn install(&self, name: &str, kind: AssetKind, scope: Scope) {
            if let Ok(mut set) = self.installed.lock() {
                set.insert((LockKey::new(name, kind), scope));
            }
        }

        pub(crate) fn uninstall(&self, name: &str, kind: AssetKind, scope: Scope) {
            if let Ok(mut set) = self.installed.lock() {
                set.remove(&(LockKey::new(name, kind), scope));
            }
        }
    }

    impl InstallationProbe for StaticProbe {
        fn find_installations(
            &self,
            name: &str,
            kind: AssetKind,
            scope: Scope,
        ) -> Vec<Installation> {
            let key = (LockKey::new(name, kind), scope);
            let present = self
                .installed
                .lock()
                .map(|set| set.contains(&key))
                .unwrap_or(false);
            if !present {
                return Vec::new();
            }
            vec![Installation {
                agent: "fake".into(),
                kind,
                scope,
                path: PathBuf::from(format!("/fake/{name}")),
            }]
        }

        fn is_valid(&self, _installation: &Installation) -> bool {
            true
        }
    }
}
