//! Writing assets into agent directories and taking them out again.
//!
//! Copy mode gives every agent its own copy. Symlink mode copies once into
//! the scope's central storage (`.agents/`) and links each agent's entry to
//! that copy.

use std::{
    io,
    path::{Path, PathBuf},
};

use {
    skillet_config::AgentConfig,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use skillet_metrics::{counter, labels, skills as skills_metrics};

use crate::{
    error::{Error, Result},
    paths::Roots,
    platform::{self, LinkKind},
    types::{Asset, AssetKind, Scope},
};

/// Files never copied out of a source tree.
pub const EXCLUDED_FILES: &[&str] = &["README.md", "metadata.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployMode {
    #[default]
    Copy,
    Symlink,
}

impl DeployMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Symlink => "symlink",
        }
    }
}

/// Result of deploying to one agent.
#[derive(Debug)]
pub struct TargetOutcome {
    pub agent: String,
    /// Installed path on success.
    pub result: Result<PathBuf>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct Deployer {
    roots: Roots,
    mode: DeployMode,
}

impl Deployer {
    pub fn new(roots: Roots, mode: DeployMode) -> Self {
        Self { roots, mode }
    }

    pub fn mode(&self) -> DeployMode {
        self.mode
    }

    /// Deploy `asset` to every agent in `agents`. One outcome per agent; a
    /// failing agent never stops the others.
    pub async fn install_asset(
        &self,
        asset: &Asset,
        agents: &[&AgentConfig],
        scope: Scope,
    ) -> Vec<TargetOutcome> {
        let stored = match self.mode {
            DeployMode::Copy => None,
            DeployMode::Symlink => match self.store_asset(asset, scope).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(name = %asset.name, error = %e, "cannot write central copy");
                    return agents
                        .iter()
                        .map(|agent| TargetOutcome {
                            agent: agent.id.clone(),
                            result: Err(e.duplicate()),
                        })
                        .collect();
                },
            },
        };

        let mut outcomes = Vec::with_capacity(agents.len());
        for agent in agents {
            let result = self.deploy_one(asset, agent, scope, stored.as_deref()).await;
            match &result {
                Ok(path) => {
                    debug!(name = %asset.name, agent = %agent.id, path = %path.display(), "deployed");
                },
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    counter!(
                        skills_metrics::DEPLOY_FAILURES_TOTAL,
                        labels::MODE => self.mode.as_str(),
                        labels::AGENT => agent.id.clone()
                    )
                    .increment(1);
                    warn!(name = %asset.name, agent = %agent.id, error = %e, "deploy failed");
                },
            }
            outcomes.push(TargetOutcome {
                agent: agent.id.clone(),
                result,
            });
        }
        outcomes
    }

    /// Replace the central copy of `asset` in `scope`.
    pub async fn store_asset(&self, asset: &Asset, scope: Scope) -> Result<PathBuf> {
        let dest = self.roots.storage_path(scope, asset.kind, &asset.name);
        remove_any(&dest)
            .await
            .map_err(|e| Error::filesystem(&dest, &e))?;
        copy_asset(asset, &dest).await?;
        info!(name = %asset.name, path = %dest.display(), "stored central copy");
        Ok(dest)
    }

    async fn deploy_one(
        &self,
        asset: &Asset,
        agent: &AgentConfig,
        scope: Scope,
        stored: Option<&Path>,
    ) -> Result<PathBuf> {
        let target = self
            .roots
            .target_path(agent, scope, asset.kind, &asset.name)
            .ok_or_else(|| Error::Unsupported {
                agent: agent.id.clone(),
                kind: asset.kind,
            })?;

        match stored {
            Some(stored) => {
                if target == stored {
                    return Ok(target);
                }
                remove_any(&target)
                    .await
                    .map_err(|e| Error::filesystem(&target, &e))?;
                ensure_parent(&target).await?;
                let kind = LinkKind::for_target(asset.kind == AssetKind::Skill);
                platform::create_link(stored, &target, kind)
                    .await
                    .map_err(|e| Error::filesystem(&target, &e))?;
            },
            None => {
                // Never copy through a link into central storage.
                if is_symlink(&target).await {
                    platform::remove_link(&target)
                        .await
                        .map_err(|e| Error::filesystem(&target, &e))?;
                }
                copy_asset(asset, &target).await?;
            },
        }
        Ok(target)
    }
}

/// Delete one installation.
///
/// A symlinked installation takes its central copy with it unless one of
/// `siblings` still resolves to the same copy. A missing path is success.
pub async fn remove_installation(path: &Path, siblings: &[PathBuf]) -> Result<()> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::filesystem(path, &e)),
    };

    if !meta.file_type().is_symlink() {
        remove_any(path)
            .await
            .map_err(|e| Error::filesystem(path, &e))?;
        info!(path = %path.display(), "removed installation");
        return Ok(());
    }

    if let Ok(real) = tokio::fs::canonicalize(path).await {
        let mut shared = false;
        for sibling in siblings.iter().filter(|s| s.as_path() != path) {
            if tokio::fs::canonicalize(sibling).await.is_ok_and(|s| s == real) {
                shared = true;
                break;
            }
        }
        if shared {
            debug!(path = %path.display(), target = %real.display(), "central copy still in use");
        } else {
            remove_any(&real)
                .await
                .map_err(|e| Error::filesystem(&real, &e))?;
            info!(path = %real.display(), "removed central copy");
        }
    }

    match platform::remove_link(path).await {
        Ok(()) => {},
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => return Err(Error::filesystem(path, &e)),
    }
    info!(path = %path.display(), "removed linked installation");
    Ok(())
}

/// Copy a skill directory or command file to `dest`.
pub async fn copy_asset(asset: &Asset, dest: &Path) -> Result<()> {
    match asset.kind {
        AssetKind::Skill => copy_dir_filtered(&asset.source_path, dest)
            .await
            .map_err(|e| Error::filesystem(dest, &e)),
        AssetKind::Command => {
            ensure_parent(dest).await?;
            tokio::fs::copy(&asset.source_path, dest)
                .await
                .map(|_| ())
                .map_err(|e| Error::filesystem(dest, &e))
        },
    }
}

pub(crate) fn is_excluded(name: &str) -> bool {
    name.starts_with('_') || EXCLUDED_FILES.contains(&name)
}

async fn copy_dir_filtered(src: &Path, dst: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dst).await?;
    let mut entries = tokio::fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if name.to_str().is_some_and(is_excluded) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);
        if src_path.is_dir() {
            Box::pin(copy_dir_filtered(&src_path, &dst_path)).await?;
        } else {
            tokio::fs::copy(&src_path, &dst_path).await?;
        }
    }
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::filesystem(parent, &e))?;
    }
    Ok(())
}

async fn is_symlink(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path)
        .await
        .is_ok_and(|m| m.file_type().is_symlink())
}

/// Remove whatever is at `path` without following links. Missing is fine.
async fn remove_any(path: &Path) -> io::Result<()> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let result = if meta.file_type().is_symlink() {
        platform::remove_link(path).await
    } else if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
