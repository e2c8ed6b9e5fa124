//! Removing installed assets and pruning stale state.

use std::path::PathBuf;

use {
    skillet_config::AgentRegistry,
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use skillet_metrics::{counter, labels, skills as skills_metrics};

use crate::{
    deploy,
    error::{Error, Result},
    tracked::Tracked,
    types::{AssetKind, Installation, LockKey, Scope, TrackedInstallable},
};

/// Outcome for one installation path.
#[derive(Debug)]
pub struct InstallationRemoval {
    pub agent: String,
    pub path: PathBuf,
    pub result: Result<()>,
}

/// Outcome for one tracked entry.
#[derive(Debug)]
pub struct RemoveResult {
    pub name: String,
    pub kind: AssetKind,
    pub scope: Scope,
    /// No installation failed.
    pub success: bool,
    pub removed: usize,
    pub failed: usize,
    pub installations: Vec<InstallationRemoval>,
}

/// Entries dropped by [`Remover::clean`], per scope.
#[derive(Debug, Default)]
pub struct CleanReport {
    pub project: Vec<LockKey>,
    pub global: Vec<LockKey>,
}

impl CleanReport {
    pub fn total(&self) -> usize {
        self.project.len() + self.global.len()
    }
}

pub struct Remover<'a> {
    agents: &'a AgentRegistry,
    tracked: &'a Tracked,
}

impl<'a> Remover<'a> {
    pub fn new(agents: &'a AgentRegistry, tracked: &'a Tracked) -> Self {
        Self { agents, tracked }
    }

    /// Remove every valid installation of the named entries (all tracked
    /// entries when `names` is empty). An entry leaves its store once at
    /// least one installation was removed.
    pub async fn remove(&self, names: &[String]) -> Result<Vec<RemoveResult>> {
        let selected: Vec<TrackedInstallable> = self
            .tracked
            .list_tracked_installables()
            .into_iter()
            .filter(|t| names.is_empty() || names.iter().any(|n| n.eq_ignore_ascii_case(&t.name)))
            .collect();

        let mut results = Vec::new();
        for item in selected {
            let installations =
                self.tracked
                    .get_valid_installations(&item.name, item.kind, item.scope);
            if installations.is_empty() {
                warn!(name = %item.name, kind = %item.kind, scope = %item.scope, "no valid installations");
                continue;
            }

            let result = remove_all(&item.name, item.kind, item.scope, &installations, &[]).await;
            if result.removed > 0 {
                self.tracked
                    .store(item.scope)
                    .remove(&item.name, item.kind)?;
            }
            results.push(result);
        }
        Ok(results)
    }

    /// Remove one entry from the given agents only. Other agents keep their
    /// installations (and any central copy they link to); state is left for
    /// [`Remover::clean`] to reconcile.
    pub async fn remove_from_agents(
        &self,
        name: &str,
        kind: AssetKind,
        scope: Scope,
        agent_ids: &[String],
    ) -> Result<RemoveResult> {
        if let Some(unknown) = agent_ids.iter().find(|id| self.agents.get(id).is_none()) {
            return Err(Error::message(format!("unknown agent '{unknown}'")));
        }
        let (targets, kept): (Vec<Installation>, Vec<Installation>) = self
            .tracked
            .get_valid_installations(name, kind, scope)
            .into_iter()
            .partition(|i| agent_ids.contains(&i.agent));
        let kept: Vec<PathBuf> = kept.into_iter().map(|i| i.path).collect();
        Ok(remove_all(name, kind, scope, &targets, &kept).await)
    }

    /// Drop entries with no valid installation from both stores.
    pub fn clean(&self) -> Result<CleanReport> {
        let report = CleanReport {
            project: self.tracked.project.reconcile_orphans()?,
            global: self.tracked.global.reconcile_orphans()?,
        };
        info!(removed = report.total(), "cleaned orphaned entries");
        Ok(report)
    }
}

/// Remove `installations` in order. Central copies survive while a later
/// target or one of `kept` still links to them.
async fn remove_all(
    name: &str,
    kind: AssetKind,
    scope: Scope,
    installations: &[Installation],
    kept: &[PathBuf],
) -> RemoveResult {
    let mut result = RemoveResult {
        name: name.to_string(),
        kind,
        scope,
        success: true,
        removed: 0,
        failed: 0,
        installations: Vec::with_capacity(installations.len()),
    };

    for (idx, installation) in installations.iter().enumerate() {
        let siblings: Vec<PathBuf> = installations[idx + 1..]
            .iter()
            .map(|i| i.path.clone())
            .chain(kept.iter().cloned())
            .collect();
        let outcome = deploy::remove_installation(&installation.path, &siblings).await;
        match &outcome {
            Ok(()) => {
                result.removed += 1;
                #[cfg(feature = "metrics")]
                counter!(
                    skills_metrics::REMOVALS_TOTAL,
                    labels::KIND => kind.as_str(),
                    labels::SCOPE => scope.as_str()
                )
                .increment(1);
            },
            Err(e) => {
                result.failed += 1;
                result.success = false;
                #[cfg(feature = "metrics")]
                counter!(
                    skills_metrics::DEPLOY_FAILURES_TOTAL,
                    labels::ERROR_TYPE => format!("{:?}", e.fs_kind())
                )
                .increment(1);
                warn!(%name, agent = %installation.agent, error = %e, "removal failed");
            },
        }
        result.installations.push(InstallationRemoval {
            agent: installation.agent.clone(),
            path: installation.path.clone(),
            result: outcome,
        });
    }
    info!(%name, %kind, %scope, removed = result.removed, failed = result.failed, "removed");
    result
}
