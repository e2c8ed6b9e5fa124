//! Drift detection against the remote branch and in-place updates.

use {
    skillet_config::AgentRegistry,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use skillet_metrics::{counter, updates as update_metrics};

use crate::{
    deploy::{DeployMode, Deployer, TargetOutcome},
    discover::Discovery,
    error::{Error, Result},
    git::GitClient,
    paths::Roots,
    tracked::Tracked,
    types::{AssetKind, TrackedInstallable},
};

/// Remote state of one tracked entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Outdated { latest: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub installable: TrackedInstallable,
    pub status: UpdateStatus,
}

/// What one update did.
#[derive(Debug)]
pub struct UpdateReport {
    pub name: String,
    pub kind: AssetKind,
    pub previous_commit: String,
    pub commit: String,
    pub targets: Vec<TargetOutcome>,
}

impl UpdateReport {
    pub fn succeeded(&self) -> usize {
        self.targets.iter().filter(|t| t.is_success()).count()
    }
}

pub struct UpdateChecker<'a> {
    roots: &'a Roots,
    agents: &'a AgentRegistry,
    tracked: &'a Tracked,
    git: &'a dyn GitClient,
}

impl<'a> UpdateChecker<'a> {
    pub fn new(
        roots: &'a Roots,
        agents: &'a AgentRegistry,
        tracked: &'a Tracked,
        git: &'a dyn GitClient,
    ) -> Self {
        Self {
            roots,
            agents,
            tracked,
            git,
        }
    }

    /// Compare each tracked entry (optionally filtered by name) against the
    /// head of its remote branch.
    pub async fn check_status(&self, names: Option<&[String]>) -> Vec<StatusReport> {
        let mut reports = Vec::new();
        for installable in self.select(names) {
            #[cfg(feature = "metrics")]
            counter!(update_metrics::CHECKS_TOTAL).increment(1);

            let entry = &installable.entry;
            let status = match self.git.latest_commit(&entry.url, &entry.branch).await {
                Ok(latest) if latest == entry.commit => UpdateStatus::UpToDate,
                Ok(latest) => UpdateStatus::Outdated { latest },
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    counter!(update_metrics::CHECK_ERRORS_TOTAL).increment(1);
                    UpdateStatus::Error {
                        message: e.to_string(),
                    }
                },
            };
            debug!(name = %installable.name, kind = %installable.kind, ?status, "checked");
            reports.push(StatusReport {
                installable,
                status,
            });
        }
        reports
    }

    /// Re-fetch one entry and redeploy it wherever it is installed.
    ///
    /// Links stay links and copies stay copies. The stored commit only moves
    /// once at least one target was redeployed.
    pub async fn update_entry(&self, installable: &TrackedInstallable) -> Result<UpdateReport> {
        let entry = &installable.entry;
        let installations = self.tracked.get_valid_installations(
            &installable.name,
            installable.kind,
            installable.scope,
        );
        if installations.is_empty() {
            return Err(Error::message(format!(
                "{} '{}' has no valid installations to update",
                installable.kind, installable.name
            )));
        }

        let checkout = self.git.clone_repo(&entry.url, Some(&entry.branch)).await?;
        let commit = self.git.head_commit(checkout.path()).await?;

        let discovery = Discovery::new(self.agents);
        let subpath = entry.subpath.as_deref();
        let candidates = match installable.kind {
            AssetKind::Skill => discovery.discover_skills(checkout.path(), subpath).await,
            AssetKind::Command => discovery.discover_commands(checkout.path(), subpath).await,
        };
        let asset = candidates
            .into_iter()
            .find(|a| a.name.eq_ignore_ascii_case(&installable.name))
            .ok_or_else(|| {
                Error::message(format!(
                    "{} '{}' no longer exists in {}",
                    installable.kind, installable.name, entry.url
                ))
            })?;

        let mut linked = Vec::new();
        let mut copied = Vec::new();
        for installation in &installations {
            let Some(agent) = self.agents.get(&installation.agent) else {
                warn!(agent = %installation.agent, "installation for unknown agent, skipping");
                continue;
            };
            let is_link = tokio::fs::symlink_metadata(&installation.path)
                .await
                .is_ok_and(|m| m.file_type().is_symlink());
            if is_link {
                linked.push(agent);
            } else {
                copied.push(agent);
            }
        }

        let mut targets = Vec::new();
        for (mode, agents) in [(DeployMode::Symlink, linked), (DeployMode::Copy, copied)] {
            if agents.is_empty() {
                continue;
            }
            let deployer = Deployer::new(self.roots.clone(), mode);
            targets.extend(
                deployer
                    .install_asset(&asset, &agents, installable.scope)
                    .await,
            );
        }

        let report = UpdateReport {
            name: installable.name.clone(),
            kind: installable.kind,
            previous_commit: entry.commit.clone(),
            commit,
            targets,
        };
        if report.succeeded() > 0 {
            self.tracked.store(installable.scope).update_commit(
                &installable.name,
                installable.kind,
                &report.commit,
            )?;
            #[cfg(feature = "metrics")]
            counter!(update_metrics::APPLIED_TOTAL).increment(1);
            info!(
                name = %report.name,
                from = %report.previous_commit,
                to = %report.commit,
                targets = report.succeeded(),
                "updated"
            );
        }
        Ok(report)
    }

    /// Update every outdated entry (optionally filtered by name).
    pub async fn update(
        &self,
        names: Option<&[String]>,
    ) -> Vec<(TrackedInstallable, Result<UpdateReport>)> {
        let mut results = Vec::new();
        for report in self.check_status(names).await {
            match report.status {
                UpdateStatus::Outdated { .. } => {
                    let result = self.update_entry(&report.installable).await;
                    results.push((report.installable, result));
                },
                UpdateStatus::UpToDate => {},
                UpdateStatus::Error { message } => {
                    warn!(name = %report.installable.name, %message, "skipping update");
                },
            }
        }
        results
    }

    fn select(&self, names: Option<&[String]>) -> Vec<TrackedInstallable> {
        let all = self.tracked.list_tracked_installables();
        match names {
            Some(names) if !names.is_empty() => all
                .into_iter()
                .filter(|t| names.iter().any(|n| n.eq_ignore_ascii_case(&t.name)))
                .collect(),
            _ => all,
        }
    }
}
