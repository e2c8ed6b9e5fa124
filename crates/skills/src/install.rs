//! Install orchestration: resolve a source, fetch it, find its assets,
//! deploy them and record what was installed.

use {
    skillet_config::{AgentConfig, AgentRegistry},
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use skillet_metrics::{counter, histogram, labels, skills as skills_metrics};

use crate::{
    deploy::{DeployMode, Deployer, TargetOutcome},
    directory::{DirectoryClient, is_directory_name},
    discover::Discovery,
    error::{Error, Result},
    git::GitClient,
    lockfile::AddEntry,
    paths::Roots,
    source::{RepoDescriptor, parse_source},
    tracked::Tracked,
    types::{Asset, AssetKind, Scope},
};

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub scope: Scope,
    pub mode: DeployMode,
    /// Agent ids to deploy to. Empty means detected agents, or every agent
    /// when none is detected.
    pub agents: Vec<String>,
    /// Asset names to install (case-insensitive). Empty means all.
    pub assets: Vec<String>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            scope: Scope::Project,
            mode: DeployMode::Copy,
            agents: Vec::new(),
            assets: Vec::new(),
        }
    }
}

/// Per-asset result of an install.
#[derive(Debug)]
pub struct AssetReport {
    pub name: String,
    pub kind: AssetKind,
    pub targets: Vec<TargetOutcome>,
    /// Set when an existing entry was tracking another branch.
    pub branch_switched_from: Option<String>,
}

#[derive(Debug)]
pub struct InstallReport {
    pub source: RepoDescriptor,
    pub branch: String,
    pub commit: String,
    pub assets: Vec<AssetReport>,
    /// Successful targets across all assets.
    pub installed: usize,
    /// Failed targets across all assets.
    pub failed: usize,
}

impl InstallReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.installed > 0
    }
}

pub struct Installer<'a> {
    roots: &'a Roots,
    agents: &'a AgentRegistry,
    tracked: &'a Tracked,
    git: &'a dyn GitClient,
    directory: Option<&'a DirectoryClient>,
    default_branch: String,
}

impl<'a> Installer<'a> {
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
            directory: None,
            default_branch: "main".into(),
        }
    }

    /// Resolve bare names through the directory listing.
    #[must_use]
    pub fn with_directory(mut self, directory: &'a DirectoryClient) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Branch recorded and cloned when a source names none.
    #[must_use]
    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    /// Turn user input into a repository descriptor, consulting the
    /// directory listing for bare names.
    pub async fn resolve(&self, source: &str) -> Result<RepoDescriptor> {
        let source = source.trim();
        if is_directory_name(source) {
            let directory = self.directory.ok_or_else(|| {
                Error::resolution(source, "bare names need a directory listing")
            })?;
            let listed = directory
                .resolve_source(source)
                .await?
                .ok_or_else(|| Error::resolution(source, "not found in directory"))?;
            info!(name = %source, source = %listed, "resolved from directory");
            return parse_source(&listed);
        }
        parse_source(source)
    }

    pub async fn install(&self, source: &str, opts: &InstallOptions) -> Result<InstallReport> {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        #[cfg(feature = "metrics")]
        counter!(
            skills_metrics::INSTALLATION_ATTEMPTS_TOTAL,
            labels::SCOPE => opts.scope.as_str(),
            labels::MODE => opts.mode.as_str()
        )
        .increment(1);

        let desc = self.resolve(source).await?;
        let agents = self.select_agents(&opts.agents)?;
        let branch = desc
            .branch
            .clone()
            .unwrap_or_else(|| self.default_branch.clone());

        let checkout = self.git.clone_repo(&desc.clone_url, Some(&branch)).await?;
        let commit = self.git.head_commit(checkout.path()).await?;

        let discovery = Discovery::new(self.agents);
        let subpath = desc.subpath.as_deref();
        let mut assets = discovery.discover_skills(checkout.path(), subpath).await;
        assets.extend(discovery.discover_commands(checkout.path(), subpath).await);

        #[cfg(feature = "metrics")]
        counter!(skills_metrics::DISCOVERED_TOTAL).increment(assets.len() as u64);

        let assets = filter_assets(assets, &opts.assets);
        if assets.is_empty() {
            return Err(Error::message(format!(
                "no skills or commands found in {}",
                desc.clone_url
            )));
        }

        let deployer = Deployer::new(self.roots.clone(), opts.mode);
        let store = self.tracked.store(opts.scope);
        let mut report = InstallReport {
            source: desc.clone(),
            branch: branch.clone(),
            commit: commit.clone(),
            assets: Vec::with_capacity(assets.len()),
            installed: 0,
            failed: 0,
        };

        for asset in &assets {
            let targets: Vec<&AgentConfig> = agents
                .iter()
                .copied()
                .filter(|agent| {
                    asset.kind == AssetKind::Skill
                        || self.roots.agent_dir(agent, opts.scope, asset.kind).is_some()
                })
                .collect();
            if targets.is_empty() {
                warn!(name = %asset.name, kind = %asset.kind, "no selected agent supports this kind");
            }

            let outcomes = deployer.install_asset(asset, &targets, opts.scope).await;
            let ok = outcomes.iter().filter(|o| o.is_success()).count();
            report.installed += ok;
            report.failed += outcomes.len() - ok;

            let mut branch_switched_from = None;
            if ok > 0 {
                let outcome = store.add_or_update(AddEntry {
                    name: asset.name.clone(),
                    kind: asset.kind,
                    url: desc.clone_url.clone(),
                    subpath: desc.subpath.clone(),
                    branch: branch.clone(),
                    commit: commit.clone(),
                })?;
                if let Some(previous) = &outcome.previous_branch {
                    info!(name = %asset.name, from = %previous, to = %branch, "switched branch");
                }
                branch_switched_from = outcome.previous_branch;
            }
            report.assets.push(AssetReport {
                name: asset.name.clone(),
                kind: asset.kind,
                targets: outcomes,
                branch_switched_from,
            });
        }

        #[cfg(feature = "metrics")]
        histogram!(skills_metrics::INSTALLATION_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());

        info!(
            source = %desc.clone_url,
            %commit,
            assets = report.assets.len(),
            installed = report.installed,
            failed = report.failed,
            "install finished"
        );
        Ok(report)
    }

    fn select_agents(&self, ids: &[String]) -> Result<Vec<&'a AgentConfig>> {
        if !ids.is_empty() {
            return ids
                .iter()
                .map(|id| {
                    self.agents
                        .get(id)
                        .ok_or_else(|| Error::message(format!("unknown agent '{id}'")))
                })
                .collect();
        }
        let detected = self.agents.detect_installed(&self.roots.home);
        if detected.is_empty() {
            Ok(self.agents.iter().collect())
        } else {
            Ok(detected)
        }
    }
}

fn filter_assets(assets: Vec<Asset>, wanted: &[String]) -> Vec<Asset> {
    if wanted.is_empty() {
        return assets;
    }
    assets
        .into_iter()
        .filter(|a| wanted.iter().any(|w| w.eq_ignore_ascii_case(&a.name)))
        .collect()
}
