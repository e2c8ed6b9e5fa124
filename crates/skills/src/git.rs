//! Version-control collaborator. Transfers are delegated to the `git`
//! binary; nothing here speaks a git protocol.

use std::{
    path::{Path, PathBuf},
    process::Output,
};

use {
    async_trait::async_trait,
    tempfile::TempDir,
    tokio::process::Command,
    tracing::{debug, info},
};

use crate::error::{Error, Result};

/// A working tree produced by [`GitClient::clone_repo`].
///
/// Temporary checkouts are deleted when dropped.
#[derive(Debug)]
pub struct Checkout {
    path: PathBuf,
    _temp: Option<TempDir>,
}

impl Checkout {
    pub fn temporary(dir: TempDir) -> Self {
        Self {
            path: dir.path().to_path_buf(),
            _temp: Some(dir),
        }
    }

    /// Wrap an existing directory that outlives the checkout.
    pub fn existing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _temp: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
pub trait GitClient: Send + Sync {
    /// Shallow clone of `url` at `branch` (remote default when `None`).
    async fn clone_repo(&self, url: &str, branch: Option<&str>) -> Result<Checkout>;

    /// Commit at the tip of `refs/heads/<branch>` on the remote.
    async fn latest_commit(&self, url: &str, branch: &str) -> Result<String>;

    /// Commit checked out in `dir`.
    async fn head_commit(&self, dir: &Path) -> Result<String>;
}

/// [`GitClient`] that shells out to the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".into(),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str], cwd: Option<&Path>, target: &str) -> Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .await
            .map_err(|e| Error::transfer(target, format!("failed to run {}: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::transfer(target, stderr.trim()));
        }
        Ok(output)
    }
}

#[async_trait]
impl GitClient for GitCli {
    async fn clone_repo(&self, url: &str, branch: Option<&str>) -> Result<Checkout> {
        let dir = tempfile::Builder::new().prefix("skillet-").tempdir()?;
        let dest = dir.path().to_string_lossy().into_owned();
        let mut args = vec!["clone", "--depth", "1"];
        if let Some(branch) = branch {
            args.extend(["--branch", branch]);
        }
        args.extend([url, dest.as_str()]);
        self.run(&args, None, url).await?;
        info!(%url, branch = branch.unwrap_or("<default>"), "cloned source");
        Ok(Checkout::temporary(dir))
    }

    async fn latest_commit(&self, url: &str, branch: &str) -> Result<String> {
        let refname = format!("refs/heads/{branch}");
        let output = self.run(&["ls-remote", url, &refname], None, url).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let commit = parse_ls_remote(&stdout)
            .ok_or_else(|| Error::transfer(url, format!("branch '{branch}' not found")))?;
        debug!(%url, %branch, %commit, "remote head");
        Ok(commit)
    }

    async fn head_commit(&self, dir: &Path) -> Result<String> {
        let target = dir.display().to_string();
        let output = self.run(&["rev-parse", "HEAD"], Some(dir), &target).await?;
        let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if commit.is_empty() {
            return Err(Error::transfer(target, "empty rev-parse output"));
        }
        Ok(commit)
    }
}

/// First column of the first `ls-remote` line.
fn parse_ls_remote(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.split_whitespace().next())
        .map(str::to_string)
}
