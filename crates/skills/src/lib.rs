//! Installing, tracking and removing agent skills and commands.
//!
//! A skill is a directory with a `SKILL.md` manifest; a command is a single
//! `<name>.md` file. Assets are fetched from git sources, deployed into the
//! directories of one or more coding agents, and recorded in a lockfile per
//! scope (user-wide or project). Installations themselves are never
//! persisted; they are probed from disk whenever needed.

pub mod deploy;
pub mod directory;
pub mod discover;
pub mod error;
pub mod git;
pub mod install;
pub mod lockfile;
pub mod parse;
pub mod paths;
pub mod platform;
pub mod probe;
pub mod remove;
pub mod source;
pub mod tracked;
pub mod types;
pub mod update;

pub use {
    deploy::{DeployMode, Deployer, TargetOutcome},
    directory::{DirectoryClient, DirectoryEntry},
    discover::Discovery,
    error::{Error, Result},
    git::{GitCli, GitClient},
    install::{InstallOptions, InstallReport, Installer},
    lockfile::StateStore,
    paths::Roots,
    probe::{FsProbe, InstallationProbe},
    remove::{RemoveResult, Remover},
    source::{RepoDescriptor, parse_source},
    tracked::Tracked,
    types::{Asset, AssetKind, Installation, LockKey, Scope, TrackedEntry, TrackedInstallable},
    update::{UpdateChecker, UpdateStatus},
};
