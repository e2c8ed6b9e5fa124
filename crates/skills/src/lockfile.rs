//! Persistent tracking of installed assets, one store per scope.
//!
//! The global store lives under the data dir and always exists; a missing
//! or corrupt file is replaced by an empty one. The project store is
//! optional: an absent file means the project tracks nothing, and the file
//! is deleted again once its last entry goes.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    chrono::{SecondsFormat, Utc},
    serde::{Deserialize, Serialize},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use skillet_metrics::{counter, labels, skills as skills_metrics};

use crate::{
    error::{Context, Result},
    probe::InstallationProbe,
    types::{AssetKind, Installation, LockKey, Scope, TrackedEntry},
};

/// Schema version written to project lockfiles.
pub const PROJECT_LOCKFILE_VERSION: &str = "1.0.0";

/// Entries keyed by serialized [`LockKey`].
pub type Entries = BTreeMap<String, TrackedEntry>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalLockfile {
    #[serde(default)]
    last_update: String,
    #[serde(default)]
    skills: Entries,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectLockfile {
    version: String,
    skills: Entries,
}

/// Input to [`StateStore::add_or_update`].
#[derive(Debug, Clone)]
pub struct AddEntry {
    pub name: String,
    pub kind: AssetKind,
    pub url: String,
    pub subpath: Option<String>,
    pub branch: String,
    pub commit: String,
}

/// What [`StateStore::add_or_update`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// An existing entry moved to a different branch.
    pub updated: bool,
    pub previous_branch: Option<String>,
}

/// A scope's lockfile.
#[derive(Clone)]
pub struct StateStore {
    scope: Scope,
    path: PathBuf,
    probe: Arc<dyn InstallationProbe>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("scope", &self.scope)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl StateStore {
    pub fn global(path: impl Into<PathBuf>, probe: Arc<dyn InstallationProbe>) -> Self {
        Self {
            scope: Scope::Global,
            path: path.into(),
            probe,
        }
    }

    pub fn project(path: impl Into<PathBuf>, probe: Arc<dyn InstallationProbe>) -> Self {
        Self {
            scope: Scope::Project,
            path: path.into(),
            probe,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all entries. Never fails: unreadable state is treated as empty
    /// (and the global file is rewritten).
    pub fn load(&self) -> Entries {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.scope == Scope::Global {
                    self.heal("missing");
                }
                return Entries::new();
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read lockfile");
                return Entries::new();
            },
        };

        let parsed = match self.scope {
            Scope::Global => serde_json::from_str::<GlobalLockfile>(&raw).map(|l| l.skills),
            Scope::Project => serde_json::from_str::<ProjectLockfile>(&raw).map(|l| l.skills),
        };
        match parsed {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt lockfile, treating as empty");
                if self.scope == Scope::Global {
                    self.heal("corrupt");
                }
                Entries::new()
            },
        }
    }

    /// Write `entries` atomically via temp file + rename.
    pub fn save(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let data = match self.scope {
            Scope::Global => serde_json::to_string_pretty(&GlobalLockfile {
                last_update: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                skills: entries.clone(),
            })?,
            Scope::Project => serde_json::to_string_pretty(&ProjectLockfile {
                version: PROJECT_LOCKFILE_VERSION.to_string(),
                skills: entries.clone(),
            })?,
        };
        let tmp = self.path.with_extension("lock.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = entries.len(), "saved lockfile");
        Ok(())
    }

    /// Insert or overwrite the entry for `entry.name`.
    pub fn add_or_update(&self, entry: AddEntry) -> Result<AddOutcome> {
        let mut entries = self.load();
        let key = LockKey::new(&entry.name, entry.kind).to_string();
        let previous_branch = entries
            .get(&key)
            .map(|e| e.branch.clone())
            .filter(|b| *b != entry.branch);
        entries.insert(key.clone(), TrackedEntry {
            url: entry.url,
            subpath: entry.subpath,
            branch: entry.branch,
            commit: entry.commit,
        });
        self.save(&entries)?;
        info!(%key, scope = %self.scope, "tracked entry");
        Ok(AddOutcome {
            updated: previous_branch.is_some(),
            previous_branch,
        })
    }

    /// Drop an entry. Returns whether it existed.
    pub fn remove(&self, name: &str, kind: AssetKind) -> Result<bool> {
        let mut entries = self.load();
        let key = LockKey::new(name, kind).to_string();
        if entries.remove(&key).is_none() {
            return Ok(false);
        }
        self.persist(&entries)?;
        info!(%key, scope = %self.scope, "untracked entry");
        Ok(true)
    }

    /// Record a new commit for an existing entry. No-op for unknown keys.
    pub fn update_commit(&self, name: &str, kind: AssetKind, commit: &str) -> Result<bool> {
        let mut entries = self.load();
        let key = LockKey::new(name, kind).to_string();
        let Some(entry) = entries.get_mut(&key) else {
            return Ok(false);
        };
        entry.commit = commit.to_string();
        self.save(&entries)?;
        Ok(true)
    }

    pub fn get_entry(&self, name: &str, kind: AssetKind) -> Option<TrackedEntry> {
        self.load().remove(&LockKey::new(name, kind).to_string())
    }

    pub fn get_all(&self) -> Entries {
        self.load()
    }

    pub fn find_installations(&self, name: &str, kind: AssetKind) -> Vec<Installation> {
        self.probe.find_installations(name, kind, self.scope)
    }

    pub fn is_valid(&self, installation: &Installation) -> bool {
        self.probe.is_valid(installation)
    }

    /// Drop every entry with no valid installation left. Returns the removed
    /// keys; saves at most once.
    pub fn reconcile_orphans(&self) -> Result<Vec<LockKey>> {
        let mut entries = self.load();
        let orphans: Vec<(String, LockKey)> = entries
            .keys()
            .filter_map(|raw| LockKey::parse(raw).map(|key| (raw.clone(), key)))
            .filter(|(_, key)| {
                self.probe
                    .valid_installations(key.name(), key.kind(), self.scope)
                    .is_empty()
            })
            .collect();
        if orphans.is_empty() {
            return Ok(Vec::new());
        }

        for (raw, _) in &orphans {
            entries.remove(raw);
        }
        self.persist(&entries)?;

        #[cfg(feature = "metrics")]
        counter!(
            skills_metrics::ORPHANS_RECONCILED_TOTAL,
            labels::SCOPE => self.scope.as_str()
        )
        .increment(orphans.len() as u64);

        let removed: Vec<LockKey> = orphans.into_iter().map(|(_, key)| key).collect();
        info!(scope = %self.scope, count = removed.len(), "removed orphaned entries");
        Ok(removed)
    }

    /// Save, except that an emptied project store deletes its file.
    fn persist(&self, entries: &Entries) -> Result<()> {
        if self.scope == Scope::Project && entries.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {
                    info!(path = %self.path.display(), "removed empty project lockfile");
                    Ok(())
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        } else {
            self.save(entries)
        }
    }

    fn heal(&self, reason: &str) {
        if let Err(e) = self.save(&Entries::new()) {
            warn!(path = %self.path.display(), error = %e, %reason, "cannot rewrite lockfile");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::StaticProbe;

    fn entry(name: &str, branch: &str, commit: &str) -> AddEntry {
        AddEntry {
            name: name.into(),
            kind: AssetKind::Skill,
            url: "https://github.com/acme/skills.git".into(),
            subpath: None,
            branch: branch.into(),
            commit: commit.into(),
        }
    }

    fn stores(tmp: &Path) -> (Arc<StaticProbe>, StateStore, StateStore) {
        let probe = Arc::new(StaticProbe::default());
        let global = StateStore::global(tmp.join("data/skills.lock"), probe.clone());
        let project = StateStore::project(tmp.join("skills.lock"), probe.clone());
        (probe, global, project)
    }

    #[test]
    fn test_add_update_branch_switch() {
        let tmp = tempfile::tempdir().unwrap();
        let (_probe, global, _) = stores(tmp.path());

        let first = global.add_or_update(entry("Review", "main", "c1")).unwrap();
        assert_eq!(first, AddOutcome {
            updated: false,
            previous_branch: None,
        });

        let same = global.add_or_update(entry("review", "main", "c2")).unwrap();
        assert!(!same.updated);
        assert_eq!(global.get_entry("REVIEW", AssetKind::Skill).unwrap().commit, "c2");

        let switched = global.add_or_update(entry("review", "dev", "c3")).unwrap();
        assert!(switched.updated);
        assert_eq!(switched.previous_branch.as_deref(), Some("main"));
        let stored = global.get_entry("review", AssetKind::Skill).unwrap();
        assert_eq!(stored.branch, "dev");
        assert_eq!(stored.commit, "c3");
        assert_eq!(global.get_all().len(), 1);
    }

    #[test]
    fn test_global_file_format() {
        let tmp = tempfile::tempdir().unwrap();
        let (_probe, global, _) = stores(tmp.path());
        global.add_or_update(entry("review", "main", "c1")).unwrap();

        let raw = std::fs::read_to_string(global.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let stamp = json["lastUpdate"].as_str().unwrap();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
        assert_eq!(json["skills"]["skill:review"]["commit"], "c1");
        assert!(raw.contains("\n  \"skills\""));
    }

    #[test]
    fn test_global_created_on_first_read_and_healed() {
        let tmp = tempfile::tempdir().unwrap();
        let (_probe, global, _) = stores(tmp.path());
        assert!(global.load().is_empty());
        assert!(global.path().exists());

        std::fs::write(global.path(), "{ not json").unwrap();
        assert!(global.load().is_empty());
        let raw = std::fs::read_to_string(global.path()).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
    }

    #[test]
    fn test_project_absent_and_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let (_probe, _, project) = stores(tmp.path());
        assert!(project.load().is_empty());
        assert!(!project.path().exists());

        std::fs::write(project.path(), r#"{"skills":{}}"#).unwrap();
        assert!(project.load().is_empty());
    }

    #[test]
    fn test_project_file_deleted_when_emptied() {
        let tmp = tempfile::tempdir().unwrap();
        let (_probe, _, project) = stores(tmp.path());
        project.add_or_update(entry("a", "main", "c1")).unwrap();
        project.add_or_update(entry("b", "main", "c1")).unwrap();

        let raw = std::fs::read_to_string(project.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["version"], PROJECT_LOCKFILE_VERSION);

        assert!(project.remove("a", AssetKind::Skill).unwrap());
        assert!(project.path().exists());
        assert!(project.remove("B", AssetKind::Skill).unwrap());
        assert!(!project.path().exists());
        assert!(!project.remove("b", AssetKind::Skill).unwrap());
    }

    #[test]
    fn test_update_commit_ignores_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let (_probe, global, _) = stores(tmp.path());
        global.add_or_update(entry("review", "main", "c1")).unwrap();

        assert!(global.update_commit("review", AssetKind::Skill, "c9").unwrap());
        assert_eq!(global.get_entry("review", AssetKind::Skill).unwrap().commit, "c9");
        assert!(!global.update_commit("ghost", AssetKind::Skill, "c9").unwrap());
        assert!(global.get_entry("ghost", AssetKind::Skill).is_none());
    }

    #[test]
    fn test_kind_is_part_of_key() {
        let tmp = tempfile::tempdir().unwrap();
        let (_probe, global, _) = stores(tmp.path());
        global.add_or_update(entry("deploy", "main", "c1")).unwrap();
        let mut cmd = entry("deploy", "main", "c2");
        cmd.kind = AssetKind::Command;
        global.add_or_update(cmd).unwrap();

        assert_eq!(global.get_all().len(), 2);
        assert_eq!(global.get_entry("deploy", AssetKind::Command).unwrap().commit, "c2");
    }

    #[test]
    fn test_reconcile_removes_only_orphans() {
        let tmp = tempfile::tempdir().unwrap();
        let (probe, global, project) = stores(tmp.path());
        global.add_or_update(entry("kept", "main", "c1")).unwrap();
        global.add_or_update(entry("orphan", "main", "c1")).unwrap();
        probe.install("kept", AssetKind::Skill, Scope::Global);

        let removed = global.reconcile_orphans().unwrap();
        assert_eq!(removed, vec![LockKey::new("orphan", AssetKind::Skill)]);
        assert!(global.get_entry("kept", AssetKind::Skill).is_some());
        assert!(global.get_entry("orphan", AssetKind::Skill).is_none());

        let modified = std::fs::metadata(global.path()).unwrap().modified().unwrap();
        assert!(global.reconcile_orphans().unwrap().is_empty());
        assert_eq!(
            std::fs::metadata(global.path()).unwrap().modified().unwrap(),
            modified
        );

        project.add_or_update(entry("gone", "main", "c1")).unwrap();
        probe.install("gone", AssetKind::Skill, Scope::Global);
        assert_eq!(project.reconcile_orphans().unwrap().len(), 1);
        assert!(!project.path().exists());
        probe.uninstall("gone", AssetKind::Skill, Scope::Global);
    }

    #[test]
    fn test_reconcile_leaves_unparseable_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let (_probe, global, _) = stores(tmp.path());
        let mut entries = Entries::new();
        entries.insert("legacy-name".into(), TrackedEntry {
            url: "u".into(),
            subpath: None,
            branch: "main".into(),
            commit: "c".into(),
        });
        global.save(&entries).unwrap();

        assert!(global.reconcile_orphans().unwrap().is_empty());
        assert!(global.get_all().contains_key("legacy-name"));
    }
}
