//! Merged view over the project and global stores.

use std::{collections::HashSet, sync::Arc};

use crate::{
    lockfile::StateStore,
    paths::Roots,
    probe::InstallationProbe,
    types::{AssetKind, Installation, LockKey, Scope, TrackedInstallable},
};

/// The project and global stores, read together.
#[derive(Debug, Clone)]
pub struct Tracked {
    pub global: StateStore,
    pub project: StateStore,
}

impl Tracked {
    pub fn new(global: StateStore, project: StateStore) -> Self {
        Self { global, project }
    }

    /// Stores at the standard lockfile locations under `roots`.
    pub fn open(roots: &Roots, probe: Arc<dyn InstallationProbe>) -> Self {
        Self {
            global: StateStore::global(roots.lockfile_path(Scope::Global), probe.clone()),
            project: StateStore::project(roots.lockfile_path(Scope::Project), probe),
        }
    }

    pub fn store(&self, scope: Scope) -> &StateStore {
        match scope {
            Scope::Global => &self.global,
            Scope::Project => &self.project,
        }
    }

    /// Project entries first, then global entries not shadowed by a project
    /// entry with the same key.
    pub fn list_tracked_installables(&self) -> Vec<TrackedInstallable> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for store in [&self.project, &self.global] {
            for (raw, entry) in store.get_all() {
                let Some(key) = LockKey::parse(&raw) else {
                    continue;
                };
                if !seen.insert(key.clone()) {
                    continue;
                }
                out.push(TrackedInstallable {
                    name: key.name().to_string(),
                    kind: key.kind(),
                    scope: store.scope(),
                    entry,
                });
            }
        }
        out
    }

    /// Installations in `scope` that still resolve.
    pub fn get_valid_installations(
        &self,
        name: &str,
        kind: AssetKind,
        scope: Scope,
    ) -> Vec<Installation> {
        let store = self.store(scope);
        store
            .find_installations(name, kind)
            .into_iter()
            .filter(|i| store.is_valid(i))
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lockfile::AddEntry, probe::testing::StaticProbe};

    fn add(store: &StateStore, name: &str, kind: AssetKind, commit: &str) {
        store
            .add_or_update(AddEntry {
                name: name.into(),
                kind,
                url: "https://github.com/acme/skills.git".into(),
                subpath: None,
                branch: "main".into(),
                commit: commit.into(),
            })
            .unwrap();
    }

    #[test]
    fn test_project_shadows_global() {
        let tmp = tempfile::tempdir().unwrap();
        let roots = Roots::new(tmp.path().join("home"), tmp.path().join("proj"));
        let probe = Arc::new(StaticProbe::default());
        let tracked = Tracked::open(&roots, probe.clone());

        add(&tracked.global, "review", AssetKind::Skill, "global-c");
        add(&tracked.global, "lint", AssetKind::Skill, "global-c");
        add(&tracked.project, "Review", AssetKind::Skill, "project-c");
        add(&tracked.project, "review", AssetKind::Command, "project-c");

        let all = tracked.list_tracked_installables();
        assert_eq!(all.len(), 3);
        assert!(all[..2].iter().all(|t| t.scope == Scope::Project));

        let review = all
            .iter()
            .find(|t| t.name == "review" && t.kind == AssetKind::Skill)
            .unwrap();
        assert_eq!(review.scope, Scope::Project);
        assert_eq!(review.entry.commit, "project-c");
        assert!(all.iter().any(|t| t.name == "lint" && t.scope == Scope::Global));

        // Shadowed global entry is still on disk.
        assert!(tracked.global.get_entry("review", AssetKind::Skill).is_some());
    }

    #[test]
    fn test_valid_installations_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let roots = Roots::new(tmp.path().join("home"), tmp.path().join("proj"));
        let probe = Arc::new(StaticProbe::default());
        probe.install("review", AssetKind::Skill, Scope::Global);
        let tracked = Tracked::open(&roots, probe);

        assert_eq!(
            tracked
                .get_valid_installations("review", AssetKind::Skill, Scope::Global)
                .len(),
            1
        );
        assert!(
            tracked
                .get_valid_installations("review", AssetKind::Skill, Scope::Project)
                .is_empty()
        );
    }
}
