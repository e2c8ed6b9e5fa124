//! Locating skills and commands inside a checked-out source tree.
//!
//! Skills are searched in three tiers: the search root itself, a list of
//! well-known directories, then a bounded recursive walk. The first tier
//! that yields anything wins.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use {skillet_config::AgentRegistry, tracing::debug};

use crate::{
    deploy::is_excluded,
    parse::{self, SKILL_MANIFEST},
    paths::COMMAND_EXT,
    types::Asset,
};

/// Conventional skill directories inside a source repository.
pub const COMMON_SKILL_DIRS: &[&str] = &[
    "skills",
    "skills/.curated",
    "skills/.experimental",
    "skills/.system",
];

/// Conventional command directories inside a source repository.
pub const COMMON_COMMAND_DIRS: &[&str] = &["commands", ".agents/commands"];

/// Directories never entered by the recursive walk.
pub const SKIP_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "__pycache__"];

pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Discovery settings. Agent directories extend the well-known list.
#[derive(Debug, Clone)]
pub struct Discovery {
    skill_dirs: Vec<String>,
    command_dirs: Vec<String>,
    max_depth: usize,
}

impl Discovery {
    pub fn new(agents: &AgentRegistry) -> Self {
        let mut skill_dirs: Vec<String> = COMMON_SKILL_DIRS.iter().map(|d| d.to_string()).collect();
        for dir in agents.unique_skills_dirs() {
            if !skill_dirs.iter().any(|d| d == dir) {
                skill_dirs.push(dir.to_string());
            }
        }
        let mut command_dirs: Vec<String> =
            COMMON_COMMAND_DIRS.iter().map(|d| d.to_string()).collect();
        for dir in agents.unique_commands_dirs() {
            if !command_dirs.iter().any(|d| d == dir) {
                command_dirs.push(dir.to_string());
            }
        }
        Self {
            skill_dirs,
            command_dirs,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Find skills under `base` (optionally narrowed to `subpath`).
    pub async fn discover_skills(&self, base: &Path, subpath: Option<&str>) -> Vec<Asset> {
        let root = search_root(base, subpath);

        if let Some(skill) = parse::read_skill(&root).await {
            debug!(name = %skill.name, "search root is a skill");
            return vec![skill];
        }

        let mut found = Found::default();
        let priority = std::iter::once(root.clone())
            .chain(self.skill_dirs.iter().map(|d| root.join(d)));
        for dir in priority {
            for child in child_dirs(&dir).await {
                if let Some(skill) = parse::read_skill(&child).await {
                    found.push(skill);
                }
            }
        }
        if !found.is_empty() {
            return found.into_vec();
        }

        let mut stack = vec![(root, 0usize)];
        while let Some((dir, depth)) = stack.pop() {
            if let Some(skill) = parse::read_skill(&dir).await {
                found.push(skill);
            }
            if depth >= self.max_depth {
                continue;
            }
            let children = child_dirs(&dir).await;
            // Reverse so the stack pops in name order.
            for child in children.into_iter().rev() {
                let skip = child
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| SKIP_DIRS.contains(&n));
                if !skip {
                    stack.push((child, depth + 1));
                }
            }
        }
        debug!(count = found.len(), "recursive skill search finished");
        found.into_vec()
    }

    /// Find commands under `base`. A subpath naming a `.md` file selects
    /// that single command.
    pub async fn discover_commands(&self, base: &Path, subpath: Option<&str>) -> Vec<Asset> {
        let root = search_root(base, subpath);

        if root.is_file() {
            if is_command_candidate(&root) {
                return parse::read_command(&root).await.into_iter().collect();
            }
            return Vec::new();
        }

        let mut dirs = Vec::new();
        // A skill directory is never a command directory.
        if subpath.is_some_and(|s| !s.is_empty()) && !root.join(SKILL_MANIFEST).exists() {
            dirs.push(root.clone());
        }
        dirs.extend(self.command_dirs.iter().map(|d| root.join(d)));

        let mut found = Found::default();
        for dir in dirs {
            for file in child_files(&dir).await {
                if is_command_candidate(&file)
                    && let Some(command) = parse::read_command(&file).await
                {
                    found.push(command);
                }
            }
        }
        found.into_vec()
    }
}

/// Assets collected so far; the first asset with a given name wins.
#[derive(Default)]
struct Found {
    seen: HashSet<String>,
    assets: Vec<Asset>,
}

impl Found {
    fn push(&mut self, asset: Asset) {
        if self.seen.insert(asset.name.to_lowercase()) {
            self.assets.push(asset);
        } else {
            debug!(name = %asset.name, path = %asset.source_path.display(), "duplicate name, skipping");
        }
    }

    fn len(&self) -> usize {
        self.assets.len()
    }

    fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn into_vec(self) -> Vec<Asset> {
        self.assets
    }
}

fn search_root(base: &Path, subpath: Option<&str>) -> PathBuf {
    match subpath.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        Some(sub) => base.join(sub),
        None => base.to_path_buf(),
    }
}

/// `*.md` files other than skill manifests and files deploys never copy.
fn is_command_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let is_md = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(COMMAND_EXT));
    is_md && !name.eq_ignore_ascii_case(SKILL_MANIFEST) && !is_excluded(name)
}

/// Immediate subdirectories of `dir` (following links), sorted by name.
async fn child_dirs(dir: &Path) -> Vec<PathBuf> {
    children(dir, true).await
}

/// Immediate regular files of `dir` (following links), sorted by name.
async fn child_files(dir: &Path) -> Vec<PathBuf> {
    children(dir, false).await
}

async fn children(dir: &Path, want_dirs: bool) -> Vec<PathBuf> {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return Vec::new();
    };
    let mut out = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Ok(meta) = tokio::fs::metadata(&path).await else {
            continue;
        };
        if (want_dirs && meta.is_dir()) || (!want_dirs && meta.is_file()) {
            out.push(path);
        }
    }
    out.sort();
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join(SKILL_MANIFEST),
            format!("---\nname: {name}\ndescription: {name} skill\n---\nbody\n"),
        )
        .unwrap();
    }

    fn names(assets: &[Asset]) -> Vec<&str> {
        assets.iter().map(|a| a.name.as_str()).collect()
    }

    fn discovery() -> Discovery {
        Discovery::new(&AgentRegistry::builtin())
    }

    #[tokio::test]
    async fn test_subpath_pointing_at_skill() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("skills/review"), "review");
        write_skill(&tmp.path().join("skills/other"), "other");

        let found = discovery()
            .discover_skills(tmp.path(), Some("skills/review"))
            .await;
        assert_eq!(names(&found), vec!["review"]);
    }

    #[tokio::test]
    async fn test_priority_dirs_first_name_wins() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("skills/alpha"), "alpha");
        write_skill(&tmp.path().join("skills/.curated/beta"), "beta");
        write_skill(&tmp.path().join(".claude/skills/gamma"), "gamma");
        // Same name later in the priority list is ignored.
        write_skill(&tmp.path().join(".cursor/skills/alpha-copy"), "alpha");
        // Deep skill is not reached when priority dirs produced results.
        write_skill(&tmp.path().join("deep/nested/delta"), "delta");

        let found = discovery().discover_skills(tmp.path(), None).await;
        let mut got = names(&found);
        got.sort_unstable();
        assert_eq!(got, vec!["alpha", "beta", "gamma"]);
        let alpha = found.iter().find(|a| a.name == "alpha").unwrap();
        assert!(alpha.source_path.ends_with("skills/alpha"));
    }

    #[tokio::test]
    async fn test_recursive_fallback_respects_skip_and_depth() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("pkgs/tools/fmt"), "fmt");
        write_skill(&tmp.path().join("node_modules/x/hidden"), "hidden");
        write_skill(&tmp.path().join("a/b/c/d/e/f/too-deep"), "too-deep");

        let found = discovery().discover_skills(tmp.path(), None).await;
        assert_eq!(names(&found), vec!["fmt"]);

        let shallow = discovery()
            .with_max_depth(1)
            .discover_skills(tmp.path(), None)
            .await;
        assert!(shallow.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_manifests_do_not_abort() {
        let tmp = tempfile::tempdir().unwrap();
        let broken = tmp.path().join("skills/broken");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join(SKILL_MANIFEST), "---\nname: broken\n---\n").unwrap();
        write_skill(&tmp.path().join("skills/fine"), "fine");

        let found = discovery().discover_skills(tmp.path(), None).await;
        assert_eq!(names(&found), vec!["fine"]);
    }

    #[tokio::test]
    async fn test_commands_from_conventional_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let commands = tmp.path().join("commands");
        std::fs::create_dir_all(&commands).unwrap();
        std::fs::write(commands.join("deploy.md"), "---\ndescription: Deploy\n---\nGo.\n").unwrap();
        std::fs::write(commands.join("notes.txt"), "---\ndescription: nope\n---\n").unwrap();
        std::fs::write(commands.join("plain.md"), "no header").unwrap();
        let claude = tmp.path().join(".claude/commands");
        std::fs::create_dir_all(&claude).unwrap();
        std::fs::write(claude.join("lint.md"), "---\ndescription: Lint\n---\n").unwrap();

        let found = discovery().discover_commands(tmp.path(), None).await;
        assert_eq!(names(&found), vec!["deploy", "lint"]);

        let single = discovery()
            .discover_commands(tmp.path(), Some("commands/deploy.md"))
            .await;
        assert_eq!(names(&single), vec!["deploy"]);
    }

    #[tokio::test]
    async fn test_recursive_walk_descends_into_skill_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(&tmp.path().join("pkgs/outer"), "outer");
        write_skill(&tmp.path().join("pkgs/outer/inner"), "inner");

        let found = discovery().discover_skills(tmp.path(), None).await;
        assert_eq!(names(&found), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn test_skill_dir_subpath_yields_no_commands() {
        let tmp = tempfile::tempdir().unwrap();
        let review = tmp.path().join("skills/review");
        write_skill(&review, "review");
        std::fs::write(review.join("usage.md"), "---\ndescription: Usage\n---\n").unwrap();

        let found = discovery()
            .discover_commands(tmp.path(), Some("skills/review"))
            .await;
        assert!(found.is_empty());

        let single = discovery()
            .discover_commands(tmp.path(), Some("skills/review/SKILL.md"))
            .await;
        assert!(single.is_empty());
    }

    #[tokio::test]
    async fn test_command_subpath_skips_readme_and_private_files() {
        let tmp = tempfile::tempdir().unwrap();
        let pack = tmp.path().join("pack");
        std::fs::create_dir_all(&pack).unwrap();
        std::fs::write(pack.join("README.md"), "---\ndescription: Readme\n---\n").unwrap();
        std::fs::write(pack.join("_draft.md"), "---\ndescription: Draft\n---\n").unwrap();
        std::fs::write(pack.join("ship.md"), "---\ndescription: Ship\n---\n").unwrap();

        let found = discovery().discover_commands(tmp.path(), Some("pack")).await;
        assert_eq!(names(&found), vec!["ship"]);
    }
}
