use std::{collections::BTreeMap, fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

/// What an installable is: a skill directory or a single command file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Skill,
    Command,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skill" => Ok(Self::Skill),
            "command" => Ok(Self::Command),
            other => Err(format!("unknown asset kind '{other}'")),
        }
    }
}

/// Where an installation lives: user-wide or inside one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Project,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State-store key: `"<kind>:<lowercase name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey {
    kind: AssetKind,
    name: String,
}

impl LockKey {
    pub fn new(name: &str, kind: AssetKind) -> Self {
        Self {
            kind,
            name: name.to_lowercase(),
        }
    }

    /// Parse a serialized key. Returns `None` for anything not shaped like
    /// `skill:<name>` or `command:<name>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, name) = raw.split_once(':')?;
        let kind = kind.parse().ok()?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, kind))
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// The lowercased name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A discovered skill or command ready to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub kind: AssetKind,
    /// Skill directory, or the command's `.md` file.
    pub source_path: PathBuf,
    pub description: String,
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Provenance of one installed asset, as persisted in a lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    pub url: String,
    #[serde(default)]
    pub subpath: Option<String>,
    pub branch: String,
    pub commit: String,
}

/// One agent's on-disk copy (or link) of an asset. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub agent: String,
    pub kind: AssetKind,
    pub scope: Scope,
    pub path: PathBuf,
}

/// A tracked entry tagged with the store it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedInstallable {
    pub name: String,
    pub kind: AssetKind,
    pub scope: Scope,
    pub entry: TrackedEntry,
}

impl TrackedInstallable {
    pub fn key(&self) -> LockKey {
        LockKey::new(&self.name, self.kind)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_lowercases_name() {
        let key = LockKey::new("Code-Review", AssetKind::Skill);
        assert_eq!(key.to_string(), "skill:code-review");
        assert_eq!(key, LockKey::new("code-review", AssetKind::Skill));
        assert_ne!(key, LockKey::new("code-review", AssetKind::Command));
    }

    #[test]
    fn lock_key_parse() {
        let key = LockKey::parse("command:deploy").unwrap();
        assert_eq!(key.kind(), AssetKind::Command);
        assert_eq!(key.name(), "deploy");
        assert!(LockKey::parse("deploy").is_none());
        assert!(LockKey::parse("plugin:deploy").is_none());
        assert!(LockKey::parse("skill:").is_none());
    }

    #[test]
    fn tracked_entry_serializes_null_subpath() {
        let entry = TrackedEntry {
            url: "https://github.com/acme/skills.git".into(),
            subpath: None,
            branch: "main".into(),
            commit: "abc123".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json["subpath"].is_null());
        let back: TrackedEntry = serde_json::from_value(serde_json::json!({
            "url": "u", "branch": "b", "commit": "c"
        }))
        .unwrap();
        assert_eq!(back.subpath, None);
    }
}
