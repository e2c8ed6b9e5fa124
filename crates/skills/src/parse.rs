//! Manifest header parsing for `SKILL.md` and command files.
//!
//! The header is a flat `key: value` block between two `---` lines. Values
//! are plain strings; nothing is YAML-typed. The one structured field is
//! `metadata`, an inline `a=b, c=d` list.

use std::{collections::BTreeMap, path::Path};

use tracing::debug;

#[cfg(feature = "metrics")]
use skillet_metrics::{counter, labels, skills as skills_metrics};

use crate::{
    error::{Error, Result},
    types::{Asset, AssetKind},
};

/// Manifest file name inside a skill directory.
pub const SKILL_MANIFEST: &str = "SKILL.md";

const DELIMITER: &str = "---";

/// Parsed `metadata` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    Map(BTreeMap<String, String>),
    /// Input that did not look like `a=b, c=d`, kept verbatim.
    Raw(String),
}

/// A split manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    /// Header fields other than `metadata`, quotes stripped.
    pub data: BTreeMap<String, String>,
    pub metadata: Option<MetadataValue>,
    pub body: String,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn metadata_map(&self) -> Option<BTreeMap<String, String>> {
        match &self.metadata {
            Some(MetadataValue::Map(map)) => Some(map.clone()),
            _ => None,
        }
    }
}

/// Split `content` into header fields and body.
///
/// Content without a header yields empty data and the whole text as body.
/// CRLF line endings are accepted.
pub fn parse_frontmatter(content: &str) -> Frontmatter {
    let normalized = content.replace("\r\n", "\n");
    let Some((header, body)) = split_header(&normalized) else {
        return Frontmatter {
            body: normalized,
            ..Default::default()
        };
    };

    let mut fm = Frontmatter {
        body: body.to_string(),
        ..Default::default()
    };
    for line in header.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        if let Some(unquoted) = unquote(value) {
            if key == "metadata" {
                fm.metadata = Some(MetadataValue::Raw(unquoted.to_string()));
            } else {
                fm.data.insert(key.to_string(), unquoted.to_string());
            }
        } else if key == "metadata" {
            fm.metadata = parse_metadata(value);
        } else {
            fm.data.insert(key.to_string(), value.to_string());
        }
    }
    fm
}

/// Build a skill from its manifest. Both `name` and `description` are
/// required.
pub fn parse_skill_manifest(content: &str, skill_dir: &Path) -> Result<Asset> {
    let fm = parse_frontmatter(content);
    let manifest = skill_dir.join(SKILL_MANIFEST);
    let name = fm
        .get("name")
        .ok_or_else(|| Error::manifest(&manifest, "missing 'name'"))?;
    let description = fm
        .get("description")
        .ok_or_else(|| Error::manifest(&manifest, "missing 'description'"))?;
    Ok(Asset {
        name: name.to_string(),
        kind: AssetKind::Skill,
        source_path: skill_dir.to_path_buf(),
        description: description.to_string(),
        metadata: fm.metadata_map(),
    })
}

/// Build a command from its manifest. `description` is required; the name
/// falls back to the file stem.
pub fn parse_command_manifest(content: &str, file: &Path) -> Result<Asset> {
    let fm = parse_frontmatter(content);
    let description = fm
        .get("description")
        .ok_or_else(|| Error::manifest(file, "missing 'description'"))?;
    let name = match fm.get("name") {
        Some(name) => name.to_string(),
        None => file
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::manifest(file, "cannot derive a name"))?
            .to_string(),
    };
    Ok(Asset {
        name,
        kind: AssetKind::Command,
        source_path: file.to_path_buf(),
        description: description.to_string(),
        metadata: fm.metadata_map(),
    })
}

/// Read `<dir>/SKILL.md`. Missing or invalid manifests yield `None`.
pub async fn read_skill(dir: &Path) -> Option<Asset> {
    let manifest = dir.join(SKILL_MANIFEST);
    let content = tokio::fs::read_to_string(&manifest).await.ok()?;
    match parse_skill_manifest(&content, dir) {
        Ok(asset) => Some(asset),
        Err(e) => {
            #[cfg(feature = "metrics")]
            counter!(skills_metrics::PARSE_ERRORS_TOTAL, labels::KIND => "skill").increment(1);
            debug!(path = %manifest.display(), error = %e, "skipping invalid skill");
            None
        },
    }
}

/// Read a command file. Missing or invalid manifests yield `None`.
pub async fn read_command(file: &Path) -> Option<Asset> {
    let content = tokio::fs::read_to_string(file).await.ok()?;
    match parse_command_manifest(&content, file) {
        Ok(asset) => Some(asset),
        Err(e) => {
            #[cfg(feature = "metrics")]
            counter!(skills_metrics::PARSE_ERRORS_TOTAL, labels::KIND => "command").increment(1);
            debug!(path = %file.display(), error = %e, "skipping invalid command");
            None
        },
    }
}

fn split_header(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix(DELIMITER)?;
    let rest = rest.strip_prefix('\n')?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((header, body));
        }
        offset += line.len();
    }
    None
}

fn unquote(value: &str) -> Option<&str> {
    if value.len() < 2 {
        return None;
    }
    ['"', '\'']
        .into_iter()
        .find(|q| value.starts_with(*q) && value.ends_with(*q))
        .map(|_| &value[1..value.len() - 1])
}

fn parse_metadata(value: &str) -> Option<MetadataValue> {
    let inner = value.trim();
    let inner = inner
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .unwrap_or(inner)
        .trim();
    if inner.is_empty() {
        return None;
    }

    let mut map = BTreeMap::new();
    for pair in inner.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((k, v)) = pair.split_once('=') else {
            return Some(MetadataValue::Raw(value.to_string()));
        };
        let k = k.trim();
        if k.is_empty() {
            return Some(MetadataValue::Raw(value.to_string()));
        }
        let v = v.trim();
        map.insert(k.to_string(), unquote(v).unwrap_or(v).to_string());
    }
    Some(MetadataValue::Map(map))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_values_are_unquoted() {
        let content = "---\nname: \"my-skill\"\ndescription: 'Does things: well'\n---\n# Body\n";
        let fm = parse_frontmatter(content);
        assert_eq!(fm.get("name"), Some("my-skill"));
        assert_eq!(fm.get("description"), Some("Does things: well"));
        assert_eq!(fm.body, "# Body\n");
    }

    #[test]
    fn test_crlf_header() {
        let content = "---\r\nname: x\r\ndescription: y\r\n---\r\nbody\r\n";
        let fm = parse_frontmatter(content);
        assert_eq!(fm.get("name"), Some("x"));
        assert_eq!(fm.body, "body\n");
    }

    #[test]
    fn test_no_header_is_all_body() {
        let fm = parse_frontmatter("# Just markdown\n");
        assert!(fm.data.is_empty());
        assert_eq!(fm.body, "# Just markdown\n");

        let unterminated = "---\nname: x\n";
        let fm = parse_frontmatter(unterminated);
        assert!(fm.data.is_empty());
        assert_eq!(fm.body, unterminated);
    }

    #[test]
    fn test_metadata_map() {
        let content =
            "---\nname: a\ndescription: b\nmetadata: {author=acme, version=\"1.2\"}\n---\n";
        let fm = parse_frontmatter(content);
        let Some(MetadataValue::Map(map)) = fm.metadata else {
            panic!("expected map");
        };
        assert_eq!(map["author"], "acme");
        assert_eq!(map["version"], "1.2");
        assert!(!fm.data.contains_key("metadata"));
    }

    #[test]
    fn test_malformed_metadata_kept_raw() {
        let fm = parse_frontmatter("---\nmetadata: not a list\n---\n");
        assert_eq!(
            fm.metadata,
            Some(MetadataValue::Raw("not a list".to_string()))
        );
        let fm = parse_frontmatter("---\nmetadata: {}\n---\n");
        assert_eq!(fm.metadata, None);
    }

    #[test]
    fn test_skill_requires_name_and_description() {
        let dir = Path::new("/repo/skills/review");
        let ok = parse_skill_manifest("---\nname: review\ndescription: Reviews\n---\n", dir)
            .unwrap();
        assert_eq!(ok.name, "review");
        assert_eq!(ok.kind, AssetKind::Skill);
        assert_eq!(ok.source_path, dir);

        let err = parse_skill_manifest("---\ndescription: Reviews\n---\n", dir).unwrap_err();
        assert!(matches!(err, Error::Manifest { .. }));
        assert!(parse_skill_manifest("---\nname: review\n---\n", dir).is_err());
        assert!(parse_skill_manifest("---\nname: \"\"\ndescription: d\n---\n", dir).is_err());
    }

    #[test]
    fn test_command_name_falls_back_to_stem() {
        let file = Path::new("/repo/commands/deploy.md");
        let cmd = parse_command_manifest("---\ndescription: Ship it\n---\nRun deploy.\n", file)
            .unwrap();
        assert_eq!(cmd.name, "deploy");
        assert_eq!(cmd.kind, AssetKind::Command);

        let named =
            parse_command_manifest("---\nname: release\ndescription: d\n---\n", file).unwrap();
        assert_eq!(named.name, "release");

        assert!(parse_command_manifest("no header", file).is_err());
    }

    #[tokio::test]
    async fn test_read_skill_skips_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good");
        let bad = tmp.path().join("bad");
        std::fs::create_dir_all(&good).unwrap();
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(good.join(SKILL_MANIFEST), "---\nname: good\ndescription: d\n---\n")
            .unwrap();
        std::fs::write(bad.join(SKILL_MANIFEST), "---\nname: bad\n---\n").unwrap();

        assert_eq!(read_skill(&good).await.unwrap().name, "good");
        assert!(read_skill(&bad).await.is_none());
        assert!(read_skill(&tmp.path().join("missing")).await.is_none());
    }
}
