//! Turning user-supplied source references into clone URLs.

use std::{fmt, path::Path};

use crate::error::{Error, Result};

/// Hosting platform of a source repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Github,
    Gitlab,
    /// Any other git URL, used verbatim.
    Git,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Git => "git",
        })
    }
}

/// A resolved source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    pub platform: Platform,
    pub clone_url: String,
    pub branch: Option<String>,
    pub subpath: Option<String>,
}

struct Host {
    platform: Platform,
    domain: &'static str,
    /// Path segments between `<owner>/<repo>` and the branch.
    tree: &'static [&'static str],
}

const HOSTS: &[Host] = &[
    Host {
        platform: Platform::Github,
        domain: "github.com",
        tree: &["tree"],
    },
    Host {
        platform: Platform::Gitlab,
        domain: "gitlab.com",
        tree: &["-", "tree"],
    },
];

/// Resolve a source reference. First match wins:
///
/// 1. `<host>/<owner>/<repo>/tree/<branch>[/<subpath>]` (GitLab: `/-/tree/`)
/// 2. `<host>/<owner>/<repo>`
/// 3. `owner/repo[/subpath]` shorthand for GitHub
/// 4. anything else, as a plain git URL
pub fn parse_source(input: &str) -> Result<RepoDescriptor> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::resolution(input, "empty source"));
    }

    let hosted: Vec<(&Host, Vec<&str>)> = HOSTS
        .iter()
        .filter_map(|host| host_segments(input, host.domain).map(|segs| (host, segs)))
        .collect();

    for (host, segs) in &hosted {
        if let Some(desc) = tree_form(host, segs) {
            return Ok(desc);
        }
    }
    for (host, segs) in &hosted {
        if let [owner, repo, ..] = segs.as_slice() {
            return Ok(RepoDescriptor {
                platform: host.platform,
                clone_url: repo_url(host.domain, owner, repo),
                branch: None,
                subpath: None,
            });
        }
    }

    if let Some(desc) = shorthand(input) {
        return Ok(desc);
    }

    Ok(RepoDescriptor {
        platform: Platform::Git,
        clone_url: input.to_string(),
        branch: None,
        subpath: None,
    })
}

/// Browser URL of `file` inside a checkout of `desc`.
pub fn build_file_url(desc: &RepoDescriptor, checkout_root: &Path, file: &Path) -> String {
    let rel = file
        .strip_prefix(checkout_root)
        .unwrap_or(file)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let base = desc.clone_url.trim_end_matches(".git");
    let branch = desc.branch.as_deref().unwrap_or("main");
    match desc.platform {
        Platform::Github => format!("{base}/blob/{branch}/{rel}"),
        Platform::Gitlab => format!("{base}/-/blob/{branch}/{rel}"),
        Platform::Git => desc.clone_url.clone(),
    }
}

/// Path segments following a leading `[http[s]://][www.]<domain>/`, or
/// `None` if the input is not on `domain` or fewer than two segments follow.
fn host_segments<'a>(input: &'a str, domain: &str) -> Option<Vec<&'a str>> {
    let rest = ["https://", "http://"]
        .iter()
        .find_map(|&scheme| input.strip_prefix(scheme))
        .unwrap_or(input);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let rest = rest.strip_prefix(domain)?.strip_prefix('/')?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let segs: Vec<&str> = rest.split('/').collect();
    match segs.as_slice() {
        [owner, repo, ..] if !owner.is_empty() && !repo.is_empty() => Some(segs),
        _ => None,
    }
}

fn tree_form(host: &Host, segs: &[&str]) -> Option<RepoDescriptor> {
    let marker_end = 2 + host.tree.len();
    if segs.len() <= marker_end || segs[2..marker_end] != *host.tree {
        return None;
    }
    let branch = segs[marker_end];
    if branch.is_empty() {
        return None;
    }
    let subpath = segs[marker_end + 1..].join("/");
    let subpath = subpath.trim_matches('/');
    Some(RepoDescriptor {
        platform: host.platform,
        clone_url: repo_url(host.domain, segs[0], segs[1]),
        branch: Some(branch.to_string()),
        subpath: (!subpath.is_empty()).then(|| subpath.to_string()),
    })
}

fn shorthand(input: &str) -> Option<RepoDescriptor> {
    if input.contains(':') {
        return None;
    }
    let trimmed = input.trim_end_matches('/');
    let mut parts = trimmed.splitn(3, '/');
    let owner = parts.next().filter(|s| !s.is_empty() && *s != "." && *s != "..")?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    let subpath = parts.next().map(|s| s.trim_matches('/')).filter(|s| !s.is_empty());
    Some(RepoDescriptor {
        platform: Platform::Github,
        clone_url: repo_url("github.com", owner, repo),
        branch: None,
        subpath: subpath.map(str::to_string),
    })
}

fn repo_url(domain: &str, owner: &str, repo: &str) -> String {
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    format!("https://{domain}/{owner}/{repo}.git")
}
