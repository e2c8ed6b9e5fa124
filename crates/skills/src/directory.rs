//! Client for the public directory listing that maps short names to
//! source references.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use {
    serde::{Deserialize, Serialize},
    skillet_config::DirectoryConfig,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use skillet_metrics::{counter, directory as directory_metrics};

use crate::error::{Error, Result};

/// One listed skill collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Last successful fetch and when it stops being fresh.
#[derive(Debug, Clone, Default)]
pub struct DirectoryCache {
    data: Option<Vec<DirectoryEntry>>,
    expiry: Option<Instant>,
}

impl DirectoryCache {
    /// Cached data if it has not expired at `now`.
    pub fn fresh(&self, now: Instant) -> Option<&[DirectoryEntry]> {
        match (&self.data, self.expiry) {
            (Some(data), Some(expiry)) if now < expiry => Some(data),
            _ => None,
        }
    }

    /// Cached data regardless of age.
    pub fn stale(&self) -> Option<&[DirectoryEntry]> {
        self.data.as_deref()
    }

    pub fn store(&mut self, data: Vec<DirectoryEntry>, now: Instant, ttl: Duration) {
        self.data = Some(data);
        self.expiry = Some(now + ttl);
    }
}

pub struct DirectoryClient {
    http: reqwest::Client,
    url: String,
    ttl: Duration,
    cache: Mutex<DirectoryCache>,
    clock: Arc<dyn Clock>,
}

impl DirectoryClient {
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &DirectoryConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("skillet/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            cache: Mutex::new(DirectoryCache::default()),
            clock,
        })
    }

    /// The full listing. Served from cache while fresh; on fetch failure the
    /// last good listing is returned if there is one.
    pub async fn list(&self) -> Result<Vec<DirectoryEntry>> {
        let now = self.clock.now();
        let fresh = self.lock_cache().fresh(now).map(<[DirectoryEntry]>::to_vec);
        if let Some(fresh) = fresh {
            #[cfg(feature = "metrics")]
            counter!(directory_metrics::CACHE_HITS_TOTAL).increment(1);
            return Ok(fresh);
        }

        let err = match self.fetch().await {
            Ok(entries) => {
                self.lock_cache().store(entries.clone(), now, self.ttl);
                return Ok(entries);
            },
            Err(e) => e,
        };
        let stale = self.lock_cache().stale().map(<[DirectoryEntry]>::to_vec);
        match stale {
            Some(stale) => {
                #[cfg(feature = "metrics")]
                counter!(directory_metrics::STALE_SERVED_TOTAL).increment(1);
                warn!(url = %self.url, error = %err, "directory fetch failed, serving cached listing");
                Ok(stale)
            },
            None => Err(err),
        }
    }

    /// Source reference listed under `name` (case-insensitive).
    pub async fn resolve_source(&self, name: &str) -> Result<Option<String>> {
        let entries = self.list().await?;
        Ok(entries
            .into_iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.source))
    }

    /// Entries whose name, description, author or tags contain `query`
    /// (case-insensitive). An empty query returns everything.
    pub async fn search(&self, query: &str) -> Result<Vec<DirectoryEntry>> {
        let needle = query.trim().to_lowercase();
        let entries = self.list().await?;
        if needle.is_empty() {
            return Ok(entries);
        }
        Ok(entries
            .into_iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.description.to_lowercase().contains(&needle)
                    || e.author.to_lowercase().contains(&needle)
                    || e.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect())
    }

    async fn fetch(&self) -> Result<Vec<DirectoryEntry>> {
        #[cfg(feature = "metrics")]
        counter!(directory_metrics::FETCHES_TOTAL).increment(1);

        let resp = self.http.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::transfer(&self.url, format!("HTTP {status}")));
        }
        let entries: Vec<DirectoryEntry> = resp.json().await?;
        debug!(url = %self.url, count = entries.len(), "fetched directory");
        Ok(entries)
    }

    fn lock_cache(&self) -> MutexGuard<'_, DirectoryCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether `source` looks like a directory name rather than a repository
/// reference: ASCII letters, digits and `-` only.
pub fn is_directory_name(source: &str) -> bool {
    !source.is_empty()
        && source
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}
