//! Metric name and label definitions.

/// Install / remove / discovery metrics
pub mod skills {
    /// Installation attempts (one per source)
    pub const INSTALLATION_ATTEMPTS_TOTAL: &str = "skillet_installation_attempts_total";
    /// Installation duration in seconds
    pub const INSTALLATION_DURATION_SECONDS: &str = "skillet_installation_duration_seconds";
    /// Per-target deployment failures
    pub const DEPLOY_FAILURES_TOTAL: &str = "skillet_deploy_failures_total";
    /// Installations removed
    pub const REMOVALS_TOTAL: &str = "skillet_removals_total";
    /// Assets found by discovery
    pub const DISCOVERED_TOTAL: &str = "skillet_discovered_total";
    /// Manifests rejected during discovery
    pub const PARSE_ERRORS_TOTAL: &str = "skillet_parse_errors_total";
    /// Lockfile entries dropped by orphan reconciliation
    pub const ORPHANS_RECONCILED_TOTAL: &str = "skillet_orphans_reconciled_total";
}

/// Remote drift checks
pub mod updates {
    /// Entries checked against their remote
    pub const CHECKS_TOTAL: &str = "skillet_update_checks_total";
    /// Entries whose remote could not be queried
    pub const CHECK_ERRORS_TOTAL: &str = "skillet_update_check_errors_total";
    /// Entries updated to a newer commit
    pub const APPLIED_TOTAL: &str = "skillet_updates_applied_total";
}

/// Directory listing client
pub mod directory {
    /// HTTP fetches of the listing
    pub const FETCHES_TOTAL: &str = "skillet_directory_fetches_total";
    /// Requests answered from cache
    pub const CACHE_HITS_TOTAL: &str = "skillet_directory_cache_hits_total";
    /// Stale cache served after a failed fetch
    pub const STALE_SERVED_TOTAL: &str = "skillet_directory_stale_served_total";
}

/// Common label keys
pub mod labels {
    pub const KIND: &str = "kind";
    pub const SCOPE: &str = "scope";
    pub const MODE: &str = "mode";
    pub const AGENT: &str = "agent";
    pub const ERROR_TYPE: &str = "error_type";
}
