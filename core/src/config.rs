//! Defaults and tuning knobs shared by the indexer, the query CLI and the server.
//!
//! Runtime values come from CLI arguments; these constants are what they
//! fall back to.

use std::time::Duration;

/// Number of ranked documents returned when the caller does not ask for a specific `k`.
pub const DEFAULT_TOP_K: usize = 50;

/// Upper bound on `k` accepted from callers.
pub const MAX_TOP_K: usize = 10_000;

/// Terms shorter than this (after stemming) are dropped.
pub const MIN_TERM_LEN: usize = 3;

/// Shard count used by the build pipeline when none is given.
pub const DEFAULT_SHARDS: usize = 8;

/// How many postings the scorer walks between deadline checks.
pub const TIMEOUT_CHECK_INTERVAL: usize = 4096;

/// Version written into `meta.json`. Bumped whenever a persisted format changes.
pub const INDEX_FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct ScoringOptions {
    pub top_k: usize,
    /// Bound on the accumulation loop. `None` disables the check.
    pub timeout: Option<Duration>,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K, timeout: None }
    }
}

impl ScoringOptions {
    pub fn with_top_k(k: usize) -> Self {
        Self { top_k: k.clamp(1, MAX_TOP_K), ..Self::default() }
    }
}
