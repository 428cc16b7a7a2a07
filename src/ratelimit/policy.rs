//! Query interface consumed by an enforcement engine.

use crate::error::Result;

/// What an enforcement engine needs to know about a configured limit.
///
/// The engine owns counters and admission decisions; implementations of this
/// trait only answer which requests a limit covers and how large it is.
pub trait PathLimit: Send + Sync {
    /// Whether this limit governs a request for `path`.
    fn match_path(&self, path: &str) -> Result<bool>;

    /// Length of the counting window in seconds.
    fn window_seconds(&self) -> Result<u64>;

    /// Requests permitted within one window.
    fn max_requests(&self) -> i64;

    /// Effective matching target, for grouping and labeling.
    fn path_key(&self) -> Option<&str>;
}
