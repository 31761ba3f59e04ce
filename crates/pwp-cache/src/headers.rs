//! Cache status reporting.

use serde::{Deserialize, Serialize};

/// Header names added to responses served by the worker.
pub mod header_names {
    /// Where the response came from (HIT, MISS).
    pub const X_CACHE_STATUS: &str = "x-cache-status";
}

/// Where a stale-while-revalidate response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the cache; the network refreshes it in the background.
    Hit,
    /// Cache empty for the locator; served from the network.
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
