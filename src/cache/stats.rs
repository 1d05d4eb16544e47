//! Cache statistics snapshot

/// Point-in-time view of a cache's counters
///
/// `hits` and `misses` count lookups through `get`; `peek` and
/// `contains_key` are not counted. `evictions` counts entries displaced
/// by capacity pressure only, not explicit removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Maximum number of entries the cache holds
    pub capacity: usize,
    /// Entries currently cached
    pub entries: usize,
    /// Lookups that found their key
    pub hits: u64,
    /// Lookups that did not find their key
    pub misses: u64,
    /// Entries displaced to make room for an insert
    pub evictions: u64,
}

impl CacheStats {
    /// Total lookups observed
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate as a percentage, 0.0 when nothing was looked up yet
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64 * 100.0
    }

    /// Miss rate as a percentage, 0.0 when nothing was looked up yet
    pub fn miss_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.misses as f64 / total as f64 * 100.0
    }
}
