#[derive(Debug, Clone)]
pub struct Config {
    pub chunk_size_threshold: usize,            // Split chunks past this many encoded bytes
    pub stats_cache_capacity: usize,            // Per-slot statistics MRU entries
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_size_threshold: 2000,         // One value may overshoot; a new chunk starts after
            stats_cache_capacity: 1,            // Most-recently-used slot only
        }
    }
}
