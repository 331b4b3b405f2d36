//! Tuning knobs for planning and execution.

/// Engine configuration shared by the optimizer and the executor.
///
/// None of these values affect query results, only which plan is picked
/// and how it is run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// An IN list or OR predicate with at least this percentage of the
    /// table's row count as values is answered by a full scan instead of
    /// one index probe per value.
    pub index_query_threshold_percent: u32,
    /// Number of right-hand rows scanned per block by the nested-loop join.
    pub nested_loop_block_size: usize,
    /// Allow the index nested-loop join strategy.
    pub enable_index_join: bool,
    /// Allow the hash join strategy.
    pub enable_hash_join: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_query_threshold_percent: 2,
            nested_loop_block_size: 256,
            enable_index_join: true,
            enable_hash_join: true,
        }
    }
}

impl EngineConfig {
    /// Largest number of probe values an index may be used for on a table
    /// of `row_count` rows.
    pub fn index_probe_limit(&self, row_count: usize) -> usize {
        row_count.saturating_mul(self.index_query_threshold_percent as usize) / 100
    }

    /// The nested-loop block size, never zero.
    pub fn block_size(&self) -> usize {
        self.nested_loop_block_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.index_query_threshold_percent, 2);
        assert_eq!(config.block_size(), 256);
        assert_eq!(config.index_probe_limit(1000), 20);
        assert_eq!(config.index_probe_limit(10), 0);
    }

    #[test]
    fn test_zero_block_size_is_clamped() {
        let config = EngineConfig {
            nested_loop_block_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.block_size(), 1);
    }
}
