/// Knobs governing one synchronization cycle.
pub struct SyncConfig {
    /// Maximum levels per page, also the batch size for account ids.
    pub block_page_size: usize,
    /// In-flight cap for per-block operations and votes fetches.
    pub block_operations_concurrency_level: usize,
    /// In-flight cap for per-account fetches.
    pub account_concurrency_level: usize,
    /// Whether each cycle performs fork detection.
    pub follow_fork: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            block_page_size: 500,
            block_operations_concurrency_level: 10,
            account_concurrency_level: 5,
            follow_fork: true,
        }
    }
}
