//! Tuning knobs for the watch/debounce/reconcile pipeline and file operations.

use std::time::Duration;

/// Core configuration shared by the watch registry, the opened-file monitor
/// and the robust filesystem helpers.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Quiet window before a watched folder is re-enumerated and reconciled.
    pub folder_debounce: Duration,
    /// Quiet window before the opened file is re-read.
    pub reload_debounce: Duration,
    /// Attempts when reading the opened file (it may be transiently locked
    /// by whatever process is writing it).
    pub read_retries: u32,
    /// Base delay between read attempts; grows linearly per attempt.
    pub read_backoff: Duration,
    /// Attempts when removing a file or directory entry.
    pub remove_retries: u32,
    /// Fixed delay between removal attempts.
    pub remove_backoff: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            folder_debounce: Duration::from_millis(150),
            reload_debounce: Duration::from_millis(200),
            read_retries: 5,
            read_backoff: Duration::from_millis(50),
            remove_retries: 6,
            remove_backoff: Duration::from_millis(80),
        }
    }
}
