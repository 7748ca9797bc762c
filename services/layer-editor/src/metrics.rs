//! Editor metrics.
//!
//! Counters are reported through the `metrics` facade; the embedding
//! application installs an exporter if it wants them. Local copies are kept
//! for logging and tests.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// How a save attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    Success,
    Invalid,
    Failed,
}

impl SaveResult {
    fn label(&self) -> &'static str {
        match self {
            SaveResult::Success => "success",
            SaveResult::Invalid => "invalid",
            SaveResult::Failed => "failed",
        }
    }
}

/// Metrics collector for one editor.
#[derive(Debug, Default)]
pub struct EditorMetrics {
    pub saves: AtomicU64,
    pub save_failures: AtomicU64,
    /// Results dropped because a newer operation replaced their state
    pub stale_results: AtomicU64,
}

impl EditorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a save attempt
    pub fn record_save(&self, result: SaveResult) {
        match result {
            SaveResult::Success => {
                self.saves.fetch_add(1, Ordering::Relaxed);
            }
            SaveResult::Failed => {
                self.save_failures.fetch_add(1, Ordering::Relaxed);
            }
            SaveResult::Invalid => {}
        }
        counter!("layer_editor_saves_total", "result" => result.label()).increment(1);
    }

    /// Record a dropped stale result
    pub fn record_stale_result(&self, operation: &'static str) {
        self.stale_results.fetch_add(1, Ordering::Relaxed);
        counter!("layer_editor_stale_results_total", "operation" => operation).increment(1);
    }

    pub fn stale_results(&self) -> u64 {
        self.stale_results.load(Ordering::Relaxed)
    }
}
