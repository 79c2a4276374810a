//! Message types for actor communication
//!
//! Message handlers are implemented in the actor module.

use kameo_macros::Reply;

use crate::executor::BatchReport;

/// Re-run the aggregator and replace the snapshot
#[derive(Debug)]
pub struct RefreshSnapshot;

/// Read the last snapshot without refreshing
#[derive(Debug)]
pub struct GetSnapshot;

/// Manually update the given entities, in order
#[derive(Debug)]
pub struct UpdateSelected {
    /// Entity ids, already validated by the caller
    pub entity_ids: Vec<String>,
}

/// Scheduled auto-update run
#[derive(Debug)]
pub struct RunAutoUpdate;

/// Read the update history, newest first
#[derive(Debug)]
pub struct GetHistory;

/// Outcome of a scheduled run
#[derive(Debug, Clone, Default, Reply)]
pub struct AutoUpdateReport {
    /// Configured entities that had a pending update, in config order
    pub targets: Vec<String>,
    /// Executor results for the targets
    pub batch: BatchReport,
    /// Whether the caller should restart the host after the grace delay
    pub restart: bool,
}

impl AutoUpdateReport {
    /// Nothing was eligible this cycle
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.targets.is_empty()
    }
}
