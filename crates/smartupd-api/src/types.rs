//! Update model shared between the daemon and its clients

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum number of records kept in the update history
pub const HISTORY_CAPACITY: usize = 100;

/// An entity with a newer version available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UpdateCandidate {
    /// Display name of the component
    pub name: String,
    /// Update entity id (e.g. `update.mushroom_update`)
    pub entity_id: String,
    /// Currently installed version, if the host reports one
    pub installed_version: Option<String>,
    /// Latest available version
    pub latest_version: String,
}

/// One applied version change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryRecord {
    /// Display name of the component after the install
    pub name: String,
    /// Installed version before the install call
    pub old_version: String,
    /// Installed version after the install call
    pub new_version: String,
    /// When the change was recorded
    pub timestamp: DateTime<FixedOffset>,
}

/// Aggregated view of pending updates, refreshed once per polling cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SensorSnapshot {
    /// Number of pending updates
    pub count: usize,
    /// Pending updates in discovery order
    pub updates: Vec<UpdateCandidate>,
    /// When the snapshot was taken
    pub refreshed_at: DateTime<Utc>,
}

impl SensorSnapshot {
    /// Build a snapshot, deriving the count from the candidate list
    #[must_use]
    pub fn new(updates: Vec<UpdateCandidate>, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            count: updates.len(),
            updates,
            refreshed_at,
        }
    }

    /// Whether the given entity has a pending update
    #[must_use]
    pub fn contains(&self, entity_id: &str) -> bool {
        self.updates.iter().any(|u| u.entity_id == entity_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
