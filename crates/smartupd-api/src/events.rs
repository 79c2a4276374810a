//! WebSocket event types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::HistoryRecord;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum UpdaterEvent {
    SnapshotRefreshed {
        count: usize,
    },
    UpdateApplied {
        entity_id: String,
        record: HistoryRecord,
    },
    UpdateUnchanged {
        entity_id: String,
        version: String,
    },
    AutoUpdateStarted {
        entities: Vec<String>,
    },
    RestartScheduled {
        delay_secs: u64,
    },
    IntegrationReloaded,
}
