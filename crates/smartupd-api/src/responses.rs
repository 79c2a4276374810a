//! Response types for the API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::HistoryRecord;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Result of an `update_selected` call
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateSelectedResponse {
    /// Entities the install action was issued for, in order
    pub requested: Vec<String>,
    /// Version changes recorded during the call
    pub applied: Vec<HistoryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub records: Vec<HistoryRecord>,
}

/// Current auto-update options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OptionsResponse {
    pub auto_update_time: String,
    pub auto_update_entities: Vec<String>,
    pub auto_restart: bool,
}
