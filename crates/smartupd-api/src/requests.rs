//! Request types for the API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Entity ids given either as a list or as a comma-separated string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum EntityIdList {
    List(Vec<String>),
    Joined(String),
}

impl EntityIdList {
    /// Flatten into trimmed, lowercase ids, dropping blanks
    #[must_use]
    pub fn into_ids(self) -> Vec<String> {
        let raw = match self {
            EntityIdList::List(ids) => ids,
            EntityIdList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|id| id.trim().to_lowercase())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

/// Body of the `update_selected` service call
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateSelectedRequest {
    pub entity_id: EntityIdList,
}

/// Partial options update; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OptionsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update_entities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_restart: Option<bool>,
}
