//! Update aggregation over the host's update entities

use smartupd_api::UpdateCandidate;
use smartupd_hass::types::STATE_OFF;
use smartupd_hass::{EntityState, HostPlatform};
use tracing::debug;

use crate::error::CoreError;

/// Display name used for the core platform update
pub const CORE_UPDATE_NAME: &str = "Home Assistant Core";

/// Which entities the aggregator looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorSettings {
    /// Registry platform whose `update` entities are scanned
    pub source_platform: String,
    /// Core platform update entity, appended last
    pub core_update_entity: Option<String>,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            source_platform: "hacs".to_string(),
            core_update_entity: Some("update.home_assistant_core_update".to_string()),
        }
    }
}

/// Turn an entity state into a candidate if it has something to install
#[must_use]
pub fn candidate_from_state(state: &EntityState, name: String) -> Option<UpdateCandidate> {
    if !state.is_available() || state.state == STATE_OFF {
        return None;
    }
    let latest = state.latest_version()?;
    let installed = state.installed_version();
    if latest == STATE_OFF || Some(latest) == installed {
        return None;
    }
    Some(UpdateCandidate {
        name,
        entity_id: state.entity_id.clone(),
        installed_version: installed.map(str::to_string),
        latest_version: latest.to_string(),
    })
}

/// Collect pending updates in discovery order, core update last
///
/// # Errors
/// Returns an error if the registry or a state cannot be read.
pub async fn aggregate(
    host: &dyn HostPlatform,
    settings: &AggregatorSettings,
) -> Result<Vec<UpdateCandidate>, CoreError> {
    let registry = host.entity_registry().await?;
    let core_id = settings.core_update_entity.as_deref();

    let mut updates = Vec::new();
    for entry in registry
        .iter()
        .filter(|e| e.platform == settings.source_platform && e.domain() == "update")
        .filter(|e| !e.is_disabled())
        .filter(|e| Some(e.entity_id.as_str()) != core_id)
    {
        let Some(state) = host.state(&entry.entity_id).await? else {
            debug!(entity = %entry.entity_id, "no state, skipping");
            continue;
        };
        if let Some(candidate) = candidate_from_state(&state, state.name()) {
            updates.push(candidate);
        }
    }

    if let Some(core_id) = core_id
        && let Some(state) = host.state(core_id).await?
        && let Some(candidate) = candidate_from_state(&state, CORE_UPDATE_NAME.to_string())
    {
        updates.push(candidate);
    }

    debug!(count = updates.len(), "aggregated pending updates");
    Ok(updates)
}
