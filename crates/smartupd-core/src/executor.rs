//! Update execution
//!
//! Installs run one entity at a time. Each install call is fully awaited
//! before the next starts, and the first failure aborts the rest of a batch.

use chrono::Local;
use smartupd_api::HistoryRecord;
use smartupd_hass::{HostPlatform, ServiceCall};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::history::History;

/// Version string recorded when the host reports none
pub const MISSING_VERSION: &str = "N/A";

/// What happened to one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Entity unknown to the host before or after the install
    Missing,
    /// Install finished but the installed version did not change
    Unchanged {
        /// Installed version before and after
        version: String,
    },
    /// Version changed and was recorded
    Applied(HistoryRecord),
}

impl UpdateOutcome {
    /// The recorded change, if any
    #[must_use]
    pub fn record(&self) -> Option<&HistoryRecord> {
        match self {
            UpdateOutcome::Applied(record) => Some(record),
            _ => None,
        }
    }
}

/// Result of a sequential batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Per-entity outcomes in processing order
    pub outcomes: Vec<(String, UpdateOutcome)>,
}

impl BatchReport {
    /// Entity ids that were processed
    #[must_use]
    pub fn entity_ids(&self) -> Vec<String> {
        self.outcomes.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Records created during the batch, in processing order
    #[must_use]
    pub fn applied(&self) -> Vec<HistoryRecord> {
        self.outcomes
            .iter()
            .filter_map(|(_, outcome)| outcome.record().cloned())
            .collect()
    }
}

/// Install the update for one entity and record a version change
///
/// # Errors
/// Returns an error if the install call, a state read or persisting the
/// history fails.
pub async fn perform_update(
    host: &dyn HostPlatform,
    history: &mut History,
    entity_id: &str,
) -> Result<UpdateOutcome, CoreError> {
    let Some(before) = host.state(entity_id).await? else {
        debug!(entity = %entity_id, "entity not found, skipping install");
        return Ok(UpdateOutcome::Missing);
    };
    let old_version = before
        .installed_version()
        .unwrap_or(MISSING_VERSION)
        .to_string();

    info!(entity = %entity_id, from = %old_version, "installing update");
    host.call_service(&ServiceCall::install_update(entity_id))
        .await?;

    let Some(after) = host.state(entity_id).await? else {
        debug!(entity = %entity_id, "entity disappeared after install");
        return Ok(UpdateOutcome::Missing);
    };
    let new_version = after
        .installed_version()
        .unwrap_or(MISSING_VERSION)
        .to_string();

    if old_version == new_version {
        info!(entity = %entity_id, version = %new_version, "installed version unchanged");
        return Ok(UpdateOutcome::Unchanged {
            version: new_version,
        });
    }

    let record = HistoryRecord {
        name: after.name(),
        old_version,
        new_version,
        timestamp: Local::now().fixed_offset(),
    };
    info!(
        entity = %entity_id,
        from = %record.old_version,
        to = %record.new_version,
        "update applied"
    );
    history.record(record.clone()).await?;

    Ok(UpdateOutcome::Applied(record))
}

/// Update several entities strictly in the given order
///
/// `on_outcome` is called after each entity so callers can report progress
/// even when a later entity fails.
///
/// # Errors
/// Returns the first failure; remaining entities are not attempted.
pub async fn perform_batch<F>(
    host: &dyn HostPlatform,
    history: &mut History,
    entity_ids: &[String],
    mut on_outcome: F,
) -> Result<BatchReport, CoreError>
where
    F: FnMut(&str, &UpdateOutcome) + Send,
{
    let mut report = BatchReport::default();
    for entity_id in entity_ids {
        let outcome = perform_update(host, history, entity_id).await?;
        on_outcome(entity_id, &outcome);
        report.outcomes.push((entity_id.clone(), outcome));
    }
    Ok(report)
}
