//! `UpdaterActor`: owner of the update snapshot and history
//!
//! All installs, history appends and snapshot refreshes go through this
//! actor's mailbox, so they never run concurrently with each other.

use std::sync::Arc;

use chrono::Utc;
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use serde_json::json;
use smartupd_api::events::UpdaterEvent;
use smartupd_api::{HistoryRecord, SensorSnapshot};
use smartupd_hass::HostPlatform;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::aggregator::{self, AggregatorSettings};
use crate::error::CoreError;
use crate::executor::{self, BatchReport, UpdateOutcome};
use crate::history::History;
use crate::message::{
    AutoUpdateReport, GetHistory, GetSnapshot, RefreshSnapshot, RunAutoUpdate, UpdateSelected,
};
use crate::options::AutoUpdateConfig;
use crate::trigger::select_targets;

/// Where the snapshot is mirrored on the host
#[derive(Debug, Clone)]
pub struct SensorPublish {
    /// Sensor entity id, e.g. `sensor.smart_updater_updates`
    pub entity_id: String,
    /// Friendly name shown by the host
    pub friendly_name: String,
}

impl Default for SensorPublish {
    fn default() -> Self {
        Self {
            entity_id: "sensor.smart_updater_updates".to_string(),
            friendly_name: "Smart Updater".to_string(),
        }
    }
}

/// Arguments for spawning an `UpdaterActor`
pub struct UpdaterActorArgs {
    /// Host platform the updater reads from and installs through
    pub host: Arc<dyn HostPlatform>,
    /// History loaded at setup
    pub history: History,
    /// Options of the integration entry
    pub options: AutoUpdateConfig,
    /// Aggregator scope
    pub aggregator: AggregatorSettings,
    /// Mirror the snapshot as a host sensor, if set
    pub publish: Option<SensorPublish>,
    /// Event broadcast sender for WebSocket
    pub event_tx: broadcast::Sender<UpdaterEvent>,
}

/// Actor owning the live snapshot and the history list
pub struct UpdaterActor {
    host: Arc<dyn HostPlatform>,
    history: History,
    options: AutoUpdateConfig,
    aggregator: AggregatorSettings,
    publish: Option<SensorPublish>,
    event_tx: broadcast::Sender<UpdaterEvent>,
    /// Last successful aggregation, `None` until the first poll completes
    snapshot: Option<SensorSnapshot>,
}

impl UpdaterActor {
    /// Options this instance was set up with
    #[must_use]
    pub fn options(&self) -> &AutoUpdateConfig {
        &self.options
    }

    fn emit(&self, event: UpdaterEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn emit_outcome(
        event_tx: &broadcast::Sender<UpdaterEvent>,
        entity_id: &str,
        outcome: &UpdateOutcome,
    ) {
        let event = match outcome {
            UpdateOutcome::Missing => return,
            UpdateOutcome::Unchanged { version } => UpdaterEvent::UpdateUnchanged {
                entity_id: entity_id.to_string(),
                version: version.clone(),
            },
            UpdateOutcome::Applied(record) => UpdaterEvent::UpdateApplied {
                entity_id: entity_id.to_string(),
                record: record.clone(),
            },
        };
        let _ = event_tx.send(event);
    }

    /// Mirror the snapshot onto the host sensor; failures only log
    async fn publish_snapshot(&self, snapshot: &SensorSnapshot) {
        let Some(publish) = &self.publish else {
            return;
        };
        let attributes = json!({
            "updates": snapshot.updates,
            "friendly_name": publish.friendly_name,
            "icon": "mdi:update",
        });
        if let Err(e) = self
            .host
            .set_state(&publish.entity_id, &snapshot.count.to_string(), attributes)
            .await
        {
            warn!(entity = %publish.entity_id, error = %e, "failed to publish sensor state");
        }
    }

    async fn run_batch(&mut self, entity_ids: &[String]) -> Result<BatchReport, CoreError> {
        let event_tx = self.event_tx.clone();
        executor::perform_batch(
            self.host.as_ref(),
            &mut self.history,
            entity_ids,
            |id, outcome| Self::emit_outcome(&event_tx, id, outcome),
        )
        .await
    }
}

impl Actor for UpdaterActor {
    type Args = UpdaterActorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        info!(
            id = %actor_ref.id(),
            host = args.host.platform_type(),
            history = args.history.len(),
            auto_update_time = %args.options.auto_update_time,
            "UpdaterActor starting"
        );

        Ok(Self {
            host: args.host,
            history: args.history,
            options: args.options,
            aggregator: args.aggregator,
            publish: args.publish,
            event_tx: args.event_tx,
            snapshot: None,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(reason = ?reason, "UpdaterActor stopping");
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<RefreshSnapshot> for UpdaterActor {
    type Reply = Result<SensorSnapshot, CoreError>;

    async fn handle(
        &mut self,
        _msg: RefreshSnapshot,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let updates = aggregator::aggregate(self.host.as_ref(), &self.aggregator).await?;
        let snapshot = SensorSnapshot::new(updates, Utc::now());

        self.publish_snapshot(&snapshot).await;
        self.emit(UpdaterEvent::SnapshotRefreshed {
            count: snapshot.count,
        });
        self.snapshot = Some(snapshot.clone());

        Ok(snapshot)
    }
}

impl Message<GetSnapshot> for UpdaterActor {
    type Reply = Option<SensorSnapshot>;

    async fn handle(
        &mut self,
        _msg: GetSnapshot,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.snapshot.clone()
    }
}

impl Message<UpdateSelected> for UpdaterActor {
    type Reply = Result<BatchReport, CoreError>;

    async fn handle(
        &mut self,
        msg: UpdateSelected,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        info!(entities = ?msg.entity_ids, "manual update requested");
        self.run_batch(&msg.entity_ids).await
    }
}

impl Message<RunAutoUpdate> for UpdaterActor {
    type Reply = Result<AutoUpdateReport, CoreError>;

    async fn handle(
        &mut self,
        _msg: RunAutoUpdate,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        if self.snapshot.is_none() {
            info!("no update snapshot yet, skipping auto-update");
        }
        let targets = select_targets(&self.options, self.snapshot.as_ref());
        if targets.is_empty() {
            return Ok(AutoUpdateReport::default());
        }

        info!(entities = ?targets, "auto-update starting");
        self.emit(UpdaterEvent::AutoUpdateStarted {
            entities: targets.clone(),
        });

        let batch = self.run_batch(&targets).await?;

        Ok(AutoUpdateReport {
            targets,
            batch,
            restart: self.options.auto_restart,
        })
    }
}

impl Message<GetHistory> for UpdaterActor {
    type Reply = Vec<HistoryRecord>;

    async fn handle(
        &mut self,
        _msg: GetHistory,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.history.records().to_vec()
    }
}
