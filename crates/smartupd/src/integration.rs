//! Integration lifecycle
//!
//! `Integration::setup` builds one instance from the current options: it loads
//! the history, spawns the updater actor and registers the service slot, the
//! polling task, the daily trigger and the options listener. `unload`
//! releases all of them and stops the actor. `supervise` loops setup and
//! unload, reloading whenever the saved options change.

use std::sync::Arc;
use std::time::Duration;

use kameo::actor::{ActorRef, Spawn};
use smartupd_api::events::UpdaterEvent;
use smartupd_core::polling::spawn_polling;
use smartupd_core::{
    AggregatorSettings, AutoUpdateConfig, CoreError, DailyTrigger, History, HistoryStore,
    SensorPublish, Subscription, Subscriptions, UpdaterActor, UpdaterActorArgs,
};
use smartupd_hass::HostPlatform;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{error, info};

/// Delay before retrying a failed setup
const SETUP_RETRY: Duration = Duration::from_secs(30);

/// Slot the HTTP service handlers read the live updater from
pub type ServiceSlot = watch::Sender<Option<ActorRef<UpdaterActor>>>;

/// Everything a setup needs besides the options
#[derive(Clone)]
pub struct IntegrationContext {
    pub host: Arc<dyn HostPlatform>,
    pub store: Arc<dyn HistoryStore>,
    pub aggregator: AggregatorSettings,
    pub publish: Option<SensorPublish>,
    pub scan_interval: Duration,
    /// Delay between an auto-update batch and the host restart
    pub restart_grace: Duration,
    pub event_tx: broadcast::Sender<UpdaterEvent>,
    pub service_slot: Arc<ServiceSlot>,
}

/// One set-up instance of the integration
#[derive(Debug)]
pub struct Integration {
    updater: ActorRef<UpdaterActor>,
    subscriptions: Subscriptions,
}

impl Integration {
    /// Set up an instance with `options`
    ///
    /// `options_rx` is watched by the options listener; any change is sent
    /// to `reload_tx`.
    ///
    /// # Errors
    /// Returns an error if the history cannot be loaded.
    pub async fn setup(
        ctx: &IntegrationContext,
        options: AutoUpdateConfig,
        mut options_rx: watch::Receiver<AutoUpdateConfig>,
        reload_tx: mpsc::Sender<()>,
    ) -> Result<Self, CoreError> {
        let history = History::load(ctx.store.clone()).await?;
        let trigger = DailyTrigger::new(options.auto_update_time);

        info!(
            history = history.len(),
            auto_update_time = %options.auto_update_time,
            entities = ?options.auto_update_entities,
            auto_restart = options.auto_restart,
            "setting up integration"
        );

        let updater = UpdaterActor::spawn(UpdaterActorArgs {
            host: ctx.host.clone(),
            history,
            options,
            aggregator: ctx.aggregator.clone(),
            publish: ctx.publish.clone(),
            event_tx: ctx.event_tx.clone(),
        });

        let mut subscriptions = Subscriptions::new();

        ctx.service_slot.send_replace(Some(updater.clone()));
        let slot = ctx.service_slot.clone();
        subscriptions.push(Subscription::new("update_selected_service", move || {
            slot.send_replace(None);
        }));

        subscriptions.push(spawn_polling(updater.clone(), ctx.scan_interval));

        subscriptions.push(trigger.spawn_auto_update(
            updater.clone(),
            ctx.host.clone(),
            ctx.restart_grace,
            ctx.event_tx.clone(),
        ));

        let listener = tokio::spawn(async move {
            if options_rx.changed().await.is_ok() {
                let _ = reload_tx.send(()).await;
            }
        });
        subscriptions.push(Subscription::from_task("options_listener", listener));

        Ok(Self {
            updater,
            subscriptions,
        })
    }

    #[must_use]
    pub fn updater(&self) -> &ActorRef<UpdaterActor> {
        &self.updater
    }

    #[must_use]
    pub fn registrations(&self) -> Vec<&'static str> {
        self.subscriptions.names()
    }

    /// Release every registration and stop the updater
    ///
    /// Messages already queued, including an in-flight install, finish first.
    pub async fn unload(mut self) {
        info!("unloading integration");
        self.subscriptions.release_all();
        if let Err(e) = self.updater.stop_gracefully().await {
            error!(error = %e, "failed to stop updater");
        }
        self.updater.wait_for_shutdown().await;
    }
}

/// Keep the integration set up until `shutdown` fires
///
/// Every options change unloads the running instance and sets up a new one
/// with the saved options.
pub async fn supervise(
    ctx: IntegrationContext,
    mut options_rx: watch::Receiver<AutoUpdateConfig>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let options = options_rx.borrow_and_update().clone();
        let (reload_tx, mut reload_rx) = mpsc::channel(1);

        let integration =
            match Integration::setup(&ctx, options, options_rx.clone(), reload_tx).await {
                Ok(integration) => integration,
                Err(e) => {
                    error!(error = %e, retry = ?SETUP_RETRY, "integration setup failed");
                    tokio::select! {
                        () = tokio::time::sleep(SETUP_RETRY) => continue,
                        _ = options_rx.changed() => continue,
                        _ = &mut shutdown => return,
                    }
                }
            };

        tokio::select! {
            _ = reload_rx.recv() => {
                info!("options changed, reloading integration");
                integration.unload().await;
                let _ = ctx.event_tx.send(UpdaterEvent::IntegrationReloaded);
            }
            _ = &mut shutdown => {
                integration.unload().await;
                return;
            }
        }
    }
}
