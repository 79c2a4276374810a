//! Periodic snapshot refresh

use std::time::Duration;

use kameo::actor::ActorRef;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::actor::updater::UpdaterActor;
use crate::message::RefreshSnapshot;
use crate::subscription::Subscription;

/// Default polling interval of the update sensor
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Refresh the updater snapshot every `interval`, starting immediately
///
/// A failed cycle keeps the previous snapshot; the next tick is the retry.
pub fn spawn_polling(updater: ActorRef<UpdaterActor>, interval: Duration) -> Subscription {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match updater.ask(RefreshSnapshot).await {
                Ok(snapshot) => debug!(count = snapshot.count, "update snapshot refreshed"),
                Err(e) => warn!(error = %e, "update snapshot refresh failed"),
            }
        }
    });
    Subscription::from_task("update_polling", handle)
}
