//! Daily auto-update trigger
//!
//! The trigger stays armed for the lifetime of the integration instance and
//! fires once per day at the configured local time. Options changes tear the
//! whole instance down, so the trigger never needs to be re-timed in place.
//! Releasing the trigger only revokes future fires; a run that already
//! started finishes on its own task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use kameo::actor::ActorRef;
use smartupd_api::SensorSnapshot;
use smartupd_api::events::UpdaterEvent;
use smartupd_hass::{HostPlatform, ServiceCall};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::actor::updater::UpdaterActor;
use crate::error::CoreError;
use crate::message::{AutoUpdateReport, RunAutoUpdate};
use crate::options::{AutoUpdateConfig, AutoUpdateTime};
use crate::subscription::Subscription;

/// Delay between a finished auto-update batch and the host restart
pub const RESTART_GRACE: Duration = Duration::from_secs(60);

/// First instant strictly after `now` whose local time is `at`
///
/// Days on which `at` does not exist locally (DST gap) are skipped; on days
/// where it exists twice the earlier instant is used.
#[must_use]
pub fn next_fire<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    loop {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest()
            && candidate > *now
        {
            return candidate;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => return now.clone(),
        }
    }
}

/// Configured entities that currently have a pending update, in config order
///
/// Empty when nothing is configured or no snapshot exists yet.
#[must_use]
pub fn select_targets(config: &AutoUpdateConfig, snapshot: Option<&SensorSnapshot>) -> Vec<String> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    config
        .auto_update_entities
        .iter()
        .filter(|id| snapshot.contains(id))
        .cloned()
        .collect()
}

/// Run one scheduled auto-update, then restart the host if requested
///
/// The restart goes to the host directly, so it still happens when the
/// updater was stopped during the grace period.
///
/// # Errors
/// Returns the batch failure; no restart happens in that case.
pub async fn run_scheduled(
    updater: &ActorRef<UpdaterActor>,
    host: &Arc<dyn HostPlatform>,
    grace: Duration,
    event_tx: &broadcast::Sender<UpdaterEvent>,
) -> Result<AutoUpdateReport, CoreError> {
    let report = updater.ask(RunAutoUpdate).await?;
    if report.is_noop() {
        info!("auto-update: nothing to do");
        return Ok(report);
    }

    info!(
        updated = report.batch.outcomes.len(),
        applied = report.batch.applied().len(),
        "auto-update finished"
    );

    if report.restart {
        info!(delay = ?grace, "restart scheduled after grace period");
        let _ = event_tx.send(UpdaterEvent::RestartScheduled {
            delay_secs: grace.as_secs(),
        });
        tokio::time::sleep(grace).await;
        info!("requesting host restart");
        host.call_service(&ServiceCall::restart()).await?;
    }

    Ok(report)
}

/// Fires an action once per day at a fixed local time
#[derive(Debug, Clone, Copy)]
pub struct DailyTrigger {
    at: NaiveTime,
}

impl DailyTrigger {
    #[must_use]
    pub fn new(at: AutoUpdateTime) -> Self {
        Self { at: at.time() }
    }

    /// Next firing instant after `now`
    #[must_use]
    pub fn next_after(&self, now: &DateTime<Local>) -> DateTime<Local> {
        next_fire(now, self.at)
    }

    /// Arm the trigger; releasing the subscription disarms it
    pub fn spawn<F, Fut>(self, action: F) -> Subscription
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_with_clock(Local::now, action)
    }

    /// Arm the trigger against a custom wall clock
    ///
    /// Each fire runs `action` on its own task, so releasing the subscription
    /// cancels the wait for the next slot but not a run in progress.
    pub fn spawn_with_clock<C, F, Fut>(self, clock: C, mut action: F) -> Subscription
    where
        C: Fn() -> DateTime<Local> + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut last_fire: Option<DateTime<Local>> = None;
            loop {
                // Never fire twice for the same slot if the sleep wakes early
                let now = clock();
                let from = match last_fire {
                    Some(last) if last >= now => last,
                    _ => now,
                };
                let next = self.next_after(&from);
                let wait = (next - now).to_std().unwrap_or_default();
                info!(next = %next.to_rfc3339(), "auto-update trigger armed");

                tokio::time::sleep(wait).await;
                last_fire = Some(next);
                tokio::spawn(action());
            }
        });
        Subscription::from_task("auto_update_trigger", handle)
    }

    /// Arm the trigger to run scheduled auto-updates on an updater
    pub fn spawn_auto_update(
        self,
        updater: ActorRef<UpdaterActor>,
        host: Arc<dyn HostPlatform>,
        grace: Duration,
        event_tx: broadcast::Sender<UpdaterEvent>,
    ) -> Subscription {
        self.spawn(move || {
            let updater = updater.clone();
            let host = host.clone();
            let event_tx = event_tx.clone();
            async move {
                if let Err(e) = run_scheduled(&updater, &host, grace, &event_tx).await {
                    error!(error = %e, "scheduled auto-update aborted");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{FixedOffset, Utc};
    use smartupd_api::UpdateCandidate;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn snapshot(ids: &[&str]) -> SensorSnapshot {
        SensorSnapshot::new(
            ids.iter()
                .map(|id| UpdateCandidate {
                    name: (*id).to_string(),
                    entity_id: (*id).to_string(),
                    installed_version: Some("1.0".to_string()),
                    latest_version: "1.1".to_string(),
                })
                .collect(),
            Utc::now(),
        )
    }

    fn config(ids: &[&str]) -> AutoUpdateConfig {
        AutoUpdateConfig {
            auto_update_entities: ids.iter().map(|s| (*s).to_string()).collect(),
            ..AutoUpdateConfig::default()
        }
    }

    #[test]
    fn test_next_fire_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap();
        let next = next_fire(&now, at(3, 0, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_next_fire_tomorrow_when_passed() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap();
        let next = next_fire(&now, at(3, 0, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 2, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_next_fire_is_strictly_after_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        let next = next_fire(&now, at(3, 0, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 2, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_next_fire_keeps_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
        let next = next_fire(&now, at(3, 0, 0));
        assert_eq!(next, tz.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_select_targets_intersection_in_config_order() {
        let targets = select_targets(
            &config(&["update.c", "update.a", "update.x"]),
            Some(&snapshot(&["update.a", "update.b", "update.c"])),
        );
        assert_eq!(targets, vec!["update.c", "update.a"]);
    }

    #[test]
    fn test_select_targets_empty_snapshot() {
        let targets = select_targets(&config(&["update.b"]), Some(&snapshot(&[])));
        assert!(targets.is_empty());
    }

    #[test]
    fn test_select_targets_without_snapshot() {
        let targets = select_targets(&config(&["update.a"]), None);
        assert!(targets.is_empty());
    }

    fn counting_trigger(
        start: DateTime<Local>,
        at: NaiveTime,
    ) -> (Subscription, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let origin = tokio::time::Instant::now();
        let clock = move || {
            start + chrono::Duration::from_std(origin.elapsed()).unwrap_or_default()
        };
        let trigger = DailyTrigger { at };
        let subscription = trigger.spawn_with_clock(clock, move || {
            let f = f.clone();
            async move {
                f.fetch_add(1, Ordering::SeqCst);
            }
        });
        (subscription, fired)
    }

    fn local(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 1, h, m, s)
            .earliest()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_fires_at_configured_time() {
        let (subscription, fired) = counting_trigger(local(2, 59, 0), at(3, 0, 0));

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        subscription.release();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_fires_once_per_day() {
        let (subscription, fired) = counting_trigger(local(2, 59, 0), at(3, 0, 0));

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        subscription.release();
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_keeps_running_action() {
        let finished = Arc::new(AtomicUsize::new(0));
        let f = finished.clone();
        let origin = tokio::time::Instant::now();
        let start = local(2, 59, 0);
        let clock = move || {
            start + chrono::Duration::from_std(origin.elapsed()).unwrap_or_default()
        };
        let subscription = DailyTrigger { at: at(3, 0, 0) }.spawn_with_clock(clock, move || {
            let f = f.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                f.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Fire at 03:00, then release while the action is still sleeping
        tokio::time::sleep(Duration::from_secs(70)).await;
        subscription.release();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_select_targets_nothing_configured() {
        let targets = select_targets(&config(&[]), Some(&snapshot(&["update.a"])));
        assert!(targets.is_empty());
    }
}
