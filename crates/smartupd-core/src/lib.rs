//! smartupd-core: Update tracking and execution
//!
//! Implements the `UpdaterActor` using the kameo framework together with the
//! pieces it owns: the update aggregator, the sequential update executor, the
//! bounded history store, the daily auto-update trigger and the subscription
//! handles used to tear all of it down again.

pub mod actor;
pub mod aggregator;
pub mod error;
pub mod executor;
pub mod history;
pub mod message;
pub mod options;
pub mod polling;
pub mod subscription;
pub mod trigger;

pub use actor::updater::{SensorPublish, UpdaterActor, UpdaterActorArgs};
pub use aggregator::AggregatorSettings;
pub use error::CoreError;
pub use executor::{BatchReport, UpdateOutcome};
pub use history::{History, HistoryStore, JsonFileStore, MemoryStore};
pub use message::{
    AutoUpdateReport, GetHistory, GetSnapshot, RefreshSnapshot, RunAutoUpdate, UpdateSelected,
};
pub use options::{AutoUpdateConfig, AutoUpdateTime};
pub use subscription::{Subscription, Subscriptions};
pub use trigger::{DailyTrigger, RESTART_GRACE};
