//! Actor implementations

pub mod updater;

pub use updater::{SensorPublish, UpdaterActor, UpdaterActorArgs};
