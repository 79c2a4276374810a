//! smartupd-hass: Host platform abstraction
//!
//! Provides the `HostPlatform` trait the updater core is written against, the
//! typed entity/registry model, and a Home Assistant implementation speaking
//! the REST API (states, services) and the WebSocket API (entity registry).

pub mod client;
pub mod error;
pub mod rest;
pub mod traits;
pub mod types;
pub mod ws;

pub use client::{HassClient, HassConnection};
pub use error::HassError;
pub use traits::HostPlatform;
pub use types::{EntityState, RegistryEntry, ServiceCall, valid_entity_id};
