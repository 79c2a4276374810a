//! smartupd-api: Shared API types and schemas
//!
//! Contains the update/history model, request/response types and event types
//! shared by the daemon, the client library and the CLI.

pub mod events;
pub mod requests;
pub mod responses;
pub mod types;

pub use types::{HISTORY_CAPACITY, HistoryRecord, SensorSnapshot, UpdateCandidate};
