//! API route handlers

pub mod card;
pub mod error;
pub mod history;
pub mod options;
pub mod sensor;
pub mod services;
pub mod system;
pub mod ws;

pub use error::ApiError;
