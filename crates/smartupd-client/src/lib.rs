//! smartupd-client: HTTP and WebSocket client library
//!
//! Talks to a running smartupd daemon.
//!
//! # Examples
//!
//! ## HTTP Client
//!
//! ```no_run
//! use smartupd_client::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new("http://localhost:8124")?;
//!
//! // Pending updates
//! let snapshot = client.sensor().await?;
//! println!("{} updates pending", snapshot.count);
//!
//! // Install two of them, in order
//! let result = client
//!     .update_selected(["update.mushroom_update", "update.home_assistant_core_update"])
//!     .await?;
//! println!("{} versions changed", result.applied.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## WebSocket Client
//!
//! ```no_run
//! use smartupd_client::{WsClient, events_url};
//! use smartupd_api::events::UpdaterEvent;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = WsClient::connect(events_url("http://localhost:8124")?).await?;
//!
//! while let Some(event) = client.recv().await {
//!     if let UpdaterEvent::SnapshotRefreshed { count } = event {
//!         println!("{count} updates pending");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod ws;

pub use error::{ClientError, Result};
pub use http::{HttpClient, OptionsBuilder};
pub use ws::{WsClient, events_url};
