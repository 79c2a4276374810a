//! Host platform trait

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HassError;
use crate::types::{EntityState, RegistryEntry, ServiceCall};

/// Operations the updater needs from the home-automation host
#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// List every entry of the entity registry
    async fn entity_registry(&self) -> Result<Vec<RegistryEntry>, HassError>;

    /// Current state of an entity, `None` if the host does not know it
    async fn state(&self, entity_id: &str) -> Result<Option<EntityState>, HassError>;

    /// Call a service and wait until the host reports it finished
    async fn call_service(&self, call: &ServiceCall) -> Result<(), HassError>;

    /// Create or overwrite the state of an entity owned by this service
    async fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: Value,
    ) -> Result<(), HassError>;

    /// Short name of the implementation for logs
    fn platform_type(&self) -> &'static str;
}
