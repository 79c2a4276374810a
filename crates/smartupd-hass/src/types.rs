//! Typed view of host entities, registry entries and service calls

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// State reported by an entity the host cannot currently reach
pub const STATE_UNAVAILABLE: &str = "unavailable";
/// State reported before an entity has a value
pub const STATE_UNKNOWN: &str = "unknown";
/// State of an update entity with nothing to install
pub const STATE_OFF: &str = "off";

/// Snapshot of one entity's state as returned by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl EntityState {
    /// Create a state with no attributes
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
            last_changed: None,
            last_updated: None,
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// String attribute, `None` when missing, null or not a string
    #[must_use]
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Whether the host currently has a usable value for this entity
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state != STATE_UNAVAILABLE && self.state != STATE_UNKNOWN
    }

    /// `installed_version` attribute of an update entity
    #[must_use]
    pub fn installed_version(&self) -> Option<&str> {
        self.attribute_str("installed_version")
    }

    /// Latest available version of an update entity
    ///
    /// Prefers the `latest_version` attribute and falls back to the state
    /// string for hosts that report the version as the entity state.
    #[must_use]
    pub fn latest_version(&self) -> Option<&str> {
        if !self.is_available() {
            return None;
        }
        self.attribute_str("latest_version")
            .or(Some(self.state.as_str()))
            .filter(|v| !v.is_empty())
    }

    /// Entity domain (`update` for `update.foo`)
    #[must_use]
    pub fn domain(&self) -> &str {
        split_entity_id(&self.entity_id).map_or("", |(domain, _)| domain)
    }

    /// Display name: `friendly_name` or the object id with spaces
    #[must_use]
    pub fn name(&self) -> String {
        if let Some(name) = self.attribute_str("friendly_name") {
            return name.to_string();
        }
        split_entity_id(&self.entity_id)
            .map_or(self.entity_id.as_str(), |(_, object_id)| object_id)
            .replace('_', " ")
    }
}

/// Entry of the host entity registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub entity_id: String,
    /// Integration that provides the entity (e.g. `hacs`)
    pub platform: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub disabled_by: Option<String>,
}

impl RegistryEntry {
    pub fn new(entity_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            platform: platform.into(),
            name: None,
            disabled_by: None,
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        split_entity_id(&self.entity_id).map_or("", |(domain, _)| domain)
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled_by.is_some()
    }
}

/// A host service invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

impl ServiceCall {
    pub fn new(domain: impl Into<String>, service: impl Into<String>, data: Value) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            data,
        }
    }

    /// `update.install` for a single entity
    #[must_use]
    pub fn install_update(entity_id: &str) -> Self {
        Self::new("update", "install", json!({ "entity_id": entity_id }))
    }

    /// `homeassistant.restart`
    #[must_use]
    pub fn restart() -> Self {
        Self::new("homeassistant", "restart", json!({}))
    }
}

/// Split `domain.object_id`
#[must_use]
pub fn split_entity_id(entity_id: &str) -> Option<(&str, &str)> {
    entity_id.split_once('.')
}

/// Check an entity id against the host's format rules
///
/// Both parts are non-empty `[a-z0-9_]`, neither starts nor ends with an
/// underscore, and no double underscore appears.
#[must_use]
pub fn valid_entity_id(entity_id: &str) -> bool {
    fn valid_part(part: &str) -> bool {
        !part.is_empty()
            && !part.starts_with('_')
            && !part.ends_with('_')
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }

    if entity_id.contains("__") {
        return false;
    }
    match split_entity_id(entity_id) {
        Some((domain, object_id)) => valid_part(domain) && valid_part(object_id),
        None => false,
    }
}
