//! Auto-update options of the integration entry

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use smartupd_api::requests::OptionsRequest;
use smartupd_api::responses::OptionsResponse;
use smartupd_hass::types::split_entity_id;
use smartupd_hass::valid_entity_id;

use crate::error::CoreError;

/// Default daily run time
pub const DEFAULT_AUTO_UPDATE_TIME: &str = "03:00:00";

/// Domain auto-update entities must belong to
const UPDATE_DOMAIN: &str = "update";

/// Wall-clock time of day, written as `HH:MM:SS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AutoUpdateTime(NaiveTime);

impl AutoUpdateTime {
    #[must_use]
    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl Default for AutoUpdateTime {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(3, 0, 0).unwrap_or_default())
    }
}

impl FromStr for AutoUpdateTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map(Self)
            .map_err(|_| CoreError::InvalidTime(s.to_string()))
    }
}

impl TryFrom<String> for AutoUpdateTime {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AutoUpdateTime> for String {
    fn from(value: AutoUpdateTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AutoUpdateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

/// Options owned by the integration entry
///
/// Read-only to the updater. Any change goes through `apply` and results in a
/// full reload of the integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoUpdateConfig {
    /// Daily time at which the auto-update runs
    #[serde(default)]
    pub auto_update_time: AutoUpdateTime,
    /// Entities to update automatically, in run order
    #[serde(default)]
    pub auto_update_entities: Vec<String>,
    /// Restart the host after an automatic update
    #[serde(default)]
    pub auto_restart: bool,
}

impl AutoUpdateConfig {
    /// Check entity ids and drop duplicates, keeping first occurrence
    ///
    /// # Errors
    /// Returns `InvalidEntityId` for malformed ids or ids outside the
    /// `update` domain.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        let mut seen = Vec::with_capacity(self.auto_update_entities.len());
        for id in self.auto_update_entities.drain(..) {
            let id = id.trim().to_lowercase();
            if !valid_entity_id(&id) {
                return Err(CoreError::InvalidEntityId(id));
            }
            if split_entity_id(&id).map(|(domain, _)| domain) != Some(UPDATE_DOMAIN) {
                return Err(CoreError::InvalidEntityId(format!(
                    "{id} is not an {UPDATE_DOMAIN} entity"
                )));
            }
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        self.auto_update_entities = seen;
        Ok(self)
    }

    /// Merge a partial options request onto these options
    ///
    /// # Errors
    /// Returns an error if the resulting options fail validation.
    pub fn apply(&self, request: OptionsRequest) -> Result<Self, CoreError> {
        let auto_update_time = match request.auto_update_time {
            Some(time) => time.parse()?,
            None => self.auto_update_time,
        };
        Self {
            auto_update_time,
            auto_update_entities: request
                .auto_update_entities
                .unwrap_or_else(|| self.auto_update_entities.clone()),
            auto_restart: request.auto_restart.unwrap_or(self.auto_restart),
        }
        .validated()
    }

    #[must_use]
    pub fn to_response(&self) -> OptionsResponse {
        OptionsResponse {
            auto_update_time: self.auto_update_time.to_string(),
            auto_update_entities: self.auto_update_entities.clone(),
            auto_restart: self.auto_restart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AutoUpdateConfig::default();
        assert_eq!(config.auto_update_time.to_string(), DEFAULT_AUTO_UPDATE_TIME);
        assert!(config.auto_update_entities.is_empty());
        assert!(!config.auto_restart);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: AutoUpdateConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AutoUpdateConfig::default());
    }

    #[test]
    fn test_time_parsing() {
        let t: AutoUpdateTime = "04:30".parse().unwrap();
        assert_eq!(t.to_string(), "04:30:00");

        let t: AutoUpdateTime = "23:59:59".parse().unwrap();
        assert_eq!(t.to_string(), "23:59:59");

        assert!("25:00:00".parse::<AutoUpdateTime>().is_err());
        assert!("noon".parse::<AutoUpdateTime>().is_err());
    }

    #[test]
    fn test_invalid_time_rejected_on_deserialize() {
        let result: Result<AutoUpdateConfig, _> =
            serde_json::from_str(r#"{"auto_update_time": "3 o'clock"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validated_dedups_in_order() {
        let config = AutoUpdateConfig {
            auto_update_entities: vec![
                "update.b".to_string(),
                "update.a".to_string(),
                "update.b".to_string(),
            ],
            ..AutoUpdateConfig::default()
        }
        .validated()
        .unwrap();
        assert_eq!(config.auto_update_entities, vec!["update.b", "update.a"]);
    }

    #[test]
    fn test_validated_rejects_other_domains() {
        let result = AutoUpdateConfig {
            auto_update_entities: vec!["light.kitchen".to_string()],
            ..AutoUpdateConfig::default()
        }
        .validated();
        assert!(matches!(result, Err(CoreError::InvalidEntityId(_))));
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let current = AutoUpdateConfig {
            auto_update_time: "02:15:00".parse().unwrap(),
            auto_update_entities: vec!["update.a".to_string()],
            auto_restart: false,
        };
        let updated = current
            .apply(OptionsRequest {
                auto_restart: Some(true),
                ..OptionsRequest::default()
            })
            .unwrap();

        assert_eq!(updated.auto_update_time.to_string(), "02:15:00");
        assert_eq!(updated.auto_update_entities, vec!["update.a"]);
        assert!(updated.auto_restart);
    }

    #[test]
    fn test_response_round_trip_fields() {
        let config = AutoUpdateConfig {
            auto_update_time: "05:00".parse().unwrap(),
            auto_update_entities: vec!["update.a".to_string()],
            auto_restart: true,
        };
        let response = config.to_response();
        assert_eq!(response.auto_update_time, "05:00:00");
        assert_eq!(response.auto_update_entities, vec!["update.a"]);
        assert!(response.auto_restart);
    }
}
