//! The integration's config entry
//!
//! Holds the options the integration is set up with. Saving new options
//! persists them and notifies the options listener, which reloads the
//! integration.

use std::path::{Path, PathBuf};

use smartupd_api::requests::OptionsRequest;
use smartupd_core::{AutoUpdateConfig, CoreError};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

/// File name of the persisted options
pub const OPTIONS_FILE: &str = "smart_updater_options.json";

/// Options storage plus change notification
#[derive(Debug)]
pub struct ConfigEntry {
    path: PathBuf,
    options: watch::Sender<AutoUpdateConfig>,
    write_lock: Mutex<()>,
}

impl ConfigEntry {
    /// Load saved options from `storage_dir`, or start from `initial`
    ///
    /// # Errors
    /// Returns an error if a saved options file is unreadable or invalid.
    pub async fn load(storage_dir: &Path, initial: AutoUpdateConfig) -> Result<Self, CoreError> {
        let path = storage_dir.join(OPTIONS_FILE);
        let options = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(path = %path.display(), "loaded saved options");
                serde_json::from_str::<AutoUpdateConfig>(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => initial,
            Err(e) => return Err(e.into()),
        };
        let options = options.validated()?;
        let (tx, _) = watch::channel(options);

        Ok(Self {
            path,
            options: tx,
            write_lock: Mutex::new(()),
        })
    }

    /// Current options
    #[must_use]
    pub fn options(&self) -> AutoUpdateConfig {
        self.options.borrow().clone()
    }

    /// Receiver that is notified whenever saved options change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AutoUpdateConfig> {
        self.options.subscribe()
    }

    /// Validate, persist and publish new options
    ///
    /// Listeners are only notified when the options actually changed.
    ///
    /// # Errors
    /// Returns a validation error, or a storage error if persisting fails.
    pub async fn update(&self, request: OptionsRequest) -> Result<AutoUpdateConfig, CoreError> {
        let _guard = self.write_lock.lock().await;
        let updated = self.options().apply(request)?;
        if updated == *self.options.borrow() {
            debug!("options unchanged");
            return Ok(updated);
        }

        self.persist(&updated).await?;
        info!(
            auto_update_time = %updated.auto_update_time,
            entities = updated.auto_update_entities.len(),
            auto_restart = updated.auto_restart,
            "options saved"
        );
        self.options.send_replace(updated.clone());
        Ok(updated)
    }

    async fn persist(&self, options: &AutoUpdateConfig) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(options)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(entities: &[&str]) -> OptionsRequest {
        OptionsRequest {
            auto_update_entities: Some(entities.iter().map(|s| (*s).to_string()).collect()),
            ..OptionsRequest::default()
        }
    }

    #[tokio::test]
    async fn test_load_without_file_uses_initial() {
        let dir = tempfile::tempdir().unwrap();
        let initial = AutoUpdateConfig {
            auto_restart: true,
            ..AutoUpdateConfig::default()
        };
        let entry = ConfigEntry::load(dir.path(), initial.clone()).await.unwrap();
        assert_eq!(entry.options(), initial);
    }

    #[tokio::test]
    async fn test_update_persists_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let entry = ConfigEntry::load(dir.path(), AutoUpdateConfig::default())
            .await
            .unwrap();
        let mut rx = entry.subscribe();

        let saved = entry.update(request(&["update.a", "update.a"])).await.unwrap();
        assert_eq!(saved.auto_update_entities, vec!["update.a"]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), saved);

        let reloaded = ConfigEntry::load(dir.path(), AutoUpdateConfig::default())
            .await
            .unwrap();
        assert_eq!(reloaded.options(), saved);
    }

    #[tokio::test]
    async fn test_unchanged_options_do_not_notify() {
        let dir = tempfile::tempdir().unwrap();
        let entry = ConfigEntry::load(dir.path(), AutoUpdateConfig::default())
            .await
            .unwrap();
        let rx = entry.subscribe();

        entry.update(OptionsRequest::default()).await.unwrap();
        assert!(!rx.has_changed().unwrap());
        assert!(!dir.path().join(OPTIONS_FILE).exists());
    }

    #[tokio::test]
    async fn test_invalid_options_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let entry = ConfigEntry::load(dir.path(), AutoUpdateConfig::default())
            .await
            .unwrap();

        let err = entry.update(request(&["sensor.a"])).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidEntityId(_)));

        let err = entry
            .update(OptionsRequest {
                auto_update_time: Some("noon".to_string()),
                ..OptionsRequest::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTime(_)));
        assert_eq!(entry.options(), AutoUpdateConfig::default());
    }
}
