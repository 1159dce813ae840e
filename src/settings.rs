use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::{compare::ComparisonConfig, playback::PlaybackConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub comparison: ComparisonConfig,
    pub playback: PlaybackConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let threshold = self.comparison.threshold_px;
        if !(threshold.is_finite() && threshold > 0.0) {
            bail!("comparison threshold must be a positive number, got {threshold}");
        }
        let tolerance = self.comparison.timestamp_tolerance_ms;
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            bail!("timestamp tolerance must be non-negative, got {tolerance}");
        }
        let speed = self.playback.default_speed;
        if !(speed.is_finite() && speed > 0.0) {
            bail!("default speed must be a positive number, got {speed}");
        }
        if self.playback.max_display_width == 0 {
            bail!("max display width must be non-zero");
        }
        Ok(())
    }
}

/// JSON-file backed settings. A missing or unreadable file yields defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring malformed settings in {}: {}",
                    path.display(),
                    err
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> Settings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_comparison(&self, comparison: ComparisonConfig) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        next.comparison = comparison;
        next.validate()?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    pub fn update_playback(&self, playback: PlaybackConfig) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        next.playback = playback;
        next.validate()?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: Settings = serde_json::from_str(&contents)?;
        data.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::MatchStrategy;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("posemirror-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let store = SettingsStore::new(temp_path("missing")).unwrap();
        let settings = store.settings();
        assert_eq!(settings.comparison.threshold_px, 80.0);
        assert_eq!(settings.comparison.strategy, MatchStrategy::FrameId);
        assert_eq!(settings.playback.max_display_width, 720);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{"comparison":{"thresholdPx":40.0}}"#).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        let settings = store.settings();
        assert_eq!(settings.comparison.threshold_px, 40.0);
        assert_eq!(settings.playback.frame_interval_ms, 16);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let path = temp_path("malformed");
        fs::write(&path, "not json").unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.settings().comparison.threshold_px, 80.0);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let path = temp_path("update");
        let store = SettingsStore::new(path.clone()).unwrap();
        let comparison = ComparisonConfig {
            threshold_px: 60.0,
            strategy: MatchStrategy::NearestTimestamp,
            timestamp_tolerance_ms: 25.0,
        };
        store.update_comparison(comparison).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.settings().comparison.threshold_px, 60.0);
        assert_eq!(
            reopened.settings().comparison.strategy,
            MatchStrategy::NearestTimestamp
        );
        reopened.reload().unwrap();
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_invalid_update_is_rejected() {
        let path = temp_path("invalid");
        let store = SettingsStore::new(path.clone()).unwrap();
        let playback = PlaybackConfig {
            default_speed: -1.0,
            ..PlaybackConfig::default()
        };
        assert!(store.update_playback(playback).is_err());
        assert_eq!(store.settings().playback.default_speed, 1.0);
        assert!(!path.exists());
    }
}
