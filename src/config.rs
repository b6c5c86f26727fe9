use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::light::{AnimationMode, ColorMode};

/// Tunables an external actor may change at any time. The processing thread
/// reads them once per chunk, never mid-computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Transient sensitivity, 0-100. Scales the spectral flux threshold in
    /// the beat detector.
    pub sensitivity: u8,
    pub animation_mode: AnimationMode,
    pub color_mode: ColorMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 75,
            animation_mode: AnimationMode::ElectronicParty,
            color_mode: ColorMode::PartyMode,
        }
    }
}

impl SessionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.as_ref().display()))?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }

    #[allow(dead_code)]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)
            .with_context(|| format!("writing config {}", path.as_ref().display()))?;
        Ok(())
    }
}

/// Shared cell for live configuration. Writers go through the setters;
/// the processing thread polls [`ConfigHandle::get`] once per chunk.
#[derive(Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<Mutex<SessionConfig>>,
}

impl ConfigHandle {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(config)),
        }
    }

    pub fn get(&self) -> SessionConfig {
        self.inner.lock().unwrap().clone()
    }

    pub fn set_sensitivity(&self, sensitivity: u8) {
        self.inner.lock().unwrap().sensitivity = sensitivity.min(100);
    }

    pub fn set_animation_mode(&self, mode: AnimationMode) {
        self.inner.lock().unwrap().animation_mode = mode;
    }

    pub fn set_color_mode(&self, mode: ColorMode) {
        self.inner.lock().unwrap().color_mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_tuned_for_electronic_music() {
        let config = SessionConfig::default();
        assert_eq!(config.sensitivity, 75);
        assert_eq!(config.animation_mode, AnimationMode::ElectronicParty);
        assert_eq!(config.color_mode, ColorMode::PartyMode);
    }

    #[test]
    fn handle_updates_are_visible_to_readers() {
        let handle = ConfigHandle::default();
        handle.set_sensitivity(40);
        handle.set_animation_mode(AnimationMode::StrobeParty);
        handle.set_color_mode(ColorMode::RaveMode);

        let config = handle.get();
        assert_eq!(config.sensitivity, 40);
        assert_eq!(config.animation_mode, AnimationMode::StrobeParty);
        assert_eq!(config.color_mode, ColorMode::RaveMode);
    }

    #[test]
    fn sensitivity_is_capped_at_100() {
        let handle = ConfigHandle::default();
        handle.set_sensitivity(250);
        assert_eq!(handle.get().sensitivity, 100);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SessionConfig {
            sensitivity: 60,
            animation_mode: AnimationMode::BassDropSpecial,
            color_mode: ColorMode::NeonElectronic,
        };

        let json = serde_json::to_string(&config).unwrap();
        let restored: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.sensitivity, 60);
        assert_eq!(restored.animation_mode, AnimationMode::BassDropSpecial);
        assert_eq!(restored.color_mode, ColorMode::NeonElectronic);
    }
}
