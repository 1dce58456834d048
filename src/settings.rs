//! Game settings and preferences
//!
//! Persisted separately from checkpoints, as a small JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,

    // === Feedback ===
    /// Haptic feedback on taps and hits
    pub haptics: bool,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,

    // === Accessibility ===
    /// Reduced motion (minimize shake, flashes)
    pub reduced_motion: bool,
    /// High contrast mode
    pub high_contrast: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,
            haptics: true,
            show_fps: false,
            reduced_motion: false,
            high_contrast: false,
        }
    }
}

impl Settings {
    /// Effective haptics (respects reduced_motion)
    pub fn effective_haptics(&self) -> bool {
        self.haptics && !self.reduced_motion
    }

    /// Effective SFX gain after the master volume
    pub fn effective_sfx_volume(&self) -> f32 {
        (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
    }

    /// Load settings from a JSON file, falling back to defaults on any error
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("settings file unreadable ({e}); using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no settings file; using defaults");
                Self::default()
            }
        }
    }

    /// Save settings; failures are logged, never fatal
    pub fn save(&self, path: &Path) {
        let json = match serde_json::to_string_pretty(self) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("could not serialize settings: {e}");
                return;
            }
        };
        if let Err(e) = fs::write(path, json) {
            log::warn!("could not save settings to {}: {e}", path.display());
        } else {
            log::info!("settings saved");
        }
    }
}
