//! Game settings
//!
//! Board shape, player count, and presentation timings. Loaded from a JSON
//! file on native (path in `CHAIN_REACTION_SETTINGS`), defaults otherwise.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("board must be at least 1x1, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("player count must be between 2 and 4, got {0}")]
    InvalidPlayers(u8),

    #[error("{name} must be positive and finite, got {value}")]
    InvalidDuration { name: &'static str, value: f32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Board ===
    pub rows: usize,
    pub cols: usize,
    /// Number of players (2..=4)
    pub players: u8,

    // === Move guard ===
    /// Seconds after which a held move guard is force-released
    pub safety_timeout_secs: f32,

    // === Playback ===
    /// Drop-in animation for the placed orb
    pub drop_secs: f32,
    /// One orb flying from an exploding cell to a neighbour
    pub flight_secs: f32,
    /// Pause between waves
    pub wave_gap_secs: f32,
    /// Longer cascades are sped up to fit
    pub max_playback_secs: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            players: 2,

            safety_timeout_secs: SAFETY_TIMEOUT_SECS,

            drop_secs: ORB_FLIGHT_SECS,
            flight_secs: ORB_FLIGHT_SECS,
            wave_gap_secs: WAVE_GAP_SECS,
            max_playback_secs: MAX_PLAYBACK_SECS,
        }
    }
}

impl Settings {
    /// Env var naming a settings JSON file (native only)
    pub const ENV_PATH: &'static str = "CHAIN_REACTION_SETTINGS";

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(SettingsError::InvalidDimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players) {
            return Err(SettingsError::InvalidPlayers(self.players));
        }
        let durations = [
            ("safety_timeout_secs", self.safety_timeout_secs),
            ("drop_secs", self.drop_secs),
            ("flight_secs", self.flight_secs),
            ("max_playback_secs", self.max_playback_secs),
        ];
        for (name, value) in durations {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::InvalidDuration { name, value });
            }
        }
        if !(self.wave_gap_secs.is_finite() && self.wave_gap_secs >= 0.0) {
            return Err(SettingsError::InvalidDuration {
                name: "wave_gap_secs",
                value: self.wave_gap_secs,
            });
        }
        Ok(())
    }

    /// Parse and validate settings from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load settings from the file named by `CHAIN_REACTION_SETTINGS`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(Self::ENV_PATH) else {
            log::info!("Using default settings");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path);
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file {}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Browser builds take their settings from the page
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!((settings.rows, settings.cols), (9, 6));
        assert_eq!(settings.players, 2);
        assert!(settings.max_playback_secs < settings.safety_timeout_secs);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{ "rows": 8, "cols": 8, "players": 4 }"#).unwrap();
        assert_eq!((settings.rows, settings.cols, settings.players), (8, 8, 4));
        assert_eq!(settings.safety_timeout_secs, SAFETY_TIMEOUT_SECS);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Settings::from_json(r#"{ "players": 5 }"#),
            Err(SettingsError::InvalidPlayers(5))
        ));
        assert!(matches!(
            Settings::from_json(r#"{ "rows": 0 }"#),
            Err(SettingsError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Settings::from_json(r#"{ "flight_secs": -1.0 }"#),
            Err(SettingsError::InvalidDuration { name: "flight_secs", .. })
        ));
        assert!(matches!(
            Settings::from_json("not json"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Settings::load_from("/definitely/not/here.json"),
            Err(SettingsError::Io(_))
        ));
    }
}
