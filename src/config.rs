//! Audio system configuration
//!
//! Loaded from JSON. Every field is optional; missing values fall back to
//! the defaults below.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::RolloffMode;
use crate::engine::{DOPPLER_RANGE, PITCH_RANGE, SPATIAL_BLEND_RANGE, SPREAD_RANGE, VOLUME_RANGE};
use crate::error::{AudioError, Result};

/// Default parent group for pooled voices
const DEFAULT_POOL_GROUP: &str = "audio_pool";

/// Default parent group for the two music channels
const DEFAULT_MUSIC_GROUP: &str = "music";

/// Parameters applied to every one-shot voice before per-call overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioDefaults {
    pub volume: f32,
    pub pitch: f32,
    pub spatial_blend: f32,
    pub doppler_level: f32,
    pub spread: f32,
    pub rolloff: RolloffMode,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for AudioDefaults {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 1.0,
            doppler_level: 1.0,
            spread: 0.0,
            rolloff: RolloffMode::Logarithmic,
            min_distance: 1.0,
            max_distance: 500.0,
        }
    }
}

/// Music crossfader settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Steady-state volume of the playing track
    pub volume: f32,
    /// Fade-in used when a transition does not name one
    pub fade_in_secs: f32,
    /// Fade-out used when a transition does not name one
    pub fade_out_secs: f32,
    pub group: String,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
            group: DEFAULT_MUSIC_GROUP.to_string(),
        }
    }
}

/// Voice pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub group: String,
    /// Channels created up front at init
    pub prewarm: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_POOL_GROUP.to_string(),
            prewarm: 0,
        }
    }
}

/// Complete audio system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub defaults: AudioDefaults,
    pub music: MusicConfig,
    pub pool: PoolConfig,
    /// Seed for sound-effect randomization; entropy when absent
    pub seed: Option<u64>,
}

impl AudioConfig {
    /// Parse a JSON configuration
    ///
    /// The result is not validated; call [`AudioConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read, parse and validate a configuration file
    ///
    /// # Arguments
    /// * `path` - JSON file to read
    ///
    /// # Example
    /// ```no_run
    /// use std::path::Path;
    /// use resound::AudioConfig;
    ///
    /// let config = AudioConfig::from_file(Path::new("audio.json")).unwrap();
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values outside the ranges a voice accepts
    pub fn validate(&self) -> Result<()> {
        let d = &self.defaults;
        check_range("defaults.volume", d.volume, VOLUME_RANGE)?;
        check_range("defaults.pitch", d.pitch, PITCH_RANGE)?;
        check_range("defaults.spatial_blend", d.spatial_blend, SPATIAL_BLEND_RANGE)?;
        check_range("defaults.doppler_level", d.doppler_level, DOPPLER_RANGE)?;
        check_range("defaults.spread", d.spread, SPREAD_RANGE)?;
        check_non_negative("defaults.min_distance", d.min_distance)?;
        check_non_negative("defaults.max_distance", d.max_distance)?;
        if d.max_distance < d.min_distance {
            return Err(invalid(format!(
                "defaults.max_distance ({}) is below defaults.min_distance ({})",
                d.max_distance, d.min_distance
            )));
        }

        check_range("music.volume", self.music.volume, VOLUME_RANGE)?;
        check_non_negative("music.fade_in_secs", self.music.fade_in_secs)?;
        check_non_negative("music.fade_out_secs", self.music.fade_out_secs)?;
        if self.music.group.trim().is_empty() {
            return Err(invalid("music.group must not be empty"));
        }
        if self.pool.group.trim().is_empty() {
            return Err(invalid("pool.group must not be empty"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> AudioError {
    AudioError::InvalidConfig {
        reason: reason.into(),
    }
}

fn check_range(field: &str, value: f32, (lo, hi): (f32, f32)) -> Result<()> {
    if value.is_nan() || value < lo || value > hi {
        return Err(invalid(format!(
            "{} = {} is outside [{}, {}]",
            field, value, lo, hi
        )));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f32) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        return Err(invalid(format!("{} = {} must be >= 0", field, value)));
    }
    Ok(())
}
