//! Resource loading
//!
//! Assets are looked up by path through a [`ResourceLoader`]. The
//! [`ResourceCache`] memoizes hits per path until cleared. The
//! [`ManifestLoader`] is the stock loader: it resolves every asset declared
//! in a JSON manifest up front.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clip::Clip;
use super::profile::{MusicProfile, RangeF32, SoundEffectProfile};
use crate::error::{AudioError, Result};

/// Anything the loader can return for a path
#[derive(Debug, Clone)]
pub enum Resource {
    Clip(Clip),
    SoundEffect(Rc<SoundEffectProfile>),
    Music(Rc<MusicProfile>),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Clip(_) => "clip",
            Resource::SoundEffect(_) => "sound_effect",
            Resource::Music(_) => "music",
        }
    }
}

/// Host asset lookup
pub trait ResourceLoader {
    /// Load the resource at `path`, or `None` when nothing lives there
    fn load(&self, path: &str) -> Option<Resource>;
}

// ============================================================================
// Cache
// ============================================================================

/// Path-keyed memo in front of a [`ResourceLoader`]
///
/// Misses are not cached, so an asset added to the loader later is found on
/// the next lookup.
pub struct ResourceCache {
    loader: Box<dyn ResourceLoader>,
    entries: HashMap<String, Resource>,
}

impl ResourceCache {
    pub fn new(loader: Box<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            entries: HashMap::new(),
        }
    }

    /// Look up `path`, consulting the loader on a cache miss
    pub fn get(&mut self, path: &str) -> Option<Resource> {
        if let Some(resource) = self.entries.get(path) {
            return Some(resource.clone());
        }
        match self.loader.load(path) {
            Some(resource) => {
                debug!(path, kind = resource.kind(), "cached resource");
                self.entries.insert(path.to_string(), resource.clone());
                Some(resource)
            }
            None => {
                debug!(path, "resource not found");
                None
            }
        }
    }

    pub fn clip(&mut self, path: &str) -> Result<Clip> {
        match self.get(path) {
            Some(Resource::Clip(clip)) => Ok(clip),
            Some(Resource::Music(profile)) => Ok(profile.track.clone()),
            Some(other) => Err(kind_mismatch(path, "clip", &other)),
            None => Err(not_found(path)),
        }
    }

    pub fn sound_effect(&mut self, path: &str) -> Result<Rc<SoundEffectProfile>> {
        match self.get(path) {
            Some(Resource::SoundEffect(profile)) => Ok(profile),
            Some(other) => Err(kind_mismatch(path, "sound_effect", &other)),
            None => Err(not_found(path)),
        }
    }

    pub fn music(&mut self, path: &str) -> Result<Rc<MusicProfile>> {
        match self.get(path) {
            Some(Resource::Music(profile)) => Ok(profile),
            Some(other) => Err(kind_mismatch(path, "music", &other)),
            None => Err(not_found(path)),
        }
    }

    /// Forget every cached entry
    pub fn clear(&mut self) {
        debug!(entries = self.entries.len(), "clearing resource cache");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn not_found(path: &str) -> AudioError {
    AudioError::ResourceNotFound {
        path: path.to_string(),
    }
}

fn kind_mismatch(path: &str, wanted: &str, found: &Resource) -> AudioError {
    AudioError::invalid_argument(format!(
        "'{}' is a {}, expected a {}",
        path,
        found.kind(),
        wanted
    ))
}

// ============================================================================
// Manifest Loader
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClipEntry {
    length_secs: f32,
    #[serde(default = "default_sample_rate")]
    sample_rate: u32,
    #[serde(default = "default_channels")]
    channels: u16,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_channels() -> u16 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SoundEffectEntry {
    clips: Vec<String>,
    smart_random: bool,
    volume: RangeF32,
    pitch: RangeF32,
    looping: bool,
    priority: i32,
    stereo_pan: f32,
    spatial_blend: f32,
    ignore_listener_pause: bool,
    ignore_listener_volume: bool,
    output_route: Option<String>,
}

impl Default for SoundEffectEntry {
    fn default() -> Self {
        Self {
            clips: Vec::new(),
            smart_random: true,
            volume: RangeF32::fixed(1.0),
            pitch: RangeF32::fixed(1.0),
            looping: false,
            priority: 128,
            stereo_pan: 0.0,
            spatial_blend: 1.0,
            ignore_listener_pause: false,
            ignore_listener_volume: false,
            output_route: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MusicEntry {
    track: String,
    #[serde(default)]
    fade_in_secs: f32,
    #[serde(default)]
    fade_out_secs: f32,
    #[serde(default)]
    volume: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Manifest {
    clips: HashMap<String, ClipEntry>,
    sound_effects: HashMap<String, SoundEffectEntry>,
    music: HashMap<String, MusicEntry>,
}

/// Loader backed by a JSON asset manifest
///
/// ```json
/// {
///   "clips": { "sfx/step_01": { "length_secs": 0.3 } },
///   "sound_effects": { "sfx/footstep": { "clips": ["sfx/step_01"] } },
///   "music": { "music/title": { "track": "music/title_loop", "fade_in_secs": 2.0 } }
/// }
/// ```
#[derive(Debug, Default)]
pub struct ManifestLoader {
    resources: HashMap<String, Resource>,
}

impl ManifestLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a manifest and resolve every clip reference
    ///
    /// # Errors
    /// `Serialization` on malformed JSON, `ResourceNotFound` when a sound
    /// effect or music entry names a clip that the manifest does not declare.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json)?;
        let mut loader = Self::new();

        for (path, entry) in &manifest.clips {
            let clip = Clip::with_format(
                path.clone(),
                entry.length_secs,
                entry.sample_rate,
                entry.channels,
            );
            loader.insert(path.clone(), Resource::Clip(clip));
        }

        for (path, entry) in manifest.sound_effects {
            check_range(&path, "volume", entry.volume)?;
            check_range(&path, "pitch", entry.pitch)?;
            let clips = entry
                .clips
                .iter()
                .map(|clip_path| loader.declared_clip(clip_path))
                .collect::<Result<Vec<_>>>()?;
            let mut profile = SoundEffectProfile::new(path.clone(), clips)
                .with_smart_random(entry.smart_random)
                .with_looping(entry.looping)
                .with_priority(entry.priority)
                .with_spatial_blend(entry.spatial_blend);
            profile.volume = entry.volume;
            profile.pitch = entry.pitch;
            profile.stereo_pan = entry.stereo_pan;
            profile.ignore_listener_pause = entry.ignore_listener_pause;
            profile.ignore_listener_volume = entry.ignore_listener_volume;
            profile.output_route = entry.output_route;
            loader.insert(path, Resource::SoundEffect(Rc::new(profile)));
        }

        for (path, entry) in manifest.music {
            let track = loader.declared_clip(&entry.track)?;
            let mut profile = MusicProfile::new(path.clone(), track)
                .with_fades(entry.fade_in_secs, entry.fade_out_secs);
            profile.volume = entry.volume;
            loader.insert(path, Resource::Music(Rc::new(profile)));
        }

        debug!(resources = loader.len(), "loaded asset manifest");
        Ok(loader)
    }

    /// Read and parse a manifest file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Register a resource under `path`, replacing any previous entry
    pub fn insert(&mut self, path: impl Into<String>, resource: Resource) {
        self.resources.insert(path.into(), resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn declared_clip(&self, path: &str) -> Result<Clip> {
        match self.resources.get(path) {
            Some(Resource::Clip(clip)) => Ok(clip.clone()),
            _ => Err(not_found(path)),
        }
    }
}

fn check_range(path: &str, field: &str, range: RangeF32) -> Result<()> {
    if range.is_finite() {
        Ok(())
    } else {
        Err(AudioError::InvalidConfig {
            reason: format!(
                "{} range of '{}' must be finite, got [{}, {}]",
                field, path, range.min, range.max
            ),
        })
    }
}

impl ResourceLoader for ManifestLoader {
    fn load(&self, path: &str) -> Option<Resource> {
        self.resources.get(path).cloned()
    }
}
