//! Host Audio Backend
//!
//! The engine never decodes or mixes audio itself. It drives channels that
//! the host provides through the [`Channel`] trait and creates them through
//! an [`AudioBackend`]. [`VirtualBackend`] is an in-process backend that
//! simulates playback time, used by the simulator and the test suite.

mod virtual_device;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::assets::Clip;

pub use virtual_device::{VirtualBackend, VirtualChannel};

// ============================================================================
// Value Types
// ============================================================================

/// Identifier of a host channel, unique per backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch#{}", self.0)
    }
}

/// World-space position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Distance attenuation curve applied by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloffMode {
    #[default]
    Logarithmic,
    Linear,
    Custom,
}

/// Playback parameters of a channel
///
/// Values are stored as given; range clamping happens in [`crate::engine::Voice`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelParams {
    pub volume: f32,
    pub pitch: f32,
    pub looping: bool,
    pub priority: i32,
    pub stereo_pan: f32,
    pub spatial_blend: f32,
    pub doppler_level: f32,
    pub spread: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rolloff: RolloffMode,
    pub mute: bool,
    pub ignore_listener_pause: bool,
    pub ignore_listener_volume: bool,
    pub position: Vec3,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            priority: 128,
            stereo_pan: 0.0,
            spatial_blend: 0.0,
            doppler_level: 1.0,
            spread: 0.0,
            min_distance: 1.0,
            max_distance: 500.0,
            rolloff: RolloffMode::Logarithmic,
            mute: false,
            ignore_listener_pause: false,
            ignore_listener_volume: false,
            position: Vec3::ZERO,
        }
    }
}

/// Naming information handed to the backend when a channel is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Channel name, e.g. `voice_3`
    pub name: String,
    /// Parent grouping object shared by related channels
    pub group: String,
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A host-provided audio output that plays one clip at a time
pub trait Channel {
    fn id(&self) -> ChannelId;

    fn name(&self) -> &str;

    /// Start playback from the current cursor
    fn play(&mut self);

    fn pause(&mut self);

    fn unpause(&mut self);

    /// Stop playback and rewind the cursor
    fn stop(&mut self);

    /// True while the channel is actually producing sound
    fn is_playing(&self) -> bool;

    fn clip(&self) -> Option<Clip>;

    /// Assign a clip; the channel stops and rewinds
    fn set_clip(&mut self, clip: Option<Clip>);

    fn params(&self) -> ChannelParams;

    fn set_params(&mut self, params: ChannelParams);

    fn output_route(&self) -> Option<String>;

    fn set_output_route(&mut self, route: Option<String>);

    /// Playback cursor in seconds
    fn time(&self) -> f32;

    fn set_time(&mut self, secs: f32);

    /// Playback cursor in sample frames
    fn time_samples(&self) -> u64 {
        match self.clip() {
            Some(clip) => (self.time() as f64 * clip.sample_rate() as f64) as u64,
            None => 0,
        }
    }

    fn set_time_samples(&mut self, samples: u64) {
        if let Some(clip) = self.clip() {
            if clip.sample_rate() > 0 {
                self.set_time((samples as f64 / clip.sample_rate() as f64) as f32);
            }
        }
    }

    /// Host-wide listener pause flag
    fn listener_paused(&self) -> bool;

    /// Permanently release the host resource
    fn destroy(&mut self);
}

/// Factory and clock for host channels
pub trait AudioBackend {
    fn create_channel(&mut self, spec: &ChannelSpec) -> Box<dyn Channel>;

    /// Called once per engine tick before any task runs
    fn update(&mut self, _dt: f32) {}
}

/// A channel shared between its owner and the voice currently bound to it
pub type SharedChannel = Rc<RefCell<Box<dyn Channel>>>;

/// Wrap a freshly created channel for sharing
pub fn share(channel: Box<dyn Channel>) -> SharedChannel {
    Rc::new(RefCell::new(channel))
}
