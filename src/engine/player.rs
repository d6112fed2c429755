//! One-Shot Player
//!
//! Plays a clip, or a randomized pick from a sound-effect profile, on a
//! pooled voice. Every voice starts from the configured defaults so nothing
//! leaks over from the channel's previous use.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::pool::VoicePool;
use super::voice::{Voice, DEFAULT_PRIORITY};
use crate::assets::{Clip, SoundEffectProfile};
use crate::backend::{AudioBackend, Vec3};
use crate::config::AudioDefaults;
use crate::error::{AudioError, Result};

/// Per-call overrides for [`OneShotPlayer::play`]
///
/// Unset fields keep the configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayOptions {
    pub position: Vec3,
    pub output_route: Option<String>,
    pub volume: Option<f32>,
    pub pitch: Option<f32>,
    pub looping: Option<bool>,
    pub priority: Option<i32>,
    pub stereo_pan: Option<f32>,
    pub spatial_blend: Option<f32>,
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_output_route(mut self, route: impl Into<String>) -> Self {
        self.output_route = Some(route.into());
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = Some(looping);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_stereo_pan(mut self, pan: f32) -> Self {
        self.stereo_pan = Some(pan);
        self
    }

    pub fn with_spatial_blend(mut self, blend: f32) -> Self {
        self.spatial_blend = Some(blend);
        self
    }
}

/// Starts one-shot sounds on pooled voices
#[derive(Debug)]
pub struct OneShotPlayer {
    defaults: AudioDefaults,
    rng: StdRng,
}

impl OneShotPlayer {
    /// Create a player
    ///
    /// # Arguments
    /// * `defaults` - Parameters every voice is reset to before overrides
    /// * `seed` - Fixed seed for reproducible sound-effect picks
    pub fn new(defaults: AudioDefaults, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { defaults, rng }
    }

    pub fn defaults(&self) -> &AudioDefaults {
        &self.defaults
    }

    /// Play `clip` once on a pooled voice
    ///
    /// # Errors
    /// `InvalidArgument` when `clip` is `None`; no voice is acquired.
    pub fn play(
        &mut self,
        pool: &mut VoicePool,
        backend: &mut dyn AudioBackend,
        clip: Option<&Clip>,
        options: &PlayOptions,
    ) -> Result<Voice> {
        let clip = match clip {
            Some(clip) => clip,
            None => {
                warn!("play requested without a clip");
                return Err(AudioError::invalid_argument("no clip to play"));
            }
        };

        let voice = pool.acquire(backend);
        voice.set_clip(clip.clone());
        self.reset(&voice);
        apply_options(&voice, options);
        voice.play();
        debug!(voice = %voice.id(), channel = %voice.channel_id(), clip = %clip, "one-shot started");
        Ok(voice)
    }

    /// Play a random clip from a sound-effect profile
    ///
    /// Volume and pitch are drawn from the profile's inclusive ranges, see
    /// [`crate::assets::RangeF32::sample`] for non-finite bounds. The
    /// remaining profile settings replace the defaults.
    ///
    /// # Errors
    /// `InvalidArgument` when the profile is missing or has no clips.
    pub fn play_sfx(
        &mut self,
        pool: &mut VoicePool,
        backend: &mut dyn AudioBackend,
        profile: Option<&SoundEffectProfile>,
        position: Vec3,
    ) -> Result<Voice> {
        let profile = match profile {
            Some(profile) => profile,
            None => {
                warn!("sound effect requested without a profile");
                return Err(AudioError::invalid_argument("no sound effect profile"));
            }
        };
        let (index, clip) = match profile.select_clip(&mut self.rng) {
            Some(pick) => pick,
            None => {
                warn!(profile = %profile.name, "sound effect profile has no clips");
                return Err(AudioError::invalid_argument(format!(
                    "sound effect '{}' has no clips",
                    profile.name
                )));
            }
        };

        let volume = profile.volume.sample(&mut self.rng);
        let pitch = profile.pitch.sample(&mut self.rng);
        let voice = self.play(pool, backend, Some(&clip), &PlayOptions::at(position))?;

        voice.set_volume(volume);
        voice.set_pitch(pitch);
        voice.set_looping(profile.looping);
        voice.set_priority(profile.priority);
        voice.set_stereo_pan(profile.stereo_pan);
        voice.set_spatial_blend(profile.spatial_blend);
        voice.set_ignore_listener_pause(profile.ignore_listener_pause);
        voice.set_ignore_listener_volume(profile.ignore_listener_volume);
        if profile.output_route.is_some() {
            voice.set_output_route(profile.output_route.clone());
        }
        debug!(profile = %profile.name, index, volume, pitch, "sound effect started");
        Ok(voice)
    }

    fn reset(&self, voice: &Voice) {
        let d = &self.defaults;
        voice.set_output_route(None);
        voice.set_volume(d.volume);
        voice.set_pitch(d.pitch);
        voice.set_looping(false);
        voice.set_priority(DEFAULT_PRIORITY);
        voice.set_stereo_pan(0.0);
        voice.set_spatial_blend(d.spatial_blend);
        voice.set_doppler_level(d.doppler_level);
        voice.set_spread(d.spread);
        voice.set_rolloff_mode(d.rolloff);
        voice.set_min_distance(d.min_distance);
        voice.set_max_distance(d.max_distance);
        voice.set_mute(false);
        voice.set_ignore_listener_pause(false);
        voice.set_ignore_listener_volume(false);
    }
}

fn apply_options(voice: &Voice, options: &PlayOptions) {
    voice.set_position(options.position);
    if options.output_route.is_some() {
        voice.set_output_route(options.output_route.clone());
    }
    if let Some(volume) = options.volume {
        voice.set_volume(volume);
    }
    if let Some(pitch) = options.pitch {
        voice.set_pitch(pitch);
    }
    if let Some(looping) = options.looping {
        voice.set_looping(looping);
    }
    if let Some(priority) = options.priority {
        voice.set_priority(priority);
    }
    if let Some(pan) = options.stereo_pan {
        voice.set_stereo_pan(pan);
    }
    if let Some(blend) = options.spatial_blend {
        voice.set_spatial_blend(blend);
    }
}
