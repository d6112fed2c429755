//! Playback profiles
//!
//! Data assets describing how a sound effect or a music track should be
//! played. Profiles are read-only apart from the sound-effect profile's
//! "last chosen clip" memory used by smart random selection.

use std::cell::Cell;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::clip::Clip;

/// Inclusive value range sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeF32 {
    pub min: f32,
    pub max: f32,
}

impl RangeF32 {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A range that always yields `value`
    pub fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Sample uniformly from `[min, max]`
    ///
    /// Reversed bounds are accepted and treated as `[max, min]`. A range with
    /// a NaN or infinite bound yields its finite bound (or 0.0 when neither
    /// is finite) instead of sampling.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if !self.is_finite() {
            return [self.min, self.max]
                .into_iter()
                .find(|bound| bound.is_finite())
                .unwrap_or(0.0);
        }
        let (lo, hi) = self.ordered();
        if lo == hi {
            lo
        } else if (hi - lo).is_finite() {
            rng.gen_range(lo..=hi)
        } else {
            // Span overflows f32
            rng.gen_range(f64::from(lo)..=f64::from(hi)) as f32
        }
    }

    /// Both bounds are finite numbers
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn contains(&self, value: f32) -> bool {
        let (lo, hi) = self.ordered();
        value >= lo && value <= hi
    }

    fn ordered(&self) -> (f32, f32) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }
}

// ============================================================================
// Sound Effect Profile
// ============================================================================

/// Randomized one-shot sound effect
#[derive(Debug, Clone)]
pub struct SoundEffectProfile {
    pub name: String,
    pub clips: Vec<Clip>,
    /// Never pick the same clip twice in a row
    pub smart_random: bool,
    pub volume: RangeF32,
    pub pitch: RangeF32,
    pub looping: bool,
    pub priority: i32,
    pub stereo_pan: f32,
    pub spatial_blend: f32,
    pub ignore_listener_pause: bool,
    pub ignore_listener_volume: bool,
    pub output_route: Option<String>,
    last_index: Cell<Option<usize>>,
}

impl SoundEffectProfile {
    /// Create a profile with neutral playback parameters
    pub fn new(name: impl Into<String>, clips: Vec<Clip>) -> Self {
        Self {
            name: name.into(),
            clips,
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
            last_index: Cell::new(None),
        }
    }

    pub fn with_smart_random(mut self, smart: bool) -> Self {
        self.smart_random = smart;
        self
    }

    pub fn with_volume(mut self, min: f32, max: f32) -> Self {
        self.volume = RangeF32::new(min, max);
        self
    }

    pub fn with_pitch(mut self, min: f32, max: f32) -> Self {
        self.pitch = RangeF32::new(min, max);
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_spatial_blend(mut self, blend: f32) -> Self {
        self.spatial_blend = blend;
        self
    }

    pub fn with_output_route(mut self, route: impl Into<String>) -> Self {
        self.output_route = Some(route.into());
        self
    }

    /// Index returned by the last smart-random selection
    pub fn last_index(&self) -> Option<usize> {
        self.last_index.get()
    }

    /// Pick the clip to play next
    ///
    /// - One clip: always that clip, nothing is remembered.
    /// - Several clips, plain random: uniform over all clips.
    /// - Several clips, smart random: uniform over all clips except the one
    ///   returned last time; the choice is remembered.
    ///
    /// Returns `None` only when the profile has no clips.
    pub fn select_clip<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(usize, Clip)> {
        let count = self.clips.len();
        let index = match count {
            0 => return None,
            1 => 0,
            _ if !self.smart_random => rng.gen_range(0..count),
            _ => {
                let index = match self.last_index.get() {
                    Some(last) if last < count => {
                        let pick = rng.gen_range(0..count - 1);
                        if pick >= last {
                            pick + 1
                        } else {
                            pick
                        }
                    }
                    _ => rng.gen_range(0..count),
                };
                self.last_index.set(Some(index));
                index
            }
        };
        Some((index, self.clips[index].clone()))
    }
}

// ============================================================================
// Music Profile
// ============================================================================

/// Background music track with its preferred transition times
#[derive(Debug, Clone)]
pub struct MusicProfile {
    pub name: String,
    pub track: Clip,
    pub fade_in_secs: f32,
    pub fade_out_secs: f32,
    /// Steady-state music volume to switch to when this track starts
    pub volume: Option<f32>,
}

impl MusicProfile {
    pub fn new(name: impl Into<String>, track: Clip) -> Self {
        Self {
            name: name.into(),
            track,
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
            volume: None,
        }
    }

    pub fn with_fades(mut self, fade_in_secs: f32, fade_out_secs: f32) -> Self {
        self.fade_in_secs = fade_in_secs;
        self.fade_out_secs = fade_out_secs;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn clips(n: usize) -> Vec<Clip> {
        (0..n).map(|i| Clip::new(format!("clip_{}", i), 1.0)).collect()
    }

    #[test]
    fn test_range_with_nan_bound_falls_back() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(RangeF32::new(0.5, f32::NAN).sample(&mut rng), 0.5);
        assert_eq!(RangeF32::new(f32::NAN, 0.25).sample(&mut rng), 0.25);
        assert_eq!(RangeF32::new(f32::NAN, f32::NAN).sample(&mut rng), 0.0);
    }

    #[test]
    fn test_range_with_infinite_bound_falls_back() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(RangeF32::new(0.0, f32::INFINITY).sample(&mut rng), 0.0);
        assert_eq!(RangeF32::new(f32::NEG_INFINITY, 1.0).sample(&mut rng), 1.0);
        assert!(!RangeF32::new(0.0, f32::INFINITY).is_finite());
    }

    #[test]
    fn test_range_with_huge_span_samples_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        let range = RangeF32::new(-f32::MAX, f32::MAX);
        for _ in 0..20 {
            let value = range.sample(&mut rng);
            assert!(value.is_finite());
            assert!(range.contains(value));
        }
    }

    #[test]
    fn test_empty_profile_selects_nothing() {
        let profile = SoundEffectProfile::new("empty", Vec::new());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(profile.select_clip(&mut rng).is_none());
    }

    #[test]
    fn test_single_clip_has_no_history() {
        let profile = SoundEffectProfile::new("one", clips(1));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..5 {
            let (index, _) = profile.select_clip(&mut rng).unwrap();
            assert_eq!(index, 0);
        }
        assert_eq!(profile.last_index(), None);
    }

    #[test]
    fn test_smart_random_never_repeats() {
        let profile = SoundEffectProfile::new("steps", clips(2));
        let mut rng = StdRng::seed_from_u64(7);
        let mut previous = None;
        for _ in 0..200 {
            let (index, clip) = profile.select_clip(&mut rng).unwrap();
            assert_eq!(clip, profile.clips[index]);
            assert_ne!(Some(index), previous);
            previous = Some(index);
        }
    }

    #[test]
    fn test_plain_random_covers_all_clips() {
        let profile = SoundEffectProfile::new("hits", clips(3)).with_smart_random(false);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 3];
        for _ in 0..300 {
            let (index, _) = profile.select_clip(&mut rng).unwrap();
            seen[index] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(profile.last_index(), None);
    }

    #[test]
    fn test_range_sample_inclusive_and_reversed() {
        let mut rng = StdRng::seed_from_u64(11);
        let range = RangeF32::new(1.2, 0.8);
        for _ in 0..100 {
            let v = range.sample(&mut rng);
            assert!(range.contains(v), "{} outside range", v);
        }
        assert_eq!(RangeF32::fixed(0.5).sample(&mut rng), 0.5);
    }
}
