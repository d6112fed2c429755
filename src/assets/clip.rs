//! Audio clip handles
//!
//! A clip is decoded audio owned by the host. The engine only needs its
//! identity and a few format facts, so a `Clip` is a cheap shared handle.

use std::fmt;
use std::sync::Arc;

/// Format facts about a clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    /// Asset name (usually the resource path)
    pub name: String,
    /// Length in seconds
    pub length_secs: f32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
}

/// Shared handle to a clip
///
/// Equality is identity: two handles are equal only when they point at the
/// same loaded clip, matching how the host compares asset references.
#[derive(Clone)]
pub struct Clip(Arc<ClipInfo>);

impl Clip {
    /// Create a stereo 48 kHz clip
    pub fn new(name: impl Into<String>, length_secs: f32) -> Self {
        Self::with_format(name, length_secs, 48000, 2)
    }

    /// Create a clip with an explicit format
    pub fn with_format(
        name: impl Into<String>,
        length_secs: f32,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self(Arc::new(ClipInfo {
            name: name.into(),
            length_secs: length_secs.max(0.0),
            sample_rate,
            channels,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn length_secs(&self) -> f32 {
        self.0.length_secs
    }

    pub fn sample_rate(&self) -> u32 {
        self.0.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.0.channels
    }

    /// Length in sample frames
    pub fn length_samples(&self) -> u64 {
        (self.0.length_secs as f64 * self.0.sample_rate as f64).round() as u64
    }

    pub fn info(&self) -> &ClipInfo {
        &self.0
    }
}

impl PartialEq for Clip {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Clip {}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Clip({:?}, {:.3}s)", self.0.name, self.0.length_secs)
    }
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}
