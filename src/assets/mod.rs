//! Assets
//!
//! Clips, playback profiles and path-based resource lookup.

mod clip;
mod loader;
mod profile;

pub use clip::{Clip, ClipInfo};
pub use loader::{ManifestLoader, Resource, ResourceCache, ResourceLoader};
pub use profile::{MusicProfile, RangeF32, SoundEffectProfile};
