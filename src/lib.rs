//! Resound - Pooled Playback for Game Audio
//!
//! Resound sits between a game loop and the host audio device. It provides:
//! 1. A voice pool lending reusable playback channels as [`Voice`] handles
//! 2. One-shot playback of clips and randomized sound-effect profiles
//! 3. A two-channel music crossfader with independent fade ramps
//!
//! # Architecture
//!
//! Everything runs on the game thread. [`AudioSystem::tick`] advances the
//! backend, polls the fade and finish-watch tasks, then delivers voice
//! notifications. The host device is reached through the
//! [`backend::AudioBackend`] and [`backend::Channel`] traits;
//! [`VirtualBackend`] simulates one in-process.

pub mod assets;
pub mod backend;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use assets::{Clip, ManifestLoader, MusicProfile, ResourceLoader, SoundEffectProfile};
pub use backend::{AudioBackend, Channel, Vec3, VirtualBackend};
pub use config::{AudioConfig, AudioDefaults};
pub use engine::{AudioSystem, MusicSource, PlayOptions, Voice, VoiceEvent, VoiceEventKind};
pub use error::{AudioError, Result};
