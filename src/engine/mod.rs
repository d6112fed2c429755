//! Playback Engine Module
//!
//! Runtime playback on top of a host backend:
//! - Voice handles and their lifecycle
//! - The voice pool that lends out channels
//! - One-shot and sound-effect playback
//! - The two-channel music crossfader
//! - The tick scheduler driving fades and finish watchers

mod events;
mod music;
mod player;
mod pool;
mod scheduler;
mod system;
mod voice;

pub use events::{ListenerId, ListenerResult, Listeners, VoiceEvent, VoiceEventKind};
pub use music::{ChannelSnapshot, MusicCrossfader, FADER_CHANNEL, PRIMARY_CHANNEL};
pub use player::{OneShotPlayer, PlayOptions};
pub use pool::VoicePool;
pub use scheduler::{RampEnd, RampTask, Scheduler, Task, TaskId, TaskPoll, TaskSignal, WatchTask};
pub use system::{AudioSystem, MusicSource};
pub use voice::{
    Voice, VoiceId, DEFAULT_PRIORITY, DOPPLER_RANGE, PITCH_RANGE, PRIORITY_RANGE,
    SPATIAL_BLEND_RANGE, SPREAD_RANGE, STEREO_PAN_RANGE, VOLUME_RANGE,
};
