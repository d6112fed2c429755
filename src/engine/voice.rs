//! Voice handle
//!
//! A `Voice` is the caller's control handle for one channel on loan from the
//! [`VoicePool`](super::VoicePool). Handles are cheap clones of the same
//! voice. Once the pool reclaims the channel the voice is disposed and every
//! handle degrades to an inert, permanently finished state: reads return
//! neutral defaults and writes are ignored.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::events::{
    EventQueue, ListenerId, ListenerResult, Listeners, PendingEvent, VoiceEvent, VoiceEventKind,
};
use crate::assets::Clip;
use crate::backend::{ChannelId, ChannelParams, RolloffMode, SharedChannel, Vec3};
use crate::dsp::{db_to_linear, linear_to_db};

// ============================================================================
// Parameter Ranges
// ============================================================================

pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);
pub const PITCH_RANGE: (f32, f32) = (-3.0, 3.0);
pub const STEREO_PAN_RANGE: (f32, f32) = (-1.0, 1.0);
pub const SPATIAL_BLEND_RANGE: (f32, f32) = (0.0, 1.0);
pub const DOPPLER_RANGE: (f32, f32) = (0.0, 5.0);
pub const SPREAD_RANGE: (f32, f32) = (0.0, 360.0);
pub const PRIORITY_RANGE: (i32, i32) = (0, 256);

/// Priority given to one-shot voices unless overridden
pub const DEFAULT_PRIORITY: i32 = 128;

/// Clamp to `[lo, hi]`, mapping NaN to `lo`
fn clamp(value: f32, (lo, hi): (f32, f32)) -> f32 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

// ============================================================================
// Voice
// ============================================================================

/// Identifier of a voice, unique per pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

struct VoiceState {
    id: VoiceId,
    channel_id: ChannelId,
    channel: Option<SharedChannel>,
    paused: bool,
    started: bool,
    finished: bool,
    force_finished: bool,
    watched: bool,
    events: Weak<RefCell<EventQueue>>,
    on_finished: Listeners<VoiceEvent>,
    on_paused: Listeners<VoiceEvent>,
}

/// Control handle for one pooled channel
#[derive(Clone)]
pub struct Voice {
    state: Rc<RefCell<VoiceState>>,
}

impl Voice {
    pub(crate) fn new(
        id: VoiceId,
        channel: SharedChannel,
        events: Weak<RefCell<EventQueue>>,
    ) -> Self {
        let channel_id = channel.borrow().id();
        Self {
            state: Rc::new(RefCell::new(VoiceState {
                id,
                channel_id,
                channel: Some(channel),
                paused: false,
                started: false,
                finished: false,
                force_finished: false,
                watched: false,
                events,
                on_finished: Listeners::new(),
                on_paused: Listeners::new(),
            })),
        }
    }

    pub fn id(&self) -> VoiceId {
        self.state.borrow().id
    }

    /// Channel this voice was bound to; stays valid after disposal
    pub fn channel_id(&self) -> ChannelId {
        self.state.borrow().channel_id
    }

    // ------------------------------------------------------------------------
    // Lifecycle Queries
    // ------------------------------------------------------------------------

    /// Channel present, producing sound and not locally paused
    pub fn is_playing(&self) -> bool {
        let state = self.state.borrow();
        match &state.channel {
            Some(channel) => !state.paused && channel.borrow().is_playing(),
            None => false,
        }
    }

    pub fn is_paused(&self) -> bool {
        let state = self.state.borrow();
        state.paused && state.channel.is_some()
    }

    /// True once the voice can no longer produce sound
    ///
    /// A started voice that has been observed finished stays finished. While
    /// the host listener pause holds a voice that does not ignore it, the
    /// silent channel does not count as finished.
    pub fn is_finished(&self) -> bool {
        let finished = {
            let state = self.state.borrow();
            let channel = match &state.channel {
                Some(channel) => channel.borrow(),
                None => return true,
            };
            if state.finished || state.force_finished {
                return true;
            }
            if state.paused || channel.is_playing() {
                return false;
            }
            let held = channel.listener_paused()
                && !channel.params().ignore_listener_pause
                && channel.clip().is_some();
            !(held && state.started)
        };
        let mut state = self.state.borrow_mut();
        if finished && state.started {
            state.finished = true;
        }
        finished
    }

    pub fn is_disposed(&self) -> bool {
        self.state.borrow().channel.is_none()
    }

    pub(crate) fn is_force_finished(&self) -> bool {
        self.state.borrow().force_finished
    }

    pub(crate) fn is_started(&self) -> bool {
        self.state.borrow().started
    }

    pub(crate) fn is_watched(&self) -> bool {
        self.state.borrow().watched
    }

    pub(crate) fn set_watched(&self, watched: bool) {
        self.state.borrow_mut().watched = watched;
    }

    // ------------------------------------------------------------------------
    // Lifecycle Control
    // ------------------------------------------------------------------------

    /// Start a freshly configured voice
    ///
    /// A voice plays at most once; later calls are ignored.
    pub fn play(&self) {
        let mut state = self.state.borrow_mut();
        if state.started || state.force_finished {
            return;
        }
        if let Some(channel) = &state.channel {
            channel.borrow_mut().play();
            state.started = true;
            trace!(voice = %state.id, channel = %state.channel_id, "voice started");
        }
    }

    /// Pause playback; ignored when finished or already paused
    pub fn pause(&self) {
        if self.is_finished() || self.is_paused() {
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            state.paused = true;
            if let Some(channel) = &state.channel {
                channel.borrow_mut().pause();
            }
        }
        self.queue_event(VoiceEventKind::Paused(true));
    }

    /// Resume a paused voice; ignored unless paused
    pub fn unpause(&self) {
        if !self.is_paused() {
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            state.paused = false;
            if let Some(channel) = &state.channel {
                channel.borrow_mut().unpause();
            }
        }
        self.queue_event(VoiceEventKind::Paused(false));
    }

    /// Stop immediately without a finished notification
    ///
    /// Also suppresses a pending natural-finish notification if the clip
    /// ended earlier in the same tick.
    pub fn force_finish(&self) {
        let already_finished = self.is_finished();
        let mut state = self.state.borrow_mut();
        if state.channel.is_none() {
            return;
        }
        state.force_finished = true;
        if already_finished {
            return;
        }
        if let Some(channel) = &state.channel {
            channel.borrow_mut().stop();
        }
        state.paused = false;
        trace!(voice = %state.id, "voice force finished");
    }

    /// Detach from the channel for good
    pub fn dispose(&self) {
        let mut state = self.state.borrow_mut();
        if state.channel.take().is_some() {
            state.paused = false;
            trace!(voice = %state.id, channel = %state.channel_id, "voice disposed");
        }
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Register a listener for the natural end of playback
    pub fn on_finished<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&VoiceEvent) -> ListenerResult + 'static,
    {
        self.state.borrow_mut().on_finished.subscribe(listener)
    }

    /// Register a listener for pause / unpause
    pub fn on_paused<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&VoiceEvent) -> ListenerResult + 'static,
    {
        self.state.borrow_mut().on_paused.subscribe(listener)
    }

    pub(crate) fn event(&self, kind: VoiceEventKind) -> VoiceEvent {
        let state = self.state.borrow();
        VoiceEvent {
            voice: state.id,
            channel: state.channel_id,
            kind,
        }
    }

    /// Run this voice's own listeners for `event`
    ///
    /// Listeners are taken out while they run so they may use this voice.
    pub(crate) fn dispatch(&self, event: &VoiceEvent) -> usize {
        let mut listeners = {
            let mut state = self.state.borrow_mut();
            match event.kind {
                VoiceEventKind::Finished => std::mem::take(&mut state.on_finished),
                VoiceEventKind::Paused(_) => std::mem::take(&mut state.on_paused),
            }
        };
        let failures = listeners.dispatch(event, "voice");

        let mut state = self.state.borrow_mut();
        let slot = match event.kind {
            VoiceEventKind::Finished => &mut state.on_finished,
            VoiceEventKind::Paused(_) => &mut state.on_paused,
        };
        listeners.absorb(std::mem::take(slot));
        *slot = listeners;
        failures
    }

    fn queue_event(&self, kind: VoiceEventKind) {
        let queue = self.state.borrow().events.upgrade();
        if let Some(queue) = queue {
            queue.borrow_mut().push_back(PendingEvent {
                voice: self.clone(),
                kind,
            });
        }
    }

    // ------------------------------------------------------------------------
    // Channel Access
    // ------------------------------------------------------------------------

    fn read<T>(&self, default: T, f: impl FnOnce(&ChannelParams) -> T) -> T {
        let state = self.state.borrow();
        match &state.channel {
            Some(channel) => f(&channel.borrow().params()),
            None => default,
        }
    }

    fn write(&self, f: impl FnOnce(&mut ChannelParams)) {
        let state = self.state.borrow();
        if let Some(channel) = &state.channel {
            let mut channel = channel.borrow_mut();
            let mut params = channel.params();
            f(&mut params);
            channel.set_params(params);
        }
    }

    /// Assign the clip to play, rewinding the channel
    ///
    /// Ignored once the voice has started or was force finished.
    pub fn set_clip(&self, clip: Clip) {
        let state = self.state.borrow();
        if state.started || state.force_finished {
            return;
        }
        if let Some(channel) = &state.channel {
            channel.borrow_mut().set_clip(Some(clip));
        }
    }

    pub fn clip(&self) -> Option<Clip> {
        let state = self.state.borrow();
        state.channel.as_ref().and_then(|c| c.borrow().clip())
    }

    pub fn output_route(&self) -> Option<String> {
        let state = self.state.borrow();
        state.channel.as_ref().and_then(|c| c.borrow().output_route())
    }

    pub fn set_output_route(&self, route: Option<String>) {
        let state = self.state.borrow();
        if let Some(channel) = &state.channel {
            channel.borrow_mut().set_output_route(route);
        }
    }

    pub fn volume(&self) -> f32 {
        self.read(0.0, |p| p.volume)
    }

    /// Clamped to `[0, 1]`
    pub fn set_volume(&self, volume: f32) {
        self.write(|p| p.volume = clamp(volume, VOLUME_RANGE));
    }

    /// Volume in decibels, [`SILENCE_DB`](crate::dsp::SILENCE_DB) when silent
    pub fn volume_db(&self) -> f32 {
        linear_to_db(self.volume())
    }

    /// Set the volume in decibels; values above 0 dB clamp to full volume
    pub fn set_volume_db(&self, db: f32) {
        self.set_volume(db_to_linear(db));
    }

    pub fn pitch(&self) -> f32 {
        self.read(0.0, |p| p.pitch)
    }

    /// Clamped to `[-3, 3]`
    pub fn set_pitch(&self, pitch: f32) {
        self.write(|p| p.pitch = clamp(pitch, PITCH_RANGE));
    }

    pub fn looping(&self) -> bool {
        self.read(false, |p| p.looping)
    }

    pub fn set_looping(&self, looping: bool) {
        self.write(|p| p.looping = looping);
    }

    pub fn priority(&self) -> i32 {
        self.read(0, |p| p.priority)
    }

    /// Clamped to `[0, 256]`; lower is more important
    pub fn set_priority(&self, priority: i32) {
        self.write(|p| p.priority = priority.clamp(PRIORITY_RANGE.0, PRIORITY_RANGE.1));
    }

    pub fn stereo_pan(&self) -> f32 {
        self.read(0.0, |p| p.stereo_pan)
    }

    /// Clamped to `[-1, 1]`
    pub fn set_stereo_pan(&self, pan: f32) {
        self.write(|p| p.stereo_pan = clamp(pan, STEREO_PAN_RANGE));
    }

    pub fn spatial_blend(&self) -> f32 {
        self.read(0.0, |p| p.spatial_blend)
    }

    /// Clamped to `[0, 1]`; 0 is fully 2D, 1 fully 3D
    pub fn set_spatial_blend(&self, blend: f32) {
        self.write(|p| p.spatial_blend = clamp(blend, SPATIAL_BLEND_RANGE));
    }

    pub fn doppler_level(&self) -> f32 {
        self.read(0.0, |p| p.doppler_level)
    }

    /// Clamped to `[0, 5]`
    pub fn set_doppler_level(&self, level: f32) {
        self.write(|p| p.doppler_level = clamp(level, DOPPLER_RANGE));
    }

    pub fn spread(&self) -> f32 {
        self.read(0.0, |p| p.spread)
    }

    /// Clamped to `[0, 360]` degrees
    pub fn set_spread(&self, degrees: f32) {
        self.write(|p| p.spread = clamp(degrees, SPREAD_RANGE));
    }

    pub fn min_distance(&self) -> f32 {
        self.read(0.0, |p| p.min_distance)
    }

    pub fn set_min_distance(&self, distance: f32) {
        self.write(|p| p.min_distance = non_negative(distance));
    }

    pub fn max_distance(&self) -> f32 {
        self.read(0.0, |p| p.max_distance)
    }

    pub fn set_max_distance(&self, distance: f32) {
        self.write(|p| p.max_distance = non_negative(distance));
    }

    pub fn rolloff_mode(&self) -> RolloffMode {
        self.read(RolloffMode::default(), |p| p.rolloff)
    }

    pub fn set_rolloff_mode(&self, mode: RolloffMode) {
        self.write(|p| p.rolloff = mode);
    }

    pub fn mute(&self) -> bool {
        self.read(false, |p| p.mute)
    }

    pub fn set_mute(&self, mute: bool) {
        self.write(|p| p.mute = mute);
    }

    pub fn ignore_listener_pause(&self) -> bool {
        self.read(false, |p| p.ignore_listener_pause)
    }

    pub fn set_ignore_listener_pause(&self, ignore: bool) {
        self.write(|p| p.ignore_listener_pause = ignore);
    }

    pub fn ignore_listener_volume(&self) -> bool {
        self.read(false, |p| p.ignore_listener_volume)
    }

    pub fn set_ignore_listener_volume(&self, ignore: bool) {
        self.write(|p| p.ignore_listener_volume = ignore);
    }

    pub fn position(&self) -> Vec3 {
        self.read(Vec3::ZERO, |p| p.position)
    }

    pub fn set_position(&self, position: Vec3) {
        self.write(|p| p.position = position);
    }

    /// Playback cursor in seconds
    pub fn time(&self) -> f32 {
        let state = self.state.borrow();
        state.channel.as_ref().map_or(0.0, |c| c.borrow().time())
    }

    pub fn set_time(&self, secs: f32) {
        let state = self.state.borrow();
        if let Some(channel) = &state.channel {
            channel.borrow_mut().set_time(non_negative(secs));
        }
    }

    /// Playback cursor in sample frames
    pub fn time_samples(&self) -> u64 {
        let state = self.state.borrow();
        state.channel.as_ref().map_or(0, |c| c.borrow().time_samples())
    }

    pub fn set_time_samples(&self, samples: u64) {
        let state = self.state.borrow();
        if let Some(channel) = &state.channel {
            channel.borrow_mut().set_time_samples(samples);
        }
    }
}

impl PartialEq for Voice {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for Voice {}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Voice")
            .field("id", &state.id)
            .field("channel", &state.channel_id)
            .field("attached", &state.channel.is_some())
            .field("paused", &state.paused)
            .field("started", &state.started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{share, AudioBackend, ChannelSpec, VirtualBackend};
    use test_case::test_case;

    fn voice(backend: &mut VirtualBackend) -> Voice {
        let channel = share(backend.create_channel(&ChannelSpec::new("voice_0", "test")));
        Voice::new(VoiceId(0), channel, Weak::new())
    }

    fn playing_voice(backend: &mut VirtualBackend, length: f32) -> Voice {
        let v = voice(backend);
        v.set_clip(Clip::new("clip", length));
        v.play();
        v
    }

    #[test_case(1.5, 1.0 ; "above range")]
    #[test_case(-0.2, 0.0 ; "below range")]
    #[test_case(0.4, 0.4 ; "in range")]
    #[test_case(f32::NAN, 0.0 ; "nan")]
    fn test_volume_clamping(input: f32, expected: f32) {
        let mut backend = VirtualBackend::new();
        let v = voice(&mut backend);
        v.set_volume(input);
        assert_eq!(v.volume(), expected);
    }

    #[test_case(-10.0, -3.0)]
    #[test_case(10.0, 3.0)]
    #[test_case(-0.5, -0.5)]
    fn test_pitch_clamping(input: f32, expected: f32) {
        let mut backend = VirtualBackend::new();
        let v = voice(&mut backend);
        v.set_pitch(input);
        assert_eq!(v.pitch(), expected);
    }

    #[test_case(-5, 0)]
    #[test_case(300, 256)]
    #[test_case(64, 64)]
    fn test_priority_clamping(input: i32, expected: i32) {
        let mut backend = VirtualBackend::new();
        let v = voice(&mut backend);
        v.set_priority(input);
        assert_eq!(v.priority(), expected);
    }

    #[test]
    fn test_other_clamps() {
        let mut backend = VirtualBackend::new();
        let v = voice(&mut backend);
        v.set_stereo_pan(-4.0);
        v.set_spatial_blend(2.0);
        v.set_doppler_level(9.0);
        v.set_spread(720.0);
        v.set_min_distance(-1.0);
        v.set_max_distance(-100.0);
        assert_eq!(v.stereo_pan(), -1.0);
        assert_eq!(v.spatial_blend(), 1.0);
        assert_eq!(v.doppler_level(), 5.0);
        assert_eq!(v.spread(), 360.0);
        assert_eq!(v.min_distance(), 0.0);
        assert_eq!(v.max_distance(), 0.0);
    }

    #[test]
    fn test_played_voice_is_not_finished() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 1.0);
        assert!(v.is_playing());
        assert!(!v.is_finished());
        assert!(!v.is_paused());
    }

    #[test]
    fn test_natural_finish_is_permanent() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 0.5);
        backend.update(1.0);
        assert!(v.is_finished());

        // A later listener pause must not revive it
        backend.set_listener_paused(true);
        assert!(v.is_finished());
    }

    #[test]
    fn test_listener_pause_holds_voice() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 1.0);
        backend.set_listener_paused(true);
        assert!(!v.is_playing());
        assert!(!v.is_finished());

        v.set_ignore_listener_pause(true);
        assert!(v.is_playing());
    }

    #[test]
    fn test_pause_and_unpause() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 1.0);
        v.pause();
        assert!(v.is_paused());
        assert!(!v.is_playing());
        assert!(!v.is_finished());

        backend.update(5.0);
        assert!(!v.is_finished());

        v.unpause();
        assert!(v.is_playing());
        assert!(!v.is_paused());
    }

    #[test]
    fn test_pause_when_finished_is_ignored() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 0.1);
        backend.update(1.0);
        v.pause();
        assert!(!v.is_paused());
    }

    #[test]
    fn test_force_finish_is_permanent() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 1.0);
        v.pause();
        v.force_finish();
        assert!(v.is_finished());
        assert!(!v.is_paused());
        assert!(v.is_force_finished());

        v.play();
        v.unpause();
        assert!(v.is_finished());
    }

    #[test]
    fn test_disposed_voice_reads_defaults() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 1.0);
        v.set_volume(0.5);
        v.set_position(Vec3::new(1.0, 2.0, 3.0));
        v.dispose();

        assert!(v.is_disposed());
        assert!(v.is_finished());
        assert!(v.clip().is_none());
        assert_eq!(v.volume(), 0.0);
        assert_eq!(v.time(), 0.0);
        assert_eq!(v.time_samples(), 0);
        assert_eq!(v.position(), Vec3::ZERO);
        assert_eq!(v.output_route(), None);

        // Writes are ignored
        v.set_volume(1.0);
        v.set_time(3.0);
        v.pause();
        assert_eq!(v.volume(), 0.0);
        assert!(!v.is_paused());
    }

    #[test]
    fn test_clones_share_state() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 1.0);
        let other = v.clone();
        other.set_pitch(2.0);
        assert_eq!(v.pitch(), 2.0);
        assert_eq!(v, other);
    }

    #[test]
    fn test_volume_in_decibels() {
        let mut backend = VirtualBackend::new();
        let v = voice(&mut backend);
        v.set_volume_db(-6.0);
        assert!((v.volume() - 0.501).abs() < 1e-3);
        assert!((v.volume_db() + 6.0).abs() < 1e-3);

        v.set_volume_db(12.0);
        assert_eq!(v.volume(), 1.0);
        v.set_volume(0.0);
        assert_eq!(v.volume_db(), crate::dsp::SILENCE_DB);
    }

    #[test]
    fn test_set_clip_ignored_after_start() {
        let mut backend = VirtualBackend::new();
        let v = playing_voice(&mut backend, 5.0);
        backend.update(1.0);
        v.set_clip(Clip::new("other", 5.0));
        assert_eq!(v.clip().map(|c| c.name().to_string()), Some("clip".to_string()));
        assert!((v.time() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cursor_access() {
        let mut backend = VirtualBackend::new();
        let v = voice(&mut backend);
        v.set_clip(Clip::with_format("long", 10.0, 1000, 2));
        v.set_time(-2.0);
        assert_eq!(v.time(), 0.0);
        v.set_time_samples(2500);
        assert!((v.time() - 2.5).abs() < 1e-6);
        assert_eq!(v.time_samples(), 2500);
    }
}
