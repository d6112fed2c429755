//! Music Crossfader
//!
//! Two dedicated channels handle background music. The primary channel
//! loops the audible track; when the track changes, the outgoing track is
//! copied onto the fader channel and faded out there while the new track
//! fades in on the primary.
//!
//! Transition rules:
//! - Requesting the track already on the primary does nothing
//! - A fade-out only happens when there is something to fade out
//! - A new transition cancels only the ramp of the same direction

use std::fmt;

use tracing::{debug, info};

use super::scheduler::{RampEnd, RampTask, Scheduler, TaskId};
use crate::assets::Clip;
use crate::backend::{share, AudioBackend, ChannelSpec, SharedChannel};
use crate::dsp::LinearRamp;

/// Name of the channel carrying the audible track
pub const PRIMARY_CHANNEL: &str = "music_primary";

/// Name of the channel carrying the outgoing track during a crossfade
pub const FADER_CHANNEL: &str = "music_fader";

/// Point-in-time view of one music channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub clip: Option<Clip>,
    pub volume: f32,
    pub playing: bool,
    pub time: f32,
}

/// Two-channel music state machine
pub struct MusicCrossfader {
    primary: SharedChannel,
    fader: SharedChannel,
    fade_in: Option<TaskId>,
    fade_out: Option<TaskId>,
    target_volume: f32,
}

impl MusicCrossfader {
    /// Create the primary and fader channels under `group`
    ///
    /// # Arguments
    /// * `backend` - Host that creates the two channels
    /// * `group` - Parent group name for both channels
    /// * `target_volume` - Steady-state volume, clamped to `[0, 1]`
    pub fn new(backend: &mut dyn AudioBackend, group: &str, target_volume: f32) -> Self {
        let primary = share(backend.create_channel(&ChannelSpec::new(PRIMARY_CHANNEL, group)));
        let fader = share(backend.create_channel(&ChannelSpec::new(FADER_CHANNEL, group)));
        let target_volume = clamp_volume(target_volume);

        {
            let mut channel = primary.borrow_mut();
            let mut params = channel.params();
            params.looping = true;
            params.volume = target_volume;
            channel.set_params(params);
        }

        info!(group, target_volume, "music crossfader ready");
        Self {
            primary,
            fader,
            fade_in: None,
            fade_out: None,
            target_volume,
        }
    }

    /// Transition to `track`
    ///
    /// `None` stops the music. Returns false when `track` is already the
    /// primary's clip and nothing changed.
    ///
    /// # Arguments
    /// * `scheduler` - Runs the fade ramps
    /// * `track` - Incoming track, or `None` for silence
    /// * `fade_in` - Seconds to ramp the incoming track from 0 to the target volume
    /// * `fade_out` - Seconds to ramp the outgoing track to 0
    pub fn play_music(
        &mut self,
        scheduler: &mut Scheduler,
        track: Option<Clip>,
        fade_in: f32,
        fade_out: f32,
    ) -> bool {
        let current = self.primary.borrow().clip();
        if current == track {
            debug!("requested music is already playing");
            return false;
        }

        if fade_out > 0.0 && current.is_some() {
            self.hand_off_to_fader(scheduler, fade_out);
        }

        if let Some(id) = self.fade_in.take() {
            scheduler.cancel(id);
        }

        let mut primary = self.primary.borrow_mut();
        primary.stop();

        let track = match track {
            Some(track) => track,
            None => {
                primary.set_clip(None);
                debug!(fade_out, "music stopped");
                return true;
            }
        };

        primary.set_clip(Some(track.clone()));
        let mut params = primary.params();
        params.looping = true;
        params.volume = if fade_in > 0.0 { 0.0 } else { self.target_volume };
        primary.set_params(params);
        primary.play();
        drop(primary);

        if fade_in > 0.0 {
            let ramp = LinearRamp::new(0.0, self.target_volume, fade_in);
            let task = RampTask::new(self.primary.clone(), ramp, RampEnd::Hold);
            self.fade_in = Some(scheduler.spawn(Box::new(task)));
        }
        debug!(track = %track, fade_in, fade_out, "music transition started");
        true
    }

    /// Fade the current track out and leave the primary silent
    pub fn stop_music(&mut self, scheduler: &mut Scheduler, fade_out: f32) -> bool {
        self.play_music(scheduler, None, 0.0, fade_out)
    }

    /// Cut both channels at once and drop any running ramp
    pub fn stop_immediately(&mut self, scheduler: &mut Scheduler) {
        for id in [self.fade_in.take(), self.fade_out.take()].into_iter().flatten() {
            scheduler.cancel(id);
        }
        for channel in [&self.primary, &self.fader] {
            let mut channel = channel.borrow_mut();
            channel.stop();
            channel.set_clip(None);
        }
        let mut primary = self.primary.borrow_mut();
        let mut params = primary.params();
        params.volume = self.target_volume;
        primary.set_params(params);
    }

    /// Track currently assigned to the primary channel
    pub fn current_clip(&self) -> Option<Clip> {
        self.primary.borrow().clip()
    }

    /// True while a fade-in or fade-out ramp is still running
    pub fn is_fading(&self, scheduler: &Scheduler) -> bool {
        [self.fade_in, self.fade_out]
            .into_iter()
            .flatten()
            .any(|id| scheduler.is_active(id))
    }

    pub fn target_volume(&self) -> f32 {
        self.target_volume
    }

    /// Change the steady-state volume
    ///
    /// Applied to both channels right away unless a fade is running, in
    /// which case it is stored and used by the next transition.
    pub fn set_target_volume(&mut self, scheduler: &Scheduler, volume: f32) {
        self.target_volume = clamp_volume(volume);
        if self.is_fading(scheduler) {
            debug!(volume = self.target_volume, "music volume deferred until fade ends");
            return;
        }
        for channel in [&self.primary, &self.fader] {
            let mut channel = channel.borrow_mut();
            let mut params = channel.params();
            params.volume = self.target_volume;
            channel.set_params(params);
        }
    }

    pub fn primary_state(&self) -> ChannelSnapshot {
        snapshot(&self.primary)
    }

    pub fn fader_state(&self) -> ChannelSnapshot {
        snapshot(&self.fader)
    }

    /// Destroy both channels; the crossfader is unusable afterwards
    pub fn destroy(&mut self, scheduler: &mut Scheduler) {
        self.stop_immediately(scheduler);
        self.primary.borrow_mut().destroy();
        self.fader.borrow_mut().destroy();
    }

    /// Move the primary's track onto the fader and ramp it to silence
    fn hand_off_to_fader(&mut self, scheduler: &mut Scheduler, fade_out: f32) {
        if let Some(id) = self.fade_out.take() {
            scheduler.cancel(id);
        }

        let primary = self.primary.borrow();
        let mut fader = self.fader.borrow_mut();
        let params = primary.params();
        fader.set_clip(primary.clip());
        fader.set_params(params);
        fader.set_output_route(primary.output_route());
        fader.set_time(primary.time());
        fader.play();
        drop(fader);
        drop(primary);

        let ramp = LinearRamp::new(params.volume, 0.0, fade_out);
        let task = RampTask::new(self.fader.clone(), ramp, RampEnd::StopAndClear);
        self.fade_out = Some(scheduler.spawn(Box::new(task)));
    }
}

impl fmt::Debug for MusicCrossfader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MusicCrossfader")
            .field("current", &self.current_clip())
            .field("fade_in", &self.fade_in)
            .field("fade_out", &self.fade_out)
            .field("target_volume", &self.target_volume)
            .finish()
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

fn snapshot(channel: &SharedChannel) -> ChannelSnapshot {
    let channel = channel.borrow();
    ChannelSnapshot {
        clip: channel.clip(),
        volume: channel.params().volume,
        playing: channel.is_playing(),
        time: channel.time(),
    }
}
