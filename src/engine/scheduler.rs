//! Cooperative Task Scheduler
//!
//! Long-running work (volume ramps, voice watchers) is expressed as a
//! [`Task`] polled once per engine tick. Everything runs on the engine
//! thread; tasks never block and there is no preemption between polls.

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use super::voice::Voice;
use crate::backend::SharedChannel;
use crate::dsp::LinearRamp;

// ============================================================================
// Task Protocol
// ============================================================================

/// Identifier of a spawned task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// Something the engine must act on after a task completes
#[derive(Debug, Clone, PartialEq)]
pub enum TaskSignal {
    /// A watched voice ended naturally; notify, then reclaim its channel
    VoiceFinished(Voice),
    /// A watched voice was force-finished; reclaim silently
    VoiceAbandoned(Voice),
}

/// Outcome of polling a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPoll {
    Pending,
    Ready(Option<TaskSignal>),
}

/// A unit of work advanced once per tick
pub trait Task {
    /// Short name used in traces
    fn label(&self) -> &'static str;

    /// Advance by `dt` seconds
    fn poll(&mut self, dt: f32) -> TaskPoll;
}

// ============================================================================
// Scheduler
// ============================================================================

/// Runs tasks in spawn order until they complete or are cancelled
#[derive(Default)]
pub struct Scheduler {
    next_id: u64,
    tasks: BTreeMap<TaskId, Box<dyn Task>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, task: Box<dyn Task>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        trace!(task = id.0, label = task.label(), "task spawned");
        self.tasks.insert(id, task);
        id
    }

    /// Drop a task without running its completion
    ///
    /// Returns false when the task already finished or was never spawned.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.tasks.remove(&id) {
            Some(task) => {
                trace!(task = id.0, label = task.label(), "task cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Poll every task once and collect completion signals in spawn order
    pub fn tick(&mut self, dt: f32) -> Vec<TaskSignal> {
        let mut signals = Vec::new();
        let mut done = Vec::new();
        for (id, task) in self.tasks.iter_mut() {
            if let TaskPoll::Ready(signal) = task.poll(dt) {
                trace!(task = id.0, label = task.label(), "task complete");
                done.push(*id);
                signals.extend(signal);
            }
        }
        for id in done {
            self.tasks.remove(&id);
        }
        signals
    }

    /// Drop every task
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

// ============================================================================
// Volume Ramp
// ============================================================================

/// What a ramp does to its channel once the target is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampEnd {
    /// Leave the channel playing at the final volume
    Hold,
    /// Stop the channel and detach its clip
    StopAndClear,
}

/// Moves a channel's volume linearly over time
pub struct RampTask {
    channel: SharedChannel,
    ramp: LinearRamp,
    end: RampEnd,
}

impl RampTask {
    pub fn new(channel: SharedChannel, ramp: LinearRamp, end: RampEnd) -> Self {
        Self { channel, ramp, end }
    }

    fn set_volume(&self, volume: f32) {
        let mut channel = self.channel.borrow_mut();
        let mut params = channel.params();
        params.volume = volume;
        channel.set_params(params);
    }
}

impl Task for RampTask {
    fn label(&self) -> &'static str {
        match self.end {
            RampEnd::Hold => "fade_in",
            RampEnd::StopAndClear => "fade_out",
        }
    }

    fn poll(&mut self, dt: f32) -> TaskPoll {
        let volume = self.ramp.advance(dt);
        self.set_volume(volume);
        if !self.ramp.is_complete() {
            return TaskPoll::Pending;
        }
        if self.end == RampEnd::StopAndClear {
            let mut channel = self.channel.borrow_mut();
            channel.stop();
            channel.set_clip(None);
        }
        TaskPoll::Ready(None)
    }
}

// ============================================================================
// Voice Watcher
// ============================================================================

/// Waits for a voice to finish so its channel can go back to the pool
///
/// While the watcher is alive the pool will not hand the voice's channel to
/// anyone else.
pub struct WatchTask {
    voice: Voice,
}

impl WatchTask {
    pub fn new(voice: Voice) -> Self {
        voice.set_watched(true);
        Self { voice }
    }
}

impl Task for WatchTask {
    fn label(&self) -> &'static str {
        "watch_voice"
    }

    fn poll(&mut self, _dt: f32) -> TaskPoll {
        if self.voice.is_disposed() {
            self.voice.set_watched(false);
            return TaskPoll::Ready(None);
        }
        if self.voice.is_force_finished() {
            self.voice.set_watched(false);
            return TaskPoll::Ready(Some(TaskSignal::VoiceAbandoned(self.voice.clone())));
        }
        if self.voice.is_finished() {
            self.voice.set_watched(false);
            return TaskPoll::Ready(Some(TaskSignal::VoiceFinished(self.voice.clone())));
        }
        TaskPoll::Pending
    }
}

impl Drop for WatchTask {
    fn drop(&mut self) {
        self.voice.set_watched(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Clip;
    use crate::backend::{share, AudioBackend, ChannelSpec, VirtualBackend};
    use crate::engine::VoicePool;
    use approx::assert_relative_eq;

    struct Countdown(u32);

    impl Task for Countdown {
        fn label(&self) -> &'static str {
            "countdown"
        }

        fn poll(&mut self, _dt: f32) -> TaskPoll {
            if self.0 == 0 {
                return TaskPoll::Ready(None);
            }
            self.0 -= 1;
            TaskPoll::Pending
        }
    }

    #[test]
    fn test_tasks_run_until_ready() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.spawn(Box::new(Countdown(2)));
        scheduler.tick(0.1);
        scheduler.tick(0.1);
        assert!(scheduler.is_active(id));
        scheduler.tick(0.1);
        assert!(!scheduler.is_active(id));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.spawn(Box::new(Countdown(10)));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.len(), 0);
    }

    #[test]
    fn test_fade_out_ramp_stops_and_clears() {
        let mut backend = VirtualBackend::new();
        let channel = share(backend.create_channel(&ChannelSpec::new("music_fader", "music")));
        channel.borrow_mut().set_clip(Some(Clip::new("song", 60.0)));
        channel.borrow_mut().play();

        let mut scheduler = Scheduler::new();
        let ramp = LinearRamp::new(1.0, 0.0, 1.0);
        scheduler.spawn(Box::new(RampTask::new(channel.clone(), ramp, RampEnd::StopAndClear)));

        scheduler.tick(0.25);
        assert_relative_eq!(channel.borrow().params().volume, 0.75);
        assert!(channel.borrow().is_playing());

        scheduler.tick(1.0);
        assert_eq!(channel.borrow().params().volume, 0.0);
        assert!(!channel.borrow().is_playing());
        assert!(channel.borrow().clip().is_none());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_zero_length_ramp_completes_on_first_poll() {
        let mut backend = VirtualBackend::new();
        let channel = share(backend.create_channel(&ChannelSpec::new("music_primary", "music")));
        let mut task = RampTask::new(channel.clone(), LinearRamp::new(0.0, 0.8, 0.0), RampEnd::Hold);
        assert_eq!(task.poll(0.0), TaskPoll::Ready(None));
        assert_relative_eq!(channel.borrow().params().volume, 0.8);
    }

    #[test]
    fn test_watcher_signals_natural_finish() {
        let mut backend = VirtualBackend::new();
        let mut pool = VoicePool::new("pool");
        let voice = pool.acquire(&mut backend);
        voice.set_clip(Clip::new("blip", 0.5));
        voice.play();

        let mut scheduler = Scheduler::new();
        scheduler.spawn(Box::new(WatchTask::new(voice.clone())));
        assert!(voice.is_watched());
        assert!(scheduler.tick(0.1).is_empty());

        backend.update(1.0);
        let signals = scheduler.tick(0.1);
        assert_eq!(signals, vec![TaskSignal::VoiceFinished(voice.clone())]);
        assert!(!voice.is_watched());
    }

    #[test]
    fn test_watcher_signals_abandoned_voice() {
        let mut backend = VirtualBackend::new();
        let mut pool = VoicePool::new("pool");
        let voice = pool.acquire(&mut backend);
        voice.set_clip(Clip::new("blip", 5.0));
        voice.play();

        let mut scheduler = Scheduler::new();
        scheduler.spawn(Box::new(WatchTask::new(voice.clone())));
        voice.force_finish();
        let signals = scheduler.tick(0.1);
        assert_eq!(signals, vec![TaskSignal::VoiceAbandoned(voice)]);
    }

    #[test]
    fn test_watcher_ends_quietly_for_released_voice() {
        let mut backend = VirtualBackend::new();
        let mut pool = VoicePool::new("pool");
        let voice = pool.acquire(&mut backend);
        let mut scheduler = Scheduler::new();
        scheduler.spawn(Box::new(WatchTask::new(voice.clone())));

        pool.release(&voice);
        assert!(scheduler.tick(0.1).is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_clear_unwatches() {
        let mut backend = VirtualBackend::new();
        let mut pool = VoicePool::new("pool");
        let voice = pool.acquire(&mut backend);
        let mut scheduler = Scheduler::new();
        scheduler.spawn(Box::new(WatchTask::new(voice.clone())));
        scheduler.clear();
        assert!(!voice.is_watched());
    }
}
