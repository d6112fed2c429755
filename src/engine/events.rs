//! Voice lifecycle notifications
//!
//! Voices never call listeners directly. Pause changes are queued and the
//! finished notification is produced by the voice watcher; the audio system
//! dispatches both once per tick. A listener that returns an error or panics
//! is logged and skipped, the remaining listeners still run.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use super::voice::{Voice, VoiceId};
use crate::backend::ChannelId;

/// What happened to a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEventKind {
    /// Raised by `pause()` (`true`) and `unpause()` (`false`)
    Paused(bool),
    /// Raised once when a watched voice reaches the end of its clip
    Finished,
}

/// A lifecycle notification for one voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceEvent {
    pub voice: VoiceId,
    pub channel: ChannelId,
    pub kind: VoiceEventKind,
}

impl VoiceEvent {
    /// The paused flag carried by a `Paused` event
    pub fn paused(&self) -> Option<bool> {
        match self.kind {
            VoiceEventKind::Paused(paused) => Some(paused),
            VoiceEventKind::Finished => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.kind == VoiceEventKind::Finished
    }
}

impl fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VoiceEventKind::Paused(true) => write!(f, "{} paused on {}", self.voice, self.channel),
            VoiceEventKind::Paused(false) => write!(f, "{} resumed on {}", self.voice, self.channel),
            VoiceEventKind::Finished => write!(f, "{} finished on {}", self.voice, self.channel),
        }
    }
}

/// Notification waiting for the next tick
pub(crate) struct PendingEvent {
    pub voice: Voice,
    pub kind: VoiceEventKind,
}

pub(crate) type EventQueue = VecDeque<PendingEvent>;

// ============================================================================
// Listener Registry
// ============================================================================

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Result returned by listeners; errors are logged, never propagated
pub type ListenerResult = anyhow::Result<()>;

type ListenerFn<T> = Box<dyn FnMut(&T) -> ListenerResult>;

/// Ordered set of observers for one kind of notification
pub struct Listeners<T> {
    next_id: u64,
    entries: Vec<(ListenerId, ListenerFn<T>)>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&T) -> ListenerResult + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false when it was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Call every listener in registration order
    ///
    /// Returns the number of listeners that failed.
    pub fn dispatch(&mut self, event: &T, scope: &str) -> usize {
        let mut failures = 0;
        for (id, listener) in self.entries.iter_mut() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    warn!(scope, listener = id.0, error = %err, "listener failed");
                }
                Err(_) => {
                    failures += 1;
                    warn!(scope, listener = id.0, "listener panicked");
                }
            }
        }
        failures
    }

    /// Append listeners registered elsewhere, keeping their ids unique
    pub(crate) fn absorb(&mut self, other: Listeners<T>) {
        for (_, listener) in other.entries {
            let id = ListenerId(self.next_id);
            self.next_id += 1;
            self.entries.push((id, listener));
        }
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}
