//! Voice Pool
//!
//! Owns every pooled channel. A channel is either on loan (bound to exactly
//! one live [`Voice`]) or on the available stack, never both. Channels are
//! created lazily and only destroyed by a full teardown.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::events::{EventQueue, PendingEvent};
use super::voice::{Voice, VoiceId};
use crate::backend::{share, AudioBackend, ChannelId, ChannelSpec, SharedChannel};

struct Loan {
    channel: SharedChannel,
    voice: Voice,
}

/// Pool of reusable playback channels
pub struct VoicePool {
    group: String,
    on_loan: BTreeMap<ChannelId, Loan>,
    available: Vec<SharedChannel>,
    next_voice_id: u64,
    created: u64,
    events: Rc<RefCell<EventQueue>>,
}

impl VoicePool {
    /// Create an empty pool whose channels are grouped under `group`
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            on_loan: BTreeMap::new(),
            available: Vec::new(),
            next_voice_id: 0,
            created: 0,
            events: Rc::new(RefCell::new(EventQueue::new())),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Hand out a voice bound to a channel
    ///
    /// Channel selection order:
    /// 1. the most recently released channel on the available stack
    /// 2. the first on-loan channel whose voice was started (or force
    ///    finished), has finished and is not still waiting to deliver its
    ///    finished notification
    /// 3. a brand-new channel
    ///
    /// A voice that was acquired but never played keeps its channel until it
    /// is played or released. A reused channel's previous voice is disposed
    /// and its clip cleared before the new voice is bound. Never fails.
    pub fn acquire(&mut self, backend: &mut dyn AudioBackend) -> Voice {
        let channel = match self.available.pop() {
            Some(channel) => {
                debug!(channel = %channel.borrow().id(), "reusing released channel");
                channel
            }
            None => match self.take_finished_loan() {
                Some(channel) => channel,
                None => self.create_channel(backend),
            },
        };
        channel.borrow_mut().set_clip(None);

        let id = VoiceId(self.next_voice_id);
        self.next_voice_id += 1;
        let voice = Voice::new(id, Rc::clone(&channel), Rc::downgrade(&self.events));
        self.on_loan.insert(
            voice.channel_id(),
            Loan {
                channel,
                voice: voice.clone(),
            },
        );
        voice
    }

    /// Stop `voice` and put its channel back on the available stack
    ///
    /// Ignored when the voice no longer holds a loan.
    pub fn release(&mut self, voice: &Voice) {
        voice.force_finish();
        self.return_channel(voice);
    }

    /// Take back the channel of a voice that finished on its own
    pub(crate) fn reclaim(&mut self, voice: &Voice) {
        self.return_channel(voice);
    }

    /// Stop every on-loan voice
    ///
    /// With `destroy`, every channel (on loan and available) is destroyed and
    /// the pool starts over empty. Otherwise the channels are kept on the
    /// available stack for reuse.
    pub fn stop_all(&mut self, destroy: bool) {
        let loans = std::mem::take(&mut self.on_loan);
        let stopped = loans.len();
        for (_, loan) in loans {
            loan.voice.force_finish();
            loan.voice.dispose();
            if destroy {
                loan.channel.borrow_mut().destroy();
            } else {
                self.available.push(loan.channel);
            }
        }

        if destroy {
            for channel in self.available.drain(..) {
                channel.borrow_mut().destroy();
            }
        }
        debug!(stopped, destroy, available = self.available.len(), "stopped all voices");
    }

    /// Create `count` idle channels ahead of time
    pub fn prewarm(&mut self, backend: &mut dyn AudioBackend, count: usize) {
        for _ in 0..count {
            let channel = self.create_channel(backend);
            self.available.push(channel);
        }
    }

    pub fn on_loan_count(&self) -> usize {
        self.on_loan.len()
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Channels currently managed by the pool
    pub fn channel_count(&self) -> usize {
        self.on_loan.len() + self.available.len()
    }

    /// Voice currently bound to `channel`, if on loan
    pub fn voice_for(&self, channel: ChannelId) -> Option<Voice> {
        self.on_loan.get(&channel).map(|loan| loan.voice.clone())
    }

    pub fn is_available(&self, channel: ChannelId) -> bool {
        self.available.iter().any(|c| c.borrow().id() == channel)
    }

    /// Take every queued voice notification
    pub(crate) fn drain_events(&self) -> Vec<PendingEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    fn return_channel(&mut self, voice: &Voice) {
        voice.dispose();
        let channel_id = voice.channel_id();
        let owned = self
            .on_loan
            .get(&channel_id)
            .map_or(false, |loan| loan.voice == *voice);
        if !owned {
            return;
        }
        if let Some(loan) = self.on_loan.remove(&channel_id) {
            debug!(voice = %voice.id(), channel = %channel_id, "channel returned to pool");
            self.available.push(loan.channel);
        }
    }

    fn take_finished_loan(&mut self) -> Option<SharedChannel> {
        let channel_id = self
            .on_loan
            .iter()
            .find(|(_, loan)| {
                let voice = &loan.voice;
                (voice.is_started() || voice.is_force_finished())
                    && !voice.is_watched()
                    && voice.is_finished()
            })
            .map(|(id, _)| *id)?;
        let loan = self.on_loan.remove(&channel_id)?;
        loan.voice.dispose();
        debug!(channel = %channel_id, previous = %loan.voice.id(), "scavenged finished channel");
        Some(loan.channel)
    }

    fn create_channel(&mut self, backend: &mut dyn AudioBackend) -> SharedChannel {
        let spec = ChannelSpec::new(format!("voice_{}", self.created), self.group.clone());
        self.created += 1;
        let channel = share(backend.create_channel(&spec));
        debug!(channel = %channel.borrow().id(), group = %self.group, "created pooled channel");
        channel
    }
}

impl fmt::Debug for VoicePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoicePool")
            .field("group", &self.group)
            .field("on_loan", &self.on_loan.len())
            .field("available", &self.available.len())
            .finish()
    }
}
