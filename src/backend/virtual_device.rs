//! Virtual playback device
//!
//! Simulates host channels without touching audio hardware. Each channel
//! advances its cursor by `dt * |pitch|` on [`AudioBackend::update`], loops
//! or stops at the end of its clip and honours the listener pause flag.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::{AudioBackend, Channel, ChannelId, ChannelParams, ChannelSpec};
use crate::assets::Clip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Stopped,
    Playing,
    Paused,
}

/// State shared by the device and all of its channels
#[derive(Debug, Default)]
struct DeviceShared {
    listener_paused: Cell<bool>,
    destroyed: Cell<usize>,
}

#[derive(Debug)]
struct ChannelState {
    id: ChannelId,
    group: String,
    clip: Option<Clip>,
    params: ChannelParams,
    output_route: Option<String>,
    transport: Transport,
    time: f32,
    destroyed: bool,
}

impl ChannelState {
    fn held_by_listener_pause(&self, listener_paused: bool) -> bool {
        listener_paused && !self.params.ignore_listener_pause
    }

    fn advance(&mut self, dt: f32, listener_paused: bool) {
        if self.destroyed
            || self.transport != Transport::Playing
            || self.held_by_listener_pause(listener_paused)
        {
            return;
        }
        let length = match &self.clip {
            Some(clip) => clip.length_secs(),
            None => {
                self.transport = Transport::Stopped;
                return;
            }
        };
        if length <= 0.0 {
            self.transport = Transport::Stopped;
            self.time = 0.0;
            return;
        }

        self.time += dt * self.params.pitch.abs();
        if self.time >= length {
            if self.params.looping {
                self.time %= length;
            } else {
                trace!(channel = %self.id, "clip reached its end");
                self.transport = Transport::Stopped;
                self.time = 0.0;
            }
        }
    }
}

// ============================================================================
// Backend
// ============================================================================

/// In-process backend with simulated playback time
#[derive(Debug, Default)]
pub struct VirtualBackend {
    next_id: u64,
    channels: Vec<Weak<RefCell<ChannelState>>>,
    shared: Rc<DeviceShared>,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host-wide listener pause flag
    pub fn set_listener_paused(&self, paused: bool) {
        self.shared.listener_paused.set(paused);
    }

    pub fn listener_paused(&self) -> bool {
        self.shared.listener_paused.get()
    }

    /// Number of live (not destroyed) channels
    pub fn channel_count(&self) -> usize {
        self.channels
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|state| !state.borrow().destroyed)
            .count()
    }

    /// Number of channels destroyed so far
    pub fn destroyed_count(&self) -> usize {
        self.shared.destroyed.get()
    }

    /// Total channels ever created
    pub fn created_count(&self) -> u64 {
        self.next_id
    }
}

impl AudioBackend for VirtualBackend {
    fn create_channel(&mut self, spec: &ChannelSpec) -> Box<dyn Channel> {
        let id = ChannelId(self.next_id);
        self.next_id += 1;

        let state = Rc::new(RefCell::new(ChannelState {
            id,
            group: spec.group.clone(),
            clip: None,
            params: ChannelParams::default(),
            output_route: None,
            transport: Transport::Stopped,
            time: 0.0,
            destroyed: false,
        }));
        self.channels.push(Rc::downgrade(&state));
        trace!(channel = %id, name = %spec.name, group = %spec.group, "created virtual channel");

        Box::new(VirtualChannel {
            name: spec.name.clone(),
            state,
            shared: Rc::clone(&self.shared),
        })
    }

    fn update(&mut self, dt: f32) {
        let listener_paused = self.shared.listener_paused.get();
        self.channels.retain(|weak| match weak.upgrade() {
            Some(state) => {
                let mut state = state.borrow_mut();
                state.advance(dt, listener_paused);
                !state.destroyed
            }
            None => false,
        });
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Channel created by [`VirtualBackend`]
#[derive(Debug)]
pub struct VirtualChannel {
    name: String,
    state: Rc<RefCell<ChannelState>>,
    shared: Rc<DeviceShared>,
}

impl VirtualChannel {
    /// Parent group name given at creation
    pub fn group(&self) -> String {
        self.state.borrow().group.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }
}

impl Channel for VirtualChannel {
    fn id(&self) -> ChannelId {
        self.state.borrow().id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn play(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.destroyed || state.clip.is_none() {
            return;
        }
        state.transport = Transport::Playing;
    }

    fn pause(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.transport == Transport::Playing {
            state.transport = Transport::Paused;
        }
    }

    fn unpause(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.transport == Transport::Paused {
            state.transport = Transport::Playing;
        }
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.transport = Transport::Stopped;
        state.time = 0.0;
    }

    fn is_playing(&self) -> bool {
        let state = self.state.borrow();
        !state.destroyed
            && state.transport == Transport::Playing
            && state.clip.is_some()
            && !state.held_by_listener_pause(self.shared.listener_paused.get())
    }

    fn clip(&self) -> Option<Clip> {
        self.state.borrow().clip.clone()
    }

    fn set_clip(&mut self, clip: Option<Clip>) {
        let mut state = self.state.borrow_mut();
        state.clip = clip;
        state.transport = Transport::Stopped;
        state.time = 0.0;
    }

    fn params(&self) -> ChannelParams {
        self.state.borrow().params
    }

    fn set_params(&mut self, params: ChannelParams) {
        self.state.borrow_mut().params = params;
    }

    fn output_route(&self) -> Option<String> {
        self.state.borrow().output_route.clone()
    }

    fn set_output_route(&mut self, route: Option<String>) {
        self.state.borrow_mut().output_route = route;
    }

    fn time(&self) -> f32 {
        self.state.borrow().time
    }

    fn set_time(&mut self, secs: f32) {
        let mut state = self.state.borrow_mut();
        let length = state.clip.as_ref().map(Clip::length_secs).unwrap_or(0.0);
        state.time = secs.clamp(0.0, length);
    }

    fn listener_paused(&self) -> bool {
        self.shared.listener_paused.get()
    }

    fn destroy(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        state.transport = Transport::Stopped;
        state.clip = None;
        self.shared.destroyed.set(self.shared.destroyed.get() + 1);
    }
}
