//! Audio System
//!
//! The facade a game loop talks to. It owns the backend, the voice pool,
//! the one-shot player, the music crossfader, the task scheduler and the
//! resource cache. There is no global instance: create one with
//! [`AudioSystem::init`] and drive it with [`AudioSystem::tick`].
//!
//! Each tick runs in a fixed order:
//! 1. the backend advances its channels
//! 2. scheduled tasks (fade ramps, voice watchers) are polled
//! 3. queued pause notifications are delivered
//! 4. finished notifications are delivered, then the channels are reclaimed

use std::rc::Rc;

use tracing::{debug, info, warn};

use super::events::{ListenerId, ListenerResult, Listeners, VoiceEvent, VoiceEventKind};
use super::music::MusicCrossfader;
use super::player::{OneShotPlayer, PlayOptions};
use super::pool::VoicePool;
use super::scheduler::{Scheduler, TaskId, TaskSignal, WatchTask};
use super::voice::Voice;
use crate::assets::{Clip, MusicProfile, ResourceCache, ResourceLoader, SoundEffectProfile};
use crate::backend::{AudioBackend, Vec3};
use crate::config::{AudioConfig, AudioDefaults};
use crate::error::{AudioError, Result};

/// What the music crossfader should play next
#[derive(Debug, Clone, PartialEq)]
pub enum MusicSource {
    Clip(Clip),
    /// Resolved through the resource cache; clip or music profile paths
    Path(String),
    Silence,
}

impl From<Clip> for MusicSource {
    fn from(clip: Clip) -> Self {
        MusicSource::Clip(clip)
    }
}

impl From<Option<Clip>> for MusicSource {
    fn from(clip: Option<Clip>) -> Self {
        clip.map_or(MusicSource::Silence, MusicSource::Clip)
    }
}

impl From<&str> for MusicSource {
    fn from(path: &str) -> Self {
        MusicSource::Path(path.to_string())
    }
}

impl From<String> for MusicSource {
    fn from(path: String) -> Self {
        MusicSource::Path(path)
    }
}

/// Voice pool, one-shot player and music crossfader behind one tick
pub struct AudioSystem<B: AudioBackend> {
    config: AudioConfig,
    backend: B,
    pool: VoicePool,
    player: OneShotPlayer,
    music: MusicCrossfader,
    scheduler: Scheduler,
    resources: ResourceCache,
    listeners: Listeners<VoiceEvent>,
}

impl<B: AudioBackend> AudioSystem<B> {
    /// Validate `config` and set up the pool and the music channels
    ///
    /// # Arguments
    /// * `config` - Defaults, music and pool settings
    /// * `backend` - Host that provides the channels
    /// * `loader` - Resolves resource paths for `play_sfx_path` and music paths
    ///
    /// # Example
    /// ```
    /// use resound::{AudioConfig, AudioSystem, ManifestLoader, VirtualBackend};
    ///
    /// let mut audio = AudioSystem::init(
    ///     AudioConfig::default(),
    ///     VirtualBackend::new(),
    ///     Box::new(ManifestLoader::new()),
    /// )
    /// .unwrap();
    /// audio.tick(1.0 / 60.0);
    /// let backend = audio.shutdown();
    /// assert_eq!(backend.channel_count(), 0);
    /// ```
    pub fn init(config: AudioConfig, mut backend: B, loader: Box<dyn ResourceLoader>) -> Result<Self> {
        config.validate()?;

        let mut pool = VoicePool::new(config.pool.group.clone());
        pool.prewarm(&mut backend, config.pool.prewarm);
        let music = MusicCrossfader::new(&mut backend, &config.music.group, config.music.volume);
        let player = OneShotPlayer::new(config.defaults.clone(), config.seed);

        info!(
            pool_group = %config.pool.group,
            prewarmed = config.pool.prewarm,
            seeded = config.seed.is_some(),
            "audio system initialized"
        );
        Ok(Self {
            config,
            backend,
            pool,
            player,
            music,
            scheduler: Scheduler::new(),
            resources: ResourceCache::new(loader),
            listeners: Listeners::new(),
        })
    }

    /// Stop everything, destroy every channel and hand the backend back
    pub fn shutdown(mut self) -> B {
        self.pool.stop_all(true);
        self.music.destroy(&mut self.scheduler);
        self.scheduler.clear();
        self.resources.clear();
        info!("audio system shut down");
        self.backend
    }

    /// Advance the system by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        self.backend.update(dt);
        let signals = self.scheduler.tick(dt);

        for pending in self.pool.drain_events() {
            let event = pending.voice.event(pending.kind);
            self.notify(&pending.voice, &event);
        }

        for signal in signals {
            match signal {
                TaskSignal::VoiceFinished(voice) => {
                    let event = voice.event(VoiceEventKind::Finished);
                    self.notify(&voice, &event);
                    self.pool.reclaim(&voice);
                }
                TaskSignal::VoiceAbandoned(voice) => {
                    debug!(voice = %voice.id(), "reclaiming force-finished voice");
                    self.pool.reclaim(&voice);
                }
            }
        }
    }

    fn notify(&mut self, voice: &Voice, event: &VoiceEvent) {
        let failures = voice.dispatch(event) + self.listeners.dispatch(event, "system");
        if failures > 0 {
            debug!(%event, failures, "listeners failed during dispatch");
        }
    }

    // ------------------------------------------------------------------------
    // Voices
    // ------------------------------------------------------------------------

    /// Take a voice straight from the pool
    ///
    /// The voice is not started or configured; give it a clip with
    /// [`Voice::set_clip`], call [`Voice::play`] when ready and
    /// [`AudioSystem::watch`] to have it reclaimed on finish. Until it is
    /// played or released it keeps its channel.
    pub fn acquire_voice(&mut self) -> Voice {
        self.pool.acquire(&mut self.backend)
    }

    /// Raise `Finished` for `voice` once it ends and then reclaim its channel
    pub fn watch(&mut self, voice: &Voice) -> TaskId {
        self.scheduler.spawn(Box::new(WatchTask::new(voice.clone())))
    }

    /// Stop `voice` and return its channel to the pool right away
    pub fn release(&mut self, voice: &Voice) {
        self.pool.release(voice);
    }

    /// Play a clip once
    ///
    /// # Errors
    /// `InvalidArgument` when `clip` is `None`.
    pub fn play(&mut self, clip: Option<&Clip>, options: &PlayOptions) -> Result<Voice> {
        let voice = self
            .player
            .play(&mut self.pool, &mut self.backend, clip, options)?;
        self.watch(&voice);
        Ok(voice)
    }

    /// Play a randomized pick from a sound-effect profile
    ///
    /// # Errors
    /// `InvalidArgument` when the profile is missing or has no clips.
    pub fn play_sfx(
        &mut self,
        profile: Option<&SoundEffectProfile>,
        position: Vec3,
    ) -> Result<Voice> {
        let voice = self
            .player
            .play_sfx(&mut self.pool, &mut self.backend, profile, position)?;
        self.watch(&voice);
        Ok(voice)
    }

    /// Play the sound-effect profile stored at `path`
    ///
    /// # Errors
    /// `ResourceNotFound` for unknown paths, `InvalidArgument` when the path
    /// is not a sound effect or the profile is empty.
    pub fn play_sfx_path(&mut self, path: &str, position: Vec3) -> Result<Voice> {
        let profile = self.resources.sound_effect(path).map_err(|err| {
            warn!(path, error = %err, "sound effect not played");
            err
        })?;
        self.play_sfx(Some(&profile), position)
    }

    /// Stop every pooled voice
    ///
    /// # Arguments
    /// * `stop_music` - Also cut the music channels immediately
    /// * `destroy_channels` - Destroy the pooled channels instead of keeping them for reuse
    pub fn stop_all_audio(&mut self, stop_music: bool, destroy_channels: bool) {
        self.pool.stop_all(destroy_channels);
        if stop_music {
            self.music.stop_immediately(&mut self.scheduler);
        }
        info!(stop_music, destroy_channels, "stopped all audio");
    }

    // ------------------------------------------------------------------------
    // Music
    // ------------------------------------------------------------------------

    /// Crossfade to `source`
    ///
    /// Returns false when `source` is already playing.
    ///
    /// # Errors
    /// `InvalidArgument` when a path source cannot be resolved to a clip.
    pub fn play_music(
        &mut self,
        source: impl Into<MusicSource>,
        fade_in: f32,
        fade_out: f32,
    ) -> Result<bool> {
        let track = self.resolve_music(source.into())?;
        Ok(self
            .music
            .play_music(&mut self.scheduler, track, fade_in, fade_out))
    }

    /// Crossfade to `source` using the configured fade times
    pub fn change_music(&mut self, source: impl Into<MusicSource>) -> Result<bool> {
        let (fade_in, fade_out) = (self.config.music.fade_in_secs, self.config.music.fade_out_secs);
        self.play_music(source, fade_in, fade_out)
    }

    /// Play a music profile with its own fades and volume
    ///
    /// The profile's volume only takes effect when its track is not already
    /// the current music.
    pub fn play_music_profile(&mut self, profile: &MusicProfile) -> bool {
        if self.music.current_clip().as_ref() == Some(&profile.track) {
            debug!(profile = %profile.name, "music profile already playing");
            return false;
        }
        if let Some(volume) = profile.volume {
            self.music.set_target_volume(&self.scheduler, volume);
        }
        self.music.play_music(
            &mut self.scheduler,
            Some(profile.track.clone()),
            profile.fade_in_secs,
            profile.fade_out_secs,
        )
    }

    /// Play the music profile stored at `path`
    pub fn play_music_profile_path(&mut self, path: &str) -> Result<bool> {
        let profile: Rc<MusicProfile> = self.resources.music(path)?;
        Ok(self.play_music_profile(&profile))
    }

    /// Fade the music out over `fade_out` seconds
    pub fn stop_music(&mut self, fade_out: f32) -> bool {
        self.music.stop_music(&mut self.scheduler, fade_out)
    }

    pub fn current_music_clip(&self) -> Option<Clip> {
        self.music.current_clip()
    }

    pub fn is_music_fading(&self) -> bool {
        self.music.is_fading(&self.scheduler)
    }

    /// Set the steady-state music volume; deferred while a fade runs
    pub fn set_music_volume(&mut self, volume: f32) {
        self.music.set_target_volume(&self.scheduler, volume);
    }

    pub fn music_volume(&self) -> f32 {
        self.music.target_volume()
    }

    fn resolve_music(&mut self, source: MusicSource) -> Result<Option<Clip>> {
        match source {
            MusicSource::Clip(clip) => Ok(Some(clip)),
            MusicSource::Silence => Ok(None),
            MusicSource::Path(path) => match self.resources.clip(&path) {
                Ok(clip) => Ok(Some(clip)),
                Err(err) => {
                    warn!(path = %path, error = %err, "music track not resolved");
                    Err(AudioError::invalid_argument(format!(
                        "music path '{}' does not resolve to a clip",
                        path
                    )))
                }
            },
        }
    }

    // ------------------------------------------------------------------------
    // Observers and Accessors
    // ------------------------------------------------------------------------

    /// Observe pause and finished notifications of every voice
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&VoiceEvent) -> ListenerResult + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Drop every cached resource; the next lookup goes to the loader
    pub fn clear_resource_cache(&mut self) {
        self.resources.clear();
    }

    pub fn defaults(&self) -> &AudioDefaults {
        self.player.defaults()
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    pub fn music(&self) -> &MusicCrossfader {
        &self.music
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }
}
