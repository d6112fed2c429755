//! Integration Tests
//!
//! End-to-end behaviour of the audio system driven through its public API
//! against the virtual backend.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use resound::assets::Resource;
use resound::{
    AudioConfig, AudioError, AudioSystem, Clip, ManifestLoader, PlayOptions, SoundEffectProfile,
    Vec3, VirtualBackend, VoiceEvent, VoiceEventKind,
};

const DT: f32 = 1.0 / 60.0;

/// Helper to create a seeded system with a few registered resources
fn create_system() -> AudioSystem<VirtualBackend> {
    let mut loader = ManifestLoader::new();
    loader.insert("music/a", Resource::Clip(Clip::new("a", 120.0)));
    loader.insert(
        "sfx/coin",
        Resource::SoundEffect(Rc::new(SoundEffectProfile::new(
            "coin",
            vec![Clip::new("coin_1", 0.2), Clip::new("coin_2", 0.2)],
        ))),
    );
    let config = AudioConfig {
        seed: Some(1234),
        ..AudioConfig::default()
    };
    AudioSystem::init(config, VirtualBackend::new(), Box::new(loader)).unwrap()
}

fn record_events(audio: &mut AudioSystem<VirtualBackend>) -> Rc<RefCell<Vec<VoiceEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    audio.subscribe(move |event| {
        sink.borrow_mut().push(*event);
        Ok(())
    });
    events
}

fn run(audio: &mut AudioSystem<VirtualBackend>, secs: f32) {
    let ticks = (secs / DT).ceil() as u32;
    for _ in 0..ticks {
        audio.tick(DT);
    }
}

// === One-Shot Playback ===

#[test]
fn test_valid_play_returns_unfinished_voice() {
    let mut audio = create_system();
    let voice = audio
        .play(Some(&Clip::new("shot", 1.0)), &PlayOptions::at(Vec3::new(0.0, 1.0, 0.0)))
        .unwrap();
    assert!(!voice.is_finished());
    assert!(voice.is_playing());
    assert_eq!(voice.position(), Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn test_play_without_clip_is_rejected() {
    let mut audio = create_system();
    let err = audio.play(None, &PlayOptions::new()).unwrap_err();
    assert!(matches!(err, AudioError::InvalidArgument { .. }));
    assert!(err.is_recoverable());
    assert_eq!(audio.pool().channel_count(), 0);
}

#[test]
fn test_natural_finish_notifies_once_then_reclaims() {
    let mut audio = create_system();
    let events = record_events(&mut audio);
    let voice = audio.play(Some(&Clip::new("shot", 0.5)), &PlayOptions::new()).unwrap();

    run(&mut audio, 1.0);
    let finished: Vec<_> = events.borrow().iter().filter(|e| e.is_finished()).copied().collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].voice, voice.id());
    assert!(voice.is_disposed());
    assert_eq!(audio.pool().available_count(), 1);
}

#[test]
fn test_force_finish_is_permanent_without_notification() {
    let mut audio = create_system();
    let events = record_events(&mut audio);
    let voice = audio.play(Some(&Clip::new("shot", 0.5)), &PlayOptions::new()).unwrap();

    voice.force_finish();
    assert!(voice.is_finished());
    voice.play();
    voice.unpause();
    run(&mut audio, 1.0);

    assert!(voice.is_finished());
    assert!(events.borrow().iter().all(|e| !e.is_finished()));
}

#[test]
fn test_double_pause_fires_one_notification() {
    let mut audio = create_system();
    let events = record_events(&mut audio);
    let voice = audio.play(Some(&Clip::new("loop", 2.0)), &PlayOptions::new()).unwrap();

    voice.pause();
    voice.pause();
    audio.tick(DT);
    assert_eq!(
        events.borrow().iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![VoiceEventKind::Paused(true)]
    );

    voice.unpause();
    voice.unpause();
    audio.tick(DT);
    assert_eq!(events.borrow().len(), 2);
    assert_eq!(events.borrow()[1].paused(), Some(false));
}

#[test]
fn test_paused_voice_is_not_reclaimed() {
    let mut audio = create_system();
    let voice = audio.play(Some(&Clip::new("shot", 0.2)), &PlayOptions::new()).unwrap();
    voice.pause();
    run(&mut audio, 1.0);
    assert!(!voice.is_finished());
    assert!(!voice.is_disposed());

    voice.unpause();
    run(&mut audio, 0.5);
    assert!(voice.is_disposed());
}

#[test]
fn test_listener_pause_keeps_voice_alive() {
    let mut audio = create_system();
    let voice = audio.play(Some(&Clip::new("shot", 0.2)), &PlayOptions::new()).unwrap();
    audio.backend().set_listener_paused(true);
    run(&mut audio, 1.0);
    assert!(!voice.is_finished());

    audio.backend().set_listener_paused(false);
    run(&mut audio, 0.5);
    assert!(voice.is_disposed());
}

#[test]
fn test_failing_listener_does_not_block_reclaim() {
    let mut audio = create_system();
    audio.subscribe(|_| Err(anyhow::anyhow!("listener broke")));
    audio.subscribe(|_| panic!("listener bug"));
    let events = record_events(&mut audio);

    let voice = audio.play(Some(&Clip::new("shot", 0.1)), &PlayOptions::new()).unwrap();
    voice.on_finished(|_| Err(anyhow::anyhow!("voice listener broke")));
    run(&mut audio, 0.5);

    assert_eq!(events.borrow().len(), 1);
    assert!(voice.is_disposed());
    assert_eq!(audio.pool().available_count(), 1);
}

// === Voice Pool ===

#[test]
fn test_acquire_release_acquire_reuses_channel() {
    let mut audio = create_system();
    let first = audio.acquire_voice();
    audio.release(&first);
    let second = audio.acquire_voice();
    assert_eq!(second.channel_id(), first.channel_id());
    assert!(first.is_disposed());
    assert!(!second.is_disposed());
}

#[test]
fn test_acquire_twice_gives_distinct_channels() {
    let mut audio = create_system();
    let first = audio.acquire_voice();
    let second = audio.acquire_voice();
    assert_ne!(first.channel_id(), second.channel_id());
    assert!(!first.is_disposed());

    first.set_clip(Clip::new("late", 1.0));
    first.play();
    assert!(first.is_playing());
    second.set_clip(Clip::new("other", 1.0));
    second.play();
    assert!(second.is_playing());
}

#[test]
fn test_released_channel_comes_back_without_clip() {
    let mut audio = create_system();
    let voice = audio.play(Some(&Clip::new("shot", 5.0)), &PlayOptions::new()).unwrap();
    audio.release(&voice);

    let next = audio.acquire_voice();
    assert_eq!(next.channel_id(), voice.channel_id());
    assert!(next.clip().is_none());
    assert!(!next.is_playing());
}

#[test]
fn test_acquired_voice_can_be_watched() {
    let mut audio = create_system();
    let events = record_events(&mut audio);
    let voice = audio.acquire_voice();
    audio.watch(&voice);
    run(&mut audio, 0.1);
    // Never started and no clip: finished right away
    assert!(voice.is_disposed());
    assert_eq!(events.borrow().len(), 1);
}

#[test]
fn test_stop_all_audio_keeps_channels_for_reuse() {
    let mut audio = create_system();
    let voices: Vec<_> = (0..3)
        .map(|i| {
            audio
                .play(Some(&Clip::new(format!("s{}", i), 5.0)), &PlayOptions::new())
                .unwrap()
        })
        .collect();

    audio.stop_all_audio(false, false);
    assert!(voices.iter().all(|v| v.is_finished()));
    let next = audio.acquire_voice();
    assert!(voices.iter().any(|v| v.channel_id() == next.channel_id()));
}

#[test]
fn test_stop_all_audio_destroy() {
    let mut audio = create_system();
    audio.play(Some(&Clip::new("s", 5.0)), &PlayOptions::new()).unwrap();
    audio.play_music(Clip::new("m", 60.0), 0.0, 0.0).unwrap();

    audio.stop_all_audio(true, true);
    assert_eq!(audio.pool().channel_count(), 0);
    assert_eq!(audio.backend().destroyed_count(), 1);
    assert!(audio.current_music_clip().is_none());
    run(&mut audio, 0.1);
}

// === Clamping ===

#[test]
fn test_clamping_boundaries() {
    let mut audio = create_system();
    let voice = audio.play(Some(&Clip::new("s", 5.0)), &PlayOptions::new()).unwrap();
    voice.set_volume(1.5);
    voice.set_pitch(-10.0);
    voice.set_priority(-5);
    assert_eq!(voice.volume(), 1.0);
    assert_eq!(voice.pitch(), -3.0);
    assert_eq!(voice.priority(), 0);
}

// === Sound Effects ===

#[test]
fn test_smart_random_never_repeats_consecutively() {
    let mut audio = create_system();
    let mut last = None;
    for _ in 0..40 {
        let voice = audio.play_sfx_path("sfx/coin", Vec3::ZERO).unwrap();
        let clip = voice.clip();
        assert_ne!(clip, last);
        last = clip;
        audio.tick(DT);
    }
}

#[test]
fn test_sfx_path_errors() {
    let mut audio = create_system();
    let missing = audio.play_sfx_path("sfx/missing", Vec3::ZERO).unwrap_err();
    assert_eq!(missing.error_code(), "RESOURCE_NOT_FOUND");

    let wrong_kind = audio.play_sfx_path("music/a", Vec3::ZERO).unwrap_err();
    assert_eq!(wrong_kind.error_code(), "INVALID_ARGUMENT");

    let empty = SoundEffectProfile::new("empty", Vec::new());
    assert!(audio.play_sfx(Some(&empty), Vec3::ZERO).is_err());
    assert!(audio.play_sfx(None, Vec3::ZERO).is_err());
}

#[test]
fn test_non_finite_sfx_ranges_still_play() {
    let mut audio = create_system();
    let profile = SoundEffectProfile::new("odd", vec![Clip::new("odd", 0.5)])
        .with_volume(0.5, f32::NAN)
        .with_pitch(1.0, f32::INFINITY);
    let voice = audio.play_sfx(Some(&profile), Vec3::ZERO).unwrap();
    assert_eq!(voice.volume(), 0.5);
    assert_eq!(voice.pitch(), 1.0);
}

#[test]
fn test_manifest_with_overflowing_range_is_rejected() {
    let json = r#"{
        "clips": { "c": { "length_secs": 1.0 } },
        "sound_effects": { "s": { "clips": ["c"], "volume": { "min": 0.0, "max": 1e39 } } }
    }"#;
    let err = ManifestLoader::from_json_str(json).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_CONFIG");
}

// === Music ===

#[test]
fn test_replaying_same_music_is_noop() {
    let mut audio = create_system();
    assert!(audio.play_music("music/a", 0.0, 0.0).unwrap());
    run(&mut audio, 2.0);
    let before = audio.music().primary_state();

    assert!(!audio.play_music("music/a", 1.0, 1.0).unwrap());
    assert_eq!(audio.music().primary_state(), before);
    assert!(!audio.is_music_fading());
}

#[test]
fn test_replaying_music_during_fade_in_is_noop() {
    let mut audio = create_system();
    assert!(audio.play_music("music/a", 1.0, 0.0).unwrap());
    for _ in 0..30 {
        audio.tick(DT);
    }
    let halfway = audio.music().primary_state().volume;
    assert_relative_eq!(halfway, 0.5, epsilon = 1e-3);

    assert!(!audio.play_music("music/a", 1.0, 0.0).unwrap());
    assert!(audio.is_music_fading());
    assert_eq!(audio.scheduler().len(), 1);
    assert_relative_eq!(audio.music().primary_state().volume, halfway);

    for _ in 0..15 {
        audio.tick(DT);
    }
    assert_relative_eq!(audio.music().primary_state().volume, 0.75, epsilon = 1e-3);
}

#[test]
fn test_crossfade_scenario() {
    let mut audio = create_system();
    let a = Clip::new("a", 120.0);
    let b = Clip::new("b", 120.0);
    audio.play_music(a.clone(), 0.0, 0.0).unwrap();
    run(&mut audio, 1.0);

    audio.play_music(b.clone(), 2.0, 2.0).unwrap();
    assert!(audio.is_music_fading());
    assert_eq!(audio.music().fader_state().clip, Some(a));
    assert_eq!(audio.current_music_clip(), Some(b.clone()));

    for _ in 0..60 {
        audio.tick(DT);
    }
    assert_relative_eq!(audio.music().primary_state().volume, 0.5, epsilon = 1e-3);
    assert_relative_eq!(audio.music().fader_state().volume, 0.5, epsilon = 1e-3);

    run(&mut audio, 1.1);
    assert!(!audio.is_music_fading());
    assert!(audio.music().fader_state().clip.is_none());
    assert_relative_eq!(audio.music().primary_state().volume, 1.0);
    assert_eq!(audio.current_music_clip(), Some(b));
}

#[test]
fn test_stop_music_and_volume() {
    let mut audio = create_system();
    audio.play_music(Clip::new("a", 60.0), 0.0, 0.0).unwrap();
    audio.set_music_volume(0.4);
    assert_eq!(audio.music_volume(), 0.4);
    assert_relative_eq!(audio.music().primary_state().volume, 0.4);

    assert!(audio.stop_music(0.5));
    assert!(audio.current_music_clip().is_none());
    run(&mut audio, 1.0);
    assert!(!audio.music().fader_state().playing);
}

#[test]
fn test_change_music_uses_configured_fades() {
    let mut config = AudioConfig::default();
    config.music.fade_in_secs = 1.0;
    let mut audio =
        AudioSystem::init(config, VirtualBackend::new(), Box::new(ManifestLoader::new())).unwrap();
    assert!(audio.change_music(Clip::new("a", 60.0)).unwrap());
    assert!(audio.is_music_fading());
    assert_eq!(audio.music().primary_state().volume, 0.0);
}

// === Resources ===

#[test]
fn test_resource_cache_clear() {
    let mut audio = create_system();
    audio.play_sfx_path("sfx/coin", Vec3::ZERO).unwrap();
    assert_eq!(audio.resources().len(), 1);
    audio.clear_resource_cache();
    assert!(audio.resources().is_empty());
}

#[test]
fn test_defaults_applied_to_voices() {
    let mut config = AudioConfig::default();
    config.defaults.volume = 0.8;
    config.defaults.max_distance = 50.0;
    let mut audio =
        AudioSystem::init(config, VirtualBackend::new(), Box::new(ManifestLoader::new())).unwrap();
    let voice = audio.play(Some(&Clip::new("s", 1.0)), &PlayOptions::new()).unwrap();
    assert_eq!(voice.volume(), 0.8);
    assert_eq!(voice.max_distance(), 50.0);
    assert_eq!(audio.defaults().volume, 0.8);
}
