//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::cell::Cell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use tracing::{info, warn};

use super::RunArgs;
use crate::assets::ManifestLoader;
use crate::backend::{Vec3, VirtualBackend};
use crate::config::AudioConfig;
use crate::engine::AudioSystem;

/// Title track played when the session starts
pub const TITLE_MUSIC: &str = "music/title";

/// Track crossfaded to halfway through the session
pub const BATTLE_MUSIC: &str = "music/battle";

/// Sound effect fired periodically
pub const FOOTSTEP_SFX: &str = "sfx/footstep";

/// Ticks between two footsteps
const FOOTSTEP_INTERVAL: u32 = 20;

/// Assets used when no manifest is given
const DEMO_MANIFEST: &str = r#"{
  "clips": {
    "clips/title_loop": { "length_secs": 95.0 },
    "clips/battle_loop": { "length_secs": 64.0 },
    "clips/step_01": { "length_secs": 0.35 },
    "clips/step_02": { "length_secs": 0.30 },
    "clips/step_03": { "length_secs": 0.40 }
  },
  "sound_effects": {
    "sfx/footstep": {
      "clips": ["clips/step_01", "clips/step_02", "clips/step_03"],
      "volume": { "min": 0.7, "max": 1.0 },
      "pitch": { "min": 0.9, "max": 1.1 }
    }
  },
  "music": {
    "music/title": { "track": "clips/title_loop", "fade_in_secs": 1.0 },
    "music/battle": { "track": "clips/battle_loop", "fade_in_secs": 2.0, "fade_out_secs": 2.0 }
  }
}"#;

/// Outcome of a simulated session
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub ticks: u32,
    pub simulated_secs: f32,
    pub effects_started: usize,
    pub effects_dropped: usize,
    pub voices_finished: usize,
    pub voices_on_loan: usize,
    pub voices_available: usize,
    pub music_clip: Option<String>,
    pub music_fading: bool,
    pub music_volume: f32,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulated {} ticks ({:.2}s)", self.ticks, self.simulated_secs)?;
        writeln!(f, "{:-<40}", "")?;
        writeln!(
            f,
            "Sound effects: {} started, {} dropped, {} finished",
            self.effects_started, self.effects_dropped, self.voices_finished
        )?;
        writeln!(
            f,
            "Voice pool:    {} on loan, {} available",
            self.voices_on_loan, self.voices_available
        )?;
        write!(
            f,
            "Music:         {} (volume {:.2}{})",
            self.music_clip.as_deref().unwrap_or("silent"),
            self.music_volume,
            if self.music_fading { ", fading" } else { "" }
        )
    }
}

/// Run the scripted session and print its report
pub fn run(args: &RunArgs) -> anyhow::Result<()> {
    let report = simulate(args)?;
    println!("{}", report);
    Ok(())
}

/// Run the scripted session against a virtual backend
///
/// Music starts on the title track, crossfades to the battle track halfway
/// through and footsteps fire every few ticks. Missing assets are logged
/// and skipped.
pub fn simulate(args: &RunArgs) -> anyhow::Result<SimulationReport> {
    let config = load_config(args.config.as_deref())?;
    let loader = match &args.manifest {
        Some(path) => ManifestLoader::from_file(path)
            .with_context(|| format!("failed to load manifest {}", path.display()))?,
        None => ManifestLoader::from_json_str(DEMO_MANIFEST)?,
    };

    let mut audio = AudioSystem::init(config, VirtualBackend::new(), Box::new(loader))?;
    let finished = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&finished);
    audio.subscribe(move |event| {
        if event.is_finished() {
            counter.set(counter.get() + 1);
        }
        Ok(())
    });

    info!(ticks = args.ticks, dt = args.dt, "starting simulation");
    play_profile(&mut audio, TITLE_MUSIC);

    let mut started = 0;
    let mut dropped = 0;
    for tick in 0..args.ticks {
        if tick == args.ticks / 2 {
            play_profile(&mut audio, BATTLE_MUSIC);
        }
        if tick % FOOTSTEP_INTERVAL == 0 {
            let x = tick as f32 * 0.1;
            match audio.play_sfx_path(FOOTSTEP_SFX, Vec3::new(x, 0.0, 0.0)) {
                Ok(_) => started += 1,
                Err(_) => dropped += 1,
            }
        }
        audio.tick(args.dt);
    }

    let report = SimulationReport {
        ticks: args.ticks,
        simulated_secs: args.ticks as f32 * args.dt,
        effects_started: started,
        effects_dropped: dropped,
        voices_finished: finished.get(),
        voices_on_loan: audio.pool().on_loan_count(),
        voices_available: audio.pool().available_count(),
        music_clip: audio.current_music_clip().map(|clip| clip.name().to_string()),
        music_fading: audio.is_music_fading(),
        music_volume: audio.music_volume(),
    };
    audio.shutdown();
    Ok(report)
}

/// Print the effective configuration
pub fn print_config(path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(path)?;
    println!("{}", config.to_json_string()?);
    Ok(())
}

/// Parse a manifest and report how many resources it declares
pub fn check_manifest(path: &Path) -> anyhow::Result<()> {
    info!("Checking manifest: {}", path.display());
    let loader = ManifestLoader::from_file(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))?;
    println!("Manifest OK: {} resources", loader.len());
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AudioConfig> {
    match path {
        Some(path) => AudioConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AudioConfig::default()),
    }
}

fn play_profile(audio: &mut AudioSystem<VirtualBackend>, path: &str) {
    if let Err(err) = audio.play_music_profile_path(path) {
        warn!(path, error = %err, "music not started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_demo_session() {
        let args = RunArgs {
            ticks: 120,
            ..RunArgs::default()
        };
        let report = simulate(&args).unwrap();
        assert_eq!(report.effects_started, 6);
        assert_eq!(report.effects_dropped, 0);
        assert!(report.voices_finished >= 5);
        assert_eq!(report.music_clip.as_deref(), Some("clips/battle_loop"));
        assert!(report.music_fading);
    }

    #[test]
    fn test_session_with_empty_manifest_drops_sounds() {
        let mut manifest = NamedTempFile::new().unwrap();
        write!(manifest, "{{}}").unwrap();
        let args = RunArgs {
            manifest: Some(manifest.path().to_path_buf()),
            ticks: 40,
            ..RunArgs::default()
        };
        let report = simulate(&args).unwrap();
        assert_eq!(report.effects_started, 0);
        assert_eq!(report.effects_dropped, 2);
        assert_eq!(report.music_clip, None);
    }

    #[test]
    fn test_report_display() {
        let report = SimulationReport {
            ticks: 10,
            simulated_secs: 1.0,
            effects_started: 1,
            effects_dropped: 0,
            voices_finished: 1,
            voices_on_loan: 0,
            voices_available: 1,
            music_clip: None,
            music_fading: false,
            music_volume: 1.0,
        };
        let text = report.to_string();
        assert!(text.contains("Simulated 10 ticks"));
        assert!(text.contains("silent"));
    }
}
