//! wavedrone - drone and wavetable synth voice engines

use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use wavedrone::app::{DroneApp, InputEvent, TickHost, TickScheduler, WaveApp};
use wavedrone::config::{self, SynthConfig};
use wavedrone::drone::DroneController;
use wavedrone::instrument::Instrument;
use wavedrone::patch::WaveSelect;
use wavedrone::synth::HeadlessEngine;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!(
                        "  Ticks: control {} ms, display {} ms",
                        cfg.timing.control_period_ms, cfg.timing.display_period_ms
                    );
                    println!("  Wave size: {} @ {}", cfg.waves.size, cfg.waves.amplitude);
                    if let Some(dir) = &cfg.waves.dir {
                        println!("  Wave dir: {:?}", dir);
                    }
                    println!(
                        "  Drone: {} voices, {:?} through {}",
                        cfg.drone.voices,
                        cfg.drone.wave,
                        cfg.drone.filter.name()
                    );
                    println!("  Pads: {:?}", cfg.instrument.pad_notes);
                    println!("  Patches: {}", cfg.instrument.patches.len());
                    for patch in &cfg.instrument.patches {
                        println!("    - {}: {}", patch.name, patch.summary());
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../wavedrone.example.yaml");

            let path = "wavedrone.yaml";
            if std::path::Path::new(path).exists() {
                println!("wavedrone.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created wavedrone.yaml with example configuration.");
            }
        }

        Commands::Drone {
            config: config_path,
            notes,
            seconds,
        } => {
            let cfg = load_or_default(config_path.as_deref())?;
            let settings = cfg.drone_settings();
            let mut drone = DroneController::new(HeadlessEngine::new(cfg.sample_rate()), settings);

            let min_detune = drone.mapping().min_detune;
            for (i, &note) in notes.iter().enumerate() {
                drone.set_voice_notes(i, [note, note + min_detune]);
            }
            println!("Start:");
            println!("{}", drone.frequency_report());

            let mut app = DroneApp::new(drone, cfg.drone_app_settings());
            let mut scheduler =
                TickScheduler::from_millis(cfg.timing.control_period_ms, cfg.timing.display_period_ms);

            println!("\nHolding the key for {:.1}s...", seconds);
            app.on_key(InputEvent::Pressed(0));
            scheduler.run_for(Duration::from_secs_f64(seconds.max(0.0)), &mut app);
            app.on_key(InputEvent::Released(0));

            println!("\nAfter {} control ticks:", scheduler.control_ticks());
            println!("{}", app.drone().frequency_report());
        }

        Commands::Play {
            config: config_path,
            patch,
            pads,
            seconds,
        } => {
            let cfg = load_or_default(config_path.as_deref())?;
            let Some(first) = cfg.instrument.patches.get(patch).cloned() else {
                bail!("No patch {} (bank has {})", patch, cfg.instrument.patches.len());
            };

            let instrument = Instrument::new(
                HeadlessEngine::new(cfg.sample_rate()),
                first,
                cfg.instrument_settings(),
            )?;
            let settings = cfg.wave_app_settings();
            let pads = if pads.is_empty() {
                (0..settings.pad_notes.len()).collect()
            } else {
                pads
            };
            let mut app = WaveApp::new(instrument, cfg.instrument.patches.clone(), settings);
            let mut scheduler =
                TickScheduler::from_millis(cfg.timing.control_period_ms, cfg.timing.display_period_ms);
            let hold = Duration::from_secs_f64(seconds.max(0.0));

            println!("Patch {}: {}", app.instrument().patch().name, app.instrument().patch().summary());
            for pad in pads {
                app.on_pad(InputEvent::Pressed(pad));
                scheduler.run_for(hold, &mut app);
                app.on_display_tick();

                for voice in app.instrument().voices() {
                    let engine = app.instrument().engine();
                    let cutoff = engine
                        .oscillator(voice.primary())
                        .and_then(|osc| osc.filter)
                        .map(|f| format!("{:.0} Hz", f.cutoff()))
                        .unwrap_or_else(|| "off".to_string());
                    println!(
                        "  pad {} note {} ({:.2} Hz) level {:.2} oscillators {} cutoff {}",
                        pad,
                        voice.note(),
                        voice.frequency(),
                        voice.level(),
                        voice.oscillators().len(),
                        cutoff
                    );
                }
                app.on_pad(InputEvent::Released(pad));
            }
            let engine = app.instrument().engine();
            println!(
                "Pressed {} times, released {} times",
                engine.press_calls(),
                engine.release_calls()
            );
        }

        Commands::Patch {
            config: config_path,
            index,
            wave,
        } => {
            let cfg = load_or_default(config_path.as_deref())?;

            if let Some(text) = wave {
                let select = WaveSelect::parse(&text, cfg.waves.dir.as_deref());
                println!("{}", select);
                println!("{}", serde_json::to_string_pretty(&select)?);
                return Ok(());
            }

            let Some(patch) = cfg.instrument.patches.get(index) else {
                bail!("No patch {} (bank has {})", index, cfg.instrument.patches.len());
            };
            println!("{}", patch.to_json()?);
        }
    }

    Ok(())
}

/// Load the given config, or use defaults when none is named
fn load_or_default(path: Option<&Path>) -> Result<SynthConfig> {
    match path {
        Some(path) => {
            log::info!("loading configuration from {:?}", path);
            config::load_config(path)
        }
        None => Ok(SynthConfig::default()),
    }
}
