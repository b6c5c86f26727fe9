use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use crossbeam_channel::Receiver;
use log::{info, warn};

mod audio;
mod config;
mod light;
mod session;

use config::{ConfigHandle, SessionConfig};
use light::{AnimationMode, ColorMode, LogSink};
use session::Session;

const STATUS_INTERVAL: Duration = Duration::from_millis(250);

/// Live beat-synchronized light controller for electronic music.
#[derive(Parser)]
#[command(name = "beatlight", version, about)]
struct Args {
    /// Transient sensitivity, 0-100
    #[arg(long)]
    sensitivity: Option<u8>,

    /// Animation policy
    #[arg(long, value_enum)]
    animation: Option<AnimationMode>,

    /// Color palette
    #[arg(long, value_enum)]
    colors: Option<ColorMode>,

    /// Load settings from a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds (runs until stopped if omitted)
    #[arg(long)]
    duration: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(sensitivity) = args.sensitivity {
        settings.sensitivity = sensitivity.min(100);
    }
    if let Some(mode) = args.animation {
        settings.animation_mode = mode;
    }
    if let Some(mode) = args.colors {
        settings.color_mode = mode;
    }

    info!(
        "starting beatlight: {:?} / {:?}, sensitivity {}",
        settings.animation_mode, settings.color_mode, settings.sensitivity
    );

    let config = ConfigHandle::new(settings);
    let session = Session::start(config.clone(), Box::new(LogSink))?;
    let quit = spawn_control_loop(config);

    let started = Instant::now();
    loop {
        thread::sleep(STATUS_INTERVAL);

        if quit.try_recv().is_ok() {
            break;
        }
        if let Some(secs) = args.duration {
            if started.elapsed() >= Duration::from_secs(secs) {
                break;
            }
        }

        let status = session.status();
        info!(
            "{:>12} | bpm {:>5.1} | energy {:>3}% | bass {:>3}% | strength {:.2} | phase {:.2}",
            status.current_color.name(),
            status.bpm,
            status.energy_percent,
            status.bass_percent,
            status.beat_strength,
            status.beat_phase,
        );
    }

    info!("stopping session");
    session.stop();
    Ok(())
}

/// Reads live control commands from stdin so sensitivity and modes can be
/// changed mid-session. Returns a channel that fires once on `stop`.
fn spawn_control_loop(config: ConfigHandle) -> Receiver<()> {
    let (quit_sender, quit_receiver) = crossbeam_channel::bounded(1);

    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if !handle_command(line.trim(), &config) {
                let _ = quit_sender.send(());
                break;
            }
        }
    });

    quit_receiver
}

/// Applies one control command. Returns false when the session should end.
fn handle_command(line: &str, config: &ConfigHandle) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("sensitivity") => match parts.next().and_then(|value| value.parse::<u8>().ok()) {
            Some(value) => {
                config.set_sensitivity(value);
                info!("sensitivity set to {}", config.get().sensitivity);
            }
            None => warn!("usage: sensitivity <0-100>"),
        },
        Some("animation") => {
            match parts.next().and_then(|name| AnimationMode::from_str(name, true).ok()) {
                Some(mode) => {
                    config.set_animation_mode(mode);
                    info!("animation mode set to {:?}", mode);
                }
                None => warn!("usage: animation <electronic-party|beat-sync-rapid|...>"),
            }
        }
        Some("colors") => {
            match parts.next().and_then(|name| ColorMode::from_str(name, true).ok()) {
                Some(mode) => {
                    config.set_color_mode(mode);
                    info!("color mode set to {:?}", mode);
                }
                None => warn!("usage: colors <party-mode|neon-electronic|...>"),
            }
        }
        Some("stop") => return false,
        Some(other) => warn!("unknown command: {}", other),
        None => {}
    }
    true
}
