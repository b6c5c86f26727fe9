use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use serde::Serialize;

use crate::audio::{AudioCapture, BeatDetector, FrequencyAnalyzer, SampleChunk};
use crate::config::{ConfigHandle, SessionConfig};
use crate::light::{Color, ColorSink, LightStateMachine};

/// How long one capture read blocks before re-checking the stop signal.
const CAPTURE_POLL: Duration = Duration::from_millis(50);
const READ_FAILURE_BACKOFF: Duration = Duration::from_millis(20);
const STOP_JOIN_WAIT: Duration = Duration::from_secs(1);

/// Raw RMS value shown as 100% on the display side.
const ENERGY_FULL_SCALE: f32 = 15000.0;
const BASS_FULL_SCALE: f32 = 10000.0;

/// Read-only status published once per processed chunk for the display side.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub energy_percent: u8,
    pub bass_percent: u8,
    pub beat_strength: f32,
    pub beat_phase: f32,
    pub bpm: f32,
    pub current_color: Color,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            energy_percent: 0,
            bass_percent: 0,
            beat_strength: 0.0,
            beat_phase: 0.0,
            bpm: 128.0,
            current_color: Color::Off,
        }
    }
}

/// The per-chunk pipeline: analyzer -> beat detector -> light policy. Owned
/// exclusively by the processing thread; nothing else writes to it.
struct Pipeline {
    analyzer: FrequencyAnalyzer,
    detector: BeatDetector,
    lights: LightStateMachine,
    chunks_processed: u64,
}

impl Pipeline {
    fn new(sample_rate: f32, config: &SessionConfig) -> Self {
        Self {
            analyzer: FrequencyAnalyzer::new(sample_rate),
            detector: BeatDetector::new(),
            lights: LightStateMachine::new(config.animation_mode, config.color_mode),
            chunks_processed: 0,
        }
    }

    /// Runs one chunk through the full pipeline. Returns the color to
    /// forward to the sink, if any, and the status to publish.
    fn process(
        &mut self,
        chunk: &[i16],
        now_ms: u64,
        config: &SessionConfig,
    ) -> (Option<Color>, StatusSnapshot) {
        self.lights.set_animation_mode(config.animation_mode);
        self.lights.set_color_mode(config.color_mode);

        let features = self.analyzer.analyze(chunk);

        self.chunks_processed += 1;
        if self.chunks_processed % 128 == 0 {
            debug!(
                "chunk {}: energy {:.0}, dominant {:.0} Hz, centroid {:.0} Hz, rolloff {:.0} Hz, flux {:.0}",
                self.chunks_processed,
                features.energy,
                features.dominant_frequency,
                features.spectral_centroid,
                features.spectral_rolloff,
                features.spectral_flux,
            );
        }

        self.detector.process(&features, now_ms, config.sensitivity);
        let beat = self.detector.state();
        let emission = self.lights.update(&features, beat, now_ms);

        let snapshot = StatusSnapshot {
            energy_percent: percent(features.energy, ENERGY_FULL_SCALE),
            bass_percent: percent(features.bass_energy, BASS_FULL_SCALE),
            beat_strength: beat.strength,
            beat_phase: beat.phase,
            bpm: beat.bpm,
            current_color: self.lights.current_color(),
        };

        (emission, snapshot)
    }
}

fn percent(value: f32, full_scale: f32) -> u8 {
    ((value / full_scale) * 100.0).clamp(0.0, 100.0) as u8
}

/// A running capture-and-processing session. Dropping (or stopping) the
/// session tears down the capture stream.
pub struct Session {
    #[allow(dead_code)]
    capture: AudioCapture,
    stop: Arc<AtomicBool>,
    status: Arc<Mutex<StatusSnapshot>>,
    handle: Option<JoinHandle<()>>,
}

impl Session {
    /// Opens the default capture device and starts the processing thread.
    pub fn start(config: ConfigHandle, sink: Box<dyn ColorSink>) -> Result<Self> {
        let capture = AudioCapture::new()?;
        let chunks = capture.receiver();
        let sample_rate = capture.sample_rate();

        let stop = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(StatusSnapshot::default()));

        let handle = {
            let stop = Arc::clone(&stop);
            let status = Arc::clone(&status);
            thread::Builder::new()
                .name("beatlight-pipeline".to_string())
                .spawn(move || run_processing_loop(chunks, sample_rate, config, sink, stop, status))?
        };

        Ok(Self {
            capture,
            stop,
            status,
            handle: Some(handle),
        })
    }

    /// Latest published snapshot. Safe to call from any thread at any
    /// cadence; never blocks the processing side.
    pub fn status(&self) -> StatusSnapshot {
        self.status.lock().unwrap().clone()
    }

    /// Signals the processing thread to stop and waits a bounded time for
    /// it. A thread that misses the deadline is detached, not a fault.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + STOP_JOIN_WAIT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }

            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!("processing thread still busy after {:?}, detaching", STOP_JOIN_WAIT);
            }
        }
    }
}

fn run_processing_loop(
    chunks: Receiver<SampleChunk>,
    sample_rate: f32,
    config: ConfigHandle,
    mut sink: Box<dyn ColorSink>,
    stop: Arc<AtomicBool>,
    status: Arc<Mutex<StatusSnapshot>>,
) {
    let started = Instant::now();
    let mut pipeline = Pipeline::new(sample_rate, &config.get());

    info!("processing thread running at {} Hz", sample_rate);

    while !stop.load(Ordering::Relaxed) {
        let chunk = match chunks.recv_timeout(CAPTURE_POLL) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("capture channel closed, retrying");
                thread::sleep(READ_FAILURE_BACKOFF);
                continue;
            }
        };

        // A chunk with no valid samples is a silence frame, not a fault.
        if chunk.is_empty() {
            continue;
        }

        let cfg = config.get();
        let now_ms = started.elapsed().as_millis() as u64;
        let (emission, snapshot) = pipeline.process(&chunk, now_ms, &cfg);

        if let Some(color) = emission {
            sink.emit(color);
        }

        // try_lock: a slow display reader must never stall the pipeline.
        if let Ok(mut latest) = status.try_lock() {
            *latest = snapshot;
        }
    }

    info!("processing thread stopped");
}
