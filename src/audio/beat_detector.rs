use std::collections::VecDeque;

use super::AudioFeatures;

/// ~1 second of 1024-sample chunks at 44.1kHz.
const ENERGY_HISTORY_LEN: usize = 43;
const BEAT_HISTORY_LEN: usize = 16;

/// Detection is skipped until this many energy samples have accumulated.
const WARMUP_SAMPLES: usize = 10;
const LOCAL_WINDOW: usize = 10;

const ENERGY_RATIO_THRESHOLD: f32 = 1.15;

/// Plausible inter-beat interval range: 500 BPM ceiling, 75 BPM floor.
const MIN_BEAT_INTERVAL_MS: u64 = 120;
const MAX_BEAT_INTERVAL_MS: u64 = 800;

const DEFAULT_BPM: f32 = 128.0;

/// Beat tracking state, owned by the detector and mutated once per chunk.
#[derive(Debug, Clone)]
pub struct BeatState {
    /// Timestamp of the last fired beat, ms since session start.
    pub last_beat_ms: u64,
    pub bpm: f32,
    /// How far the firing energy rose above the rolling average, 0..1.
    pub strength: f32,
    pub on_beat: bool,
    /// Position within the current inter-beat interval, 0 at a beat and
    /// clamped to 1 past the next expected one.
    pub phase: f32,
}

/// Adaptive beat detector fusing three noisy cues: an energy rise over the
/// rolling average, a spectral transient, and a bass kick. The ratio cue must
/// agree with at least one of the other two, which suppresses sustained loud
/// passages while staying sensitive to percussive onsets.
pub struct BeatDetector {
    energy_history: VecDeque<f32>,
    beat_history: VecDeque<u64>,
    state: BeatState,
}

impl BeatDetector {
    pub fn new() -> Self {
        Self {
            energy_history: VecDeque::with_capacity(ENERGY_HISTORY_LEN),
            beat_history: VecDeque::with_capacity(BEAT_HISTORY_LEN),
            state: BeatState {
                last_beat_ms: 0,
                bpm: DEFAULT_BPM,
                strength: 0.0,
                on_beat: false,
                phase: 0.0,
            },
        }
    }

    pub fn state(&self) -> &BeatState {
        &self.state
    }

    /// Feeds one feature snapshot at the given timestamp. `sensitivity`
    /// (0-100) scales the spectral flux threshold.
    pub fn process(&mut self, features: &AudioFeatures, now_ms: u64, sensitivity: u8) -> &BeatState {
        self.energy_history.push_back(features.energy);
        if self.energy_history.len() > ENERGY_HISTORY_LEN {
            self.energy_history.pop_front();
        }

        if self.energy_history.len() >= WARMUP_SAMPLES {
            self.detect(features, now_ms, sensitivity);
        }
        self.update_phase(now_ms);

        &self.state
    }

    fn detect(&mut self, features: &AudioFeatures, now_ms: u64, sensitivity: u8) {
        let overall_avg =
            self.energy_history.iter().sum::<f32>() / self.energy_history.len() as f32;
        let local_avg =
            self.energy_history.iter().rev().take(LOCAL_WINDOW).sum::<f32>() / LOCAL_WINDOW as f32;

        // The +1 keeps the ratio sane over silence.
        let energy_ratio = features.energy / (overall_avg + 1.0);
        let flux_transient = features.spectral_flux > sensitivity as f32 / 100.0 * 1000.0;
        let bass_kick = features.bass_energy > local_avg * 1.5;

        let is_beat = energy_ratio > ENERGY_RATIO_THRESHOLD
            && (flux_transient || bass_kick)
            && now_ms.saturating_sub(self.state.last_beat_ms) > MIN_BEAT_INTERVAL_MS;

        if is_beat {
            self.beat_history.push_back(now_ms);
            if self.beat_history.len() > BEAT_HISTORY_LEN {
                self.beat_history.pop_front();
            }

            if self.beat_history.len() >= 4 {
                // A filter that rejects every interval leaves the previous
                // estimate in place rather than poisoning it.
                if let Some(interval) = self.filtered_interval_avg() {
                    self.state.bpm = 60_000.0 / interval;
                }
            }

            self.state.strength = (energy_ratio - 1.0).clamp(0.0, 1.0);
            self.state.last_beat_ms = now_ms;
            self.state.on_beat = true;
        } else {
            self.state.on_beat = false;
        }
    }

    /// Mean of consecutive inter-beat intervals within the plausible range,
    /// in ms. `None` when nothing survives the filter.
    fn filtered_interval_avg(&self) -> Option<f32> {
        let mut sum = 0.0f32;
        let mut count = 0usize;

        for window in self.beat_history.iter().zip(self.beat_history.iter().skip(1)) {
            let interval = window.1 - window.0;
            if (MIN_BEAT_INTERVAL_MS..=MAX_BEAT_INTERVAL_MS).contains(&interval) {
                sum += interval as f32;
                count += 1;
            }
        }

        (count > 0).then(|| sum / count as f32)
    }

    fn update_phase(&mut self, now_ms: u64) {
        if self.beat_history.len() < 2 {
            return;
        }

        let avg_interval = if self.beat_history.len() >= 4 {
            match self.filtered_interval_avg() {
                Some(interval) => interval,
                None => return,
            }
        } else {
            60_000.0 / self.state.bpm
        };
        if avg_interval <= 0.0 {
            return;
        }

        let elapsed = now_ms.saturating_sub(self.state.last_beat_ms) as f32;
        self.state.phase = (elapsed / avg_interval).clamp(0.0, 1.0);
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}
