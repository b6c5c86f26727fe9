use super::{AnimationMode, Color, ColorMode};
use crate::audio::{AudioFeatures, BeatState};

/// ElectronicParty changes color on this cadence even between beats, as long
/// as the room is loud enough.
const PARTY_FALLBACK_MS: u64 = 250;
const PARTY_ENERGY_FLOOR: f32 = 5000.0;

/// FrequencySplit holds a color at least this long unless a beat lands.
const SPLIT_HOLD_MS: u64 = 300;

const PULSE_INTERVAL_MS: u64 = 150;
const PULSE_ENERGY_SCALE: f32 = 10000.0;

/// Decides, once per chunk, whether to emit a color and which one. Policies
/// are a closed set dispatched on [`AnimationMode`]; each one is a pure
/// function of the feature snapshot, the beat state and the bookkeeping
/// fields below.
pub struct LightStateMachine {
    animation_mode: AnimationMode,
    color_mode: ColorMode,
    sequence: &'static [Color],
    current_color: Color,
    cycle_index: usize,
    last_change_ms: u64,
}

impl LightStateMachine {
    pub fn new(animation_mode: AnimationMode, color_mode: ColorMode) -> Self {
        Self {
            animation_mode,
            color_mode,
            sequence: color_mode.sequence(),
            current_color: Color::Red,
            cycle_index: 0,
            last_change_ms: 0,
        }
    }

    pub fn current_color(&self) -> Color {
        self.current_color
    }

    /// The sequence the active color mode cycles through.
    #[allow(dead_code)]
    pub fn sequence(&self) -> &'static [Color] {
        self.sequence
    }

    pub fn set_animation_mode(&mut self, mode: AnimationMode) {
        self.animation_mode = mode;
    }

    /// Rebuilds the active sequence immediately. The cycle index carries
    /// over, so the new palette picks up mid-cycle.
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        if mode != self.color_mode {
            self.color_mode = mode;
            self.sequence = mode.sequence();
        }
    }

    /// Runs the active policy for one chunk. Returns the color to forward to
    /// the emission sink, if the policy decided to change anything.
    pub fn update(
        &mut self,
        features: &AudioFeatures,
        beat: &BeatState,
        now_ms: u64,
    ) -> Option<Color> {
        let decision = match self.animation_mode {
            AnimationMode::ElectronicParty => self.electronic_party(features, beat, now_ms),
            AnimationMode::BeatSyncRapid => self.beat_sync_rapid(beat),
            AnimationMode::BassDropSpecial => self.bass_drop_special(features, beat),
            AnimationMode::FrequencySplit => self.frequency_split(features, beat, now_ms),
            AnimationMode::EnergyPulse => self.energy_pulse(features, now_ms),
            AnimationMode::StrobeParty => self.strobe_party(beat),
        };

        if let Some(color) = decision {
            self.current_color = color;
            self.last_change_ms = now_ms;
        }
        decision
    }

    fn electronic_party(
        &mut self,
        features: &AudioFeatures,
        beat: &BeatState,
        now_ms: u64,
    ) -> Option<Color> {
        let fallback = now_ms.saturating_sub(self.last_change_ms) > PARTY_FALLBACK_MS
            && features.energy > PARTY_ENERGY_FLOOR;
        (beat.on_beat || fallback).then(|| self.advance_cycle())
    }

    fn beat_sync_rapid(&mut self, beat: &BeatState) -> Option<Color> {
        beat.on_beat.then(|| self.advance_cycle())
    }

    fn bass_drop_special(&mut self, features: &AudioFeatures, beat: &BeatState) -> Option<Color> {
        if beat.on_beat && features.bass_energy > features.energy * 0.6 {
            // The cycle advances on every drop, even when the flash goes
            // white instead of the sequence color.
            let next = self.advance_cycle();
            Some(if beat.strength > 0.7 { Color::White } else { next })
        } else {
            None
        }
    }

    fn frequency_split(
        &self,
        features: &AudioFeatures,
        beat: &BeatState,
        now_ms: u64,
    ) -> Option<Color> {
        let color = if features.bass_energy > features.energy * 0.4 {
            Color::Red
        } else if features.bands[2] > features.bands[1] * 1.2 {
            Color::Blue
        } else if features.bands[4] > features.bands[3] * 1.2 {
            Color::Green
        } else if features.high_energy > features.energy * 0.3 {
            Color::White
        } else {
            Color::Purple
        };

        let due = beat.on_beat || now_ms.saturating_sub(self.last_change_ms) > SPLIT_HOLD_MS;
        (color != self.current_color && due).then_some(color)
    }

    fn energy_pulse(&self, features: &AudioFeatures, now_ms: u64) -> Option<Color> {
        if now_ms.saturating_sub(self.last_change_ms) <= PULSE_INTERVAL_MS {
            return None;
        }

        let level = (features.energy / PULSE_ENERGY_SCALE).clamp(0.0, 1.0);
        let index = ((level * self.sequence.len() as f32) as usize).min(self.sequence.len() - 1);
        let color = self.sequence[index];
        (color != self.current_color).then_some(color)
    }

    fn strobe_party(&mut self, beat: &BeatState) -> Option<Color> {
        if beat.on_beat && beat.strength > 0.5 {
            let color = if self.cycle_index % 2 == 0 {
                Color::White
            } else {
                self.sequence[(self.cycle_index / 2) % self.sequence.len()]
            };
            self.cycle_index += 1;
            Some(color)
        } else {
            None
        }
    }

    fn advance_cycle(&mut self) -> Color {
        self.cycle_index += 1;
        self.sequence[self.cycle_index % self.sequence.len()]
    }
}
