pub mod sink;
pub mod state_machine;

pub use sink::{ChannelSink, ColorSink, LogSink};
pub use state_machine::LightStateMachine;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The discrete color set understood by the emission hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Off,
    Red,
    Green,
    Blue,
    White,
    LightGreen,
    VeryLightGreen,
    Turquoise,
    Orange,
    Yellow,
    Purple,
    LightPurple,
    Pink,
}

impl Color {
    pub fn name(&self) -> &'static str {
        match self {
            Color::Off => "off",
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::White => "white",
            Color::LightGreen => "light green",
            Color::VeryLightGreen => "very light green",
            Color::Turquoise => "turquoise",
            Color::Orange => "orange",
            Color::Yellow => "yellow",
            Color::Purple => "purple",
            Color::LightPurple => "light purple",
            Color::Pink => "pink",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Color palette cycled through by the animation policies. Each mode maps to
/// a fixed, ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ColorMode {
    PartyMode,
    NeonElectronic,
    BassColors,
    RaveMode,
    FestivalVibes,
    ClubAtmosphere,
}

impl ColorMode {
    pub fn sequence(&self) -> &'static [Color] {
        match self {
            ColorMode::PartyMode => &[
                Color::Red,
                Color::Blue,
                Color::Green,
                Color::Purple,
                Color::Pink,
                Color::Orange,
                Color::Yellow,
                Color::White,
                Color::Turquoise,
            ],
            ColorMode::NeonElectronic => &[
                Color::Purple,
                Color::Pink,
                Color::Turquoise,
                Color::LightGreen,
                Color::Blue,
                Color::LightPurple,
            ],
            ColorMode::BassColors => &[
                Color::Red,
                Color::Purple,
                Color::Blue,
                Color::Orange,
                Color::Pink,
            ],
            ColorMode::RaveMode => &[
                Color::Green,
                Color::Purple,
                Color::Yellow,
                Color::Pink,
                Color::Turquoise,
                Color::White,
            ],
            ColorMode::FestivalVibes => &[
                Color::Orange,
                Color::Yellow,
                Color::Pink,
                Color::Turquoise,
                Color::LightGreen,
                Color::Purple,
            ],
            ColorMode::ClubAtmosphere => &[
                Color::Blue,
                Color::Purple,
                Color::Red,
                Color::White,
                Color::Pink,
            ],
        }
    }
}

/// Emission policy evaluated once per processed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum AnimationMode {
    /// Beat-driven cycling with an energy-gated fallback cadence.
    ElectronicParty,
    /// A new color on every detected beat, nothing else.
    BeatSyncRapid,
    /// Flashes on bass-heavy beats, white on the strongest ones.
    BassDropSpecial,
    /// Maps the dominant region of the band profile to a fixed color.
    FrequencySplit,
    /// Periodically re-maps overall energy onto the palette.
    EnergyPulse,
    /// White-interleaved strobing on strong beats.
    StrobeParty,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [ColorMode; 6] = [
        ColorMode::PartyMode,
        ColorMode::NeonElectronic,
        ColorMode::BassColors,
        ColorMode::RaveMode,
        ColorMode::FestivalVibes,
        ColorMode::ClubAtmosphere,
    ];

    #[test]
    fn sequences_have_expected_sizes() {
        for mode in ALL_MODES {
            let sequence = mode.sequence();
            assert!(
                (5..=9).contains(&sequence.len()),
                "{:?} has {} colors",
                mode,
                sequence.len()
            );
        }
    }

    #[test]
    fn sequences_contain_no_duplicates() {
        for mode in ALL_MODES {
            let sequence = mode.sequence();
            for (i, color) in sequence.iter().enumerate() {
                assert!(
                    !sequence[i + 1..].contains(color),
                    "{:?} repeats {:?}",
                    mode,
                    color
                );
            }
        }
    }

    #[test]
    fn party_sequence_reads_back_in_order() {
        assert_eq!(
            ColorMode::PartyMode.sequence(),
            &[
                Color::Red,
                Color::Blue,
                Color::Green,
                Color::Purple,
                Color::Pink,
                Color::Orange,
                Color::Yellow,
                Color::White,
                Color::Turquoise,
            ]
        );
    }

    #[test]
    fn sequences_never_contain_off() {
        for mode in ALL_MODES {
            assert!(!mode.sequence().contains(&Color::Off));
        }
    }
}
