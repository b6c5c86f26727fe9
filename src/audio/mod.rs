pub mod analyzer;
pub mod beat_detector;
pub mod capture;

pub use analyzer::FrequencyAnalyzer;
pub use beat_detector::{BeatDetector, BeatState};
pub use capture::AudioCapture;

/// Nominal samples per processing chunk.
pub const CHUNK_SIZE: usize = 1024;

/// Number of coarse time-domain energy bands.
pub const BAND_COUNT: usize = 8;

/// One buffer of raw mono PCM samples, the unit of processing. May carry
/// fewer valid samples than [`CHUNK_SIZE`], including none at all.
pub type SampleChunk = Vec<i16>;

/// Per-chunk audio feature snapshot produced by the analyzer and consumed by
/// the beat detector and the light state machine.
///
/// Bands are RMS magnitudes of equal-width time partitions of the chunk, a
/// deliberate coarse stand-in for a spectrum; no frequency-domain transform
/// is involved anywhere in the pipeline.
#[derive(Debug, Clone)]
pub struct AudioFeatures {
    /// RMS over the whole chunk, in raw 16-bit sample units.
    pub energy: f32,
    /// Autocorrelation pitch estimate in Hz, 0.0 when nothing correlates.
    pub dominant_frequency: f32,
    /// Half-wave rectified band energy rise since the previous chunk.
    pub spectral_flux: f32,
    /// Magnitude-weighted mean band frequency in Hz.
    pub spectral_centroid: f32,
    /// Frequency below which 85% of the band magnitude sits, in Hz.
    pub spectral_rolloff: f32,
    /// Sum of the two lowest bands.
    pub bass_energy: f32,
    /// Sum of the two highest bands.
    pub high_energy: f32,
    pub bands: [f32; BAND_COUNT],
}

impl Default for AudioFeatures {
    fn default() -> Self {
        Self {
            energy: 0.0,
            dominant_frequency: 0.0,
            spectral_flux: 0.0,
            spectral_centroid: 0.0,
            spectral_rolloff: 0.0,
            bass_energy: 0.0,
            high_energy: 0.0,
            bands: [0.0; BAND_COUNT],
        }
    }
}
