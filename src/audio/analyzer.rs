use super::{AudioFeatures, BAND_COUNT};

const ROLLOFF_FRACTION: f32 = 0.85;

/// Shortest autocorrelation lag considered, keeps the pitch estimate below
/// ~2.2kHz at 44.1kHz and out of single-sample noise.
const MIN_PITCH_LAG: usize = 20;

/// Computes the per-chunk feature snapshot from raw PCM samples.
///
/// The analyzer retains the previous chunk's band magnitudes so spectral flux
/// can be computed across chunk boundaries; that is its only state.
pub struct FrequencyAnalyzer {
    sample_rate: f32,
    bands: [f32; BAND_COUNT],
    previous_bands: [f32; BAND_COUNT],
}

impl FrequencyAnalyzer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            bands: [0.0; BAND_COUNT],
            previous_bands: [0.0; BAND_COUNT],
        }
    }

    /// Analyzes one chunk. An empty chunk yields an all-zero snapshot and
    /// leaves the retained bands untouched.
    pub fn analyze(&mut self, samples: &[i16]) -> AudioFeatures {
        if samples.is_empty() {
            return AudioFeatures::default();
        }

        self.previous_bands = self.bands;
        self.bands = compute_bands(samples);

        AudioFeatures {
            energy: rms(samples, 0, samples.len()),
            dominant_frequency: self.detect_dominant_frequency(samples),
            spectral_flux: self.compute_flux(),
            spectral_centroid: self.compute_centroid(),
            spectral_rolloff: self.compute_rolloff(),
            bass_energy: self.bands[0] + self.bands[1],
            high_energy: self.bands[BAND_COUNT - 2] + self.bands[BAND_COUNT - 1],
            bands: self.bands,
        }
    }

    /// Center frequency assigned to a band for centroid/rolloff purposes.
    fn band_frequency(&self, band: usize) -> f32 {
        (band as f32 + 1.0) * self.sample_rate / (2.0 * BAND_COUNT as f32)
    }

    fn compute_flux(&self) -> f32 {
        self.bands
            .iter()
            .zip(self.previous_bands.iter())
            .map(|(&current, &previous)| (current - previous).max(0.0))
            .sum()
    }

    fn compute_centroid(&self) -> f32 {
        let magnitude_sum: f32 = self.bands.iter().sum();
        if magnitude_sum <= 0.0 {
            return 0.0;
        }

        let weighted_sum: f32 = self
            .bands
            .iter()
            .enumerate()
            .map(|(band, &magnitude)| self.band_frequency(band) * magnitude)
            .sum();

        weighted_sum / magnitude_sum
    }

    fn compute_rolloff(&self) -> f32 {
        let magnitude_sum: f32 = self.bands.iter().sum();
        if magnitude_sum > 0.0 {
            let threshold = magnitude_sum * ROLLOFF_FRACTION;
            let mut cumulative = 0.0;
            for (band, &magnitude) in self.bands.iter().enumerate() {
                cumulative += magnitude;
                if cumulative >= threshold {
                    return self.band_frequency(band);
                }
            }
        }
        self.sample_rate / 2.0
    }

    /// Bounded-lag autocorrelation pitch estimate. The lag cap keeps the cost
    /// at O(len * max_lag) with a fixed upper bound per chunk.
    fn detect_dominant_frequency(&self, samples: &[i16]) -> f32 {
        let max_lag = (samples.len() / 4).min((self.sample_rate / 50.0) as usize);
        let mut best_lag = 0;
        let mut best_correlation = 0.0f64;

        for lag in MIN_PITCH_LAG..max_lag {
            let mut correlation = 0.0f64;
            for i in lag..samples.len() {
                correlation += samples[i] as f64 * samples[i - lag] as f64;
            }
            correlation /= (samples.len() - lag) as f64;

            if correlation > best_correlation {
                best_correlation = correlation;
                best_lag = lag;
            }
        }

        if best_lag > 0 {
            self.sample_rate / best_lag as f32
        } else {
            0.0
        }
    }
}

fn compute_bands(samples: &[i16]) -> [f32; BAND_COUNT] {
    let mut bands = [0.0; BAND_COUNT];
    let band_size = samples.len() / BAND_COUNT;

    for (band, magnitude) in bands.iter_mut().enumerate() {
        let start = band * band_size;
        // The last range absorbs the remainder of the chunk.
        let end = if band == BAND_COUNT - 1 {
            samples.len()
        } else {
            ((band + 1) * band_size).min(samples.len())
        };
        *magnitude = rms(samples, start, end);
    }

    bands
}

fn rms(samples: &[i16], start: usize, end: usize) -> f32 {
    if start >= end {
        return 0.0;
    }

    let sum_squares: f64 = samples[start..end]
        .iter()
        .map(|&sample| {
            let sample = sample as f64;
            sample * sample
        })
        .sum();

    (sum_squares / (end - start) as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const SAMPLE_RATE: f32 = 44100.0;

    fn sine(frequency: f32, amplitude: f32, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE;
                (phase.sin() * amplitude) as i16
            })
            .collect()
    }

    #[test]
    fn silence_yields_zero_features() {
        let mut analyzer = FrequencyAnalyzer::new(SAMPLE_RATE);
        let features = analyzer.analyze(&vec![0i16; 1024]);

        assert_eq!(features.energy, 0.0);
        assert_eq!(features.spectral_flux, 0.0);
        assert_eq!(features.bass_energy, 0.0);
        assert_eq!(features.high_energy, 0.0);
        assert_eq!(features.dominant_frequency, 0.0);
        assert_eq!(features.spectral_centroid, 0.0);
        assert!(features.bands.iter().all(|&band| band == 0.0));
        // All-zero magnitudes fall back to Nyquist.
        assert_eq!(features.spectral_rolloff, SAMPLE_RATE / 2.0);
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut analyzer = FrequencyAnalyzer::new(SAMPLE_RATE);
        let tone = sine(440.0, 12000.0, 1024);

        analyzer.analyze(&tone);
        let features = analyzer.analyze(&[]);
        assert_eq!(features.energy, 0.0);
        assert!(features.bands.iter().all(|&band| band == 0.0));

        // The empty chunk must not have clobbered the retained bands: the
        // same tone again produces no rising energy.
        let features = analyzer.analyze(&tone);
        assert_abs_diff_eq!(features.spectral_flux, 0.0, epsilon = 1.0);
    }

    #[test]
    fn detects_440hz_tone() {
        let mut analyzer = FrequencyAnalyzer::new(SAMPLE_RATE);
        let features = analyzer.analyze(&sine(440.0, 12000.0, 1024));

        assert_relative_eq!(features.dominant_frequency, 440.0, max_relative = 0.05);
    }

    #[test]
    fn flux_tracks_rising_energy_only() {
        let mut analyzer = FrequencyAnalyzer::new(SAMPLE_RATE);
        analyzer.analyze(&vec![0i16; 1024]);

        let rising = analyzer.analyze(&sine(440.0, 12000.0, 1024));
        assert!(rising.spectral_flux > 0.0);

        let falling = analyzer.analyze(&vec![0i16; 1024]);
        assert_eq!(falling.spectral_flux, 0.0);
    }

    #[test]
    fn banding_localizes_energy_in_time() {
        let mut analyzer = FrequencyAnalyzer::new(SAMPLE_RATE);
        let mut samples = vec![0i16; 1024];
        for sample in samples.iter_mut().take(128) {
            *sample = 10000;
        }

        let features = analyzer.analyze(&samples);
        assert!(features.bands[0] > 9000.0);
        assert!(features.bands[1..].iter().all(|&band| band == 0.0));
        assert!(features.bass_energy > 0.0);
        assert_eq!(features.high_energy, 0.0);
    }

    #[test]
    fn rolloff_stays_within_nyquist() {
        let mut analyzer = FrequencyAnalyzer::new(SAMPLE_RATE);
        for frequency in [55.0, 440.0, 3520.0] {
            let features = analyzer.analyze(&sine(frequency, 8000.0, 1024));
            assert!(features.spectral_rolloff >= 0.0);
            assert!(features.spectral_rolloff <= SAMPLE_RATE / 2.0);
        }
    }

    #[test]
    fn short_chunk_still_produces_bounded_features() {
        let mut analyzer = FrequencyAnalyzer::new(SAMPLE_RATE);
        // Fewer samples than bands: the zero-width ranges must not divide by
        // zero and the tail lands in the last band.
        let features = analyzer.analyze(&[1000, -1000, 1000]);

        assert!(features.energy > 0.0);
        assert!(features.spectral_rolloff <= SAMPLE_RATE / 2.0);
        assert_eq!(features.dominant_frequency, 0.0);
    }
}
