//! Unit Conversion
//!
//! Pure helpers for levels (ratio ⇄ dB), musical frequency steps and
//! sample ⇄ time conversions. No state, no allocation beyond `add_db`.

// ============================================================================
// Constants
// ============================================================================

/// Smallest ratio fed into a logarithm; keeps silence at -240 dB instead of -inf
pub const RATIO_FLOOR: f64 = 1e-12;

/// Semitones per octave
const SEMITONES_PER_OCTAVE: i64 = 12;

// ============================================================================
// Levels
// ============================================================================

/// Convert an amplitude ratio to a level difference in dB
///
/// The ratio is clamped to [`RATIO_FLOOR`] first, so zero or negative input
/// yields a large negative but finite value.
#[inline]
pub fn convert_ratio_to_db(ratio: f64) -> f64 {
    20.0 * ratio.max(RATIO_FLOOR).log10()
}

/// Convert a level difference in dB to an amplitude ratio
#[inline]
pub fn convert_db_to_ratio(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Return a copy of `samples` changed in level by `db`
pub fn add_db(samples: &[f64], db: f64) -> Vec<f64> {
    let ratio = convert_db_to_ratio(db);
    samples.iter().map(|s| s * ratio).collect()
}

// ============================================================================
// Frequencies
// ============================================================================

/// Shift a frequency by a number of (possibly fractional) semitones
///
/// Whole-semitone shifts are split into octaves and a remainder so that
/// octave steps are exact: `add_semi_tones(1000.0, 12.0) == 2000.0`.
pub fn add_semi_tones(freq: f64, semitones: f64) -> f64 {
    if semitones == 0.0 {
        return freq;
    }
    if semitones.fract() == 0.0 {
        let st = semitones as i64;
        let octaves = st.div_euclid(SEMITONES_PER_OCTAVE);
        let remainder = st.rem_euclid(SEMITONES_PER_OCTAVE);
        freq * 2.0_f64.powi(octaves as i32) * semitone_ratio(remainder)
    } else {
        freq * 2.0_f64.powf(semitones / SEMITONES_PER_OCTAVE as f64)
    }
}

/// Frequency ratio for 0..12 semitones up
#[inline]
fn semitone_ratio(semitones: i64) -> f64 {
    if semitones == 0 {
        1.0
    } else {
        2.0_f64.powf(semitones as f64 / SEMITONES_PER_OCTAVE as f64)
    }
}

// ============================================================================
// Time
// ============================================================================

/// Number of samples to seconds
#[inline]
pub fn samples_to_seconds(num_samples: usize, sample_rate: u32) -> f64 {
    num_samples as f64 / sample_rate as f64
}

/// Seconds to number of samples (truncating)
#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64) as usize
}

/// Number of samples to milliseconds
#[inline]
pub fn samples_to_ms(num_samples: usize, sample_rate: u32) -> f64 {
    1000.0 * samples_to_seconds(num_samples, sample_rate)
}

/// Milliseconds to number of samples (truncating)
#[inline]
pub fn ms_to_samples(ms: f64, sample_rate: u32) -> usize {
    seconds_to_samples(ms / 1000.0, sample_rate)
}

// ============================================================================
// Tests
// ============================================================================
