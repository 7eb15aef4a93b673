//! Amplifier Effect
//!
//! Level change in dB with optional hard clipping to full scale.

use super::{Effect, EffectParams};
use crate::engine::Signal;
use crate::error::{EarfxError, Result};
use crate::units::convert_db_to_ratio;
use log::debug;

// ============================================================================
// Amplifier
// ============================================================================

/// Simple amplifier
///
/// # Parameters
/// - `gain_db`: Level change in decibels
/// - `clip`: Hard-clip the output to `[-1, 1]`
///
/// # Example
/// ```
/// use earfx::dsp::{Amplifier, Effect};
/// use earfx::engine::Signal;
///
/// let mut amp = Amplifier::new(6.0, true).unwrap();
/// let out = amp.apply(Signal::mono(vec![0.25, 0.9]));
/// assert!(out.channel(0)[0] > 0.49);
/// assert_eq!(out.channel(0)[1], 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amplifier {
    gain_db: f64,
    clip: bool,
    gain_ratio: f64,
}

impl Default for Amplifier {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            clip: true,
            gain_ratio: 1.0,
        }
    }
}

impl Amplifier {
    /// Create an amplifier
    ///
    /// # Arguments
    /// * `gain_db` - Level change in decibels
    /// * `clip` - Toggle hard clipping
    ///
    /// # Errors
    /// `InvalidParameter` if `gain_db` is not finite.
    pub fn new(gain_db: f64, clip: bool) -> Result<Self> {
        let gain_ratio = Self::ratio_for(gain_db)?;
        debug!("Created amplifier: {} dB, clip={}", gain_db, clip);
        Ok(Self {
            gain_db,
            clip,
            gain_ratio,
        })
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    /// Linear factor for the current gain
    pub fn gain_ratio(&self) -> f64 {
        self.gain_ratio
    }

    pub fn clip(&self) -> bool {
        self.clip
    }

    fn ratio_for(gain_db: f64) -> Result<f64> {
        if !gain_db.is_finite() {
            return Err(EarfxError::invalid("gain_db", gain_db, "a finite gain in dB"));
        }
        Ok(convert_db_to_ratio(gain_db))
    }
}

impl Effect for Amplifier {
    fn name(&self) -> &'static str {
        "Amplifier"
    }

    fn params(&self) -> EffectParams {
        EffectParams::new()
            .with("gain_db", self.gain_db)
            .with("clip", self.clip)
    }

    fn load_params(&mut self, params: &EffectParams) -> Result<()> {
        let gain_db = params.float("gain_db")?;
        let clip = params.bool("clip")?;
        self.gain_ratio = Self::ratio_for(gain_db)?;
        self.gain_db = gain_db;
        self.clip = clip;
        Ok(())
    }

    fn apply(&mut self, mut signal: Signal) -> Signal {
        let ratio = self.gain_ratio;
        let clip = self.clip;
        for channel in signal.channels_mut() {
            for sample in channel.iter_mut() {
                *sample *= ratio;
                if clip {
                    *sample = sample.clamp(-1.0, 1.0);
                }
            }
        }
        signal
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_amplifier_default() {
        let amp = Amplifier::default();
        assert_eq!(amp.gain_db(), 0.0);
        assert!(amp.clip());
        assert_eq!(amp.gain_ratio(), 1.0);
    }

    #[test]
    fn test_unity_gain() {
        let mut amp = Amplifier::default();
        let input = vec![0.5, -0.25, 0.0, 0.75];
        let out = amp.apply(Signal::mono(input.clone()));
        assert_eq!(out.channel(0), input.as_slice());
    }

    #[test]
    fn test_minus_6db() {
        let mut amp = Amplifier::new(-6.0, true).unwrap();
        let out = amp.apply(Signal::stereo(vec![1.0; 4], vec![-0.5; 4]).unwrap());
        assert_relative_eq!(out.channel(0)[0], 0.501187, epsilon = 1e-6);
        assert_relative_eq!(out.channel(1)[3], -0.250594, epsilon = 1e-6);
    }

    #[test]
    fn test_clipping() {
        let mut clipped = Amplifier::new(12.0, true).unwrap();
        let out = clipped.apply(Signal::mono(vec![0.5, -0.5, 0.01]));
        assert_eq!(out.channel(0)[0], 1.0);
        assert_eq!(out.channel(0)[1], -1.0);
        assert!(out.channel(0)[2] < 1.0);

        let mut unclipped = Amplifier::new(12.0, false).unwrap();
        let out = unclipped.apply(Signal::mono(vec![0.5]));
        assert_relative_eq!(out.channel(0)[0], 0.5 * convert_db_to_ratio(12.0), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_gain() {
        assert!(Amplifier::new(f64::NAN, true).is_err());
        assert!(Amplifier::new(f64::INFINITY, false).is_err());
    }

    #[test]
    fn test_set_params() {
        let mut amp = Amplifier::default();
        amp.set_params(&[("gain_db", (-3_i64).into()), ("clip", false.into())])
            .unwrap();
        assert_eq!(amp.gain_db(), -3.0);
        assert!(!amp.clip());

        // A bool where a float belongs is rejected as a whole
        let err = amp
            .set_params(&[("clip", true.into()), ("gain_db", true.into())])
            .unwrap_err();
        assert_eq!(err.error_code(), "PARAMETER_TYPE");
        assert!(!amp.clip());
    }

    #[test]
    fn test_describe() {
        let amp = Amplifier::new(-6.0, true).unwrap();
        assert_eq!(amp.describe(), "AMPLIFIER\n- gain_db: -6\n- clip:    true");
    }
}
