//! Stereo imaging
//!
//! Mid/side decomposition with an orthonormal basis, stereo width control and
//! equal-power panning.

use super::{Effect, EffectParams};
use crate::engine::Signal;
use crate::error::{EarfxError, Result};
use log::debug;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

/// Mid/side basis scale, 1/√2
pub const SQRT12: f64 = FRAC_1_SQRT_2;

// ============================================================================
// Mid/Side Helpers
// ============================================================================

/// Split a left/right pair into mid and side channels
///
/// `mid = (L + R) / √2`, `side = (L - R) / √2`
pub fn mid_side_split(left: &[f64], right: &[f64]) -> (Vec<f64>, Vec<f64>) {
    left.iter()
        .zip(right)
        .map(|(&l, &r)| ((l + r) * SQRT12, (l - r) * SQRT12))
        .unzip()
}

/// Rebuild left/right from mid and side channels; inverse of [`mid_side_split`]
pub fn mid_side_merge(mid: &[f64], side: &[f64]) -> (Vec<f64>, Vec<f64>) {
    mid.iter()
        .zip(side)
        .map(|(&m, &s)| ((m + s) * SQRT12, (m - s) * SQRT12))
        .unzip()
}

/// Fold a stereo pair into one channel of equal intensity
pub fn convert_stereo_to_mono(left: &[f64], right: &[f64]) -> Vec<f64> {
    left.iter().zip(right).map(|(&l, &r)| (l + r) * SQRT12).collect()
}

/// Scale the side component of a stereo pair in place
fn scale_side(left: &mut [f64], right: &mut [f64], width: f64) {
    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let mid = (*l + *r) * SQRT12;
        let side = (*l - *r) * SQRT12 * width;
        *l = (mid + side) * SQRT12;
        *r = (mid - side) * SQRT12;
    }
}

/// Adjust the stereo width of a stereo signal
///
/// `width = 1` returns the signal untouched, `0` collapses it to the center.
///
/// # Errors
/// `InvalidShape` for a mono signal.
pub fn adjust_stereo_width(mut signal: Signal, width: f64) -> Result<Signal> {
    let (left, right) = signal.as_stereo_mut().ok_or_else(|| EarfxError::InvalidShape {
        reason: "stereo width needs a two-channel signal".to_string(),
    })?;
    if width != 1.0 {
        scale_side(left, right, width);
    }
    Ok(signal)
}

/// Equal-power pan coefficients `(left, right)` for a position in `[-1, 1]`
///
/// The quarter-sine law keeps `left² + right² = 1` across the field.
pub fn pan_coefficients(pos: f64) -> (f64, f64) {
    if pos == 0.0 {
        (SQRT12, SQRT12)
    } else if pos == -1.0 {
        (1.0, 0.0)
    } else if pos == 1.0 {
        (0.0, 1.0)
    } else {
        let angle = (pos + 1.0) * FRAC_PI_4;
        (angle.cos(), angle.sin())
    }
}

// ============================================================================
// Stereo Control Effect
// ============================================================================

/// Places mono material in the stereo field and controls the width of
/// stereo material
#[derive(Debug, Clone)]
pub struct StereoControl {
    /// Position, -1 (hard left) to 1 (hard right)
    pos: f64,
    /// Width, 0 (mono) to 1 (unchanged)
    width: f64,
    coefficients: (f64, f64),
}

impl Default for StereoControl {
    fn default() -> Self {
        Self {
            pos: 0.0,
            width: 1.0,
            coefficients: pan_coefficients(0.0),
        }
    }
}

impl StereoControl {
    /// Create a stereo control; both values are clamped into range
    ///
    /// # Errors
    /// `InvalidParameter` if either value is NaN.
    pub fn new(pos: f64, width: f64) -> Result<Self> {
        let (pos, width) = Self::clamp_params(pos, width)?;
        debug!("Created stereo control: pos={}, width={}", pos, width);
        Ok(Self {
            pos,
            width,
            coefficients: pan_coefficients(pos),
        })
    }

    /// Pan to a position, leaving the width at 1
    pub fn panned(pos: f64) -> Result<Self> {
        Self::new(pos, 1.0)
    }

    pub fn pos(&self) -> f64 {
        self.pos
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Current `(left, right)` pan coefficients
    pub fn coefficients(&self) -> (f64, f64) {
        self.coefficients
    }

    fn clamp_params(pos: f64, width: f64) -> Result<(f64, f64)> {
        if pos.is_nan() {
            return Err(EarfxError::invalid("pos", pos, "a number in [-1, 1]"));
        }
        if width.is_nan() {
            return Err(EarfxError::invalid("width", width, "a number in [0, 1]"));
        }
        Ok((pos.clamp(-1.0, 1.0), width.clamp(0.0, 1.0)))
    }

    /// Pan a mono channel into a stereo pair
    fn pan_mono(&self, mono: Signal) -> Signal {
        let (lam, rho) = self.coefficients;
        let mut stereo = mono.into_stereo();
        if let Some((left, right)) = stereo.as_stereo_mut() {
            left.iter_mut().for_each(|s| *s *= lam);
            right.iter_mut().for_each(|s| *s *= rho);
        }
        stereo
    }
}

impl Effect for StereoControl {
    fn name(&self) -> &'static str {
        "Stereo Control"
    }

    fn params(&self) -> EffectParams {
        EffectParams::new()
            .with("pos", self.pos)
            .with("width", self.width)
    }

    fn load_params(&mut self, params: &EffectParams) -> Result<()> {
        let (pos, width) = Self::clamp_params(params.float("pos")?, params.float("width")?)?;
        self.pos = pos;
        self.width = width;
        self.coefficients = pan_coefficients(pos);
        Ok(())
    }

    fn apply(&mut self, mut signal: Signal) -> Signal {
        if !signal.is_stereo() {
            return self.pan_mono(signal);
        }

        let (lam, rho) = self.coefficients;
        let centered = self.pos == 0.0;
        let width = self.width;
        if let Some((left, right)) = signal.as_stereo_mut() {
            if width != 1.0 {
                scale_side(left, right, width);
            }
            // Already centered material stays as it is
            if !(centered && left == right) {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let mid = (*l + *r) * SQRT12;
                    let side = (*l - *r) * SQRT12;
                    *l = lam * mid + side * SQRT12;
                    *r = rho * mid - side * SQRT12;
                }
            }
        }
        signal
    }
}
