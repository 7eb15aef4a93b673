//! Parametric EQ (peaking biquad)
//!
//! A single bell-shaped boost/cut designed with the Audio EQ Cookbook
//! formulas and streamed through the shared SOS cascade.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html

use super::filter::{check_frequency, Section, SosCascade};
use super::{Effect, EffectParams};
use crate::config::DEFAULT_SAMPLE_RATE;
use crate::engine::Signal;
use crate::error::{EarfxError, Result};
use log::debug;
use std::f64::consts::PI;

/// Design a peaking EQ biquad as one normalized second-order section
///
/// # Arguments
/// * `freq` - Center frequency in Hz, `0 < freq < sample_rate / 2`
/// * `q` - Quality factor, positive
/// * `gain_db` - Boost (positive) or cut (negative) at `freq`
/// * `sample_rate` - Sample rate in Hz
pub fn peaking_section(freq: f64, q: f64, gain_db: f64, sample_rate: u32) -> Result<Section> {
    if sample_rate == 0 {
        return Err(EarfxError::FilterDesign {
            reason: "sample rate must be positive".to_string(),
        });
    }
    let fs = sample_rate as f64;
    check_frequency("freq", freq, fs)?;
    if !q.is_finite() || q <= 0.0 {
        return Err(EarfxError::FilterDesign {
            reason: format!("q must be a positive number, got {}", q),
        });
    }
    if !gain_db.is_finite() {
        return Err(EarfxError::FilterDesign {
            reason: format!("gain must be finite, got {}", gain_db),
        });
    }

    let a = 10.0_f64.powf(gain_db / 40.0);
    let w0 = 2.0 * PI * freq / fs;
    let cos_w0 = w0.cos();
    let alpha = w0.sin() / (2.0 * q);

    Section::new(
        [1.0 + alpha * a, -2.0 * cos_w0, 1.0 - alpha * a],
        [1.0 + alpha / a, -2.0 * cos_w0, 1.0 - alpha / a],
    )
}

/// Parametric equalizer band (biquad peaking filter)
#[derive(Debug, Clone)]
pub struct ParametricEq {
    /// Center frequency in Hz
    freq: f64,
    /// Quality factor
    q: f64,
    /// Gain at the center frequency in dB
    gain: f64,
    sample_rate: u32,
    cascade: SosCascade,
}

impl ParametricEq {
    /// Create an EQ band at the default sample rate
    ///
    /// # Errors
    /// `FilterDesign` for a frequency outside `(0, Nyquist)`, a non-positive
    /// Q, or a non-finite gain.
    pub fn new(freq: f64, q: f64, gain: f64) -> Result<Self> {
        Self::with_sample_rate(freq, q, gain, DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(freq: f64, q: f64, gain: f64, sample_rate: u32) -> Result<Self> {
        let section = peaking_section(freq, q, gain, sample_rate)?;
        debug!("Created parametric EQ: {} Hz, Q={}, {} dB", freq, q, gain);
        Ok(Self {
            freq,
            q,
            gain,
            sample_rate,
            cascade: SosCascade::new(vec![section]),
        })
    }

    /// Flat band at 1 kHz, Q 1
    pub fn flat(sample_rate: u32) -> Result<Self> {
        Self::with_sample_rate(1000.0, 1.0, 0.0, sample_rate)
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn cascade(&self) -> &SosCascade {
        &self.cascade
    }
}

impl Effect for ParametricEq {
    fn name(&self) -> &'static str {
        "Parametric EQ / Peaking Filter (RBJ, BiQuad, SOS)"
    }

    fn params(&self) -> EffectParams {
        EffectParams::new()
            .with("freq", self.freq)
            .with("q", self.q)
            .with("gain", self.gain)
    }

    fn load_params(&mut self, params: &EffectParams) -> Result<()> {
        let freq = params.float("freq")?;
        let q = params.float("q")?;
        let gain = params.float("gain")?;
        let section = peaking_section(freq, q, gain, self.sample_rate)?;
        self.freq = freq;
        self.q = q;
        self.gain = gain;
        self.cascade.redesign(vec![section]);
        Ok(())
    }

    fn apply(&mut self, signal: Signal) -> Signal {
        self.cascade.process(signal)
    }
}
