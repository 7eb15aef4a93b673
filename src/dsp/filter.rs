//! IIR Filter Engine
//!
//! Filters are designed once into a cascade of second-order sections (SOS)
//! and streamed block by block. The cascade keeps its delay state between
//! calls, so a signal split into blocks filters exactly like the whole signal.
//! When the channel count of the incoming block changes, the state is
//! re-initialised to the steady-state condition and broadcast to every channel.

use super::{Effect, EffectParams};
use crate::config::{just_below_nyquist, DEFAULT_SAMPLE_RATE};
use crate::engine::Signal;
use crate::error::{EarfxError, Result};
use log::{debug, trace};
use std::f64::consts::PI;

/// Default Butterworth order for the pass filters
pub const DEFAULT_ORDER: u32 = 5;

/// Default high-pass cutoff in Hz
pub const DEFAULT_HIGH_PASS_CUTOFF: f64 = 16.0;

// ============================================================================
// Second-Order Section
// ============================================================================

/// One biquad stage: `H(z) = (b0 + b1 z⁻¹ + b2 z⁻²) / (1 + a1 z⁻¹ + a2 z⁻²)`
///
/// Coefficients are normalized so that the leading denominator term is 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Section {
    /// Build a section from raw coefficients, normalizing by `a[0]`
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Result<Self> {
        let a0 = a[0];
        if a0 == 0.0 || !a0.is_finite() {
            return Err(EarfxError::FilterDesign {
                reason: format!("leading denominator coefficient must be non-zero, got {}", a0),
            });
        }
        let section = Self {
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            a: [1.0, a[1] / a0, a[2] / a0],
        };
        if section.b.iter().chain(section.a.iter()).any(|c| !c.is_finite()) {
            return Err(EarfxError::FilterDesign {
                reason: "coefficients are not finite".to_string(),
            });
        }
        Ok(section)
    }

    /// Gain at DC (z = 1)
    pub fn dc_gain(&self) -> f64 {
        let den: f64 = self.a.iter().sum();
        if den == 0.0 {
            0.0
        } else {
            self.b.iter().sum::<f64>() / den
        }
    }

    /// Delay state reached after a unit step has been fed forever
    ///
    /// Solves `(I - Aᵀ) z = b[1..] - a[1..]·b0` for the transposed direct
    /// form II state.
    fn step_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let rhs0 = b1 - a1 * b0;
        let rhs1 = b2 - a2 * b0;
        let den = 1.0 + a1 + a2;
        if den == 0.0 {
            return [0.0, 0.0];
        }
        let z0 = (rhs0 + rhs1) / den;
        [z0, rhs1 - a2 * z0]
    }

    /// Run the section over `samples` in place (transposed direct form II)
    #[inline]
    fn process(&self, samples: &mut [f64], z: &mut [f64; 2]) {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let [mut z0, mut z1] = *z;
        for sample in samples.iter_mut() {
            let x = *sample;
            let y = b0 * x + z0;
            z0 = b1 * x - a1 * y + z1;
            z1 = b2 * x - a2 * y;
            *sample = y;
        }
        *z = [z0, z1];
    }
}

// ============================================================================
// Design
// ============================================================================

/// Which side of the cutoff a Butterworth filter keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassBand {
    Low,
    High,
}

fn check_sample_rate(sample_rate: u32) -> Result<f64> {
    if sample_rate == 0 {
        return Err(EarfxError::FilterDesign {
            reason: "sample rate must be positive".to_string(),
        });
    }
    Ok(sample_rate as f64)
}

/// Check `0 < freq < sample_rate / 2`
pub(crate) fn check_frequency(name: &str, freq: f64, sample_rate: f64) -> Result<()> {
    let nyquist = sample_rate / 2.0;
    if !freq.is_finite() || freq <= 0.0 || freq >= nyquist {
        return Err(EarfxError::FilterDesign {
            reason: format!(
                "{} must satisfy 0 < {} < {} Hz, got {}",
                name, name, nyquist, freq
            ),
        });
    }
    Ok(())
}

/// Highest Butterworth order `butterworth` will design
pub const MAX_ORDER: u32 = 64;

/// Design a digital Butterworth filter as second-order sections
///
/// The analog prototype is mapped with the bilinear transform after
/// prewarping the cutoff, which yields `order / 2` biquads with
/// `Q_k = 1 / (2·sin((2k+1)·π / (2·order)))` and, for odd orders, one
/// first-order stage.
///
/// # Errors
/// `FilterDesign` for an order of 0 or above [`MAX_ORDER`], a zero sample
/// rate, or a cutoff outside `(0, sample_rate / 2)`.
pub fn butterworth(band: PassBand, order: u32, cutoff: f64, sample_rate: u32) -> Result<Vec<Section>> {
    let fs = check_sample_rate(sample_rate)?;
    if order == 0 {
        return Err(EarfxError::FilterDesign {
            reason: "order must be at least 1".to_string(),
        });
    }
    if order > MAX_ORDER {
        return Err(EarfxError::FilterDesign {
            reason: format!("order {} exceeds the maximum of {}", order, MAX_ORDER),
        });
    }
    check_frequency("cutoff", cutoff, fs)?;

    let w0 = 2.0 * PI * cutoff / fs;
    let cos_w0 = w0.cos();
    let sin_w0 = w0.sin();
    let mut sections = Vec::with_capacity(order.div_ceil(2) as usize);

    if order % 2 == 1 {
        // First-order stage: H(s) = 1 / (s + 1) resp. s / (s + 1)
        let k = (w0 / 2.0).tan();
        let b = match band {
            PassBand::Low => [k, k, 0.0],
            PassBand::High => [1.0, -1.0, 0.0],
        };
        sections.push(Section::new(b, [1.0 + k, k - 1.0, 0.0])?);
    }

    let n = order as f64;
    for k in 0..order / 2 {
        let q = 1.0 / (2.0 * ((2 * k + 1) as f64 * PI / (2.0 * n)).sin());
        let alpha = sin_w0 / (2.0 * q);
        let b = match band {
            PassBand::Low => [(1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0],
            PassBand::High => [(1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0],
        };
        sections.push(Section::new(b, [1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha])?);
    }

    trace!(
        "Butterworth {:?} order {} at {} Hz: {} sections",
        band,
        order,
        cutoff,
        sections.len()
    );
    Ok(sections)
}

/// Steady-state initial condition for a cascade
///
/// Each section starts at its unit-step state, scaled by the DC gain of the
/// sections before it.
pub fn steady_state(sections: &[Section]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sections
        .iter()
        .map(|section| {
            let [z0, z1] = section.step_state();
            let state = [z0 * scale, z1 * scale];
            scale *= section.dc_gain();
            state
        })
        .collect()
}

// ============================================================================
// Streaming Cascade
// ============================================================================

/// A section cascade plus its persistent per-channel delay state
#[derive(Debug, Clone)]
pub struct SosCascade {
    sections: Vec<Section>,
    /// Channel count the state is shaped for; `None` after a redesign that
    /// changed the number of sections
    channels: Option<usize>,
    /// `zi[channel][section]`
    zi: Vec<Vec<[f64; 2]>>,
}

impl SosCascade {
    /// Create a cascade with a mono steady-state initial condition
    pub fn new(sections: Vec<Section>) -> Self {
        let zi = vec![steady_state(&sections)];
        Self {
            sections,
            channels: Some(1),
            zi,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Channel count the current state is shaped for
    pub fn state_channels(&self) -> Option<usize> {
        self.channels
    }

    /// Current delay state, `[channel][section]`
    pub fn state(&self) -> &[Vec<[f64; 2]>] {
        &self.zi
    }

    /// Swap in new coefficients
    ///
    /// The delay state is kept when the section count matches so that a
    /// parameter change does not click; otherwise it is marked stale and
    /// rebuilt by the next [`SosCascade::process`].
    pub fn redesign(&mut self, sections: Vec<Section>) {
        if sections.len() != self.sections.len() {
            self.channels = None;
        }
        self.sections = sections;
    }

    /// Filter a block along the sample axis, updating the state
    pub fn process(&mut self, mut signal: Signal) -> Signal {
        let num_channels = signal.num_channels();
        if self.channels != Some(num_channels) {
            self.reshape_state(num_channels);
        }

        for (channel, zi) in signal.channels_mut().zip(self.zi.iter_mut()) {
            for (section, z) in self.sections.iter().zip(zi.iter_mut()) {
                section.process(channel, z);
            }
        }
        signal
    }

    fn reshape_state(&mut self, num_channels: usize) {
        debug!(
            "Re-initialising filter state: {:?} -> {} channel(s)",
            self.channels, num_channels
        );
        let initial = steady_state(&self.sections);
        self.zi = vec![initial; num_channels];
        self.channels = Some(num_channels);
    }
}

// ============================================================================
// Pass Filters
// ============================================================================

/// Shared body of the Butterworth pass filters
#[derive(Debug, Clone)]
struct PassFilter {
    band: PassBand,
    cutoff: f64,
    order: u32,
    sample_rate: u32,
    cascade: SosCascade,
}

impl PassFilter {
    fn new(band: PassBand, cutoff: f64, order: u32, sample_rate: u32) -> Result<Self> {
        let sections = butterworth(band, order, cutoff, sample_rate)?;
        debug!("Created {:?}-pass filter: cutoff={} Hz, order={}", band, cutoff, order);
        Ok(Self {
            band,
            cutoff,
            order,
            sample_rate,
            cascade: SosCascade::new(sections),
        })
    }

    fn params(&self) -> EffectParams {
        EffectParams::new()
            .with("cutoff", self.cutoff)
            .with("order", self.order)
    }

    fn load_params(&mut self, params: &EffectParams) -> Result<()> {
        let cutoff = params.float("cutoff")?;
        let order = params.int("order")?;
        let order = u32::try_from(order)
            .map_err(|_| EarfxError::invalid("order", order, "a positive integer"))?;
        let sections = butterworth(self.band, order, cutoff, self.sample_rate)?;
        self.cutoff = cutoff;
        self.order = order;
        self.cascade.redesign(sections);
        Ok(())
    }
}

/// Butterworth low-pass filter streamed through second-order sections
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    inner: PassFilter,
}

impl LowPassFilter {
    /// Create a low-pass filter at the default sample rate
    ///
    /// # Errors
    /// `FilterDesign` if the cutoff is not below Nyquist or the order is 0.
    pub fn new(cutoff: f64, order: u32) -> Result<Self> {
        Self::with_sample_rate(cutoff, order, DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(cutoff: f64, order: u32, sample_rate: u32) -> Result<Self> {
        Ok(Self {
            inner: PassFilter::new(PassBand::Low, cutoff, order, sample_rate)?,
        })
    }

    /// Order-5 filter with its cutoff just below Nyquist (practically open)
    pub fn open(sample_rate: u32) -> Result<Self> {
        Self::with_sample_rate(just_below_nyquist(sample_rate), DEFAULT_ORDER, sample_rate)
    }

    pub fn cutoff(&self) -> f64 {
        self.inner.cutoff
    }

    pub fn order(&self) -> u32 {
        self.inner.order
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn cascade(&self) -> &SosCascade {
        &self.inner.cascade
    }
}

impl Effect for LowPassFilter {
    fn name(&self) -> &'static str {
        "Low Pass Filter (Butterworth, SOS)"
    }

    fn params(&self) -> EffectParams {
        self.inner.params()
    }

    fn load_params(&mut self, params: &EffectParams) -> Result<()> {
        self.inner.load_params(params)
    }

    fn apply(&mut self, signal: Signal) -> Signal {
        self.inner.cascade.process(signal)
    }
}

/// Butterworth high-pass filter streamed through second-order sections
#[derive(Debug, Clone)]
pub struct HighPassFilter {
    inner: PassFilter,
}

impl HighPassFilter {
    /// Create a high-pass filter at the default sample rate
    ///
    /// # Errors
    /// `FilterDesign` if the cutoff is not below Nyquist or the order is 0.
    pub fn new(cutoff: f64, order: u32) -> Result<Self> {
        Self::with_sample_rate(cutoff, order, DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(cutoff: f64, order: u32, sample_rate: u32) -> Result<Self> {
        Ok(Self {
            inner: PassFilter::new(PassBand::High, cutoff, order, sample_rate)?,
        })
    }

    /// Order-5 filter at 16 Hz (removes DC and rumble only)
    pub fn open(sample_rate: u32) -> Result<Self> {
        Self::with_sample_rate(DEFAULT_HIGH_PASS_CUTOFF, DEFAULT_ORDER, sample_rate)
    }

    pub fn cutoff(&self) -> f64 {
        self.inner.cutoff
    }

    pub fn order(&self) -> u32 {
        self.inner.order
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn cascade(&self) -> &SosCascade {
        &self.inner.cascade
    }
}

impl Effect for HighPassFilter {
    fn name(&self) -> &'static str {
        "High Pass Filter (Butterworth, SOS)"
    }

    fn params(&self) -> EffectParams {
        self.inner.params()
    }

    fn load_params(&mut self, params: &EffectParams) -> Result<()> {
        self.inner.load_params(params)
    }

    fn apply(&mut self, signal: Signal) -> Signal {
        self.inner.cascade.process(signal)
    }
}

// ============================================================================
// Tests
// ============================================================================
