//! Compressor effect
//!
//! A hard-knee dynamics processor with a peak envelope follower. Each channel
//! has its own envelope, held between blocks so that gain changes stay smooth
//! across block boundaries.

use super::{Effect, EffectParams};
use crate::config::DEFAULT_SAMPLE_RATE;
use crate::engine::Signal;
use crate::error::{EarfxError, Result};
use crate::units::{convert_db_to_ratio, convert_ratio_to_db};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Compressor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Threshold level in dB
    pub threshold_db: f64,
    /// Compression ratio (4.0 means 4:1), at least 1
    pub ratio: f64,
    /// Attack time in milliseconds
    pub attack_ms: f64,
    /// Release time in milliseconds
    pub release_ms: f64,
    /// Makeup gain in dB
    pub makeup_db: f64,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            makeup_db: 0.0,
        }
    }
}

impl CompressorParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_db.is_finite() {
            return Err(EarfxError::invalid("threshold_db", self.threshold_db, "a finite level in dB"));
        }
        if !self.ratio.is_finite() || self.ratio < 1.0 {
            return Err(EarfxError::invalid("ratio", self.ratio, "a finite ratio of at least 1"));
        }
        if !self.attack_ms.is_finite() || self.attack_ms <= 0.0 {
            return Err(EarfxError::invalid("attack_ms", self.attack_ms, "a positive time in ms"));
        }
        if !self.release_ms.is_finite() || self.release_ms <= 0.0 {
            return Err(EarfxError::invalid("release_ms", self.release_ms, "a positive time in ms"));
        }
        if !self.makeup_db.is_finite() {
            return Err(EarfxError::invalid("makeup_db", self.makeup_db, "a finite gain in dB"));
        }
        Ok(())
    }
}

/// Values derived from one parameter set, computed before anything is committed
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    attack: f64,
    release: f64,
    thresh_db: f64,
    makeup: f64,
}

impl Coefficients {
    fn compute(params: &CompressorParams, sample_rate: u32) -> Self {
        Self {
            attack: time_to_coeff(params.attack_ms, sample_rate),
            release: time_to_coeff(params.release_ms, sample_rate),
            thresh_db: convert_ratio_to_db(convert_db_to_ratio(params.threshold_db)),
            makeup: convert_db_to_ratio(params.makeup_db),
        }
    }
}

/// One-pole smoothing coefficient for a time constant in milliseconds
///
/// `coeff = exp(-1 / time_in_samples)`: the envelope covers ~63% of a level
/// change within `time_ms`.
pub fn time_to_coeff(time_ms: f64, sample_rate: u32) -> f64 {
    let samples = time_ms / 1000.0 * sample_rate as f64;
    (-1.0 / samples).exp()
}

/// Compressor dynamics processor
///
/// Per sample: rectify, follow the level with the attack or release
/// coefficient, then reduce everything above the threshold by `1 - 1/ratio`.
#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    sample_rate: u32,
    coeffs: Coefficients,
    /// Envelope level per channel (linear)
    envelope: Vec<f64>,
}

impl Compressor {
    /// Create a compressor at the default sample rate
    pub fn new(params: CompressorParams) -> Result<Self> {
        Self::with_sample_rate(params, DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(params: CompressorParams, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EarfxError::invalid("sample_rate", sample_rate, "a positive rate in Hz"));
        }
        params.validate()?;
        debug!(
            "Created compressor: {} dB, {}:1, attack {} ms, release {} ms",
            params.threshold_db, params.ratio, params.attack_ms, params.release_ms
        );
        Ok(Self {
            params,
            sample_rate,
            coeffs: Coefficients::compute(&params, sample_rate),
            envelope: Vec::new(),
        })
    }

    /// Get the current parameters
    pub fn compressor_params(&self) -> &CompressorParams {
        &self.params
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn attack_coeff(&self) -> f64 {
        self.coeffs.attack
    }

    pub fn release_coeff(&self) -> f64 {
        self.coeffs.release
    }

    /// Envelope level of each channel seen so far, in dB
    pub fn envelope_db(&self) -> Vec<f64> {
        self.envelope.iter().map(|&env| convert_ratio_to_db(env)).collect()
    }

    /// Gain in dB the gain computer applies at a given envelope level
    pub fn gain_reduction_db(&self, env_db: f64) -> f64 {
        if env_db > self.coeffs.thresh_db {
            -(env_db - self.coeffs.thresh_db) * (1.0 - 1.0 / self.params.ratio)
        } else {
            0.0
        }
    }

    fn process_channel(&self, samples: &mut [f64], env: &mut f64) {
        let Coefficients {
            attack,
            release,
            makeup,
            ..
        } = self.coeffs;

        for sample in samples.iter_mut() {
            let rectified = sample.abs();
            let coeff = if rectified > *env { attack } else { release };
            *env = coeff * *env + (1.0 - coeff) * rectified;

            let gain_db = self.gain_reduction_db(convert_ratio_to_db(*env));
            *sample *= convert_db_to_ratio(gain_db) * makeup;
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        let params = CompressorParams::default();
        Self {
            params,
            sample_rate: DEFAULT_SAMPLE_RATE,
            coeffs: Coefficients::compute(&params, DEFAULT_SAMPLE_RATE),
            envelope: Vec::new(),
        }
    }
}

impl Effect for Compressor {
    fn name(&self) -> &'static str {
        "Compressor"
    }

    fn params(&self) -> EffectParams {
        EffectParams::new()
            .with("threshold_db", self.params.threshold_db)
            .with("ratio", self.params.ratio)
            .with("attack_ms", self.params.attack_ms)
            .with("release_ms", self.params.release_ms)
            .with("makeup_db", self.params.makeup_db)
    }

    fn load_params(&mut self, params: &EffectParams) -> Result<()> {
        let next = CompressorParams {
            threshold_db: params.float("threshold_db")?,
            ratio: params.float("ratio")?,
            attack_ms: params.float("attack_ms")?,
            release_ms: params.float("release_ms")?,
            makeup_db: params.float("makeup_db")?,
        };
        next.validate()?;
        self.coeffs = Coefficients::compute(&next, self.sample_rate);
        self.params = next;
        Ok(())
    }

    fn apply(&mut self, mut signal: Signal) -> Signal {
        let num_channels = signal.num_channels();
        if self.envelope.len() < num_channels {
            trace!("Compressor envelope grows to {} channels", num_channels);
            self.envelope.resize(num_channels, 0.0);
        }

        let mut envelope = std::mem::take(&mut self.envelope);
        for (channel, env) in signal.channels_mut().zip(envelope.iter_mut()) {
            self.process_channel(channel, env);
        }
        self.envelope = envelope;
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChannelLayout;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    const SR: u32 = 44100;

    fn create_sine(freq: f64, amplitude: f64, num_samples: usize) -> Vec<f64> {
        (0..num_samples)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / SR as f64).sin())
            .collect()
    }

    #[test]
    fn test_compressor_default_params() {
        let comp = Compressor::default();
        let params = comp.compressor_params();
        assert_eq!(params.threshold_db, -24.0);
        assert_eq!(params.ratio, 4.0);
        assert_eq!(params.attack_ms, 10.0);
        assert_eq!(params.release_ms, 100.0);
        assert_eq!(params.makeup_db, 0.0);
    }

    #[test]
    fn test_parameter_validation() {
        let mut params = CompressorParams::default();
        assert!(params.validate().is_ok());

        params.ratio = 0.5;
        assert!(params.validate().is_err());

        params = CompressorParams::default();
        params.attack_ms = 0.0;
        assert!(params.validate().is_err());

        params = CompressorParams::default();
        params.release_ms = -10.0;
        assert!(params.validate().is_err());

        params = CompressorParams::default();
        params.threshold_db = f64::NAN;
        assert!(Compressor::new(params).is_err());

        assert!(Compressor::with_sample_rate(CompressorParams::default(), 0).is_err());
    }

    #[test]
    fn test_time_coefficients() {
        let comp = Compressor::default();
        assert_relative_eq!(comp.attack_coeff(), (-1.0 / 441.0_f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(comp.release_coeff(), (-1.0 / 4410.0_f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_gain_computer_hard_knee() {
        let comp = Compressor::default();
        assert_eq!(comp.gain_reduction_db(-30.0), 0.0);
        assert_eq!(comp.gain_reduction_db(-24.0), 0.0);
        // 12 dB over a 4:1 threshold comes out 3 dB over: 9 dB of reduction
        assert_relative_eq!(comp.gain_reduction_db(-12.0), -9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_process_below_threshold() {
        let mut comp = Compressor::default();
        let input = create_sine(440.0, 0.01, 4410);
        let out = comp.apply(Signal::mono(input.clone()));
        assert_eq!(out.channel(0), input.as_slice());
    }

    #[test]
    fn test_unity_ratio_is_identity() {
        let params = CompressorParams {
            ratio: 1.0,
            ..Default::default()
        };
        let mut comp = Compressor::new(params).unwrap();
        let input = create_sine(440.0, 0.9, 4410);
        let out = comp.apply(Signal::mono(input.clone()));
        assert_eq!(out.channel(0), input.as_slice());
    }

    #[test]
    fn test_process_above_threshold_converges() {
        let mut comp = Compressor::default();
        let out = comp.apply(Signal::mono(vec![1.0; SR as usize]));
        // 0 dB in, -24 dB threshold, 4:1 -> 18 dB of reduction
        let last = *out.channel(0).last().unwrap();
        assert_relative_eq!(last, convert_db_to_ratio(-18.0), epsilon = 1e-3);
        assert_relative_eq!(comp.envelope_db()[0], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_envelope_follows_attack_then_release() {
        let mut comp = Compressor::default();
        let attack = comp.attack_coeff();
        let release = comp.release_coeff();

        // Rising input is tracked at the attack rate
        comp.apply(Signal::mono(vec![1.0; 100]));
        let env = convert_db_to_ratio(comp.envelope_db()[0]);
        assert_relative_eq!(env, 1.0 - attack.powi(100), max_relative = 1e-9);

        // Falling input decays at the release rate
        comp.apply(Signal::silence(200, ChannelLayout::Mono));
        let decayed = convert_db_to_ratio(comp.envelope_db()[0]);
        assert_relative_eq!(decayed, env * release.powi(200), max_relative = 1e-9);
    }

    #[test]
    fn test_release_recovers_gain() {
        let mut comp = Compressor::default();
        comp.apply(Signal::mono(vec![1.0; SR as usize]));
        let after_attack = comp.envelope_db()[0];

        comp.apply(Signal::silence(SR as usize, ChannelLayout::Mono));
        let after_release = comp.envelope_db()[0];
        assert!(after_release < after_attack - 40.0);

        let out = comp.apply(Signal::mono(vec![0.01; 16]));
        assert_relative_eq!(out.channel(0)[0], 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_makeup_gain() {
        let params = CompressorParams {
            makeup_db: 6.0,
            ..Default::default()
        };
        let mut comp = Compressor::new(params).unwrap();
        let out = comp.apply(Signal::mono(vec![0.01; 8]));
        assert_relative_eq!(out.channel(0)[7], 0.01 * convert_db_to_ratio(6.0), epsilon = 1e-12);
    }

    #[test]
    fn test_block_continuity() {
        let input = create_sine(100.0, 0.8, 8192);

        let mut whole = Compressor::default();
        let expected = whole.apply(Signal::mono(input.clone()));

        let mut blocked = Compressor::default();
        let mut streamed = Vec::new();
        for block in input.chunks(1024) {
            let out = blocked.apply(Signal::mono(block.to_vec()));
            streamed.extend_from_slice(out.channel(0));
        }

        for (a, b) in streamed.iter().zip(expected.channel(0)) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let mut comp = Compressor::default();
        let loud = create_sine(200.0, 1.0, 8820);
        let quiet = create_sine(200.0, 0.01, 8820);
        let out = comp.apply(Signal::stereo(loud.clone(), quiet.clone()).unwrap());

        assert_eq!(out.channel(1), quiet.as_slice());
        let peak = out.channel(0)[4410..].iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak < 0.5, "loud channel should be compressed, peak {}", peak);
    }

    #[test]
    fn test_silence_stays_finite() {
        let mut comp = Compressor::default();
        let out = comp.apply(Signal::silence(1024, ChannelLayout::Stereo));
        assert!(out.is_finite());
        assert!(out.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_set_params_is_atomic() {
        let mut comp = Compressor::default();
        comp.set_params(&[("ratio", 8.0.into()), ("attack_ms", 5.0.into())])
            .unwrap();
        assert_eq!(comp.compressor_params().ratio, 8.0);
        assert_relative_eq!(comp.attack_coeff(), time_to_coeff(5.0, SR), epsilon = 1e-15);

        let before = *comp.compressor_params();
        assert!(comp
            .set_params(&[("threshold_db", (-10.0).into()), ("ratio", 0.5.into())])
            .is_err());
        assert_eq!(*comp.compressor_params(), before);
        assert!(comp.set_params(&[("knee_db", 6.0.into())]).is_err());
    }

    #[test]
    fn test_serialization() {
        let params = CompressorParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: CompressorParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);

        let comp = Compressor::default();
        let value = comp.to_json().unwrap();
        assert_eq!(value["ratio"], 4.0);
    }
}
