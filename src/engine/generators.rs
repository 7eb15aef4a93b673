//! Block generators
//!
//! Test material produced one block at a time, with phase carried between
//! blocks.

use super::Signal;
use crate::config::{DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scale a block by `vol` when it lies in `[0, 1)`; other values leave it at
/// full scale
fn apply_volume(block: &mut [f64], vol: f64) {
    if (0.0..1.0).contains(&vol) {
        block.iter_mut().for_each(|s| *s *= vol);
    }
}

/// Band-unlimited sawtooth oscillator
#[derive(Debug, Clone)]
pub struct SawOscillator {
    sample_rate: u32,
    block_size: usize,
    /// Sample offset of the next block, wrapped once per second
    phase: f64,
}

impl Default for SawOscillator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_BLOCK_SIZE)
    }
}

impl SawOscillator {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            phase: 0.0,
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Generate the next block of a sawtooth in `[-1, 1)`
    ///
    /// # Arguments
    /// * `freq` - Frequency in Hz
    /// * `vol` - Level in `[0, 1)`; anything else plays at full scale
    pub fn generate(&mut self, freq: f64, vol: f64) -> Signal {
        let sr = self.sample_rate as f64;
        let mut block: Vec<f64> = (0..self.block_size)
            .map(|n| {
                let t = (n as f64 + self.phase) / sr;
                2.0 * (t * freq - (0.5 + t * freq).floor())
            })
            .collect();
        self.phase = (self.phase + self.block_size as f64) % sr;
        apply_volume(&mut block, vol);
        Signal::mono(block)
    }
}

/// Uniform white noise generator
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    block_size: usize,
    rng: StdRng,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl NoiseGenerator {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            rng: StdRng::from_entropy(),
        }
    }

    /// Generator with a fixed seed, for reproducible material
    pub fn with_seed(block_size: usize, seed: u64) -> Self {
        Self {
            block_size,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate the next block of noise in `[-1, 1)`
    ///
    /// Uniform rather than Gaussian, so that full volume never exceeds
    /// full scale.
    pub fn generate(&mut self, vol: f64) -> Signal {
        let mut block: Vec<f64> = (0..self.block_size)
            .map(|_| self.rng.gen::<f64>() * 2.0 - 1.0)
            .collect();
        apply_volume(&mut block, vol);
        Signal::mono(block)
    }
}
