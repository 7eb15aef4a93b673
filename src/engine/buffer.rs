//! Signal Buffers
//!
//! The block type every effect consumes and produces. A signal is either one
//! channel (mono) or exactly two equal-length channels (stereo, left then
//! right). The shape is checked when raw channel data is turned into a
//! [`Signal`], so effects never see a malformed buffer.

use crate::error::{EarfxError, Result};
use crate::units::convert_ratio_to_db;
use std::f64::consts::FRAC_1_SQRT_2;

// ============================================================================
// Level Helpers
// ============================================================================

/// RMS level of all samples of a signal in dB (floored, never -inf)
pub fn calculate_rms_db(signal: &Signal) -> f64 {
    let total = signal.num_channels() * signal.num_samples();
    if total == 0 {
        return convert_ratio_to_db(0.0);
    }
    let sum_squares: f64 = signal
        .channels()
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|s| s * s)
        .sum();
    convert_ratio_to_db((sum_squares / total as f64).sqrt())
}

/// Peak level of all samples of a signal in dB (floored, never -inf)
pub fn calculate_peak_db(signal: &Signal) -> f64 {
    let peak = signal
        .channels()
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|s| s.abs())
        .fold(0.0_f64, f64::max);
    convert_ratio_to_db(peak)
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel
    #[default]
    Mono,
    /// Two channels (left, right)
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }

    /// Like [`ChannelLayout::from_count`], but reports a shape error
    pub fn try_from_count(count: usize) -> Result<Self> {
        Self::from_count(count).ok_or_else(|| EarfxError::InvalidShape {
            reason: format!(
                "expected 1 (mono) or 2 (stereo) channels, got {}",
                count
            ),
        })
    }
}

// ============================================================================
// Signal
// ============================================================================

/// A block of mono or stereo audio
///
/// Samples are stored non-interleaved: one `Vec<f64>` per channel.
///
/// # Example
/// ```
/// use earfx::engine::{ChannelLayout, Signal};
///
/// let stereo = Signal::stereo(vec![0.1, 0.2], vec![0.3, 0.4]).unwrap();
/// assert_eq!(stereo.layout(), ChannelLayout::Stereo);
/// assert_eq!(stereo.num_samples(), 2);
///
/// assert!(Signal::from_channels(vec![vec![0.0]; 3]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    channels: Vec<Vec<f64>>,
}

impl Signal {
    /// Wrap a single channel
    pub fn mono(samples: Vec<f64>) -> Self {
        Self {
            channels: vec![samples],
        }
    }

    /// Wrap a left/right pair; both channels must have the same length
    pub fn stereo(left: Vec<f64>, right: Vec<f64>) -> Result<Self> {
        Self::from_channels(vec![left, right])
    }

    /// Build a signal from raw channel rows
    ///
    /// # Errors
    /// `InvalidShape` unless there are exactly one or two rows of equal length.
    pub fn from_channels(channels: Vec<Vec<f64>>) -> Result<Self> {
        ChannelLayout::try_from_count(channels.len())?;
        if let [left, right] = channels.as_slice() {
            if left.len() != right.len() {
                return Err(EarfxError::InvalidShape {
                    reason: format!(
                        "stereo channels differ in length ({} vs {})",
                        left.len(),
                        right.len()
                    ),
                });
            }
        }
        Ok(Self { channels })
    }

    /// A silent signal
    pub fn silence(num_samples: usize, layout: ChannelLayout) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; layout.num_channels()],
        }
    }

    /// Duplicate a mono signal into an equal-power centered stereo pair
    ///
    /// Each channel is scaled by 1/√2 so that the mid component of the result
    /// has the level of the input.
    pub fn mono_to_center(mono: &[f64]) -> Self {
        let scaled: Vec<f64> = mono.iter().map(|s| s * FRAC_1_SQRT_2).collect();
        Self {
            channels: vec![scaled.clone(), scaled],
        }
    }

    /// Build a signal from frame-major (interleaved) data, as delivered by
    /// most audio devices: L, R, L, R, ...
    pub fn from_interleaved(interleaved: &[f64], layout: ChannelLayout) -> Result<Self> {
        let num_channels = layout.num_channels();
        if interleaved.len() % num_channels != 0 {
            return Err(EarfxError::InvalidShape {
                reason: format!(
                    "interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(num_samples); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }
        Ok(Self { channels })
    }

    /// Convert to frame-major (interleaved) order
    pub fn to_interleaved(&self) -> Vec<f64> {
        let mut interleaved = Vec::with_capacity(self.num_channels() * self.num_samples());
        for i in 0..self.num_samples() {
            for channel in &self.channels {
                interleaved.push(channel[i]);
            }
        }
        interleaved
    }

    /// Channel configuration
    pub fn layout(&self) -> ChannelLayout {
        if self.channels.len() == 2 {
            ChannelLayout::Stereo
        } else {
            ChannelLayout::Mono
        }
    }

    /// Number of channels (1 or 2)
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.channels[0].len()
    }

    /// Whether the signal holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    /// Whether this is a stereo signal
    #[inline]
    pub fn is_stereo(&self) -> bool {
        self.layout() == ChannelLayout::Stereo
    }

    /// All channel rows
    #[inline]
    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    /// Samples of one channel
    ///
    /// # Panics
    /// Panics if `index` is not a channel of this signal.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f64] {
        &self.channels[index]
    }

    /// Mutable samples of one channel. Lengths cannot change through a slice,
    /// so the shape invariant holds.
    ///
    /// # Panics
    /// Panics if `index` is not a channel of this signal.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.channels[index]
    }

    /// Mutable access to every channel in order
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f64]> {
        self.channels.iter_mut().map(|ch| ch.as_mut_slice())
    }

    /// Left and right channels, if this is a stereo signal
    pub fn as_stereo(&self) -> Option<(&[f64], &[f64])> {
        match self.channels.as_slice() {
            [left, right] => Some((left, right)),
            _ => None,
        }
    }

    /// Mutable left and right channels, if this is a stereo signal
    pub fn as_stereo_mut(&mut self) -> Option<(&mut [f64], &mut [f64])> {
        match self.channels.as_mut_slice() {
            [left, right] => Some((left, right)),
            _ => None,
        }
    }

    /// Duplicate a mono signal into two identical channels without scaling.
    /// Stereo signals are returned as they are.
    pub fn into_stereo(mut self) -> Signal {
        if self.channels.len() == 1 {
            let left = self.channels[0].clone();
            self.channels.insert(0, left);
        }
        self
    }

    /// Consume the signal and return its channel rows
    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }

    /// Extract `size` consecutive samples starting at `start`, wrapping around
    /// the end of the signal (looped playback).
    ///
    /// # Errors
    /// `SignalTooShort` if the signal has fewer than `size` samples.
    pub fn chunk(&self, start: usize, size: usize) -> Result<Signal> {
        let len = self.num_samples();
        if len < size || len == 0 {
            return Err(EarfxError::SignalTooShort {
                requested: size,
                available: len,
            });
        }

        let start = start % len;
        let channels = self
            .channels
            .iter()
            .map(|ch| {
                ch.iter()
                    .cycle()
                    .skip(start)
                    .take(size)
                    .copied()
                    .collect()
            })
            .collect();
        Ok(Signal { channels })
    }

    /// Check that all samples are finite (no NaN or infinity)
    pub fn is_finite(&self) -> bool {
        self.channels
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::silence(0, ChannelLayout::Mono)
    }
}

// ============================================================================
// Tests
// ============================================================================
