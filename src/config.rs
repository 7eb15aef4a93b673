//! Engine defaults
//!
//! Sample rate and block size assumed by the filter and compressor time
//! constants. Hosts can override them with an [`EngineConfig`] parsed from JSON.

use crate::error::{EarfxError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default block size for audio streams, in samples per channel
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Frequency one Hz below Nyquist for the given sample rate
#[inline]
pub fn just_below_nyquist(sample_rate: u32) -> f64 {
    (sample_rate / 2) as f64 - 1.0
}

// ============================================================================
// Engine Config
// ============================================================================

/// Stream settings shared by the effects of one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples per channel handed to the chain per call
    pub block_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON; missing fields fall back to the defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EarfxError::Config {
                reason: "sample_rate must be positive".to_string(),
            });
        }
        if self.block_size == 0 {
            return Err(EarfxError::Config {
                reason: "block_size must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Highest cutoff a low-pass filter at this rate accepts by default
    pub fn just_below_nyquist(&self) -> f64 {
        just_below_nyquist(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.block_size, 1024);
        assert_eq!(config.just_below_nyquist(), 22049.0);
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json_str(r#"{"sample_rate": 48000}"#).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_from_json_rejects_zero() {
        let err = EngineConfig::from_json_str(r#"{"block_size": 0}"#).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(EngineConfig::from_json_str("{not json").is_err());
        let err = EngineConfig::from_json_str(r#"{"sample_rate": "fast"}"#).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG");
    }
}
