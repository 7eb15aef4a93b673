//! DSP Effects Library
//!
//! Block-based effects with persistent state. All effects implement the
//! `Effect` trait and are collected into an [`EffectChain`] through the
//! [`AudioEffect`] enum.

mod chain;
mod compressor;
mod effect;
mod eq;
pub mod filter;
mod gain;
pub mod stereo;

pub use chain::{AudioEffect, EffectChain};
pub use compressor::{time_to_coeff, Compressor, CompressorParams};
pub use effect::{Effect, EffectParams, ParamValue, PassThrough};
pub use eq::{peaking_section, ParametricEq};
pub use filter::{HighPassFilter, LowPassFilter, PassBand, Section, SosCascade};
pub use gain::Amplifier;
pub use stereo::StereoControl;
