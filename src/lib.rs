//! earfx - Block-based Audio Effects
//!
//! Stateful audio effects that process streaming audio in fixed-size blocks.
//! Filter memory and envelope levels persist between calls, so a signal fed
//! block by block comes out the same as the signal processed in one piece.
//!
//! # Architecture
//!
//! - `engine`: signal buffers, generators and a looping block player
//! - `dsp`: the `Effect` trait, the effects and the `EffectChain`
//! - `units`: level, pitch and time conversions
//! - `config`: sample rate and block size defaults
//! - `cli`: the command-line front end of the `earfx-cli` binary
//!
//! # Example
//!
//! ```
//! use earfx::dsp::{AudioEffect, LowPassFilter, StereoControl};
//! use earfx::engine::Signal;
//!
//! let mut chain = AudioEffect::from(LowPassFilter::new(2000.0, 4).unwrap()).into_chain();
//! chain.add(StereoControl::panned(-0.5).unwrap());
//!
//! let block = Signal::mono(vec![0.0; 1024]);
//! let out = chain.apply(block);
//! assert!(out.is_stereo());
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod units;

pub use error::{EarfxError, Result};
