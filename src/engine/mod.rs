//! Audio Engine Module
//!
//! Everything around the effects:
//! - Signal buffers and the channel-shape convention
//! - Block generators
//! - Looping playback through an effect chain

pub mod buffer;
pub mod generators;
pub mod player;

pub use buffer::{calculate_peak_db, calculate_rms_db, ChannelLayout, Signal};
pub use generators::{NoiseGenerator, SawOscillator};
pub use player::SamplePlayer;
