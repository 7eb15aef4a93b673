//! CLI Module
//!
//! Command-line interface for rendering generated material through an effect
//! chain assembled from flags.

pub mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// earfx - block-based audio effects
#[derive(Parser, Debug)]
#[command(name = "earfx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render generated material through an effect chain and report levels
    #[command(name = "render")]
    Render {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        chain: ChainArgs,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print the chain built from the given flags
    #[command(name = "describe")]
    Describe {
        #[command(flatten)]
        chain: ChainArgs,

        #[command(flatten)]
        engine: EngineArgs,

        /// Print the parameters as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Convert between levels and ratios
    #[command(name = "level")]
    Level {
        /// Value to convert
        #[arg(allow_hyphen_values = true)]
        value: f64,

        /// Treat the value as a linear ratio instead of decibels
        #[arg(long)]
        ratio: bool,
    },

    /// Shift a frequency by a number of semitones
    #[command(name = "transpose")]
    Transpose {
        /// Frequency in Hz
        freq: f64,

        /// Semitones, fractional values allowed
        #[arg(allow_hyphen_values = true)]
        semitones: f64,
    },
}

/// Generated material to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Saw,
    Noise,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Kind of generated material
    #[arg(long, value_enum, default_value = "saw")]
    pub source: SourceKind,

    /// Oscillator frequency in Hz
    #[arg(long, default_value_t = 220.0)]
    pub freq: f64,

    /// Source level in [0, 1)
    #[arg(long, default_value_t = 0.8)]
    pub vol: f64,

    /// Length of the rendered material in seconds
    #[arg(long, default_value_t = 1.0)]
    pub seconds: f64,

    /// Seed for the noise source
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Effects, added in the order listed here
#[derive(Args, Debug, Clone, Default)]
pub struct ChainArgs {
    /// High-pass cutoff in Hz
    #[arg(long)]
    pub highpass: Option<f64>,

    /// Low-pass cutoff in Hz
    #[arg(long)]
    pub lowpass: Option<f64>,

    /// Butterworth order of both pass filters
    #[arg(long, default_value_t = 5)]
    pub order: u32,

    /// Peaking EQ band as FREQ:Q:GAIN_DB, may be repeated
    #[arg(long, value_name = "FREQ:Q:GAIN")]
    pub eq: Vec<String>,

    /// Compress with the given threshold in dB
    #[arg(long, allow_hyphen_values = true)]
    pub threshold: Option<f64>,

    /// Compression ratio
    #[arg(long, default_value_t = 4.0)]
    pub ratio: f64,

    /// Stereo position in [-1, 1]
    #[arg(long, allow_hyphen_values = true)]
    pub pan: Option<f64>,

    /// Stereo width in [0, 1]
    #[arg(long)]
    pub width: Option<f64>,

    /// Output gain in dB
    #[arg(long, allow_hyphen_values = true)]
    pub gain: Option<f64>,

    /// Disable hard clipping on the output gain
    #[arg(long)]
    pub no_clip: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// JSON file with `sample_rate` and `block_size`
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sample rate in Hz, overrides the config file
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Block size in samples, overrides the config file
    #[arg(long)]
    pub block_size: Option<usize>,
}
