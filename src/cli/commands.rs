//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;

use anyhow::{bail, Context, Result};
use log::info;

use super::{ChainArgs, EngineArgs, SourceArgs, SourceKind};
use crate::config::EngineConfig;
use crate::dsp::{
    Amplifier, Compressor, CompressorParams, Effect, EffectChain, HighPassFilter,
    LowPassFilter, ParametricEq, StereoControl,
};
use crate::engine::{
    calculate_peak_db, calculate_rms_db, NoiseGenerator, SamplePlayer, SawOscillator, Signal,
};
use crate::units::{add_semi_tones, convert_db_to_ratio, convert_ratio_to_db, seconds_to_samples};

/// Resolve engine settings: defaults, then the config file, then flags.
pub fn load_engine_config(args: &EngineArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            EngineConfig::from_json_str(&json)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(sample_rate) = args.sample_rate {
        config.sample_rate = sample_rate;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    config.validate()?;
    Ok(config)
}

/// Parse a `FREQ:Q:GAIN` EQ band.
pub fn parse_eq_band(band: &str) -> Result<(f64, f64, f64)> {
    let fields = band
        .split(':')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid number '{}' in EQ band '{}'", field, band))
        })
        .collect::<Result<Vec<_>>>()?;

    match fields.as_slice() {
        &[freq, q, gain] => Ok((freq, q, gain)),
        _ => bail!("EQ band '{}' must look like FREQ:Q:GAIN", band),
    }
}

/// Build the chain described by the flags, in a fixed order:
/// high-pass, low-pass, EQ bands, compressor, stereo control, amplifier.
pub fn build_chain(args: &ChainArgs, sample_rate: u32) -> Result<EffectChain> {
    let mut chain = EffectChain::new();

    if let Some(cutoff) = args.highpass {
        chain.add(HighPassFilter::with_sample_rate(cutoff, args.order, sample_rate)?);
    }
    if let Some(cutoff) = args.lowpass {
        chain.add(LowPassFilter::with_sample_rate(cutoff, args.order, sample_rate)?);
    }
    for band in &args.eq {
        let (freq, q, gain) = parse_eq_band(band)?;
        chain.add(ParametricEq::with_sample_rate(freq, q, gain, sample_rate)?);
    }
    if let Some(threshold_db) = args.threshold {
        let params = CompressorParams {
            threshold_db,
            ratio: args.ratio,
            ..Default::default()
        };
        chain.add(Compressor::with_sample_rate(params, sample_rate)?);
    }
    if args.pan.is_some() || args.width.is_some() {
        chain.add(StereoControl::new(
            args.pan.unwrap_or(0.0),
            args.width.unwrap_or(1.0),
        )?);
    }
    if let Some(gain_db) = args.gain {
        chain.add(Amplifier::new(gain_db, !args.no_clip)?);
    }

    Ok(chain)
}

/// Generate `num_blocks` blocks of source material.
fn generate_source(args: &SourceArgs, config: &EngineConfig, num_blocks: usize) -> Signal {
    let mut samples = Vec::with_capacity(num_blocks * config.block_size);
    match args.source {
        SourceKind::Saw => {
            let mut osc = SawOscillator::new(config.sample_rate, config.block_size);
            for _ in 0..num_blocks {
                samples.extend_from_slice(osc.generate(args.freq, args.vol).channel(0));
            }
        }
        SourceKind::Noise => {
            let mut noise = match args.seed {
                Some(seed) => NoiseGenerator::with_seed(config.block_size, seed),
                None => NoiseGenerator::new(config.block_size),
            };
            for _ in 0..num_blocks {
                samples.extend_from_slice(noise.generate(args.vol).channel(0));
            }
        }
    }
    Signal::mono(samples)
}

/// Join consecutive blocks of the same layout into one signal.
fn join_blocks(blocks: Vec<Signal>) -> Result<Signal> {
    let mut channels: Vec<Vec<f64>> = Vec::new();
    for block in blocks {
        let rows = block.into_channels();
        if channels.is_empty() {
            channels = rows;
        } else {
            for (acc, row) in channels.iter_mut().zip(rows) {
                acc.extend(row);
            }
        }
    }
    if channels.is_empty() {
        return Ok(Signal::default());
    }
    Ok(Signal::from_channels(channels)?)
}

/// Render generated material through the chain, block by block.
pub fn render(source: &SourceArgs, chain_args: &ChainArgs, engine: &EngineArgs) -> Result<()> {
    let config = load_engine_config(engine)?;
    let chain = build_chain(chain_args, config.sample_rate)?;

    let num_samples = seconds_to_samples(source.seconds, config.sample_rate);
    let num_blocks = num_samples.div_ceil(config.block_size).max(1);
    info!(
        "Rendering {} blocks of {} samples at {} Hz",
        num_blocks, config.block_size, config.sample_rate
    );

    let input = generate_source(source, &config, num_blocks);
    let input_rms = calculate_rms_db(&input);
    let input_peak = calculate_peak_db(&input);

    let mut player = SamplePlayer::new(input, chain, config.block_size)?;
    player.play();
    player.set_fx_enabled(true);
    let blocks = (0..num_blocks)
        .map(|_| player.next_block())
        .collect::<crate::Result<Vec<_>>>()?;
    let output = join_blocks(blocks)?;

    println!("{}", player.chain());
    println!();
    println!(
        "Input:  {} channel(s), RMS {:.2} dB, peak {:.2} dB",
        player.signal().num_channels(),
        input_rms,
        input_peak
    );
    println!(
        "Output: {} channel(s), RMS {:.2} dB, peak {:.2} dB",
        output.num_channels(),
        calculate_rms_db(&output),
        calculate_peak_db(&output)
    );
    if !output.is_finite() {
        bail!("Output contains non-finite samples");
    }

    Ok(())
}

/// Print the chain built from the flags.
pub fn describe(chain_args: &ChainArgs, engine: &EngineArgs, json: bool) -> Result<()> {
    let config = load_engine_config(engine)?;
    let chain = build_chain(chain_args, config.sample_rate)?;

    if json {
        let effects = chain
            .iter()
            .map(|effect| {
                Ok(serde_json::json!({
                    "name": effect.name(),
                    "params": effect.to_json()?,
                }))
            })
            .collect::<Result<Vec<_>>>()?;
        println!("{}", serde_json::to_string_pretty(&effects)?);
    } else {
        println!("{}", chain);
        for effect in chain.iter() {
            println!();
            println!("{}", effect.describe());
        }
    }

    Ok(())
}

/// Convert a level in dB to a ratio, or back.
pub fn level(value: f64, is_ratio: bool) -> Result<()> {
    if is_ratio {
        println!("{} -> {:.4} dB", value, convert_ratio_to_db(value));
    } else {
        println!("{} dB -> {:.6}", value, convert_db_to_ratio(value));
    }
    Ok(())
}

/// Shift a frequency by semitones.
pub fn transpose(freq: f64, semitones: f64) -> Result<()> {
    println!("{} Hz {:+} st -> {:.4} Hz", freq, semitones, add_semi_tones(freq, semitones));
    Ok(())
}
