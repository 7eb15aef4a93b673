//! Looping Sample Player
//!
//! Drives an effect chain the way an audio device callback would: each call
//! hands out the next block of a looped signal, optionally run through the
//! chain. Playback state is a two-state machine, stopped (default) or playing.

use super::{ChannelLayout, Signal};
use crate::config::DEFAULT_BLOCK_SIZE;
use crate::dsp::EffectChain;
use crate::error::{EarfxError, Result};
use log::debug;

/// Looped playback of one signal through an effect chain
#[derive(Debug, Clone)]
pub struct SamplePlayer {
    signal: Signal,
    chain: EffectChain,
    /// Start of the next block, in samples
    playhead: usize,
    block_size: usize,
    playing: bool,
    fx_on: bool,
}

impl SamplePlayer {
    /// Create a stopped player with effects off
    ///
    /// # Errors
    /// `Config` for a zero block size, `SignalTooShort` if the signal holds
    /// fewer samples than one block.
    pub fn new(signal: Signal, chain: EffectChain, block_size: usize) -> Result<Self> {
        Self::check_fits(&signal, block_size)?;
        debug!(
            "Created player: {} samples, {} effects, block size {}",
            signal.num_samples(),
            chain.len(),
            block_size
        );
        Ok(Self {
            signal,
            chain,
            playhead: 0,
            block_size,
            playing: false,
            fx_on: false,
        })
    }

    /// Player with the default block size
    pub fn with_default_block(signal: Signal, chain: EffectChain) -> Result<Self> {
        Self::new(signal, chain, DEFAULT_BLOCK_SIZE)
    }

    fn check_fits(signal: &Signal, block_size: usize) -> Result<()> {
        if block_size == 0 {
            return Err(EarfxError::Config {
                reason: "block_size must be positive".to_string(),
            });
        }
        if signal.num_samples() < block_size {
            return Err(EarfxError::SignalTooShort {
                requested: block_size,
                available: signal.num_samples(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start (or continue) looped playback from the playhead
    pub fn play(&mut self) {
        if !self.playing {
            debug!("Playback started at sample {}", self.playhead);
        }
        self.playing = true;
    }

    /// Stop playback; the playhead stays where it is
    pub fn stop(&mut self) {
        if self.playing {
            debug!("Playback stopped at sample {}", self.playhead);
        }
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Move the playhead, wrapping around the end of the signal
    pub fn seek(&mut self, sample: usize) {
        self.playhead = sample % self.signal.num_samples();
    }

    pub fn playhead(&self) -> usize {
        self.playhead
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    // ========================================================================
    // Effects
    // ========================================================================

    pub fn set_fx_enabled(&mut self, enabled: bool) {
        self.fx_on = enabled;
    }

    /// Flip the effects toggle and return the new state
    pub fn toggle_fx(&mut self) -> bool {
        self.fx_on = !self.fx_on;
        self.fx_on
    }

    pub fn fx_enabled(&self) -> bool {
        self.fx_on
    }

    pub fn chain(&self) -> &EffectChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut EffectChain {
        &mut self.chain
    }

    /// Swap in a new chain, e.g. for the next round of an exercise
    pub fn set_chain(&mut self, chain: EffectChain) {
        self.chain = chain;
    }

    // ========================================================================
    // Material
    // ========================================================================

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Replace the looped signal and rewind
    pub fn set_signal(&mut self, signal: Signal) -> Result<()> {
        Self::check_fits(&signal, self.block_size)?;
        self.signal = signal;
        self.playhead = 0;
        Ok(())
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Produce the next block
    ///
    /// Silence in the signal's layout while stopped. Otherwise the next looped
    /// chunk, run through the chain when effects are on.
    pub fn next_block(&mut self) -> Result<Signal> {
        if !self.playing {
            return Ok(Signal::silence(self.block_size, self.signal.layout()));
        }

        let chunk = self.signal.chunk(self.playhead, self.block_size)?;
        self.playhead = (self.playhead + self.block_size) % self.signal.num_samples();

        if self.fx_on {
            Ok(self.chain.apply(chunk))
        } else {
            Ok(chunk)
        }
    }

    /// Write the next block into a frame-major device buffer
    ///
    /// # Errors
    /// `InvalidShape` if `out` does not hold exactly one block in the output
    /// layout.
    pub fn fill_interleaved(&mut self, out: &mut [f64]) -> Result<ChannelLayout> {
        let block = self.next_block()?;
        let frames = block.to_interleaved();
        if frames.len() != out.len() {
            return Err(EarfxError::InvalidShape {
                reason: format!(
                    "output buffer holds {} values, block needs {}",
                    out.len(),
                    frames.len()
                ),
            });
        }
        out.copy_from_slice(&frames);
        Ok(block.layout())
    }
}
