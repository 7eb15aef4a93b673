//! Effect Chain management
//!
//! Effects are processed in chain order (index 0 first). Every chain owns its
//! effects, so two chains never share filter or envelope state.

use super::{
    Amplifier, Compressor, Effect, EffectParams, HighPassFilter, LowPassFilter, ParametricEq,
    PassThrough, StereoControl,
};
use crate::engine::Signal;
use crate::error::Result;
use log::debug;
use std::fmt;

// ============================================================================
// Audio Effect
// ============================================================================

/// Any effect the chain can hold
#[derive(Debug, Clone)]
pub enum AudioEffect {
    PassThrough(PassThrough),
    LowPass(LowPassFilter),
    HighPass(HighPassFilter),
    Eq(ParametricEq),
    Stereo(StereoControl),
    Amplifier(Amplifier),
    Compressor(Compressor),
}

/// Forward a call to the wrapped effect
macro_rules! dispatch {
    ($self:expr, $effect:ident => $body:expr) => {
        match $self {
            AudioEffect::PassThrough($effect) => $body,
            AudioEffect::LowPass($effect) => $body,
            AudioEffect::HighPass($effect) => $body,
            AudioEffect::Eq($effect) => $body,
            AudioEffect::Stereo($effect) => $body,
            AudioEffect::Amplifier($effect) => $body,
            AudioEffect::Compressor($effect) => $body,
        }
    };
}

macro_rules! impl_from_effect {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AudioEffect {
                fn from(effect: $ty) -> Self {
                    AudioEffect::$variant(effect)
                }
            }
        )*
    };
}

impl_from_effect! {
    PassThrough => PassThrough,
    LowPass => LowPassFilter,
    HighPass => HighPassFilter,
    Eq => ParametricEq,
    Stereo => StereoControl,
    Amplifier => Amplifier,
    Compressor => Compressor,
}

impl AudioEffect {
    /// Wrap this effect in a chain of its own
    pub fn into_chain(self) -> EffectChain {
        EffectChain::with_effects(vec![self])
    }
}

impl Effect for AudioEffect {
    fn name(&self) -> &'static str {
        dispatch!(self, e => e.name())
    }

    fn params(&self) -> EffectParams {
        dispatch!(self, e => e.params())
    }

    fn load_params(&mut self, params: &EffectParams) -> Result<()> {
        dispatch!(self, e => e.load_params(params))
    }

    fn apply(&mut self, signal: Signal) -> Signal {
        dispatch!(self, e => e.apply(signal))
    }
}

// ============================================================================
// Effect Chain
// ============================================================================

/// Ordered chain of effects
#[derive(Debug, Clone, Default)]
pub struct EffectChain {
    effects: Vec<AudioEffect>,
}

impl EffectChain {
    /// Create a new empty effect chain
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Create a chain from an ordered list of effects
    pub fn with_effects(effects: Vec<AudioEffect>) -> Self {
        debug!("Assembled effect chain with {} effects", effects.len());
        Self { effects }
    }

    /// Append an effect to the end of the chain
    pub fn add(&mut self, effect: impl Into<AudioEffect>) {
        let effect = effect.into();
        debug!("Adding '{}' at position {}", effect.name(), self.effects.len());
        self.effects.push(effect);
    }

    /// Run a block through every effect in order
    pub fn apply(&mut self, signal: Signal) -> Signal {
        self.effects
            .iter_mut()
            .fold(signal, |signal, effect| effect.apply(signal))
    }

    /// Get the number of effects in the chain
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Iterate over effects in processing order
    pub fn iter(&self) -> impl Iterator<Item = &AudioEffect> {
        self.effects.iter()
    }

    /// Get an effect by position
    pub fn get(&self, index: usize) -> Option<&AudioEffect> {
        self.effects.get(index)
    }

    /// Get a mutable effect by position, e.g. to change its parameters
    pub fn get_mut(&mut self, index: usize) -> Option<&mut AudioEffect> {
        self.effects.get_mut(index)
    }

    /// Multi-line description of the chain
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl From<AudioEffect> for EffectChain {
    fn from(effect: AudioEffect) -> Self {
        effect.into_chain()
    }
}

impl FromIterator<AudioEffect> for EffectChain {
    fn from_iter<I: IntoIterator<Item = AudioEffect>>(iter: I) -> Self {
        Self::with_effects(iter.into_iter().collect())
    }
}

impl fmt::Display for EffectChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AUDIO EFFECTS CHAIN")?;
        for effect in &self.effects {
            write!(
                f,
                "\n- {} ({})",
                effect.name(),
                effect.params().to_inline_string()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::CompressorParams;
    use crate::engine::ChannelLayout;
    use approx::assert_relative_eq;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.05).sin() * 0.5).collect()
    }

    #[test]
    fn test_chain_creation() {
        let chain = EffectChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
        assert!(chain.get(0).is_none());
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let mut chain = EffectChain::default();
        let signal = Signal::stereo(ramp(64), ramp(64)).unwrap();
        assert_eq!(chain.apply(signal.clone()), signal);
    }

    #[test]
    fn test_add_appends() {
        let mut chain = EffectChain::new();
        chain.add(Amplifier::default());
        chain.add(StereoControl::default());
        assert_eq!(chain.len(), 2);
        let names: Vec<_> = chain.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Amplifier", "Stereo Control"]);
    }

    #[test]
    fn test_order_matters() {
        // Clip then attenuate vs. attenuate then clip
        let clip_first = EffectChain::with_effects(vec![
            Amplifier::new(0.0, true).unwrap().into(),
            Amplifier::new(-6.0, false).unwrap().into(),
        ]);
        let clip_last: EffectChain = vec![
            AudioEffect::from(Amplifier::new(-6.0, false).unwrap()),
            AudioEffect::from(Amplifier::new(0.0, true).unwrap()),
        ]
        .into_iter()
        .collect();

        let input = Signal::mono(vec![1.8]);
        let a = clip_first.clone().apply(input.clone());
        let b = clip_last.clone().apply(input);
        assert_relative_eq!(a.channel(0)[0], 0.501187, epsilon = 1e-6);
        assert_relative_eq!(b.channel(0)[0], 0.902137, epsilon = 1e-6);
    }

    #[test]
    fn test_mono_becomes_stereo_through_panner() {
        let mut chain = AudioEffect::from(StereoControl::panned(-1.0).unwrap()).into_chain();
        chain.add(Amplifier::new(-6.0, true).unwrap());
        let out = chain.apply(Signal::mono(ramp(32)));
        assert_eq!(out.layout(), ChannelLayout::Stereo);
        assert!(out.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_get_mut_changes_params() {
        let mut chain = EffectChain::from(AudioEffect::from(Amplifier::default()));
        chain
            .get_mut(0)
            .unwrap()
            .set_params(&[("gain_db", (-20.0).into())])
            .unwrap();
        let out = chain.apply(Signal::mono(vec![1.0]));
        assert_relative_eq!(out.channel(0)[0], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_enum_forwards_state() {
        let mut effect = AudioEffect::from(Compressor::new(CompressorParams::default()).unwrap());
        effect.apply(Signal::mono(vec![1.0; 4410]));
        match &effect {
            AudioEffect::Compressor(comp) => assert!(comp.envelope_db()[0] > -1.0),
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn test_chain_display() {
        let mut chain = EffectChain::new();
        chain.add(PassThrough::new());
        chain.add(Amplifier::new(-6.0, true).unwrap());
        chain.add(StereoControl::new(0.5, 1.0).unwrap());
        assert_eq!(
            chain.to_string(),
            "AUDIO EFFECTS CHAIN\n\
             - Generic Audio Effect ()\n\
             - Amplifier (gain_db: -6, clip: true)\n\
             - Stereo Control (pos: 0.5, width: 1)"
        );
        assert_eq!(EffectChain::new().describe(), "AUDIO EFFECTS CHAIN");
    }

    #[test]
    fn test_effect_describe_through_enum() {
        let effect = AudioEffect::from(Amplifier::default());
        assert_eq!(effect.describe(), "AMPLIFIER\n- gain_db: 0\n- clip:    true");
    }
}
