//! Effect trait definition
//!
//! Every effect exposes the same contract: a parameter snapshot, an atomic
//! parameter setter, a block-processing `apply` and a text description.
//! Parameters live in an explicit, ordered schema fixed at construction.

use crate::engine::Signal;
use crate::error::{EarfxError, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

// ============================================================================
// Parameter Values
// ============================================================================

/// A single effect parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    /// Human-readable kind, used in type errors
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Float(_) => "float",
            ParamValue::Int(_) => "int",
            ParamValue::Bool(_) => "bool",
        }
    }

    /// Numeric view; integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ParamValue::Float(v) => Some(v),
            ParamValue::Int(v) => Some(v as f64),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ParamValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ParamValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Convert `self` to the kind of `template`, if the conversion is lossless
    fn coerce_like(self, template: ParamValue) -> Option<ParamValue> {
        match (template, self) {
            (ParamValue::Float(_), v) => v.as_f64().map(ParamValue::Float),
            (ParamValue::Int(_), ParamValue::Int(v)) => Some(ParamValue::Int(v)),
            (ParamValue::Int(_), ParamValue::Float(v))
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 =>
            {
                Some(ParamValue::Int(v as i64))
            }
            (ParamValue::Bool(_), ParamValue::Bool(v)) => Some(ParamValue::Bool(v)),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {
            ParamValue::Float(v) => serializer.serialize_f64(v),
            ParamValue::Int(v) => serializer.serialize_i64(v),
            ParamValue::Bool(v) => serializer.serialize_bool(v),
        }
    }
}

// ============================================================================
// Parameter Map
// ============================================================================

/// Ordered name → value view over an effect's parameter schema
///
/// The set of names is fixed when the effect is built; only values change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectParams {
    entries: Vec<(&'static str, ParamValue)>,
}

impl EffectParams {
    /// Empty schema (pass-through effects)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion used by effects when describing their schema
    pub fn with(mut self, name: &'static str, value: impl Into<ParamValue>) -> Self {
        self.entries.push((name, value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is part of the schema
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| *key == name)
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    /// Parameter names in schema order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ParamValue)> + '_ {
        self.entries.iter().copied()
    }

    /// Read a numeric parameter
    pub fn float(&self, name: &str) -> Result<f64> {
        self.lookup(name)?
            .as_f64()
            .ok_or_else(|| self.type_error(name, "float"))
    }

    /// Read an integer parameter
    pub fn int(&self, name: &str) -> Result<i64> {
        self.lookup(name)?
            .as_i64()
            .ok_or_else(|| self.type_error(name, "int"))
    }

    /// Read a boolean parameter
    pub fn bool(&self, name: &str) -> Result<bool> {
        self.lookup(name)?
            .as_bool()
            .ok_or_else(|| self.type_error(name, "bool"))
    }

    /// Apply a partial update, validating every key and value kind first
    ///
    /// On error `self` is left unchanged.
    pub fn merge(&mut self, updates: &[(&str, ParamValue)]) -> Result<()> {
        let mut next = self.entries.clone();
        for &(name, value) in updates {
            let slot = next
                .iter_mut()
                .find(|(key, _)| *key == name)
                .ok_or_else(|| self.unknown(name))?;
            slot.1 = value
                .coerce_like(slot.1)
                .ok_or_else(|| EarfxError::ParameterType {
                    param: name.to_string(),
                    expected: slot.1.kind(),
                    actual: value.kind(),
                })?;
        }
        self.entries = next;
        Ok(())
    }

    /// Render as `key: value, key: value`
    pub fn to_inline_string(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn lookup(&self, name: &str) -> Result<ParamValue> {
        self.get(name).ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, name: &str) -> EarfxError {
        let allowed = self
            .names()
            .map(|key| format!("\"{}\"", key))
            .collect::<Vec<_>>()
            .join(", ");
        EarfxError::UnknownParameter {
            param: name.to_string(),
            allowed,
        }
    }

    fn type_error(&self, name: &str, expected: &'static str) -> EarfxError {
        EarfxError::ParameterType {
            param: name.to_string(),
            expected,
            actual: self.get(name).map(|v| v.kind()).unwrap_or("missing"),
        }
    }
}

impl Serialize for EffectParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Effect Trait
// ============================================================================

/// Base trait for all effects
///
/// Only [`Effect::apply`] mutates processing state (filter memory, envelope
/// levels). Reading or writing parameters never touches it.
pub trait Effect: Send {
    /// Display name of the effect type
    fn name(&self) -> &'static str;

    /// Snapshot of the current parameters
    fn params(&self) -> EffectParams;

    /// Rebuild the effect from a complete parameter set
    ///
    /// Implementations must compute all derived values before committing any,
    /// so that an error leaves the effect unchanged.
    fn load_params(&mut self, params: &EffectParams) -> Result<()>;

    /// Update the listed parameters
    ///
    /// # Errors
    /// `UnknownParameter` if a key is not in the schema, `ParameterType` for a
    /// value of the wrong kind, or whatever the effect's own validation
    /// reports. Nothing changes unless every update is accepted.
    fn set_params(&mut self, updates: &[(&str, ParamValue)]) -> Result<()> {
        let mut next = self.params();
        next.merge(updates)?;
        self.load_params(&next)
    }

    /// Process one block. The default forwards the signal unchanged.
    fn apply(&mut self, signal: Signal) -> Signal {
        signal
    }

    /// Upper-cased name followed by one `- key: value` line per parameter
    fn describe(&self) -> String {
        let params = self.params();
        let mut text = self.name().to_uppercase();
        let width = params.names().map(|key| key.len()).max().unwrap_or(0) + 1;
        for (key, value) in params.iter() {
            let label = format!("{}:", key);
            text.push_str(&format!("\n- {:<width$} {}", label, value, width = width));
        }
        text
    }

    /// Parameters as a JSON object
    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.params())?)
    }
}

// ============================================================================
// Pass-through
// ============================================================================

/// Effect without parameters that forwards audio unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl PassThrough {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for PassThrough {
    fn name(&self) -> &'static str {
        "Generic Audio Effect"
    }

    fn params(&self) -> EffectParams {
        EffectParams::new()
    }

    fn load_params(&mut self, _params: &EffectParams) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Minimal effect with one float and one bool parameter
    struct Probe {
        level: f64,
        armed: bool,
    }

    impl Effect for Probe {
        fn name(&self) -> &'static str {
            "Probe"
        }

        fn params(&self) -> EffectParams {
            EffectParams::new()
                .with("level", self.level)
                .with("armed", self.armed)
        }

        fn load_params(&mut self, params: &EffectParams) -> Result<()> {
            let level = params.float("level")?;
            if level < 0.0 {
                return Err(EarfxError::invalid("level", level, "a non-negative number"));
            }
            self.level = level;
            self.armed = params.bool("armed")?;
            Ok(())
        }
    }

    fn probe() -> Probe {
        Probe {
            level: 1.0,
            armed: false,
        }
    }

    #[test]
    fn test_params_snapshot() {
        let params = probe().params();
        assert_eq!(params.len(), 2);
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["level", "armed"]);
        assert_eq!(params.get("level"), Some(ParamValue::Float(1.0)));
        assert_eq!(params.get("armed"), Some(ParamValue::Bool(false)));
    }

    #[test]
    fn test_set_params() {
        let mut effect = probe();
        effect
            .set_params(&[("level", 0.5.into()), ("armed", true.into())])
            .unwrap();
        assert_eq!(effect.level, 0.5);
        assert!(effect.armed);
    }

    #[test]
    fn test_set_params_int_widens_to_float() {
        let mut effect = probe();
        effect.set_params(&[("level", ParamValue::Int(3))]).unwrap();
        assert_eq!(effect.level, 3.0);
    }

    #[test]
    fn test_set_params_unknown_key_is_atomic() {
        let mut effect = probe();
        let err = effect
            .set_params(&[("level", 0.25.into()), ("lvl", 0.5.into())])
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");
        assert!(err.to_string().contains("\"level\", \"armed\""));
        assert_eq!(effect.level, 1.0);
    }

    #[test]
    fn test_set_params_wrong_kind() {
        let mut effect = probe();
        let err = effect.set_params(&[("armed", 1.0.into())]).unwrap_err();
        assert_eq!(
            err,
            EarfxError::ParameterType {
                param: "armed".to_string(),
                expected: "bool",
                actual: "float",
            }
        );
        assert!(!effect.armed);
    }

    #[test]
    fn test_set_params_validation_failure_is_atomic() {
        let mut effect = probe();
        let result = effect.set_params(&[("armed", true.into()), ("level", (-1.0).into())]);
        assert!(result.is_err());
        assert_eq!(effect.level, 1.0);
        assert!(!effect.armed);
    }

    #[test]
    fn test_default_apply_is_identity() {
        let mut effect = probe();
        let signal = Signal::mono(vec![0.0, 0.5, -0.5]);
        assert_eq!(effect.apply(signal.clone()), signal);
    }

    #[test]
    fn test_describe() {
        let text = probe().describe();
        assert_eq!(text, "PROBE\n- level: 1\n- armed: false");
    }

    #[test]
    fn test_to_json() {
        assert_eq!(
            probe().to_json().unwrap(),
            json!({"level": 1.0, "armed": false})
        );
    }

    #[test]
    fn test_pass_through() {
        let mut effect = PassThrough::new();
        assert!(effect.params().is_empty());
        assert_eq!(effect.describe(), "GENERIC AUDIO EFFECT");

        let signal = Signal::stereo(vec![0.1; 8], vec![0.2; 8]).unwrap();
        assert_eq!(effect.apply(signal.clone()), signal);

        let err = effect.set_params(&[("test", 1.0.into())]).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");
    }
}
