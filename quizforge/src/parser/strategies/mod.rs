//! Decode strategies, tried in priority order until one yields a document.

mod extracted;
mod hard_cut;
mod lenient_json;
mod strict_json;

pub use extracted::ExtractedJsonStrategy;
pub use hard_cut::HardCutStrategy;
pub use lenient_json::LenientJsonStrategy;
pub use strict_json::StrictJsonStrategy;

use serde_json::Value;

use crate::{error::StrategyError, value::ParsedDocument};

/// A way of turning response text into a JSON document.
///
/// Each strategy handles a different kind of damage. Strategies are cheap
/// to construct and hold no per-request state.
pub trait DecodeStrategy: Send + Sync + std::fmt::Debug {
    /// Returns the name of this strategy for diagnostics.
    fn name(&self) -> &'static str;

    /// Attempts to decode `input`.
    ///
    /// A document whose root is a scalar is reported as an error.
    fn decode(&self, input: &str) -> Result<ParsedDocument, StrategyError>;

    /// Lower values are tried first.
    fn priority(&self) -> u8;
}

/// Rejects scalar roots.
pub(crate) fn require_container(value: Value) -> Result<Value, String> {
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        other => Err(format!(
            "root is {} rather than an object or array",
            kind_of(&other)
        )),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_priorities_are_ordered() {
        let strategies: Vec<Box<dyn DecodeStrategy>> = vec![
            Box::new(HardCutStrategy::default()),
            Box::new(StrictJsonStrategy),
            Box::new(ExtractedJsonStrategy::default()),
            Box::new(LenientJsonStrategy::default()),
        ];
        let mut sorted = strategies;
        sorted.sort_by_key(|s| s.priority());
        let names: Vec<_> = sorted.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["strict_json", "lenient_json", "extracted_json", "hard_cut"]
        );
    }

    #[test]
    fn test_require_container() {
        assert!(require_container(json!({})).is_ok());
        assert!(require_container(json!([])).is_ok());
        let err = require_container(json!("text")).unwrap_err();
        assert!(err.contains("a string"));
    }
}
