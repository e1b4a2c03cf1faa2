//! Strict JSON strategy.

use super::{require_container, DecodeStrategy};
use crate::{
    error::StrategyError,
    value::{ParsedDocument, Source},
};

/// Parses the whole input as standard JSON.
///
/// This is the fast path and is always tried first.
///
/// # Examples
///
/// ```
/// use quizforge::parser::strategies::{DecodeStrategy, StrictJsonStrategy};
///
/// let doc = StrictJsonStrategy.decode(r#"{"name": "Alice"}"#).unwrap();
/// assert_eq!(doc.value["name"], "Alice");
/// assert!(StrictJsonStrategy.decode(r#"{"name": "Alice",}"#).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictJsonStrategy;

impl DecodeStrategy for StrictJsonStrategy {
    #[inline]
    fn name(&self) -> &'static str {
        "strict_json"
    }

    fn decode(&self, input: &str) -> Result<ParsedDocument, StrategyError> {
        let value = serde_json::from_str(input.trim())
            .map_err(|e| StrategyError::new(self.name(), e.to_string()))?;
        let value = require_container(value).map_err(|e| StrategyError::new(self.name(), e))?;
        Ok(ParsedDocument::new(value, Source::Strict))
    }

    #[inline]
    fn priority(&self) -> u8 {
        1
    }
}
