//! Lenient JSON strategy.

use super::DecodeStrategy;
use crate::{
    config::DEFAULT_MAX_NESTING_DEPTH,
    error::StrategyError,
    parser::lenient::parse_lenient,
    value::{ParsedDocument, Source},
};

/// Parses the whole input with the lenient grammar.
///
/// Handles unquoted keys, single quotes, trailing commas, comments and
/// Python literals; see [`parse_lenient`].
#[derive(Debug, Clone, Copy)]
pub struct LenientJsonStrategy {
    max_depth: usize,
}

impl LenientJsonStrategy {
    /// Creates a strategy with the given nesting limit.
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for LenientJsonStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NESTING_DEPTH)
    }
}

impl DecodeStrategy for LenientJsonStrategy {
    #[inline]
    fn name(&self) -> &'static str {
        "lenient_json"
    }

    fn decode(&self, input: &str) -> Result<ParsedDocument, StrategyError> {
        parse_lenient(input, self.max_depth)
            .map(|value| ParsedDocument::new(value, Source::Lenient))
            .map_err(|e| StrategyError::new(self.name(), e.to_string()))
    }

    #[inline]
    fn priority(&self) -> u8 {
        2
    }
}
