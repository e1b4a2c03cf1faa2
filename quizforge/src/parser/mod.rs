//! Tolerant decoder that coordinates sanitizers and decode strategies.

mod candidate;
pub mod lenient;
pub mod sanitize;
pub mod strategies;

pub use candidate::{locate_candidates, Candidate, CandidateSource};
use strategies::{
    DecodeStrategy, ExtractedJsonStrategy, HardCutStrategy, LenientJsonStrategy,
    StrictJsonStrategy,
};

use crate::{config::PipelineConfig, error::StrategyError, value::ParsedDocument};

/// Decoder that tries each strategy in priority order and stops at the
/// first success.
///
/// # Examples
///
/// ```
/// use quizforge::parser::TolerantDecoder;
///
/// let decoder = TolerantDecoder::default();
/// let doc = decoder.decode(r#"{"name": "Alice",}"#).unwrap();
/// assert_eq!(doc.strategy(), "lenient_json");
/// ```
#[derive(Debug)]
pub struct TolerantDecoder {
    /// Strategies in priority order.
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl Default for TolerantDecoder {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl TolerantDecoder {
    /// Creates a decoder with the strategies enabled by `config`.
    ///
    /// Strategies (in priority order):
    /// 1. `strict_json` - the whole text is valid JSON
    /// 2. `lenient_json` - the whole text parses with the lenient grammar
    /// 3. `extracted_json` - a fenced block or brace span inside prose
    /// 4. `hard_cut` - truncate and close what is open
    pub fn new(config: &PipelineConfig) -> Self {
        let depth = config.max_nesting_depth;
        let mut strategies: Vec<Box<dyn DecodeStrategy>> = vec![
            Box::new(StrictJsonStrategy),
            Box::new(ExtractedJsonStrategy::new(config.enable_lenient, depth)),
        ];
        if config.enable_lenient {
            strategies.push(Box::new(LenientJsonStrategy::new(depth)));
        }
        if config.enable_hard_cut {
            strategies.push(Box::new(HardCutStrategy::new(depth)));
        }
        Self::with_strategies(strategies)
    }

    /// Creates a decoder with custom strategies, sorted by priority.
    pub fn with_strategies(mut strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        strategies.sort_by_key(|s| s.priority());
        Self { strategies }
    }

    /// Decodes `input`, returning one diagnostic per failed strategy when
    /// nothing succeeds.
    pub fn decode(&self, input: &str) -> Result<ParsedDocument, Vec<StrategyError>> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.decode(input) {
                Ok(doc) => {
                    log::debug!(
                        "decoded response with {} after {} failed attempt(s)",
                        strategy.name(),
                        attempts.len()
                    );
                    return Ok(doc);
                }
                Err(e) => {
                    log::debug!("{e}");
                    attempts.push(e);
                }
            }
        }
        Err(attempts)
    }

    /// Returns the number of strategies registered.
    #[inline]
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Returns the names of all registered strategies in priority order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_default_order() {
        let decoder = TolerantDecoder::default();
        assert_eq!(
            decoder.strategy_names(),
            vec!["strict_json", "lenient_json", "extracted_json", "hard_cut"]
        );
    }

    #[test]
    fn test_config_disables_strategies() {
        let config = PipelineConfig {
            enable_lenient: false,
            enable_hard_cut: false,
            ..PipelineConfig::default()
        };
        let decoder = TolerantDecoder::new(&config);
        assert_eq!(decoder.strategy_names(), vec!["strict_json", "extracted_json"]);
        assert!(decoder.decode(r#"{"a": 1,}"#).is_err());
    }

    #[test]
    fn test_strict_first() {
        let doc = TolerantDecoder::default().decode(r#"{"a": 1}"#).unwrap();
        assert_eq!(doc.strategy(), "strict_json");
    }

    #[test]
    fn test_lenient_equals_strict() {
        let decoder = TolerantDecoder::default();
        let lenient = decoder.decode(r#"{"a": 1,}"#).unwrap();
        let strict = decoder.decode(r#"{"a": 1}"#).unwrap();
        assert_eq!(lenient.strategy(), "lenient_json");
        assert_eq!(lenient.value, strict.value);
    }

    #[test]
    fn test_hard_cut_last() {
        let doc = TolerantDecoder::default()
            .decode(r#"{"a": 1, "b": "unterminated"#)
            .unwrap();
        assert_eq!(doc.strategy(), "hard_cut");
        assert_eq!(doc.value["a"], json!(1));
    }

    #[test]
    fn test_all_attempts_reported() {
        let attempts = TolerantDecoder::default()
            .decode("I cannot answer that.")
            .unwrap_err();
        let names: Vec<_> = attempts.iter().map(|a| a.strategy).collect();
        assert_eq!(
            names,
            vec!["strict_json", "lenient_json", "extracted_json", "hard_cut"]
        );
    }

    #[test]
    fn test_custom_strategies() {
        let decoder = TolerantDecoder::with_strategies(vec![Box::new(StrictJsonStrategy)]);
        assert_eq!(decoder.strategy_count(), 1);
        assert_eq!(decoder.strategy_names()[0], "strict_json");
    }
}
