//! Last-resort recovery for truncated or structurally broken output.

use super::DecodeStrategy;
use crate::{
    config::DEFAULT_MAX_NESTING_DEPTH,
    error::{truncate_snippet, StrategyError},
    parser::{
        lenient::parse_lenient,
        sanitize::{close_open_string, last_separator, run_steps, Quotes, DEEP_STEPS},
    },
    value::{ParsedDocument, Repair, Source},
};

/// Truncates the text to its last complete object and closes what is open.
///
/// Starting at the first `{`, everything after the last `}` is dropped.
/// Open strings and containers are then closed, and omitted values, missing
/// commas and trailing commas are repaired before a lenient parse. If that
/// still fails, the text is cut back to its last separator and the repair
/// runs once more.
///
/// Recovered documents report how many non-whitespace bytes were discarded
/// so callers can tell a clean recovery from one that lost data.
///
/// # Examples
///
/// ```
/// use quizforge::parser::strategies::{DecodeStrategy, HardCutStrategy};
///
/// let doc = HardCutStrategy::default()
///     .decode(r#"{"a": 1, "b": "unterminated"#)
///     .unwrap();
/// assert_eq!(doc.value["a"], 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HardCutStrategy {
    max_depth: usize,
}

impl HardCutStrategy {
    /// Creates a strategy with the given nesting limit.
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    fn repair_and_parse(&self, text: &str) -> Result<(serde_json::Value, Vec<Repair>), String> {
        let closed = close_open_string(text, Quotes::Any);
        let mut repairs = Vec::new();
        if closed != text {
            repairs.push(Repair::StringsClosed);
        }
        let (repaired, mut deep) = run_steps(&closed, DEEP_STEPS);
        repairs.append(&mut deep);
        parse_lenient(&repaired, self.max_depth)
            .map(|value| (value, repairs))
            .map_err(|e| e.to_string())
    }

    fn finish(
        &self,
        value: serde_json::Value,
        mut repairs: Vec<Repair>,
        dropped_bytes: usize,
        retried: bool,
    ) -> ParsedDocument {
        if dropped_bytes > 0 {
            repairs.insert(0, Repair::TrailingContentDropped);
            log::warn!(
                "hard cut discarded {} bytes of trailing content; recovered document may be incomplete: {}",
                dropped_bytes,
                truncate_snippet(&value.to_string(), 80)
            );
        } else {
            log::warn!(
                "hard cut recovered document by closing open structures ({} repairs)",
                repairs.len()
            );
        }

        ParsedDocument::with_repairs(
            value,
            Source::HardCut {
                dropped_bytes,
                retried,
            },
            repairs,
        )
    }
}

impl Default for HardCutStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NESTING_DEPTH)
    }
}

impl DecodeStrategy for HardCutStrategy {
    #[inline]
    fn name(&self) -> &'static str {
        "hard_cut"
    }

    fn decode(&self, input: &str) -> Result<ParsedDocument, StrategyError> {
        let Some(start) = input.find('{') else {
            return Err(StrategyError::new(self.name(), "no opening brace found"));
        };
        let candidate = &input[start..];

        let (cut, mut dropped_bytes) = match candidate.rfind('}') {
            Some(end) => {
                let (kept, rest) = candidate.split_at(end + 1);
                (kept, significant_bytes(rest))
            }
            None => (candidate, 0),
        };

        let first_error = match self.repair_and_parse(cut) {
            Ok((value, repairs)) => {
                return Ok(self.finish(value, repairs, dropped_bytes, false));
            }
            Err(e) => e,
        };

        // Closing the string first keeps separators inside it from counting.
        let closed = close_open_string(cut, Quotes::Any);
        let Some(separator) = last_separator(&closed) else {
            return Err(StrategyError::new(self.name(), first_error));
        };
        let (shorter, rest) = closed.split_at(separator);
        dropped_bytes += significant_bytes(rest);

        match self.repair_and_parse(shorter) {
            Ok((value, repairs)) => Ok(self.finish(value, repairs, dropped_bytes, true)),
            Err(e) => Err(StrategyError::new(
                self.name(),
                format!("{first_error}; after cutting at last separator: {e}"),
            )),
        }
    }

    #[inline]
    fn priority(&self) -> u8 {
        4
    }
}

/// Counts bytes of non-whitespace characters.
fn significant_bytes(text: &str) -> usize {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(char::len_utf8)
        .sum()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unterminated_string_recovered() {
        let doc = HardCutStrategy::default()
            .decode(r#"{"a": 1, "b": "unterminated"#)
            .unwrap();
        assert_eq!(doc.value, json!({"a": 1, "b": "unterminated"}));
        assert_eq!(
            doc.source,
            Source::HardCut {
                dropped_bytes: 0,
                retried: false
            }
        );
        assert!(doc.repairs.contains(&Repair::StringsClosed));
        assert!(doc.repairs.contains(&Repair::ContainersBalanced));
        assert!(!doc.lost_data());
    }

    #[test]
    fn test_trailing_garbage_dropped() {
        let doc = HardCutStrategy::default()
            .decode(r#"{"a": {"b": 1}, "c": tru"#)
            .unwrap();
        assert_eq!(doc.value, json!({"a": {"b": 1}}));
        assert!(doc.lost_data());
        assert_eq!(doc.repairs[0], Repair::TrailingContentDropped);
    }

    #[test]
    fn test_retry_at_last_separator() {
        // A dangling key cannot be completed, so the cut falls back to the comma.
        let doc = HardCutStrategy::default()
            .decode(r#"{"a": 1, "b": [1, 2], "c""#)
            .unwrap();
        assert_eq!(doc.value, json!({"a": 1, "b": [1, 2]}));
        assert!(matches!(
            doc.source,
            Source::HardCut { retried: true, .. }
        ));
    }

    #[test]
    fn test_omitted_value_and_missing_comma() {
        let doc = HardCutStrategy::default()
            .decode("{\"a\": 1, \"b\": , \"c\": [1 2")
            .unwrap();
        assert_eq!(doc.value, json!({"a": 1, "c": [1, 2]}));
    }

    #[test]
    fn test_no_brace() {
        let err = HardCutStrategy::default()
            .decode("I cannot answer that.")
            .unwrap_err();
        assert_eq!(err.strategy, "hard_cut");
    }

    #[test]
    fn test_significant_bytes() {
        assert_eq!(significant_bytes("  \n"), 0);
        assert_eq!(significant_bytes(", \"c\": é"), 7);
    }
}
