//! Strategy that pulls a JSON object out of surrounding prose.

use super::{require_container, DecodeStrategy};
use crate::{
    config::DEFAULT_MAX_NESTING_DEPTH,
    error::StrategyError,
    parser::{
        candidate::locate_candidates,
        lenient::parse_lenient,
        sanitize::{run_steps, STRING_STEPS},
    },
    value::{ParsedDocument, Source},
};

/// Decodes the first usable candidate located by
/// [`locate_candidates`](crate::parser::locate_candidates).
///
/// Each candidate is tried strictly, then strictly again after its own
/// strings are closed and escaped, then (when enabled) with the lenient
/// grammar, before moving on to the next one.
///
/// # Examples
///
/// ```
/// use quizforge::parser::strategies::{DecodeStrategy, ExtractedJsonStrategy};
///
/// let text = "Sure! Here is the quiz:\n```json\n{\"question\": \"Why?\"}\n```\nEnjoy.";
/// let doc = ExtractedJsonStrategy::default().decode(text).unwrap();
/// assert_eq!(doc.value["question"], "Why?");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExtractedJsonStrategy {
    lenient: bool,
    max_depth: usize,
}

impl ExtractedJsonStrategy {
    /// Creates a strategy; `lenient` enables the lenient fallback per candidate.
    pub const fn new(lenient: bool, max_depth: usize) -> Self {
        Self { lenient, max_depth }
    }
}

impl Default for ExtractedJsonStrategy {
    fn default() -> Self {
        Self::new(true, DEFAULT_MAX_NESTING_DEPTH)
    }
}

impl DecodeStrategy for ExtractedJsonStrategy {
    #[inline]
    fn name(&self) -> &'static str {
        "extracted_json"
    }

    fn decode(&self, input: &str) -> Result<ParsedDocument, StrategyError> {
        let candidates = locate_candidates(input);
        if candidates.is_empty() {
            return Err(StrategyError::new(self.name(), "no JSON candidates found"));
        }

        let mut last_error = String::new();
        for candidate in candidates {
            let strict = serde_json::from_str(candidate.content.trim())
                .map_err(|e| e.to_string())
                .and_then(require_container);
            match strict {
                Ok(value) => {
                    return Ok(ParsedDocument::new(
                        value,
                        Source::Extracted {
                            candidate: candidate.source,
                            lenient: false,
                        },
                    ));
                }
                Err(e) => last_error = e,
            }

            let (repaired, repairs) = run_steps(&candidate.content, STRING_STEPS);
            if !repairs.is_empty() {
                if let Ok(value) = serde_json::from_str(repaired.trim())
                    .map_err(|e: serde_json::Error| e.to_string())
                    .and_then(require_container)
                {
                    return Ok(ParsedDocument::with_repairs(
                        value,
                        Source::Extracted {
                            candidate: candidate.source,
                            lenient: false,
                        },
                        repairs,
                    ));
                }
            }

            if !self.lenient {
                continue;
            }
            match parse_lenient(&candidate.content, self.max_depth) {
                Ok(value) => {
                    return Ok(ParsedDocument::new(
                        value,
                        Source::Extracted {
                            candidate: candidate.source,
                            lenient: true,
                        },
                    ));
                }
                Err(e) => last_error = e.to_string(),
            }
        }

        Err(StrategyError::new(
            self.name(),
            format!("no candidate could be decoded (last error: {last_error})"),
        ))
    }

    #[inline]
    fn priority(&self) -> u8 {
        3
    }
}
