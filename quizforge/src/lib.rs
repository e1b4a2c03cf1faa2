//! # quizforge
//!
//! Multi-provider generation and validation of programming quiz content.
//!
//! LLM providers return JSON that is often wrapped in markdown, padded with
//! prose, or cut off mid-string. This crate recovers the document and
//! coerces it into one of four strict schemas:
//! - [`Question`](schema::Question) with three answer levels
//! - [`Quiz`](schema::Quiz)
//! - [`Validation`](schema::Validation) scores and feedback
//! - [`UserQuiz`](schema::UserQuiz) follow-ups
//!
//! ## Quick Start
//!
//! ```rust
//! use quizforge::{extract_and_coerce, schema::{RequestContext, TargetKind, TypedResult}};
//!
//! let response = "Sure! ```json\n{\"topic\": \"ARC\", \"question\": \"Why weak?\",}\n```";
//! let ctx = RequestContext::new("Memory", "Apple").with_technology("ObjC");
//!
//! let result = extract_and_coerce(response, TargetKind::Quiz, &ctx).unwrap();
//! let TypedResult::Quiz(quiz) = result else { unreachable!() };
//! assert_eq!(quiz.topic.name, "ARC");
//! assert_eq!(quiz.topic.platform, "Apple");
//! ```
//!
//! ## Pipeline
//!
//! 1. **Sanitizers** strip an outer fence, close a dangling string and
//!    escape raw control characters.
//! 2. The **tolerant decoder** tries `strict_json`, `lenient_json`,
//!    `extracted_json` and `hard_cut` in order.
//! 3. The **coercer** applies whitelisted autofixes and validates strictly.
//!
//! Provider adapters ([`provider`]) and the dispatch table ([`registry`])
//! sit on top and share this pipeline.

pub mod config;
pub mod constraints;
pub mod error;
pub mod extract;
pub mod parser;
pub mod provider;
pub mod registry;
pub mod schema;
pub mod value;

use config::PipelineConfig;
use error::Result;
use extract::ResponseExtractor;
use schema::{RequestContext, TargetKind, TypedResult};
use value::{Autofix, Repair};

/// Extracts the JSON document from `raw` and coerces it into `kind`.
///
/// # Errors
///
/// Returns `PipelineError::ResponseParse` if no document can be recovered
/// and `PipelineError::SchemaValidation` if it does not fit the schema.
///
/// # Examples
///
/// ```
/// use quizforge::{extract_and_coerce, schema::{RequestContext, TargetKind}};
///
/// let err = extract_and_coerce("I cannot answer that.", TargetKind::Question, &RequestContext::default())
///     .unwrap_err();
/// assert_eq!(err.error_type(), "response_parse_error");
/// ```
pub fn extract_and_coerce(
    raw: &str,
    kind: TargetKind,
    context: &RequestContext,
) -> Result<TypedResult> {
    Ok(extract_and_coerce_with_report(raw, kind, context)?.result)
}

/// What the pipeline did to produce a result.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub result: TypedResult,
    /// Name of the decode strategy that succeeded.
    pub strategy: &'static str,
    pub repairs: Vec<Repair>,
    pub autofixes: Vec<Autofix>,
    /// True when the hard cut discarded trailing content.
    pub lost_data: bool,
}

/// Like [`extract_and_coerce`], also reporting strategy, repairs and
/// autofixes.
///
/// # Errors
///
/// See [`extract_and_coerce`].
pub fn extract_and_coerce_with_report(
    raw: &str,
    kind: TargetKind,
    context: &RequestContext,
) -> Result<PipelineReport> {
    extract_and_coerce_with_config(raw, kind, context, &PipelineConfig::default())
}

/// Runs the pipeline with an explicit configuration.
///
/// # Errors
///
/// See [`extract_and_coerce`].
pub fn extract_and_coerce_with_config(
    raw: &str,
    kind: TargetKind,
    context: &RequestContext,
    config: &PipelineConfig,
) -> Result<PipelineReport> {
    let doc = ResponseExtractor::new(config).extract(raw, kind)?;
    let coerced = schema::coerce(&doc.value, kind, context)?;
    Ok(PipelineReport {
        result: coerced.result,
        strategy: doc.strategy(),
        lost_data: doc.lost_data(),
        repairs: doc.repairs,
        autofixes: coerced.autofixes,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{error::PipelineError, schema::LevelName};

    const QUIZ: &str = r#"{"topic": {"name": "ARC", "platform": "Apple"}, "question": "Why weak?", "tags": []}"#;

    #[test]
    fn test_clean_quiz() {
        let report =
            extract_and_coerce_with_report(QUIZ, TargetKind::Quiz, &RequestContext::default())
                .unwrap();
        assert_eq!(report.strategy, "strict_json");
        assert!(report.repairs.is_empty());
        assert!(report.autofixes.is_empty());
        assert!(!report.lost_data);
    }

    #[test]
    fn test_trailing_comma_uses_lenient() {
        let raw = r#"{"topic": {"name": "ARC", "platform": "Apple"}, "question": "Why weak?",}"#;
        let report =
            extract_and_coerce_with_report(raw, TargetKind::Quiz, &RequestContext::default())
                .unwrap();
        assert_eq!(report.strategy, "lenient_json");
    }

    #[test]
    fn test_truncated_quiz_recovered_by_hard_cut() {
        let raw = r#"Result: {"question": "Why weak?", "topic": {"name": "ARC", "platform": "App"#;
        let report =
            extract_and_coerce_with_report(raw, TargetKind::Quiz, &RequestContext::default())
                .unwrap();
        assert_eq!(report.strategy, "hard_cut");
        assert!(!report.lost_data);
        let TypedResult::Quiz(quiz) = report.result else {
            panic!("expected quiz");
        };
        assert_eq!(quiz.question, "Why weak?");
        assert_eq!(quiz.topic.platform, "App");
    }

    #[test]
    fn test_schema_error_surfaces() {
        let err = extract_and_coerce(
            r#"{"question": "Why weak?"}"#,
            TargetKind::Quiz,
            &RequestContext::default(),
        )
        .unwrap_err();
        let PipelineError::SchemaValidation(err) = err else {
            panic!("expected schema error");
        };
        assert_eq!(err.fields(), vec!["topic"]);
    }

    #[test]
    fn test_disabled_hard_cut() {
        let config = PipelineConfig {
            enable_hard_cut: false,
            ..PipelineConfig::default()
        };
        let raw = r#"Result: {"question": "Why weak?", "topic": {"name": "ARC", "platform": "App"#;
        let err = extract_and_coerce_with_config(
            raw,
            TargetKind::Quiz,
            &RequestContext::default(),
            &config,
        )
        .unwrap_err();
        assert_eq!(err.error_type(), "response_parse_error");
    }

    #[test]
    fn test_level_name_display() {
        assert_eq!(LevelName::Intermediate.to_string(), "Intermediate");
    }
}
