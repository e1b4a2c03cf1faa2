//! Target schemas and the coercer that builds them from decoded documents.
//!
//! Coercion applies a short whitelist of structural autofixes (bare-string
//! topics, missing answer levels, key spelling) and then validates strictly.
//! Every offending field is reported; a partial result is never returned.
//!
//! ```
//! use quizforge::schema::{coerce, RequestContext, TargetKind, TypedResult};
//! use serde_json::json;
//!
//! let doc = json!({"topic": "ARC", "question": "What does ARC do?"});
//! let ctx = RequestContext::new("Memory", "Apple");
//!
//! let coerced = coerce(&doc, TargetKind::Quiz, &ctx).unwrap();
//! let TypedResult::Quiz(quiz) = coerced.result else { unreachable!() };
//! assert_eq!(quiz.topic.platform, "Apple");
//! assert_eq!(coerced.autofixes.len(), 1);
//! ```

mod autofix;
mod fields;
mod model;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use autofix::PASSING_QUALITY_SCORE;
pub use fields::normalize_key;
pub use model::{
    AnswerLevel, AnswerLevels, CodeTest, LevelName, Question, Quiz, QuizStyle, Topic, UserQuiz,
    Validation, SCORE_RANGE, TESTS_PER_LEVEL,
};

use crate::{error::SchemaValidationError, parser::strategies::kind_of, value::Autofix};
use fields::FieldReader;

/// The schema a response is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Question,
    Quiz,
    Validation,
    UserQuiz,
}

impl TargetKind {
    /// Every kind.
    pub const ALL: [Self; 4] = [Self::Question, Self::Quiz, Self::Validation, Self::UserQuiz];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Quiz => "quiz",
            Self::Validation => "validation",
            Self::UserQuiz => "user_quiz",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown [`TargetKind`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target kind '{0}'")]
pub struct UnknownTargetKind(pub String);

impl FromStr for TargetKind {
    type Err = UnknownTargetKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTargetKind(s.to_string()))
    }
}

/// Request fields used by prompts and as autofix fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    pub platform: Option<String>,
    pub topic: Option<String>,
    pub technology: Option<String>,
    pub tags: Vec<String>,
    /// Student answer or follow-up question for user quizzes.
    pub question: Option<String>,
    /// Requested user-quiz style.
    pub style: Option<QuizStyle>,
}

impl RequestContext {
    pub fn new(topic: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            platform: Some(platform.into()),
            ..Self::default()
        }
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    pub fn with_style(mut self, style: QuizStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// True when both topic and platform are non-blank.
    pub fn has_topic_and_platform(&self) -> bool {
        is_present(&self.topic) && is_present(&self.platform)
    }

    /// True when a non-blank question is set.
    pub fn has_question(&self) -> bool {
        is_present(&self.question)
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// A validated result of one of the four schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypedResult {
    Question(Question),
    Quiz(Quiz),
    Validation(Validation),
    UserQuiz(UserQuiz),
}

impl TypedResult {
    pub const fn kind(&self) -> TargetKind {
        match self {
            Self::Question(_) => TargetKind::Question,
            Self::Quiz(_) => TargetKind::Quiz,
            Self::Validation(_) => TargetKind::Validation,
            Self::UserQuiz(_) => TargetKind::UserQuiz,
        }
    }

    /// Serializes the result with its wire keys.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A coerced result and the autofixes that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub result: TypedResult,
    pub autofixes: Vec<Autofix>,
}

/// Coerces a decoded document into `kind`.
///
/// # Errors
///
/// Returns [`SchemaValidationError`] listing every field that is missing,
/// mistyped or out of range after autofixes.
pub fn coerce(
    value: &Value,
    kind: TargetKind,
    ctx: &RequestContext,
) -> Result<Coerced, SchemaValidationError> {
    let Value::Object(root) = value else {
        return Err(SchemaValidationError::single(
            kind,
            "",
            format!("expected object, found {}", kind_of(value)),
        ));
    };

    let mut reader = FieldReader::new(kind);
    let built = match kind {
        TargetKind::Question => model::read_question(&mut reader, root, ctx).map(TypedResult::Question),
        TargetKind::Quiz => model::read_quiz(&mut reader, root, ctx).map(TypedResult::Quiz),
        TargetKind::Validation => {
            model::read_validation(&mut reader, root).map(TypedResult::Validation)
        }
        TargetKind::UserQuiz => {
            model::read_user_quiz(&mut reader, root, ctx).map(TypedResult::UserQuiz)
        }
    };

    let (result, autofixes) = reader.finish(built)?;
    log::debug!(
        "coerced {} response with {} autofix(es)",
        kind,
        autofixes.len()
    );
    Ok(Coerced { result, autofixes })
}
