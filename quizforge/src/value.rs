//! Decoded documents and the metadata describing how they were obtained.

use std::fmt;

use serde_json::Value;

use crate::parser::CandidateSource;
use crate::schema::LevelName;

/// A decoded JSON tree together with its provenance.
///
/// The root is always an object or an array; decode strategies that yield a
/// scalar root are treated as failures before a `ParsedDocument` is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// The decoded tree.
    pub value: Value,
    /// Which decode strategy produced the tree.
    pub source: Source,
    /// Text repairs applied before the successful decode, in order.
    pub repairs: Vec<Repair>,
}

impl ParsedDocument {
    /// Creates a document with no repairs recorded.
    ///
    /// # Examples
    ///
    /// ```
    /// use quizforge::value::{ParsedDocument, Source};
    /// use serde_json::json;
    ///
    /// let doc = ParsedDocument::new(json!({"a": 1}), Source::Strict);
    /// assert!(doc.repairs.is_empty());
    /// assert_eq!(doc.strategy(), "strict_json");
    /// ```
    #[inline]
    pub fn new(value: Value, source: Source) -> Self {
        Self {
            value,
            source,
            repairs: Vec::new(),
        }
    }

    /// Creates a document with the given repairs.
    #[inline]
    pub fn with_repairs(value: Value, source: Source, repairs: Vec<Repair>) -> Self {
        Self {
            value,
            source,
            repairs,
        }
    }

    /// Name of the decode strategy that produced this document.
    #[inline]
    pub fn strategy(&self) -> &'static str {
        self.source.strategy_name()
    }

    /// Prepends repairs applied by an earlier stage.
    pub(crate) fn prepend_repairs(&mut self, earlier: &[Repair]) {
        if earlier.is_empty() {
            return;
        }
        let mut merged = earlier.to_vec();
        merged.append(&mut self.repairs);
        self.repairs = merged;
    }

    /// Returns true if any repair discarded part of the input.
    pub fn lost_data(&self) -> bool {
        matches!(self.source, Source::HardCut { dropped_bytes, .. } if dropped_bytes > 0)
    }
}

/// Which decode strategy produced a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// The whole text was valid JSON.
    Strict,

    /// The whole text parsed with the lenient grammar.
    Lenient,

    /// A substring located inside surrounding prose or a fence.
    Extracted {
        /// Where the substring came from.
        candidate: CandidateSource,
        /// Whether the lenient grammar was needed.
        lenient: bool,
    },

    /// The text was truncated and structurally completed.
    HardCut {
        /// Non-whitespace bytes discarded from the end of the input.
        dropped_bytes: usize,
        /// Whether the second, deeper cut was needed.
        retried: bool,
    },
}

impl Source {
    /// Strategy name as reported in diagnostics and logs.
    pub const fn strategy_name(&self) -> &'static str {
        match self {
            Self::Strict => "strict_json",
            Self::Lenient => "lenient_json",
            Self::Extracted { .. } => "extracted_json",
            Self::HardCut { .. } => "hard_cut",
        }
    }
}

/// A textual repair applied to the raw response before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repair {
    /// Removed a markdown fence wrapping the whole response.
    OuterFenceStripped,
    /// Appended a quote to close a string cut off at the end.
    StringsClosed,
    /// Escaped raw control characters inside strings.
    ControlCharsEscaped,
    /// Appended closers for unbalanced containers.
    ContainersBalanced,
    /// Dropped `"key":` pairs that had no value.
    OmittedValuesRemoved,
    /// Inserted commas between adjacent values.
    MissingCommasInserted,
    /// Removed commas directly before a closer.
    TrailingCommasStripped,
    /// Discarded trailing text after the last complete value.
    TrailingContentDropped,
}

impl Repair {
    /// Returns a human-readable description of this repair.
    pub const fn description(self) -> &'static str {
        match self {
            Self::OuterFenceStripped => "stripped outer markdown fence",
            Self::StringsClosed => "closed unterminated string",
            Self::ControlCharsEscaped => "escaped control characters in strings",
            Self::ContainersBalanced => "closed unbalanced braces/brackets",
            Self::OmittedValuesRemoved => "removed keys with omitted values",
            Self::MissingCommasInserted => "added missing commas",
            Self::TrailingCommasStripped => "removed trailing commas",
            Self::TrailingContentDropped => "dropped truncated trailing content",
        }
    }
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A whitelisted structural fix applied by the schema coercer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Autofix {
    /// A bare-string `topic` was wrapped into an object.
    TopicWrapped {
        /// The string that became `topic.name`.
        name: String,
    },
    /// A missing answer level was replaced by an empty stub.
    LevelStubbed {
        /// The synthesized level.
        level: LevelName,
    },
    /// A key was matched under a different spelling.
    KeyRenamed {
        /// Key as it appeared in the document.
        from: String,
        /// Key required by the schema.
        to: String,
    },
    /// The top-level `question` string was used as `text`.
    QuestionAsText,
    /// `passed` disagreed with `quality_score` and was recomputed.
    PassedRecomputed {
        /// The authoritative score.
        quality_score: i64,
    },
}

impl fmt::Display for Autofix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopicWrapped { name } => write!(f, "wrapped string topic '{name}'"),
            Self::LevelStubbed { level } => write!(f, "stubbed missing {level} level"),
            Self::KeyRenamed { from, to } => write!(f, "renamed '{from}' to '{to}'"),
            Self::QuestionAsText => f.write_str("used 'question' as 'text'"),
            Self::PassedRecomputed { quality_score } => {
                write!(f, "recomputed passed from quality_score {quality_score}")
            }
        }
    }
}
