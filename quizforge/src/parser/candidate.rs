//! Candidate substrings located inside a larger response.

use once_cell::sync::Lazy;
use regex::Regex;

/// Any fenced block, capturing the language tag and the body.
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```([A-Za-z0-9_+\-]*)\s*(.*?)\s*```").expect("valid regex"));

/// A substring that may hold the JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The extracted content, trimmed to its outermost braces when present.
    pub content: String,

    /// How this candidate was located.
    pub source: CandidateSource,
}

/// Describes how a candidate was located in the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Body of a markdown code fence.
    Fence { language: Option<String> },

    /// Span from the first `{` to the last `}` of the text.
    BraceSpan,
}

impl CandidateSource {
    /// Returns true for fences tagged `json` (any case).
    pub fn is_json_fence(&self) -> bool {
        matches!(self, Self::Fence { language: Some(lang) } if lang.eq_ignore_ascii_case("json"))
    }
}

impl Candidate {
    /// Creates a candidate from a fenced block body.
    pub fn fence(content: impl Into<String>, language: Option<String>) -> Self {
        Self {
            content: content.into(),
            source: CandidateSource::Fence { language },
        }
    }

    /// Creates a candidate from a raw brace span.
    pub fn brace_span(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: CandidateSource::BraceSpan,
        }
    }
}

/// Locates candidates in `text`.
///
/// Fenced blocks come first, `json`-tagged ones ahead of the rest, followed
/// by the span from the first `{` to the last `}`. Each candidate is trimmed
/// to its own outermost braces; duplicates are dropped.
///
/// # Examples
///
/// ```
/// use quizforge::parser::{locate_candidates, CandidateSource};
///
/// let text = "Sure!\n```json\n{\"a\": 1}\n```\nAnything else?";
/// let candidates = locate_candidates(text);
/// assert_eq!(candidates[0].content, "{\"a\": 1}");
/// assert!(candidates[0].source.is_json_fence());
/// ```
pub fn locate_candidates(text: &str) -> Vec<Candidate> {
    let mut fenced: Vec<Candidate> = FENCE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let body = caps.get(2)?.as_str();
            let language = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|lang| !lang.is_empty())
                .map(str::to_string);
            Some(Candidate::fence(outermost_braces(body).unwrap_or(body), language))
        })
        .filter(|c| !c.content.trim().is_empty())
        .collect();

    // Stable sort keeps document order within each group.
    fenced.sort_by_key(|c| !c.source.is_json_fence());

    let mut candidates: Vec<Candidate> = Vec::with_capacity(fenced.len() + 1);
    for candidate in fenced {
        push_unique(&mut candidates, candidate);
    }
    if let Some(span) = outermost_braces(text) {
        push_unique(&mut candidates, Candidate::brace_span(span));
    }

    candidates
}

fn push_unique(candidates: &mut Vec<Candidate>, candidate: Candidate) {
    if !candidates.iter().any(|c| c.content == candidate.content) {
        candidates.push(candidate);
    }
}

/// Returns the slice from the first `{` to the last `}`, if both exist in order.
pub(crate) fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
