//! Text sanitizers that repair common defects in model output before decoding.
//!
//! Every sanitizer is a pure `&str -> String` transform built on a single
//! character scan that tracks whether the cursor is inside a quoted string.
//! Content of well-formed strings is never altered, and applying a sanitizer
//! twice gives the same result as applying it once.

use crate::value::Repair;

const FENCE: &str = "```";

/// Which quote characters open a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quotes {
    /// Only `"` delimits strings.
    Double,
    /// `"` and `'` both delimit strings.
    Any,
}

/// Where a character sits relative to quoted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Outside,
    Opening,
    Inside,
    Closing,
}

/// In-string / escape state machine shared by all sanitizers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QuoteTracker {
    quotes: Quotes,
    open: Option<char>,
    escaped: bool,
}

impl QuoteTracker {
    pub(crate) const fn new(quotes: Quotes) -> Self {
        Self {
            quotes,
            open: None,
            escaped: false,
        }
    }

    /// Feeds one character and reports its position.
    pub(crate) fn advance(&mut self, ch: char) -> Position {
        match self.open {
            Some(quote) => {
                if self.escaped {
                    self.escaped = false;
                    Position::Inside
                } else if ch == '\\' {
                    self.escaped = true;
                    Position::Inside
                } else if ch == quote {
                    self.open = None;
                    Position::Closing
                } else {
                    Position::Inside
                }
            }
            None => {
                let opens = ch == '"' || (ch == '\'' && self.quotes == Quotes::Any);
                if opens {
                    self.open = Some(ch);
                    Position::Opening
                } else {
                    Position::Outside
                }
            }
        }
    }

    pub(crate) const fn in_string(&self) -> bool {
        self.open.is_some()
    }

    pub(crate) const fn open_quote(&self) -> Option<char> {
        self.open
    }

    /// True when the last character fed was an unconsumed backslash.
    pub(crate) const fn pending_escape(&self) -> bool {
        self.escaped
    }
}

/// Ordered sanitizer steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeStep {
    /// [`strip_outer_fence`]
    OuterFence,
    /// [`close_unterminated_strings`]
    CloseStrings,
    /// [`escape_control_chars`]
    EscapeControlChars,
    /// [`balance_containers`]
    BalanceContainers,
    /// [`remove_omitted_values`]
    RemoveOmittedValues,
    /// [`insert_missing_commas`]
    InsertMissingCommas,
    /// [`strip_trailing_commas`]
    StripTrailingCommas,
}

/// Steps applied to a response before any decode strategy runs.
///
/// See [`sanitize_surface`] for how they are scoped.
pub const SURFACE_STEPS: &[SanitizeStep] = &[
    SanitizeStep::OuterFence,
    SanitizeStep::CloseStrings,
    SanitizeStep::EscapeControlChars,
];

/// Steps that pair quotes. Only meaningful on text that is JSON from its
/// first character.
pub const STRING_STEPS: &[SanitizeStep] =
    &[SanitizeStep::CloseStrings, SanitizeStep::EscapeControlChars];

/// Structural steps applied only by the hard-cut fallback.
pub const DEEP_STEPS: &[SanitizeStep] = &[
    SanitizeStep::BalanceContainers,
    SanitizeStep::RemoveOmittedValues,
    SanitizeStep::InsertMissingCommas,
    SanitizeStep::StripTrailingCommas,
];

impl SanitizeStep {
    /// Applies the step to `text`.
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::OuterFence => strip_outer_fence(text),
            Self::CloseStrings => close_unterminated_strings(text),
            Self::EscapeControlChars => escape_control_chars(text),
            Self::BalanceContainers => balance_containers(text),
            Self::RemoveOmittedValues => remove_omitted_values(text),
            Self::InsertMissingCommas => insert_missing_commas(text),
            Self::StripTrailingCommas => strip_trailing_commas(text),
        }
    }

    /// The repair recorded when the step changes the text.
    pub const fn repair(self) -> Repair {
        match self {
            Self::OuterFence => Repair::OuterFenceStripped,
            Self::CloseStrings => Repair::StringsClosed,
            Self::EscapeControlChars => Repair::ControlCharsEscaped,
            Self::BalanceContainers => Repair::ContainersBalanced,
            Self::RemoveOmittedValues => Repair::OmittedValuesRemoved,
            Self::InsertMissingCommas => Repair::MissingCommasInserted,
            Self::StripTrailingCommas => Repair::TrailingCommasStripped,
        }
    }
}

/// Runs `steps` in order, returning the final text and the repairs that
/// actually changed it.
pub fn run_steps(text: &str, steps: &[SanitizeStep]) -> (String, Vec<Repair>) {
    let mut current = text.to_string();
    let mut repairs = Vec::new();
    for step in steps {
        let next = step.apply(&current);
        if next != current {
            repairs.push(step.repair());
            current = next;
        }
    }
    (current, repairs)
}

/// Applies [`SURFACE_STEPS`] to a whole response.
///
/// The outer fence is stripped first. The string steps run only when what
/// remains starts with `{` or `[`: in a response that opens with prose they
/// would pair quotes across the prose and the document. Candidates found
/// inside prose are repaired individually by the decode strategies.
///
/// # Examples
///
/// ```
/// use quizforge::parser::sanitize::sanitize_surface;
///
/// let (text, _) = sanitize_surface("{\"a\": \"x\ny");
/// assert_eq!(text, "{\"a\": \"x\\ny\"");
///
/// let prose = "The \"weak keyword:\n{\"a\": 1}";
/// assert_eq!(sanitize_surface(prose).0, prose);
/// ```
pub fn sanitize_surface(text: &str) -> (String, Vec<Repair>) {
    let (unfenced, mut repairs) = run_steps(text, &[SanitizeStep::OuterFence]);
    if !unfenced.trim_start().starts_with(['{', '[']) {
        return (unfenced, repairs);
    }
    let (repaired, mut more) = run_steps(&unfenced, STRING_STEPS);
    repairs.append(&mut more);
    (repaired, repairs)
}

/// Removes one pair of markdown fences wrapping the whole response.
///
/// The text is left untouched unless the trimmed response both starts and
/// ends with a fence and no other fence appears between them outside a
/// string literal.
///
/// # Examples
///
/// ```
/// use quizforge::parser::sanitize::strip_outer_fence;
///
/// assert_eq!(strip_outer_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(strip_outer_fence("See ```json\n{}\n```"), "See ```json\n{}\n```");
///
/// let two_blocks = "```json\n{}\n```\ntext ```x```";
/// assert_eq!(strip_outer_fence(two_blocks), two_blocks);
/// ```
pub fn strip_outer_fence(text: &str) -> String {
    let Some(inner) = text
        .trim()
        .strip_prefix(FENCE)
        .and_then(|rest| rest.strip_suffix(FENCE))
    else {
        return text.to_string();
    };
    let body = inner.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || "_+-".contains(c));
    if has_fence_outside_strings(body) {
        return text.to_string();
    }
    body.trim().to_string()
}

fn has_fence_outside_strings(text: &str) -> bool {
    let mut tracker = QuoteTracker::new(Quotes::Double);
    text.char_indices()
        .any(|(i, ch)| tracker.advance(ch) == Position::Outside && text[i..].starts_with(FENCE))
}

/// Appends a closing quote if the text ends inside a string.
///
/// A dangling backslash at the very end is dropped first so the added quote
/// is not escaped.
///
/// # Examples
///
/// ```
/// use quizforge::parser::sanitize::close_unterminated_strings;
///
/// assert_eq!(close_unterminated_strings("{\"a\": \"hel"), "{\"a\": \"hel\"");
/// ```
pub fn close_unterminated_strings(text: &str) -> String {
    close_open_string(text, Quotes::Double)
}

pub(crate) fn close_open_string(text: &str, quotes: Quotes) -> String {
    let mut tracker = QuoteTracker::new(quotes);
    for ch in text.chars() {
        tracker.advance(ch);
    }

    let Some(quote) = tracker.open_quote() else {
        return text.to_string();
    };

    let mut result = text.to_string();
    if tracker.pending_escape() {
        result.pop();
    }
    result.push(quote);
    result
}

/// Escapes raw control characters that appear inside strings.
///
/// Newline, carriage return and tab become `\n`, `\r` and `\t`; any other
/// C0 control character becomes `\u00XX`. Characters outside strings are
/// left alone.
pub fn escape_control_chars(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut tracker = QuoteTracker::new(Quotes::Double);

    for ch in text.chars() {
        let escaped_before = tracker.pending_escape();
        let position = tracker.advance(ch);

        if position != Position::Inside || !ch.is_control() || (ch as u32) >= 0x20 {
            result.push(ch);
            continue;
        }

        // A backslash already sits in front of this character.
        if !escaped_before {
            result.push('\\');
        }
        match ch {
            '\n' => result.push('n'),
            '\r' => result.push('r'),
            '\t' => result.push('t'),
            other => result.push_str(&format!("u{:04x}", other as u32)),
        }
    }

    result
}

/// Appends closers for every container still open at the end of the text.
///
/// An unterminated string is closed first. Stray closers that do not match
/// the innermost open container are left in place.
pub fn balance_containers(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut tracker = QuoteTracker::new(Quotes::Any);

    for ch in text.chars() {
        if tracker.advance(ch) != Position::Outside {
            continue;
        }
        match ch {
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' if stack.last() == Some(&ch) => {
                stack.pop();
            }
            _ => {}
        }
    }

    if stack.is_empty() && !tracker.in_string() {
        return text.to_string();
    }

    let mut result = close_open_string(text, Quotes::Any);
    while let Some(closer) = stack.pop() {
        result.push(closer);
    }
    result
}

/// Drops `"key":` pairs whose value is missing and collapses repeated commas.
///
/// Handles `"k": ,`, `"k": }` and a `"k":` cut off at the end of the text.
///
/// # Examples
///
/// ```
/// use quizforge::parser::sanitize::remove_omitted_values;
///
/// assert_eq!(
///     remove_omitted_values(r#"{"a": 1, "b": , "c": 2}"#),
///     r#"{"a": 1, "c": 2}"#
/// );
/// ```
pub fn remove_omitted_values(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut tracker = QuoteTracker::new(Quotes::Any);
    // (is_object, byte offset in `result` where the current member starts)
    let mut stack: Vec<(bool, usize)> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if tracker.advance(ch) != Position::Outside {
            result.push(ch);
            i += 1;
            continue;
        }

        match ch {
            '{' | '[' => {
                result.push(ch);
                stack.push((ch == '{', result.len()));
            }
            '}' | ']' => {
                stack.pop();
                result.push(ch);
            }
            ',' => {
                if last_significant(&result) == Some(',') {
                    i += 1;
                    continue;
                }
                result.push(ch);
                if let Some(top) = stack.last_mut() {
                    top.1 = result.len();
                }
            }
            ':' => {
                let next = next_significant(&chars, i + 1);
                let omitted = matches!(next, None | Some((_, ',' | '}' | ']')));
                match stack.last() {
                    Some(&(true, member_start)) if omitted => {
                        result.truncate(member_start);
                        // Skip the colon, and a following comma that would now
                        // be doubled.
                        i = match next {
                            Some((idx, ',')) => idx + 1,
                            Some((idx, _)) => idx,
                            None => chars.len(),
                        };
                        continue;
                    }
                    _ => result.push(ch),
                }
            }
            _ => result.push(ch),
        }
        i += 1;
    }

    result
}

/// Inserts commas between adjacent values that lack a separator.
///
/// # Examples
///
/// ```
/// use quizforge::parser::sanitize::insert_missing_commas;
///
/// assert_eq!(
///     insert_missing_commas(r#"{"a": 1 "b": [1 2]}"#),
///     r#"{"a": 1, "b": [1, 2]}"#
/// );
/// ```
pub fn insert_missing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 8);
    let mut tracker = QuoteTracker::new(Quotes::Any);
    let mut depth = 0usize;
    // Byte offset just past the last complete value, if nothing but
    // whitespace has followed it.
    let mut value_end: Option<usize> = None;
    let mut in_word = false;

    for ch in text.chars() {
        let position = tracker.advance(ch);
        match position {
            Position::Inside => {
                result.push(ch);
                continue;
            }
            Position::Closing => {
                result.push(ch);
                value_end = Some(result.len());
                in_word = false;
                continue;
            }
            Position::Opening | Position::Outside => {}
        }

        if ch.is_whitespace() {
            in_word = false;
            result.push(ch);
            continue;
        }

        let continues_word = in_word && is_word_char(ch);
        if !continues_word && depth > 0 && starts_value(ch) {
            if let Some(end) = value_end {
                result.insert(end, ',');
            }
        }

        result.push(ch);
        match ch {
            '{' | '[' => {
                depth += 1;
                value_end = None;
                in_word = false;
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                value_end = Some(result.len());
                in_word = false;
            }
            '"' | '\'' => {
                value_end = None;
                in_word = false;
            }
            c if is_word_char(c) => {
                in_word = true;
                value_end = Some(result.len());
            }
            _ => {
                value_end = None;
                in_word = false;
            }
        }
    }

    result
}

/// Removes commas followed only by whitespace and a closing `}` or `]`.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut tracker = QuoteTracker::new(Quotes::Any);

    for (i, &ch) in chars.iter().enumerate() {
        let outside = tracker.advance(ch) == Position::Outside;
        if outside && ch == ',' {
            if let Some((_, '}' | ']')) = next_significant(&chars, i + 1) {
                continue;
            }
        }
        result.push(ch);
    }

    result
}

/// Byte offset of the last `,` outside strings, if any.
pub(crate) fn last_separator(text: &str) -> Option<usize> {
    let mut tracker = QuoteTracker::new(Quotes::Any);
    let mut last = None;
    for (idx, ch) in text.char_indices() {
        if tracker.advance(ch) == Position::Outside && ch == ',' {
            last = Some(idx);
        }
    }
    last
}

fn next_significant(chars: &[char], from: usize) -> Option<(usize, char)> {
    chars
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, &c)| (i, c))
}

fn last_significant(text: &str) -> Option<char> {
    text.chars().rev().find(|c| !c.is_whitespace())
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '+' | '.' | '$')
}

fn starts_value(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '{' | '[' | '-') || ch.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_outer_fence_tagged() {
        assert_eq!(strip_outer_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_outer_fence("  ```\n[1, 2]\n```  "), "[1, 2]");
    }

    #[test]
    fn test_strip_outer_fence_ignores_inner() {
        let text = "Here you go:\n```json\n{\"a\":1}\n```";
        assert_eq!(strip_outer_fence(text), text);

        let inside = r#"{"snippet": "```swift\nlet a = 1\n```"}"#;
        assert_eq!(strip_outer_fence(inside), inside);
    }

    #[test]
    fn test_strip_outer_fence_needs_single_pair() {
        let nested = "```json\n```swift\nx\n```\n```";
        assert_eq!(strip_outer_fence(nested), nested);

        let unrelated = "```json\n{\"a\":1}\n```\ntext ```x```";
        assert_eq!(strip_outer_fence(unrelated), unrelated);

        let snippet = "```json\n{\"s\": \"```objc\nx\n```\"}\n```";
        assert_eq!(strip_outer_fence(snippet), "{\"s\": \"```objc\nx\n```\"}");
    }

    #[test]
    fn test_surface_skips_string_steps_in_prose() {
        let prose = "About the \"weak keyword:\n```json\n{\n  \"a\": 1\n}\n```";
        let (text, repairs) = sanitize_surface(prose);
        assert_eq!(text, prose);
        assert!(repairs.is_empty());

        let (text, repairs) = sanitize_surface("```json\n{\"a\": \"x\ny\n```");
        assert_eq!(text, "{\"a\": \"x\\ny\"");
        assert_eq!(
            repairs,
            vec![
                Repair::OuterFenceStripped,
                Repair::StringsClosed,
                Repair::ControlCharsEscaped
            ]
        );
    }

    #[test]
    fn test_close_unterminated() {
        assert_eq!(close_unterminated_strings("{\"a\": \"hel"), "{\"a\": \"hel\"");
        assert_eq!(close_unterminated_strings("{\"a\": \"ok\"}"), "{\"a\": \"ok\"}");
    }

    #[test]
    fn test_close_drops_dangling_backslash() {
        assert_eq!(close_unterminated_strings("{\"a\": \"x\\"), "{\"a\": \"x\"");
        // An escaped quote does not end the string.
        assert_eq!(
            close_unterminated_strings(r#"{"a": "say \"hi"#),
            r#"{"a": "say \"hi""#
        );
    }

    #[test]
    fn test_escape_control_chars() {
        let text = "{\"a\": \"line1\nline2\tend\r\u{1}\"}";
        assert_eq!(
            escape_control_chars(text),
            "{\"a\": \"line1\\nline2\\tend\\r\\u0001\"}"
        );
    }

    #[test]
    fn test_escape_keeps_structural_whitespace() {
        let text = "{\n  \"a\": \"x\"\n}";
        assert_eq!(escape_control_chars(text), text);
    }

    #[test]
    fn test_escape_after_backslash() {
        // Backslash followed by a raw newline becomes a proper \n escape.
        assert_eq!(escape_control_chars("\"a\\\nb\""), "\"a\\nb\"");
    }

    #[test]
    fn test_balance_containers() {
        assert_eq!(balance_containers(r#"{"a": [1, {"b": 2"#), r#"{"a": [1, {"b": 2}]}"#);
        assert_eq!(balance_containers(r#"{"a": "}"#), r#"{"a": "}"}"#);
        assert_eq!(balance_containers("{}"), "{}");
    }

    #[test]
    fn test_remove_omitted_values() {
        assert_eq!(remove_omitted_values(r#"{"a": 1, "b": }"#), r#"{"a": 1,}"#);
        assert_eq!(remove_omitted_values(r#"{"b": , "c": 2}"#), r#"{ "c": 2}"#);
        assert_eq!(remove_omitted_values(r#"{"a": 1, "b":"#), r#"{"a": 1,"#);
        assert_eq!(remove_omitted_values(r#"{"a": {"b": }}"#), r#"{"a": {}}"#);
    }

    #[test]
    fn test_remove_omitted_collapses_commas() {
        assert_eq!(remove_omitted_values("[1,,2]"), "[1,2]");
        assert_eq!(remove_omitted_values(r#"{"a": ",,"}"#), r#"{"a": ",,"}"#);
    }

    #[test]
    fn test_insert_missing_commas() {
        assert_eq!(
            insert_missing_commas("{\"a\": \"x\"\n\"b\": 2}"),
            "{\"a\": \"x\",\n\"b\": 2}"
        );
        assert_eq!(insert_missing_commas("[{}{}]"), "[{},{}]");
        assert_eq!(insert_missing_commas(r#"{"a": true}"#), r#"{"a": true}"#);
    }

    #[test]
    fn test_insert_missing_commas_leaves_strings() {
        let text = r#"{"a": "one two" , "b": 'three four'}"#;
        assert_eq!(insert_missing_commas(text), text);
    }

    #[test]
    fn test_strip_trailing_commas() {
        assert_eq!(strip_trailing_commas(r#"{"a": [1, 2, ], }"#), r#"{"a": [1, 2 ] }"#);
        assert_eq!(strip_trailing_commas(r#"{"a": ",}"}"#), r#"{"a": ",}"}"#);
    }

    #[test]
    fn test_sanitizers_idempotent() {
        let samples = [
            "```json\n{\"a\": \"hel\n",
            r#"{"a": 1 "b": [1 2,], "c": , "d": {"e": "#,
            "{\"a\": \"x\\",
            r#"{'a': 'it''s', "b": }"#,
            "```json\n```swift\nx\n```\n```",
            "```json\n{\"a\":1}\n```\ntext ```x```",
            "``````",
        ];
        let steps = [SURFACE_STEPS, DEEP_STEPS].concat();
        for sample in samples {
            for step in &steps {
                let once = step.apply(sample);
                let twice = step.apply(&once);
                assert_eq!(once, twice, "{step:?} not idempotent on {sample:?}");
            }
        }
    }

    #[test]
    fn test_run_steps_records_changes() {
        let (text, repairs) = run_steps("```json\n{\"a\": \"hi\nthere\"}\n```", SURFACE_STEPS);
        assert_eq!(text, "{\"a\": \"hi\\nthere\"}");
        assert_eq!(
            repairs,
            vec![Repair::OuterFenceStripped, Repair::ControlCharsEscaped]
        );
    }

    #[test]
    fn test_last_separator() {
        assert_eq!(last_separator(r#"{"a": 1, "b": "x,y"#), Some(7));
        assert_eq!(last_separator(r#"{"a": 1}"#), None);
    }
}
