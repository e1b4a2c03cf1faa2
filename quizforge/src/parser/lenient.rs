//! Lenient JSON-like decoder.
//!
//! Accepts everything strict JSON accepts, plus:
//! - unquoted object keys (`{name: "x"}`)
//! - single-quoted strings
//! - trailing commas in objects and arrays
//! - `//`, `/* */` and `#` comments
//! - Python literals `True`, `False` and `None`
//! - raw control characters inside strings
//!
//! The root must be an object or an array, and only whitespace or comments
//! may follow it.

use serde_json::{Map, Number, Value};

/// Error raised by [`parse_lenient`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct LenientError {
    /// What went wrong.
    pub message: String,
    /// Character offset where the problem was detected.
    pub position: usize,
}

/// Parses `input` with the lenient grammar.
///
/// # Examples
///
/// ```
/// use quizforge::parser::lenient::parse_lenient;
/// use serde_json::json;
///
/// let value = parse_lenient("{name: 'Alice', tags: ['a',], ok: True}", 64).unwrap();
/// assert_eq!(value, json!({"name": "Alice", "tags": ["a"], "ok": true}));
/// ```
///
/// # Errors
///
/// Returns [`LenientError`] on malformed input, on a scalar root, or when
/// containers nest deeper than `max_depth`.
pub fn parse_lenient(input: &str, max_depth: usize) -> Result<Value, LenientError> {
    let mut parser = LenientParser::new(input, max_depth);
    parser.skip_trivia()?;
    match parser.peek() {
        Some('{') | Some('[') => {}
        Some(_) => return Err(parser.error("root must be an object or array")),
        None => return Err(parser.error("empty input")),
    }
    let value = parser.parse_value(0)?;
    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

struct LenientParser {
    chars: Vec<char>,
    pos: usize,
    max_depth: usize,
}

impl LenientParser {
    fn new(input: &str, max_depth: usize) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            max_depth,
        }
    }

    fn error(&self, message: impl Into<String>) -> LenientError {
        LenientError {
            message: message.into(),
            position: self.pos,
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn expect(&mut self, expected: char) -> Result<(), LenientError> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => {
                self.pos -= 1;
                Err(self.error(format!("expected '{expected}', found '{ch}'")))
            }
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), LenientError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() || c == '\u{feff}' => self.pos += 1,
                (Some('/'), Some('/')) | (Some('#'), _) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => {
                                self.pos = start;
                                return Err(self.error("unterminated block comment"));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LenientError> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_object(depth + 1),
            Some('[') => self.parse_array(depth + 1),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.parse_number()
            }
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                let word = self.parse_identifier();
                match word.as_str() {
                    "true" | "True" => Ok(Value::Bool(true)),
                    "false" | "False" => Ok(Value::Bool(false)),
                    "null" | "None" => Ok(Value::Null),
                    _ => {
                        self.pos = start;
                        Err(self.error(format!("unexpected bare word '{word}'")))
                    }
                }
            }
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), LenientError> {
        if depth > self.max_depth {
            return Err(self.error(format!(
                "nesting deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, LenientError> {
        self.check_depth(depth)?;
        self.expect('{')?;
        let mut map = Map::new();

        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }

            let key = match self.peek() {
                Some(q @ ('"' | '\'')) => self.parse_string(q)?,
                Some(c) if is_ident_start(c) || c.is_ascii_digit() => self.parse_identifier(),
                Some(c) => return Err(self.error(format!("expected object key, found '{c}'"))),
                None => return Err(self.error("unterminated object")),
            };

            self.skip_trivia()?;
            self.expect(':')?;
            let value = self.parse_value(depth)?;
            map.insert(key, value);

            self.skip_trivia()?;
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or '}}', found '{c}'")));
                }
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, LenientError> {
        self.check_depth(depth)?;
        self.expect('[')?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }

            items.push(self.parse_value(depth)?);

            self.skip_trivia()?;
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or ']', found '{c}'")));
                }
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, LenientError> {
        let start = self.pos;
        self.expect(quote)?;
        let mut out = String::new();

        loop {
            let Some(ch) = self.bump() else {
                self.pos = start;
                return Err(self.error("unterminated string"));
            };
            match ch {
                c if c == quote => return Ok(out),
                '\\' => self.parse_escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LenientError> {
        let Some(ch) = self.bump() else {
            return Err(self.error("unterminated escape sequence"));
        };
        match ch {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000c}'),
            'u' => {
                let high = self.parse_hex4()?;
                let code = if (0xD800..0xDC00).contains(&high)
                    && self.peek() == Some('\\')
                    && self.peek_at(1) == Some('u')
                {
                    self.pos += 2;
                    let low = self.parse_hex4()?;
                    if (0xDC00..0xE000).contains(&low) {
                        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                    } else {
                        return Err(self.error("invalid low surrogate"));
                    }
                } else {
                    high
                };
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            // `\"`, `\'`, `\\`, `\/` and unknown escapes keep the character.
            other => out.push(other),
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u32, LenientError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn parse_identifier(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                word.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        word
    }

    fn parse_number(&mut self) -> Result<Value, LenientError> {
        let start = self.pos;
        let mut literal = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                literal.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        let literal = literal.strip_prefix('+').unwrap_or(&literal);
        let number = if literal.contains(['.', 'e', 'E']) {
            literal.parse::<f64>().ok().and_then(Number::from_f64)
        } else if let Ok(int) = literal.parse::<i64>() {
            Some(Number::from(int))
        } else if let Ok(uint) = literal.parse::<u64>() {
            Some(Number::from(uint))
        } else {
            literal.parse::<f64>().ok().and_then(Number::from_f64)
        };

        number.map(Value::Number).ok_or_else(|| {
            self.pos = start;
            self.error(format!("invalid number '{literal}'"))
        })
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '-')
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_strict_json_subset() {
        let value = parse_lenient(r#"{"a": [1, 2.5, -3e2], "b": null, "c": "x\"y"}"#, 16).unwrap();
        assert_eq!(value, json!({"a": [1, 2.5, -300.0], "b": null, "c": "x\"y"}));
    }

    #[test]
    fn test_trailing_comma_matches_strict() {
        let lenient = parse_lenient(r#"{"a": 1,}"#, 16).unwrap();
        let strict: Value = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        assert_eq!(lenient, strict);
    }

    #[test]
    fn test_unquoted_keys_and_single_quotes() {
        let value = parse_lenient("{name: 'O\\'Brien', answer_levels: {}}", 16).unwrap();
        assert_eq!(value, json!({"name": "O'Brien", "answer_levels": {}}));
    }

    #[test]
    fn test_comments() {
        let input = "{\n  // line\n  \"a\": 1, # hash\n  /* block */ \"b\": 2\n}";
        assert_eq!(parse_lenient(input, 16).unwrap(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_python_literals() {
        let value = parse_lenient("[True, False, None]", 16).unwrap();
        assert_eq!(value, json!([true, false, null]));
    }

    #[test]
    fn test_raw_control_chars_in_string() {
        let value = parse_lenient("{\"a\": \"line1\nline2\"}", 16).unwrap();
        assert_eq!(value, json!({"a": "line1\nline2"}));
    }

    #[test]
    fn test_surrogate_pair() {
        let value = parse_lenient(r#"["\ud83d\ude00"]"#, 16).unwrap();
        assert_eq!(value, json!(["\u{1F600}"]));
    }

    #[test]
    fn test_scalar_root_rejected() {
        let err = parse_lenient("42", 16).unwrap_err();
        assert!(err.message.contains("root"));
        assert!(parse_lenient("   ", 16).is_err());
    }

    #[test]
    fn test_trailing_content_rejected() {
        let err = parse_lenient(r#"{"a": 1} and more"#, 16).unwrap_err();
        assert_eq!(err.message, "unexpected trailing content");
        assert!(parse_lenient("{\"a\": 1} // done", 16).is_ok());
    }

    #[test]
    fn test_bare_word_value_rejected() {
        assert!(parse_lenient("{a: hello}", 16).is_err());
    }

    #[test]
    fn test_unterminated() {
        assert!(parse_lenient(r#"{"a": 1"#, 16).is_err());
        assert!(parse_lenient(r#"{"a": "x"#, 16).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}{}", "[".repeat(10), "]".repeat(10));
        assert!(parse_lenient(&deep, 10).is_ok());
        let err = parse_lenient(&deep, 9).unwrap_err();
        assert!(err.message.contains("nesting"));
    }
}
