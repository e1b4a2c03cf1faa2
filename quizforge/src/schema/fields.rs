//! Field access with key normalization and issue accumulation.

use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use super::TargetKind;
use crate::{
    constraints::{Constraint, ConstraintResults},
    error::{FieldIssue, SchemaValidationError},
    parser::strategies::kind_of,
    value::Autofix,
};

/// Normalizes a key for spelling-insensitive comparison.
///
/// Applies NFKC, lowercases, and drops `_`, `-` and spaces, so
/// `answer_levels`, `AnswerLevels` and `answer-levels` compare equal.
///
/// # Examples
///
/// ```
/// use quizforge::schema::normalize_key;
///
/// assert_eq!(normalize_key("evaluation_criteria"), normalize_key("evaluationCriteria"));
/// assert_eq!(normalize_key("Ｑｕａｌｉｔｙ_Score"), "qualityscore");
/// ```
pub fn normalize_key(key: &str) -> String {
    key.nfkc()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Joins a parent path and a key into a dotted field path.
pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Reads typed fields out of JSON objects, recording every problem instead
/// of stopping at the first one.
#[derive(Debug)]
pub(crate) struct FieldReader {
    kind: TargetKind,
    issues: Vec<FieldIssue>,
    autofixes: Vec<Autofix>,
    constraints: ConstraintResults,
}

impl FieldReader {
    pub(crate) fn new(kind: TargetKind) -> Self {
        Self {
            kind,
            issues: Vec::new(),
            autofixes: Vec::new(),
            constraints: ConstraintResults::new(),
        }
    }

    pub(crate) fn issue(&mut self, field: impl Into<String>, problem: impl Into<String>) {
        self.issues.push(FieldIssue::new(field, problem));
    }

    pub(crate) fn fix(&mut self, autofix: Autofix) {
        log::warn!("autofix applied to {} response: {}", self.kind, autofix);
        self.autofixes.push(autofix);
    }

    /// Records an assert. A failure becomes an issue when the read finishes.
    pub(crate) fn assert(
        &mut self,
        field: &str,
        description: impl Into<String>,
        passed: bool,
    ) -> bool {
        self.constraints
            .add(Constraint::assert(field, description).validate(passed));
        passed
    }

    /// Records a check. A failure applies `repair` immediately.
    pub(crate) fn check(
        &mut self,
        field: &str,
        description: impl Into<String>,
        passed: bool,
        repair: Autofix,
    ) -> bool {
        self.constraints
            .add(Constraint::check(field, description).validate(passed));
        if !passed {
            self.fix(repair);
        }
        passed
    }

    /// Looks `key` up exactly, then by normalized spelling.
    ///
    /// `null` counts as absent.
    pub(crate) fn lookup<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<&'v Value> {
        if let Some(value) = obj.get(key) {
            return (!value.is_null()).then_some(value);
        }

        let wanted = normalize_key(key);
        let (found, value) = obj
            .iter()
            .find(|(k, v)| !v.is_null() && normalize_key(k) == wanted)?;
        self.fix(Autofix::KeyRenamed {
            from: found.clone(),
            to: join(path, key),
        });
        Some(value)
    }

    pub(crate) fn required<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<&'v Value> {
        let value = self.lookup(obj, path, key);
        if value.is_none() {
            self.issue(join(path, key), "missing required field");
        }
        value
    }

    pub(crate) fn string(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<String> {
        let value = self.required(obj, path, key)?;
        self.expect_string(value, &join(path, key))
    }

    /// Absent or `null` yields `Some(None)`; a wrong type yields `None`.
    pub(crate) fn optional_string(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<Option<String>> {
        match self.lookup(obj, path, key) {
            None => Some(None),
            Some(value) => self.expect_string(value, &join(path, key)).map(Some),
        }
    }

    pub(crate) fn expect_string(&mut self, value: &Value, field: &str) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.issue(field, format!("expected string, found {}", kind_of(other)));
                None
            }
        }
    }

    /// Reads a list of strings; when `required` is false a missing list is empty.
    pub(crate) fn string_list(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
        required: bool,
    ) -> Option<Vec<String>> {
        let field = join(path, key);
        let value = if required {
            self.required(obj, path, key)?
        } else {
            match self.lookup(obj, path, key) {
                Some(value) => value,
                None => return Some(Vec::new()),
            }
        };

        let Value::Array(items) = value else {
            self.issue(&field, format!("expected list, found {}", kind_of(value)));
            return None;
        };

        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, item) in items.iter().enumerate() {
            match self.expect_string(item, &format!("{field}[{i}]")) {
                Some(s) => out.push(s),
                None => ok = false,
            }
        }
        ok.then_some(out)
    }

    pub(crate) fn boolean(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<bool> {
        let value = self.required(obj, path, key)?;
        match value {
            Value::Bool(b) => Some(*b),
            other => {
                self.issue(
                    join(path, key),
                    format!("expected boolean, found {}", kind_of(other)),
                );
                None
            }
        }
    }

    /// Reads an integer; floats without a fractional part are accepted.
    pub(crate) fn integer(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<i64> {
        let value = self.required(obj, path, key)?;
        let int = value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        });
        if int.is_none() {
            self.issue(
                join(path, key),
                format!("expected integer, found {}", kind_of(value)),
            );
        }
        int
    }

    pub(crate) fn expect_object<'v>(
        &mut self,
        value: &'v Value,
        field: &str,
    ) -> Option<&'v Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.issue(field, format!("expected object, found {}", kind_of(other)));
                None
            }
        }
    }

    /// Completes the read: any recorded issue or failed assert fails the
    /// whole document.
    pub(crate) fn finish<T>(
        mut self,
        built: Option<T>,
    ) -> Result<(T, Vec<Autofix>), SchemaValidationError> {
        let failed: Vec<FieldIssue> = self
            .constraints
            .failing_asserts()
            .into_iter()
            .map(|r| FieldIssue::new(r.constraint.field.clone(), r.constraint.description.clone()))
            .collect();
        self.issues.extend(failed);

        match built {
            Some(value) if self.issues.is_empty() => Ok((value, self.autofixes)),
            _ => {
                let mut issues = self.issues;
                if issues.is_empty() {
                    issues.push(FieldIssue::new("", "document could not be read"));
                }
                Err(SchemaValidationError {
                    kind: self.kind,
                    issues,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("answerLevels"), "answerlevels");
        assert_eq!(normalize_key("Answer_Levels"), "answerlevels");
        assert_eq!(normalize_key("answer-levels"), "answerlevels");
        assert_eq!(normalize_key("qualityScore"), normalize_key("quality_score"));
    }

    #[test]
    fn test_lookup_records_rename() {
        let map = obj(json!({"AnswerLevels": {}}));
        let mut reader = FieldReader::new(TargetKind::Question);
        assert!(reader.lookup(&map, "", "answerLevels").is_some());
        let (_, fixes) = reader.finish(Some(())).unwrap();
        assert_eq!(
            fixes,
            vec![Autofix::KeyRenamed {
                from: "AnswerLevels".into(),
                to: "answerLevels".into()
            }]
        );
    }

    #[test]
    fn test_exact_key_wins() {
        let map = obj(json!({"text": "exact", "Text": "other"}));
        let mut reader = FieldReader::new(TargetKind::Question);
        assert_eq!(reader.string(&map, "", "text").as_deref(), Some("exact"));
    }

    #[test]
    fn test_issues_accumulate() {
        let map = obj(json!({"name": 3, "tags": ["a", 1]}));
        let mut reader = FieldReader::new(TargetKind::Quiz);
        assert!(reader.string(&map, "topic", "name").is_none());
        assert!(reader.string(&map, "topic", "platform").is_none());
        assert!(reader.string_list(&map, "", "tags", true).is_none());
        let err = reader.finish(Some(())).unwrap_err();
        assert_eq!(err.fields(), vec!["topic.name", "topic.platform", "tags[1]"]);
        assert_eq!(err.issues[0].problem, "expected string, found a number");
    }

    #[test]
    fn test_null_is_absent() {
        let map = obj(json!({"technology": null}));
        let mut reader = FieldReader::new(TargetKind::Quiz);
        assert_eq!(reader.optional_string(&map, "topic", "technology"), Some(None));
        assert!(reader.finish(Some(())).is_ok());
    }

    #[test]
    fn test_failed_assert_fails_finish() {
        let mut reader = FieldReader::new(TargetKind::Validation);
        assert!(reader.assert("clarity_score", "must be between 1 and 10", true));
        assert!(!reader.assert("quality_score", "must be between 1 and 10", false));
        let err = reader.finish(Some(())).unwrap_err();
        assert_eq!(err.fields(), vec!["quality_score"]);
        assert_eq!(err.issues[0].problem, "must be between 1 and 10");
    }

    #[test]
    fn test_failed_check_applies_repair() {
        let mut reader = FieldReader::new(TargetKind::Validation);
        assert!(!reader.check(
            "passed",
            "must equal quality_score >= 7",
            false,
            Autofix::PassedRecomputed { quality_score: 9 },
        ));
        let (_, fixes) = reader.finish(Some(())).unwrap();
        assert_eq!(fixes, vec![Autofix::PassedRecomputed { quality_score: 9 }]);
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        let map = obj(json!({"a": 8.0, "b": 7.5, "c": "8"}));
        let mut reader = FieldReader::new(TargetKind::Validation);
        assert_eq!(reader.integer(&map, "", "a"), Some(8));
        assert_eq!(reader.integer(&map, "", "b"), None);
        assert_eq!(reader.integer(&map, "", "c"), None);
    }

    #[test]
    fn test_optional_list_defaults_empty() {
        let map = obj(json!({}));
        let mut reader = FieldReader::new(TargetKind::Quiz);
        assert_eq!(reader.string_list(&map, "", "tags", false), Some(vec![]));
    }
}
