//! Whitelisted structural fixes applied before strict validation.

use serde_json::{Map, Value};

use super::{
    fields::FieldReader,
    model::{AnswerLevel, LevelName, Topic},
    RequestContext,
};
use crate::{
    value::Autofix,
};

/// Minimum `quality_score` for a question to pass validation.
pub const PASSING_QUALITY_SCORE: i64 = 7;

/// Turns a bare-string `topic` into a full topic object.
///
/// The platform and technology come from top-level document fields when
/// present, otherwise from the request context.
pub(crate) fn wrap_string_topic(
    reader: &mut FieldReader,
    root: &Map<String, Value>,
    name: &str,
    ctx: &RequestContext,
) -> Option<Topic> {
    let platform = top_level_string(root, "platform").or_else(|| non_empty(&ctx.platform));
    let technology =
        top_level_string(root, "technology").or_else(|| non_empty(&ctx.technology));

    let Some(platform) = platform else {
        reader.issue(
            "topic.platform",
            "topic is a bare string and no platform is available to complete it",
        );
        return None;
    };

    reader.fix(Autofix::TopicWrapped {
        name: name.to_string(),
    });
    Some(Topic {
        name: name.to_string(),
        platform,
        technology,
    })
}

/// Uses a top-level `question` string when `text` is absent.
pub(crate) fn question_as_text(
    reader: &mut FieldReader,
    root: &Map<String, Value>,
) -> Option<String> {
    match root.get("question") {
        Some(Value::String(question)) => {
            reader.fix(Autofix::QuestionAsText);
            Some(question.clone())
        }
        _ => {
            reader.issue("text", "missing required field");
            None
        }
    }
}

/// Builds the placeholder for an answer level the provider left out.
pub(crate) fn stub_level(reader: &mut FieldReader, level: LevelName) -> AnswerLevel {
    reader.fix(Autofix::LevelStubbed { level });
    AnswerLevel::stub(level)
}

/// Derives `passed` from `quality_score`, which is authoritative.
///
/// A reported value that disagrees is replaced and logged.
pub(crate) fn reconcile_passed(
    reader: &mut FieldReader,
    reported: Option<bool>,
    quality_score: i64,
) -> bool {
    let derived = quality_score >= PASSING_QUALITY_SCORE;
    if let Some(reported) = reported {
        let consistent = reader.check(
            "passed",
            "must equal quality_score >= 7",
            reported == derived,
            Autofix::PassedRecomputed { quality_score },
        );
        if !consistent {
            log::warn!(
                "validation reported passed={} but quality_score={}; using {}",
                reported,
                quality_score,
                derived
            );
        }
    }
    derived
}

fn top_level_string(root: &Map<String, Value>, key: &str) -> Option<String> {
    root.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::TargetKind;

    fn root(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_wrap_topic_from_context() {
        let ctx = RequestContext::new("Memory", "Apple").with_technology("ObjC");
        let mut reader = FieldReader::new(TargetKind::Quiz);
        let topic = wrap_string_topic(&mut reader, &root(json!({})), "ARC", &ctx).unwrap();
        assert_eq!(topic.name, "ARC");
        assert_eq!(topic.platform, "Apple");
        assert_eq!(topic.technology.as_deref(), Some("ObjC"));
    }

    #[test]
    fn test_wrap_topic_prefers_document_fields() {
        let ctx = RequestContext::new("Memory", "Apple").with_technology("ObjC");
        let doc = root(json!({"platform": "iOS", "technology": "Swift"}));
        let mut reader = FieldReader::new(TargetKind::Question);
        let topic = wrap_string_topic(&mut reader, &doc, "ARC", &ctx).unwrap();
        assert_eq!(topic.platform, "iOS");
        assert_eq!(topic.technology.as_deref(), Some("Swift"));
    }

    #[test]
    fn test_wrap_topic_without_platform() {
        let mut reader = FieldReader::new(TargetKind::Quiz);
        let topic = wrap_string_topic(
            &mut reader,
            &root(json!({})),
            "ARC",
            &RequestContext::default(),
        );
        assert!(topic.is_none());
        let err = reader.finish(topic).unwrap_err();
        assert!(err.mentions("topic.platform"));
    }

    #[test]
    fn test_reconcile_passed() {
        let mut reader = FieldReader::new(TargetKind::Validation);
        assert!(reconcile_passed(&mut reader, Some(false), 8));
        assert!(!reconcile_passed(&mut reader, None, 6));
        assert!(!reconcile_passed(&mut reader, Some(false), 6));

        let (_, fixes) = reader.finish(Some(())).unwrap();
        assert_eq!(fixes, vec![Autofix::PassedRecomputed { quality_score: 8 }]);
    }
}
