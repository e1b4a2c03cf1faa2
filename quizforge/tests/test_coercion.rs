//! Schema coercion of decoded documents.

use pretty_assertions::assert_eq;
use quizforge::{
    schema::{
        coerce, LevelName, QuizStyle, RequestContext, TargetKind, Topic, TypedResult,
        PASSING_QUALITY_SCORE,
    },
    value::Autofix,
};
use serde_json::{json, Value};

fn level(name: &str) -> Value {
    let test = json!({
        "snippet": "```swift\nlet x = 1\n```\nWhat is x?",
        "options": ["1. 0", "2. 1", "3. nil"],
        "answer": "2"
    });
    json!({
        "name": name,
        "answer": format!("{name} answer"),
        "tests": [test, test, test],
        "evaluationCriteria": "Explains the value"
    })
}

fn question(levels: Value) -> Value {
    json!({
        "topic": {"name": "ARC", "platform": "Apple", "technology": "Objective-C"},
        "text": "Explain ARC.",
        "tags": ["arc"],
        "answerLevels": levels
    })
}

fn validation(quality_score: i64, passed: bool) -> Value {
    json!({
        "is_text_clear": true,
        "is_question_correspond": true,
        "is_question_not_trivial": true,
        "do_answer_levels_exist": true,
        "are_answer_levels_valid": true,
        "has_evaluation_criteria": true,
        "are_answer_levels_different": false,
        "do_tests_exist": true,
        "do_tags_exist": true,
        "do_test_options_exist": true,
        "is_question_text_different_from_existing_questions": true,
        "are_test_options_numbered": true,
        "does_answer_contain_option_number": true,
        "are_code_blocks_marked_if_they_exist": true,
        "does_snippet_have_question": true,
        "does_snippet_have_code": true,
        "clarity_score": 8,
        "relevance_score": 9,
        "difficulty_score": 7,
        "structure_score": 8,
        "code_quality_score": 6,
        "quality_score": quality_score,
        "clarity_feedback": "Clear",
        "relevance_feedback": "Relevant",
        "difficulty_feedback": "Fine",
        "structure_feedback": "Good",
        "code_quality_feedback": "Could use more code",
        "comments": "Solid question",
        "recommendations": ["Differentiate levels"],
        "passed": passed
    })
}

#[test]
fn test_bare_string_topic_uses_context() {
    let ctx = RequestContext::new("Memory", "Apple").with_technology("ObjC");
    let doc = json!({"topic": "ARC", "question": "What is a weak reference?"});
    let coerced = coerce(&doc, TargetKind::Quiz, &ctx).unwrap();
    let TypedResult::Quiz(quiz) = coerced.result else {
        panic!("expected quiz");
    };
    assert_eq!(
        quiz.topic,
        Topic {
            name: "ARC".into(),
            platform: "Apple".into(),
            technology: Some("ObjC".into()),
        }
    );
    assert_eq!(
        coerced.autofixes,
        vec![Autofix::TopicWrapped { name: "ARC".into() }]
    );
}

#[test]
fn test_bare_string_topic_without_platform_fails() {
    let doc = json!({"topic": "ARC", "question": "What is a weak reference?"});
    let err = coerce(&doc, TargetKind::Quiz, &RequestContext::default()).unwrap_err();
    assert_eq!(err.fields(), vec!["topic.platform"]);
}

#[test]
fn test_missing_advanced_level_is_stubbed() {
    let doc = question(json!({
        "beginner": level("Beginner"),
        "intermediate": level("Intermediate")
    }));
    let coerced = coerce(&doc, TargetKind::Question, &RequestContext::default()).unwrap();
    let TypedResult::Question(q) = coerced.result else {
        panic!("expected question");
    };
    let advanced = q.answer_levels.get(LevelName::Advanced);
    assert_eq!(advanced.name, "Advanced");
    assert!(advanced.answer.is_empty());
    assert!(advanced.tests.is_empty());
    assert!(advanced.evaluation_criteria.is_empty());
    assert_eq!(q.stubbed_levels(), &[LevelName::Advanced]);
}

#[test]
fn test_two_missing_levels_are_stubbed() {
    let doc = question(json!({"intermediate": level("Intermediate")}));
    let coerced = coerce(&doc, TargetKind::Question, &RequestContext::default()).unwrap();
    let TypedResult::Question(q) = coerced.result else {
        panic!("expected question");
    };
    assert_eq!(
        q.stubbed_levels(),
        &[LevelName::Beginner, LevelName::Advanced]
    );
}

#[test]
fn test_missing_all_levels_is_an_error() {
    let err = coerce(
        &question(json!({})),
        TargetKind::Question,
        &RequestContext::default(),
    )
    .unwrap_err();
    assert!(err.mentions("answerLevels"));
    assert_eq!(err.kind, TargetKind::Question);
}

#[test]
fn test_every_offending_field_is_listed() {
    let doc = json!({
        "topic": {"name": 1},
        "tags": "not a list",
        "answerLevels": {"beginner": level("Beginner")}
    });
    let err = coerce(&doc, TargetKind::Question, &RequestContext::default()).unwrap_err();
    assert_eq!(
        err.fields(),
        vec!["topic.name", "topic.platform", "text", "tags"]
    );
}

#[test]
fn test_key_spellings_are_normalized() {
    let mut beginner = level("Beginner");
    let criteria = beginner
        .as_object_mut()
        .unwrap()
        .remove("evaluationCriteria")
        .unwrap();
    beginner["evaluation_criteria"] = criteria;
    let doc = json!({
        "Topic": {"name": "ARC", "platform": "Apple"},
        "text": "Explain ARC.",
        "tags": [],
        "AnswerLevels": {
            "Beginner": beginner,
            "intermediate": level("Intermediate"),
            "advanced": level("Advanced")
        }
    });
    let coerced = coerce(&doc, TargetKind::Question, &RequestContext::default()).unwrap();
    let renamed: Vec<String> = coerced
        .autofixes
        .iter()
        .filter_map(|fix| match fix {
            Autofix::KeyRenamed { to, .. } => Some(to.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        renamed,
        vec![
            "topic",
            "answerLevels",
            "answerLevels.beginner",
            "answerLevels.beginner.evaluationCriteria"
        ]
    );
}

#[test]
fn test_passed_is_recomputed_from_quality_score() {
    let coerced = coerce(
        &validation(8, false),
        TargetKind::Validation,
        &RequestContext::default(),
    )
    .unwrap();
    let TypedResult::Validation(v) = coerced.result else {
        panic!("expected validation");
    };
    assert!(v.passed);
    assert_eq!(v.quality_score, 8);
    assert!(i64::from(v.quality_score) >= PASSING_QUALITY_SCORE);
}

#[test]
fn test_consistent_passed_needs_no_fix() {
    let coerced = coerce(
        &validation(6, false),
        TargetKind::Validation,
        &RequestContext::default(),
    )
    .unwrap();
    assert!(coerced.autofixes.is_empty());
}

#[test]
fn test_scores_outside_range_are_rejected() {
    let mut doc = validation(8, true);
    doc["difficulty_score"] = json!(12);
    doc["structure_score"] = json!(7.5);
    let err = coerce(&doc, TargetKind::Validation, &RequestContext::default()).unwrap_err();
    assert_eq!(err.fields(), vec!["structure_score", "difficulty_score"]);
}

#[test]
fn test_user_quiz_style_keys_are_closed() {
    let ctx = RequestContext::new("ARC", "Apple");
    let doc = json!({
        "topic": "ARC",
        "question": "What leaks here?",
        "result": {"PITFALL": "Retain cycles", "mistake": "None found"}
    });
    let coerced = coerce(&doc, TargetKind::UserQuiz, &ctx).unwrap();
    let TypedResult::UserQuiz(quiz) = coerced.result else {
        panic!("expected user quiz");
    };
    let styles: Vec<QuizStyle> = quiz.result.keys().copied().collect();
    assert_eq!(styles, vec![QuizStyle::Pitfall, QuizStyle::Mistake]);
}

#[test]
fn test_user_quiz_needs_a_result() {
    let doc = json!({
        "topic": {"name": "ARC", "platform": "Apple"},
        "question": "What leaks here?",
        "result": {}
    });
    let err = coerce(&doc, TargetKind::UserQuiz, &RequestContext::default()).unwrap_err();
    assert_eq!(err.fields(), vec!["result"]);
}
