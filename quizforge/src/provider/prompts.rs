//! Prompt construction shared by the provider adapters.

use std::fmt::Write as _;

use super::{AgentRequest, Operation};
use crate::schema::{Question, QuizStyle};

/// Shape of the generation response a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionShape {
    /// `topic` is an object with name, platform and technology.
    Nested,
    /// `platform`, `topic` and `question` are top-level strings.
    Flat,
}

const JSON_ONLY: &str = "Return ONLY valid JSON. Do not wrap the response in markdown \
fences and do not add any text before or after the JSON object. Escape line breaks, tabs \
and quotes inside string values. Code blocks are allowed only inside string values and \
must be marked with a language (for example ```swift).";

const NESTED_QUESTION_EXAMPLE: &str = r#"{
  "topic": {"name": "ARC", "platform": "Apple", "technology": "Objective-C"},
  "text": "How does ARC decide when to release an object?",
  "tags": ["memory", "arc", "retain cycle"],
  "answerLevels": {
    "beginner": {
      "name": "Beginner",
      "answer": "...",
      "tests": [{"snippet": "```objc\n...\n```\nWhat is printed?", "options": ["1. ...", "2. ...", "3. ..."], "answer": "2"}],
      "evaluationCriteria": "..."
    },
    "intermediate": {"name": "Intermediate", "answer": "...", "tests": [], "evaluationCriteria": "..."},
    "advanced": {"name": "Advanced", "answer": "...", "tests": [], "evaluationCriteria": "..."}
  }
}"#;

const FLAT_QUESTION_EXAMPLE: &str = r#"{
  "platform": "iOS",
  "topic": "SwiftUI State Management",
  "tags": ["iOS", "Swift", "SwiftUI", "State"],
  "question": "Implement a counter view that can increment, decrement and reset a value.",
  "answerLevels": {
    "beginner": {"name": "Beginner", "answer": "...", "tests": [], "evaluationCriteria": "..."},
    "intermediate": {"name": "Intermediate", "answer": "...", "tests": [], "evaluationCriteria": "..."},
    "advanced": {"name": "Advanced", "answer": "...", "tests": [], "evaluationCriteria": "..."}
  }
}"#;

const VALIDATION_KEYS: &str = "is_text_clear, is_question_correspond, is_question_not_trivial, \
do_answer_levels_exist, are_answer_levels_valid, has_evaluation_criteria, \
are_answer_levels_different, do_tests_exist, do_tags_exist, do_test_options_exist, \
is_question_text_different_from_existing_questions, are_test_options_numbered, \
does_answer_contain_option_number, are_code_blocks_marked_if_they_exist, \
does_snippet_have_question, does_snippet_have_code (booleans); clarity_score, \
relevance_score, difficulty_score, structure_score, code_quality_score, quality_score \
(integers 1-10); clarity_feedback, relevance_feedback, difficulty_feedback, \
structure_feedback, code_quality_feedback, comments (strings); recommendations (list of \
strings); passed (boolean, true when quality_score >= 7)";

const QUIZ_EXAMPLE: &str = r#"{
  "topic": {"name": "ARC", "platform": "Apple", "technology": "Objective-C"},
  "question": "What happens when two objects hold strong references to each other?",
  "tags": ["arc", "retain cycle"]
}"#;

/// System prompt for `operation`.
pub fn system_prompt(operation: Operation, shape: QuestionShape) -> String {
    match operation {
        Operation::Generate => {
            let example = match shape {
                QuestionShape::Nested => NESTED_QUESTION_EXAMPLE,
                QuestionShape::Flat => FLAT_QUESTION_EXAMPLE,
            };
            format!(
                "You are an expert programming question generator. Create one clear, \
                 specific question for the given topic and platform with three answer \
                 levels: Beginner, Intermediate and Advanced. Every level has exactly 3 \
                 tests; each test has a code snippet with a question, more than 2 numbered \
                 options and the number of the correct option as its answer. Make the \
                 levels genuinely different in depth.\n\n{JSON_ONLY}\n\nExample:\n{example}"
            )
        }
        Operation::Validate => format!(
            "You are an expert at evaluating programming questions. Check clarity, \
             relevance to topic and tags, the three answer levels, their tests and \
             evaluation criteria, and code formatting. Score each aspect from 1 to 10. \
             The question passes when the overall quality score is 7 or higher.\n\n\
             {JSON_ONLY}\n\nRespond with an object with these keys: {VALIDATION_KEYS}."
        ),
        Operation::Quiz => format!(
            "You are an expert programming teacher. Write one short quiz question on the \
             given topic that checks real understanding rather than recall.\n\n\
             {JSON_ONLY}\n\nExample:\n{QUIZ_EXAMPLE}"
        ),
        Operation::UserQuiz => {
            let styles: Vec<&str> = QuizStyle::ALL.iter().map(|s| s.as_str()).collect();
            format!(
                "You are an expert programming teacher. Based on the student's text and \
                 the requested style, write one follow-up question and a `result` object \
                 whose keys are style names ({}) and whose values are the explanation for \
                 that style. Expand deepens the topic, Pitfall points at risks and \
                 misconceptions, Application asks about real-world use, Compare contrasts \
                 related concepts, Mistake reviews the student's text for errors and Humor \
                 is a short programming joke on the topic.\n\n{JSON_ONLY}\n\nExample:\n\
                 {{\"topic\": {{\"name\": \"ARC\", \"platform\": \"Apple\"}}, \"question\": \
                 \"...\", \"tags\": [], \"result\": {{\"Pitfall\": \"...\"}}}}",
                styles.join(", ")
            )
        }
    }
}

/// User prompt carrying the request fields for `operation`.
pub fn user_prompt(operation: Operation, request: &AgentRequest) -> String {
    let ctx = &request.context;
    let mut out = String::new();
    match operation {
        Operation::Generate | Operation::Quiz => {
            let noun = if operation == Operation::Generate {
                "a programming question"
            } else {
                "a quiz question"
            };
            let _ = writeln!(out, "Create {noun} with the following parameters:");
            push_field(&mut out, "Platform", ctx.platform.as_deref());
            push_field(&mut out, "Topic", ctx.topic.as_deref());
            push_field(&mut out, "Technology", ctx.technology.as_deref());
            if !ctx.tags.is_empty() {
                let _ = writeln!(out, "- Tags: {}", ctx.tags.join(", "));
            }
        }
        Operation::Validate => {
            out.push_str("Validate the following programming question:\n");
            if let Some(question) = &request.question {
                push_question(&mut out, question);
            }
        }
        Operation::UserQuiz => {
            out.push_str("Create a follow-up question based on the student's text:\n");
            push_field(&mut out, "Student text", ctx.question.as_deref());
            push_field(&mut out, "Platform", ctx.platform.as_deref());
            push_field(&mut out, "Topic", ctx.topic.as_deref());
            push_field(&mut out, "Technology", ctx.technology.as_deref());
            match ctx.style {
                Some(style) => {
                    let _ = writeln!(
                        out,
                        "- Question style: {style}\nAlways include the \"{style}\" key in result."
                    );
                }
                None => {
                    out.push_str("- Question style: any\nInclude all six style keys in result.\n");
                }
            }
        }
    }
    out
}

fn push_field(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        let _ = writeln!(out, "- {label}: {value}");
    }
}

fn push_question(out: &mut String, question: &Question) {
    match serde_json::to_string_pretty(question) {
        Ok(json) => out.push_str(&json),
        Err(_) => out.push_str(&question.text),
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RequestContext;

    fn request(context: RequestContext) -> AgentRequest {
        AgentRequest::new("gpt-4o", context)
    }

    #[test]
    fn test_generate_prompt_lists_parameters() {
        let ctx = RequestContext::new("ARC", "Apple")
            .with_technology("Objective-C")
            .with_tags(["memory"]);
        let prompt = user_prompt(Operation::Generate, &request(ctx));
        assert!(prompt.contains("- Platform: Apple"));
        assert!(prompt.contains("- Topic: ARC"));
        assert!(prompt.contains("- Technology: Objective-C"));
        assert!(prompt.contains("- Tags: memory"));
    }

    #[test]
    fn test_blank_fields_omitted() {
        let mut ctx = RequestContext::new("ARC", "Apple");
        ctx.technology = Some("  ".into());
        let prompt = user_prompt(Operation::Quiz, &request(ctx));
        assert!(!prompt.contains("Technology"));
    }

    #[test]
    fn test_flat_shape_uses_top_level_question() {
        let nested = system_prompt(Operation::Generate, QuestionShape::Nested);
        let flat = system_prompt(Operation::Generate, QuestionShape::Flat);
        assert!(nested.contains("\"text\""));
        assert!(flat.contains("\"question\""));
        assert!(!flat.contains("\"text\""));
    }

    #[test]
    fn test_user_quiz_style() {
        let ctx = RequestContext::default()
            .with_question("ARC counts references")
            .with_style(QuizStyle::Pitfall);
        let prompt = user_prompt(Operation::UserQuiz, &request(ctx));
        assert!(prompt.contains("Student text: ARC counts references"));
        assert!(prompt.contains("\"Pitfall\" key"));
    }

    #[test]
    fn test_validate_prompt_lists_all_keys() {
        let prompt = system_prompt(Operation::Validate, QuestionShape::Nested);
        assert!(prompt.contains("does_snippet_have_code"));
        assert!(prompt.contains("quality_score >= 7"));
    }
}
