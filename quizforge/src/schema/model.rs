//! Typed quiz schemas and their validating readers.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    autofix, coerce,
    fields::{join, normalize_key, FieldReader},
    RequestContext, TargetKind, TypedResult,
};
use crate::{error::SchemaValidationError, parser::strategies::kind_of, value::Autofix};

/// Number of tests every provided answer level must carry.
pub const TESTS_PER_LEVEL: usize = 3;

/// Lowest and highest allowed validation score.
pub const SCORE_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// Topic and platform a question belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    /// Topic name, e.g. "ARC".
    pub name: String,
    /// Platform, e.g. "Apple".
    pub platform: String,
    /// Technology stack, e.g. "Objective-C".
    pub technology: Option<String>,
}

/// A multiple-choice test attached to an answer level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeTest {
    /// Code snippet and the question about it.
    pub snippet: String,
    /// Numbered answer options.
    pub options: Vec<String>,
    /// Number of the correct option, e.g. "2".
    pub answer: String,
}

impl CodeTest {
    /// The 1-based option number referenced by `answer`, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use quizforge::schema::CodeTest;
    ///
    /// let test = CodeTest {
    ///     snippet: "let x = 1".into(),
    ///     options: vec!["1. a".into(), "2. b".into(), "3. c".into()],
    ///     answer: "Option 2".into(),
    /// };
    /// assert_eq!(test.answer_option(), Some(2));
    /// ```
    pub fn answer_option(&self) -> Option<usize> {
        first_integer(&self.answer).filter(|n| (1..=self.options.len()).contains(n))
    }
}

fn first_integer(text: &str) -> Option<usize> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Difficulty level of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LevelName {
    Beginner,
    Intermediate,
    Advanced,
}

impl LevelName {
    /// All levels in ascending difficulty.
    pub const ALL: [Self; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    /// Key under `answerLevels`.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Value required in the level's `name` field.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Answer and tests for one difficulty level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerLevel {
    /// "Beginner", "Intermediate" or "Advanced".
    pub name: String,
    /// Detailed answer at this level.
    pub answer: String,
    /// Exactly three tests, or none for a stubbed level.
    pub tests: Vec<CodeTest>,
    /// How knowledge at this level is evaluated.
    #[serde(rename = "evaluationCriteria")]
    pub evaluation_criteria: String,
}

impl AnswerLevel {
    /// An empty placeholder for a level the provider did not supply.
    pub fn stub(level: LevelName) -> Self {
        Self {
            name: level.display_name().to_string(),
            answer: String::new(),
            tests: Vec::new(),
            evaluation_criteria: String::new(),
        }
    }
}

/// The three answer levels of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerLevels {
    pub beginner: AnswerLevel,
    pub intermediate: AnswerLevel,
    pub advanced: AnswerLevel,
}

impl AnswerLevels {
    /// Returns the level in `slot`.
    pub const fn get(&self, slot: LevelName) -> &AnswerLevel {
        match slot {
            LevelName::Beginner => &self.beginner,
            LevelName::Intermediate => &self.intermediate,
            LevelName::Advanced => &self.advanced,
        }
    }
}

/// A generated programming question with three answer levels.
///
/// Deserializing runs the same coercion as a provider response, so a
/// `Question` built from JSON always satisfies the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Question {
    pub topic: Topic,
    /// Question text; code blocks are fenced.
    pub text: String,
    pub tags: Vec<String>,
    #[serde(rename = "answerLevels")]
    pub answer_levels: AnswerLevels,
    #[serde(skip)]
    stubbed: Vec<LevelName>,
}

impl Question {
    /// Levels that were missing from the response and filled with stubs.
    pub fn stubbed_levels(&self) -> &[LevelName] {
        &self.stubbed
    }
}

impl TryFrom<Value> for Question {
    type Error = SchemaValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match coerce(&value, TargetKind::Question, &RequestContext::default())?.result {
            TypedResult::Question(question) => Ok(question),
            other => Err(SchemaValidationError::single(
                TargetKind::Question,
                "",
                format!("coerced into {}", other.kind()),
            )),
        }
    }
}

/// A single follow-up question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quiz {
    pub topic: Topic,
    pub question: String,
    pub tags: Vec<String>,
}

/// Style of a user-quiz result entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuizStyle {
    Expand,
    Pitfall,
    Application,
    Compare,
    Mistake,
    Humor,
}

impl QuizStyle {
    /// All styles in prompt order.
    pub const ALL: [Self; 6] = [
        Self::Expand,
        Self::Pitfall,
        Self::Application,
        Self::Compare,
        Self::Mistake,
        Self::Humor,
    ];

    /// Canonical key used in `result`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expand => "Expand",
            Self::Pitfall => "Pitfall",
            Self::Application => "Application",
            Self::Compare => "Compare",
            Self::Mistake => "Mistake",
            Self::Humor => "Humor",
        }
    }
}

impl fmt::Display for QuizStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizStyle {
    type Err = String;

    /// Case- and separator-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_key(s);
        Self::ALL
            .into_iter()
            .find(|style| normalize_key(style.as_str()) == wanted)
            .ok_or_else(|| format!("unknown quiz style '{s}'"))
    }
}

/// A follow-up question generated from a student's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserQuiz {
    pub topic: Topic,
    pub question: String,
    pub tags: Vec<String>,
    /// Explanation per requested style.
    pub result: BTreeMap<QuizStyle, String>,
}

/// Quality assessment of a [`Question`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub is_text_clear: bool,
    pub is_question_correspond: bool,
    pub is_question_not_trivial: bool,
    pub do_answer_levels_exist: bool,
    pub are_answer_levels_valid: bool,
    pub has_evaluation_criteria: bool,
    pub are_answer_levels_different: bool,
    pub do_tests_exist: bool,
    pub do_tags_exist: bool,
    pub do_test_options_exist: bool,
    pub is_question_text_different_from_existing_questions: bool,
    pub are_test_options_numbered: bool,
    pub does_answer_contain_option_number: bool,
    pub are_code_blocks_marked_if_they_exist: bool,
    pub does_snippet_have_question: bool,
    pub does_snippet_have_code: bool,

    pub clarity_score: u8,
    pub relevance_score: u8,
    pub difficulty_score: u8,
    pub structure_score: u8,
    pub code_quality_score: u8,
    pub quality_score: u8,

    pub clarity_feedback: String,
    pub relevance_feedback: String,
    pub difficulty_feedback: String,
    pub structure_feedback: String,
    pub code_quality_feedback: String,

    pub comments: String,
    pub recommendations: Vec<String>,
    /// Always `quality_score >= 7`.
    pub passed: bool,
}

// Readers. Each records every problem it sees in the `FieldReader` and
// returns `None` if the value cannot be built.

pub(super) fn read_topic(
    r: &mut FieldReader,
    root: &Map<String, Value>,
    ctx: &RequestContext,
) -> Option<Topic> {
    let Some(value) = r.lookup(root, "", "topic") else {
        r.issue("topic", "missing required field");
        return None;
    };

    match value {
        Value::String(name) => autofix::wrap_string_topic(r, root, name, ctx),
        Value::Object(map) => {
            let name = r.string(map, "topic", "name");
            let platform = r.string(map, "topic", "platform");
            let technology = r.optional_string(map, "topic", "technology");
            Some(Topic {
                name: name?,
                platform: platform?,
                technology: technology?,
            })
        }
        other => {
            r.issue(
                "topic",
                format!("expected object or string, found {}", kind_of(other)),
            );
            None
        }
    }
}

pub(super) fn read_question(
    r: &mut FieldReader,
    root: &Map<String, Value>,
    ctx: &RequestContext,
) -> Option<Question> {
    let topic = read_topic(r, root, ctx);
    let text = match r.lookup(root, "", "text") {
        Some(value) => r.expect_string(value, "text"),
        None => autofix::question_as_text(r, root),
    };
    let tags = r.string_list(root, "", "tags", true);
    let levels = match r.lookup(root, "", "answerLevels") {
        Some(value) => r
            .expect_object(value, "answerLevels")
            .and_then(|map| read_levels(r, map)),
        None => {
            r.issue("answerLevels", "missing required field");
            None
        }
    };

    let (answer_levels, stubbed) = levels?;
    Some(Question {
        topic: topic?,
        text: text?,
        tags: tags?,
        answer_levels,
        stubbed,
    })
}

fn read_levels(
    r: &mut FieldReader,
    map: &Map<String, Value>,
) -> Option<(AnswerLevels, Vec<LevelName>)> {
    let mut found: Vec<(LevelName, Option<&Value>)> = Vec::with_capacity(LevelName::ALL.len());
    for level in LevelName::ALL {
        let mut value = r.lookup(map, "answerLevels", level.key());
        // Older prompts spelled this key "beginer".
        if value.is_none() && level == LevelName::Beginner {
            value = r.lookup(map, "answerLevels", "beginer");
            if value.is_some() {
                r.fix(Autofix::KeyRenamed {
                    from: "beginer".to_string(),
                    to: join("answerLevels", level.key()),
                });
            }
        }
        found.push((level, value));
    }

    if found.iter().all(|(_, value)| value.is_none()) {
        r.issue(
            "answerLevels",
            "no answer levels present; expected beginner, intermediate and advanced",
        );
        return None;
    }

    let mut stubbed = Vec::new();
    let mut levels = Vec::with_capacity(LevelName::ALL.len());
    for (level, value) in found {
        match value {
            Some(value) => levels.push(read_level(r, value, level)),
            None => {
                stubbed.push(level);
                levels.push(Some(autofix::stub_level(r, level)));
            }
        }
    }

    let mut levels = levels.into_iter();
    let beginner = levels.next().flatten();
    let intermediate = levels.next().flatten();
    let advanced = levels.next().flatten();
    Some((
        AnswerLevels {
            beginner: beginner?,
            intermediate: intermediate?,
            advanced: advanced?,
        },
        stubbed,
    ))
}

fn read_level(r: &mut FieldReader, value: &Value, slot: LevelName) -> Option<AnswerLevel> {
    let path = join("answerLevels", slot.key());
    let map = r.expect_object(value, &path)?;

    let name = r.string(map, &path, "name");
    if let Some(name) = &name {
        if name != slot.display_name() {
            r.issue(
                join(&path, "name"),
                format!("expected '{}', found '{}'", slot.display_name(), name),
            );
        }
    }
    let answer = r.string(map, &path, "answer");
    let tests = read_tests(r, map, &path);
    let evaluation_criteria = r.string(map, &path, "evaluationCriteria");

    Some(AnswerLevel {
        name: name?,
        answer: answer?,
        tests: tests?,
        evaluation_criteria: evaluation_criteria?,
    })
}

fn read_tests(r: &mut FieldReader, level: &Map<String, Value>, path: &str) -> Option<Vec<CodeTest>> {
    let field = join(path, "tests");
    let value = r.required(level, path, "tests")?;
    let Value::Array(items) = value else {
        r.issue(&field, format!("expected list, found {}", kind_of(value)));
        return None;
    };

    if items.len() != TESTS_PER_LEVEL {
        r.issue(
            &field,
            format!(
                "expected exactly {} tests, found {}",
                TESTS_PER_LEVEL,
                items.len()
            ),
        );
    }

    let tests: Vec<Option<CodeTest>> = items
        .iter()
        .enumerate()
        .map(|(i, item)| read_test(r, item, &format!("{field}[{i}]")))
        .collect();
    tests.into_iter().collect()
}

fn read_test(r: &mut FieldReader, value: &Value, path: &str) -> Option<CodeTest> {
    let map = r.expect_object(value, path)?;
    let snippet = r.string(map, path, "snippet");
    let options = r.string_list(map, path, "options", true);
    let answer = r.string(map, path, "answer");

    let test = CodeTest {
        snippet: snippet?,
        options: options?,
        answer: answer?,
    };

    if test.options.len() <= 2 {
        r.issue(
            join(path, "options"),
            format!("expected more than 2 options, found {}", test.options.len()),
        );
    }
    if test.answer_option().is_none() {
        r.issue(
            join(path, "answer"),
            format!(
                "must reference an option number between 1 and {}",
                test.options.len()
            ),
        );
    }
    Some(test)
}

pub(super) fn read_quiz(
    r: &mut FieldReader,
    root: &Map<String, Value>,
    ctx: &RequestContext,
) -> Option<Quiz> {
    let topic = read_topic(r, root, ctx);
    let question = r.string(root, "", "question");
    let tags = r.string_list(root, "", "tags", false);
    Some(Quiz {
        topic: topic?,
        question: question?,
        tags: tags?,
    })
}

pub(super) fn read_user_quiz(
    r: &mut FieldReader,
    root: &Map<String, Value>,
    ctx: &RequestContext,
) -> Option<UserQuiz> {
    let quiz = read_quiz(r, root, ctx);
    let result = match r.lookup(root, "", "result") {
        Some(value) => r
            .expect_object(value, "result")
            .and_then(|map| read_styles(r, map)),
        None => {
            r.issue("result", "missing required field");
            None
        }
    };

    let quiz = quiz?;
    Some(UserQuiz {
        topic: quiz.topic,
        question: quiz.question,
        tags: quiz.tags,
        result: result?,
    })
}

fn read_styles(
    r: &mut FieldReader,
    map: &Map<String, Value>,
) -> Option<BTreeMap<QuizStyle, String>> {
    if map.is_empty() {
        r.issue("result", "expected at least one style entry");
        return None;
    }

    let mut result = BTreeMap::new();
    let mut ok = true;
    for (key, value) in map {
        let Ok(style) = key.parse::<QuizStyle>() else {
            r.issue(
                join("result", key),
                "unknown style; expected Expand, Pitfall, Application, Compare, Mistake or Humor",
            );
            ok = false;
            continue;
        };
        if key != style.as_str() {
            r.fix(Autofix::KeyRenamed {
                from: key.clone(),
                to: join("result", style.as_str()),
            });
        }
        match r.expect_string(value, &join("result", style.as_str())) {
            Some(text) => {
                result.insert(style, text);
            }
            None => ok = false,
        }
    }
    ok.then_some(result)
}

pub(super) fn read_validation(
    r: &mut FieldReader,
    root: &Map<String, Value>,
) -> Option<Validation> {
    let is_text_clear = r.boolean(root, "", "is_text_clear");
    let is_question_correspond = r.boolean(root, "", "is_question_correspond");
    let is_question_not_trivial = r.boolean(root, "", "is_question_not_trivial");
    let do_answer_levels_exist = r.boolean(root, "", "do_answer_levels_exist");
    let are_answer_levels_valid = r.boolean(root, "", "are_answer_levels_valid");
    let has_evaluation_criteria = r.boolean(root, "", "has_evaluation_criteria");
    let are_answer_levels_different = r.boolean(root, "", "are_answer_levels_different");
    let do_tests_exist = r.boolean(root, "", "do_tests_exist");
    let do_tags_exist = r.boolean(root, "", "do_tags_exist");
    let do_test_options_exist = r.boolean(root, "", "do_test_options_exist");
    let is_question_text_different_from_existing_questions = r.boolean(
        root,
        "",
        "is_question_text_different_from_existing_questions",
    );
    let are_test_options_numbered = r.boolean(root, "", "are_test_options_numbered");
    let does_answer_contain_option_number =
        r.boolean(root, "", "does_answer_contain_option_number");
    let are_code_blocks_marked_if_they_exist =
        r.boolean(root, "", "are_code_blocks_marked_if_they_exist");
    let does_snippet_have_question = r.boolean(root, "", "does_snippet_have_question");
    let does_snippet_have_code = r.boolean(root, "", "does_snippet_have_code");

    let clarity_score = read_score(r, root, "clarity_score");
    let relevance_score = read_score(r, root, "relevance_score");
    let difficulty_score = read_score(r, root, "difficulty_score");
    let structure_score = read_score(r, root, "structure_score");
    let code_quality_score = read_score(r, root, "code_quality_score");
    let quality_score = read_score(r, root, "quality_score");

    let clarity_feedback = r.string(root, "", "clarity_feedback");
    let relevance_feedback = r.string(root, "", "relevance_feedback");
    let difficulty_feedback = r.string(root, "", "difficulty_feedback");
    let structure_feedback = r.string(root, "", "structure_feedback");
    let code_quality_feedback = r.string(root, "", "code_quality_feedback");
    let comments = r.string(root, "", "comments");
    let recommendations = r.string_list(root, "", "recommendations", true);

    let reported_passed = match r.lookup(root, "", "passed") {
        None => Some(None),
        Some(Value::Bool(b)) => Some(Some(*b)),
        Some(other) => {
            r.issue(
                "passed",
                format!("expected boolean, found {}", kind_of(other)),
            );
            None
        }
    };

    let quality_score = quality_score?;
    let passed = autofix::reconcile_passed(r, reported_passed?, i64::from(quality_score));

    Some(Validation {
        is_text_clear: is_text_clear?,
        is_question_correspond: is_question_correspond?,
        is_question_not_trivial: is_question_not_trivial?,
        do_answer_levels_exist: do_answer_levels_exist?,
        are_answer_levels_valid: are_answer_levels_valid?,
        has_evaluation_criteria: has_evaluation_criteria?,
        are_answer_levels_different: are_answer_levels_different?,
        do_tests_exist: do_tests_exist?,
        do_tags_exist: do_tags_exist?,
        do_test_options_exist: do_test_options_exist?,
        is_question_text_different_from_existing_questions:
            is_question_text_different_from_existing_questions?,
        are_test_options_numbered: are_test_options_numbered?,
        does_answer_contain_option_number: does_answer_contain_option_number?,
        are_code_blocks_marked_if_they_exist: are_code_blocks_marked_if_they_exist?,
        does_snippet_have_question: does_snippet_have_question?,
        does_snippet_have_code: does_snippet_have_code?,
        clarity_score: clarity_score?,
        relevance_score: relevance_score?,
        difficulty_score: difficulty_score?,
        structure_score: structure_score?,
        code_quality_score: code_quality_score?,
        quality_score,
        clarity_feedback: clarity_feedback?,
        relevance_feedback: relevance_feedback?,
        difficulty_feedback: difficulty_feedback?,
        structure_feedback: structure_feedback?,
        code_quality_feedback: code_quality_feedback?,
        comments: comments?,
        recommendations: recommendations?,
        passed,
    })
}

/// Reads a 1-10 score; out-of-range values fail an assert.
fn read_score(r: &mut FieldReader, root: &Map<String, Value>, key: &str) -> Option<u8> {
    let score = r.integer(root, "", key)?;
    let in_range = r.assert(
        key,
        format!("must be an integer between 1 and 10, found {score}"),
        SCORE_RANGE.contains(&score),
    );
    if in_range {
        u8::try_from(score).ok()
    } else {
        None
    }
}
