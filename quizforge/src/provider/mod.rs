//! Provider adapters.
//!
//! An adapter pairs a [`Provider`] (model catalogue and prompt wording) with
//! an injected [`CompletionClient`] that performs the actual API call. Every
//! adapter runs the raw completion text through the same extraction and
//! coercion pipeline.

pub mod claude;
pub mod deepseek;
pub mod gemini;
pub mod openai;
pub mod prompts;

use std::{
    fmt,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use claude::Claude;
pub use deepseek::DeepSeek;
pub use gemini::Gemini;
pub use openai::OpenAi;
use prompts::QuestionShape;

use crate::{
    config::{PipelineConfig, ProviderSettings},
    error::ProviderError,
    extract_and_coerce_with_config,
    schema::{Question, RequestContext, TargetKind, TypedResult},
};

/// A request sent to a completion API.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Provider-side model name.
    pub model: String,
    pub system: String,
    pub prompt: String,
    /// `None` for models that reject a temperature.
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    /// Never serialized and redacted in `Debug` output.
    #[serde(skip)]
    pub api_key: SecretString,
}

impl CompletionRequest {
    /// The API key to authenticate this request with.
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Text returned by a completion API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Usage reported by the provider, if any.
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl Completion {
    /// A completion without usage data.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attaches provider-reported usage.
    pub fn with_usage(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
        self.prompt_tokens = Some(prompt_tokens);
        self.completion_tokens = Some(completion_tokens);
        self
    }
}

/// Performs the network call for one provider.
#[cfg_attr(test, mockall::automock)]
pub trait CompletionClient: Send + Sync {
    /// Sends `request` and returns the raw completion.
    fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;
}

/// An operation an adapter can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Generate,
    Validate,
    Quiz,
    UserQuiz,
}

impl Operation {
    pub const ALL: [Self; 4] = [Self::Generate, Self::Validate, Self::Quiz, Self::UserQuiz];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Validate => "validate",
            Self::Quiz => "quiz",
            Self::UserQuiz => "user_quiz",
        }
    }

    /// The schema this operation produces.
    pub const fn target_kind(self) -> TargetKind {
        match self {
            Self::Generate => TargetKind::Question,
            Self::Validate => TargetKind::Validation,
            Self::Quiz => TargetKind::Quiz,
            Self::UserQuiz => TargetKind::UserQuiz,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Catalogue and prompt wording of one provider.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Registry identifier, e.g. `"openai"`.
    fn id(&self) -> &'static str;

    /// Model names accepted in requests.
    fn supported_models(&self) -> &'static [&'static str];

    /// Operations this provider implements.
    fn operations(&self) -> &'static [Operation] {
        &Operation::ALL
    }

    fn supports(&self, operation: Operation) -> bool {
        self.operations().contains(&operation)
    }

    /// Case-insensitive catalogue check.
    fn supports_model(&self, model: &str) -> bool {
        self.supported_models()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(model))
    }

    /// Maps a catalogue name to the name sent to the API.
    fn resolve_model(&self, model: &str) -> String {
        model.to_string()
    }

    fn supports_temperature(&self, _model: &str) -> bool {
        true
    }

    /// Response shape requested by the generation prompt.
    fn question_shape(&self) -> QuestionShape {
        QuestionShape::Nested
    }

    fn system_prompt(&self, operation: Operation) -> String {
        prompts::system_prompt(operation, self.question_shape())
    }

    fn user_prompt(&self, operation: Operation, request: &AgentRequest) -> String {
        prompts::user_prompt(operation, request)
    }

    /// Tokens used by one call: reported usage when available, otherwise
    /// an estimate from the prompt and completion text.
    fn count_tokens(&self, request: &CompletionRequest, completion: &Completion) -> u64 {
        match (completion.prompt_tokens, completion.completion_tokens) {
            (Some(p), Some(c)) => u64::from(p) + u64::from(c),
            (Some(t), None) | (None, Some(t)) => u64::from(t),
            (None, None) => estimate_tokens(&request.system)
                .saturating_add(estimate_tokens(&request.prompt))
                .saturating_add(estimate_tokens(&completion.text)),
        }
    }
}

/// Rough token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// An adapter request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentRequest {
    /// Catalogue model name.
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, rename = "request")]
    pub context: RequestContext,
    /// The question to validate.
    #[serde(default)]
    pub question: Option<Question>,
}

impl AgentRequest {
    pub fn new(model: impl Into<String>, context: RequestContext) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            context,
            question: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_question(mut self, question: Question) -> Self {
        self.question = Some(question);
        self
    }
}

/// Statistics attached to every successful adapter result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStatistic {
    pub provider: String,
    pub model: String,
    pub elapsed_time_ms: u64,
    pub token_count: u64,
}

/// A typed result and the statistics of the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResult {
    pub agent: AgentStatistic,
    pub result: TypedResult,
}

impl AgentResult {
    /// `{"agent": ..., "<kind>": ...}`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "agent".into(),
            serde_json::to_value(&self.agent).unwrap_or(Value::Null),
        );
        map.insert(self.result.kind().as_str().into(), self.result.to_value());
        Value::Object(map)
    }
}

/// A provider bound to a completion client.
pub struct Agent {
    provider: Box<dyn Provider>,
    client: Arc<dyn CompletionClient>,
    settings: ProviderSettings,
    config: PipelineConfig,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(
        provider: Box<dyn Provider>,
        client: Arc<dyn CompletionClient>,
        settings: ProviderSettings,
    ) -> Self {
        Self {
            provider,
            client,
            settings,
            config: PipelineConfig::default(),
        }
    }

    /// Replaces the extraction pipeline configuration.
    pub fn with_config(mut self, config: &PipelineConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Generates a [`Question`](crate::schema::Question).
    pub fn generate(&self, request: &AgentRequest) -> Result<AgentResult, ProviderError> {
        self.run(Operation::Generate, request)
    }

    /// Validates `request.question`.
    pub fn validate(&self, request: &AgentRequest) -> Result<AgentResult, ProviderError> {
        self.run(Operation::Validate, request)
    }

    pub fn quiz(&self, request: &AgentRequest) -> Result<AgentResult, ProviderError> {
        self.run(Operation::Quiz, request)
    }

    pub fn user_quiz(&self, request: &AgentRequest) -> Result<AgentResult, ProviderError> {
        self.run(Operation::UserQuiz, request)
    }

    /// Runs `operation`: checks the request, calls the client once and
    /// coerces the response.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for unsupported models or operations,
    /// missing credentials, incomplete requests, client failures and
    /// responses that cannot be coerced. No client call is made unless the
    /// request passes every check.
    pub fn run(
        &self,
        operation: Operation,
        request: &AgentRequest,
    ) -> Result<AgentResult, ProviderError> {
        let id = self.provider.id();
        if !self.provider.supports(operation) {
            return Err(ProviderError::InvalidRequest(format!(
                "operation '{operation}' is not supported by {id}"
            )));
        }
        if !self.provider.supports_model(&request.model) {
            return Err(ProviderError::UnsupportedModel {
                provider: id,
                model: request.model.clone(),
            });
        }
        let Some(api_key) = self.settings.api_key(id).cloned() else {
            return Err(ProviderError::MissingApiKey(id));
        };
        check_preconditions(operation, request)?;

        let completion_request = self.build_request(operation, request, api_key);
        let started = Instant::now();
        let completion = self.client.complete(&completion_request)?;
        let elapsed = started.elapsed();
        if completion.text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse(id));
        }

        let report = extract_and_coerce_with_config(
            &completion.text,
            operation.target_kind(),
            &request.context,
            &self.config,
        )?;

        let agent = AgentStatistic {
            provider: id.to_string(),
            model: request.model.clone(),
            elapsed_time_ms: millis(elapsed),
            token_count: self.provider.count_tokens(&completion_request, &completion),
        };
        log::info!(
            "{} {} via {} took {}ms ({} tokens, strategy {})",
            id,
            operation,
            agent.model,
            agent.elapsed_time_ms,
            agent.token_count,
            report.strategy
        );
        Ok(AgentResult {
            agent,
            result: report.result,
        })
    }

    fn build_request(
        &self,
        operation: Operation,
        request: &AgentRequest,
        api_key: SecretString,
    ) -> CompletionRequest {
        let temperature = self
            .provider
            .supports_temperature(&request.model)
            .then(|| request.temperature.unwrap_or(self.settings.default_temperature));
        CompletionRequest {
            model: self.provider.resolve_model(&request.model),
            system: self.provider.system_prompt(operation),
            prompt: self.provider.user_prompt(operation, request),
            temperature,
            max_tokens: self.settings.max_tokens,
            api_key,
        }
    }
}

fn check_preconditions(operation: Operation, request: &AgentRequest) -> Result<(), ProviderError> {
    let ctx = &request.context;
    match operation {
        Operation::Generate | Operation::Quiz if !ctx.has_topic_and_platform() => Err(
            ProviderError::InvalidRequest("topic and platform are required".into()),
        ),
        Operation::UserQuiz if !ctx.has_topic_and_platform() && !ctx.has_question() => {
            Err(ProviderError::InvalidRequest(
                "either topic and platform or a question is required".into(),
            ))
        }
        Operation::Validate if request.question.is_none() => Err(ProviderError::InvalidRequest(
            "a question to validate is required".into(),
        )),
        _ => Ok(()),
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
