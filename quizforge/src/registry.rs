//! Static provider registry and request dispatch.
//!
//! ```
//! use quizforge::registry;
//!
//! assert!(registry::lookup("google").is_some());
//! assert_eq!(registry::provider_ids(), vec!["openai", "gemini", "claude", "deepseek"]);
//! ```

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use serde_json::Value;

use crate::{
    config::{PipelineConfig, ProviderSettings},
    error::DispatchError,
    provider::{
        Agent, AgentRequest, AgentResult, Claude, CompletionClient, DeepSeek, Gemini, OpenAi,
        Operation, Provider,
    },
};

type Factory = fn() -> Box<dyn Provider>;

static PROVIDERS: &[(&str, Factory)] = &[
    ("openai", build::<OpenAi>),
    ("gemini", build::<Gemini>),
    ("claude", build::<Claude>),
    ("deepseek", build::<DeepSeek>),
];

static ALIASES: &[(&str, &str)] = &[("google", "gemini"), ("anthropic", "claude")];

fn build<P: Provider + Default + 'static>() -> Box<dyn Provider> {
    Box::new(P::default())
}

/// Resolves an alias to its registered provider id.
pub fn canonical_id(id: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == id)
        .map_or(id, |(_, target)| *target)
}

/// Builds the provider registered under `id` or one of its aliases.
pub fn lookup(id: &str) -> Option<Box<dyn Provider>> {
    let id = canonical_id(id);
    PROVIDERS
        .iter()
        .find(|(name, _)| *name == id)
        .map(|(_, factory)| factory())
}

/// Registered provider ids in registration order.
pub fn provider_ids() -> Vec<&'static str> {
    PROVIDERS.iter().map(|(id, _)| *id).collect()
}

/// Boundary payload for one dispatched request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl AgentResponse {
    pub fn ok(result: &AgentResult) -> Self {
        Self {
            success: true,
            data: Some(result.to_value()),
            error: None,
            error_type: None,
        }
    }

    pub fn err(error: &DispatchError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_type: Some(error.error_type().to_string()),
        }
    }
}

impl From<Result<AgentResult, DispatchError>> for AgentResponse {
    fn from(result: Result<AgentResult, DispatchError>) -> Self {
        match result {
            Ok(result) => Self::ok(&result),
            Err(error) => Self::err(&error),
        }
    }
}

/// Routes `(provider, operation, payload)` to an adapter.
///
/// One completion client is configured per provider id.
pub struct Dispatcher {
    clients: HashMap<&'static str, Arc<dyn CompletionClient>>,
    settings: ProviderSettings,
    config: PipelineConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut clients: Vec<_> = self.clients.keys().collect();
        clients.sort();
        f.debug_struct("Dispatcher")
            .field("clients", &clients)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            clients: HashMap::new(),
            settings,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers the client for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownProvider`] if `provider` is not
    /// registered.
    pub fn with_client(
        mut self,
        provider: &str,
        client: Arc<dyn CompletionClient>,
    ) -> Result<Self, DispatchError> {
        let id = lookup(provider)
            .map(|p| p.id())
            .ok_or_else(|| DispatchError::UnknownProvider(provider.to_string()))?;
        self.clients.insert(id, client);
        Ok(self)
    }

    /// Dispatches and wraps the outcome in the boundary payload.
    pub fn dispatch(&self, provider: &str, operation: &str, payload: &Value) -> AgentResponse {
        let result = self.try_dispatch(provider, operation, payload);
        if let Err(e) = &result {
            log::error!("{provider}.{operation} failed: {e}");
        }
        result.into()
    }

    /// Dispatches a request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the provider or operation is unknown,
    /// the payload is malformed, no client is configured, or the adapter
    /// itself fails.
    pub fn try_dispatch(
        &self,
        provider: &str,
        operation: &str,
        payload: &Value,
    ) -> Result<AgentResult, DispatchError> {
        let adapter =
            lookup(provider).ok_or_else(|| DispatchError::UnknownProvider(provider.to_string()))?;
        let unsupported = || DispatchError::UnsupportedOperation {
            provider: provider.to_string(),
            operation: operation.to_string(),
        };
        let op: Operation = operation.parse().map_err(|_| unsupported())?;
        if !adapter.supports(op) {
            return Err(unsupported());
        }

        let request: AgentRequest = serde_json::from_value(payload.clone())
            .map_err(|e| DispatchError::InvalidPayload(e.to_string()))?;
        let client = self
            .clients
            .get(adapter.id())
            .cloned()
            .ok_or_else(|| DispatchError::NoClient(adapter.id().to_string()))?;

        log::debug!("dispatching {}.{} for model {}", adapter.id(), op, request.model);
        let agent = Agent::new(adapter, client, self.settings.clone()).with_config(&self.config);
        Ok(agent.run(op, &request)?)
    }
}
