//! DeepSeek models, served through an OpenAI-compatible API.

use super::{Operation, Provider};

const MODELS: &[&str] = &["deepseek-chat", "deepseek-reasoner"];

const OPERATIONS: &[Operation] = &[Operation::Generate, Operation::Validate, Operation::Quiz];

#[derive(Debug, Clone, Copy, Default)]
pub struct DeepSeek;

impl Provider for DeepSeek {
    fn id(&self) -> &'static str {
        "deepseek"
    }

    fn supported_models(&self) -> &'static [&'static str] {
        MODELS
    }

    fn operations(&self) -> &'static [Operation] {
        OPERATIONS
    }
}
