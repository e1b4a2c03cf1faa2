//! OpenAI chat models.

use super::{Operation, Provider};

const MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "o3-mini", "o4-mini"];

/// Reasoning models accept only their default temperature.
const FIXED_TEMPERATURE: &[&str] = &["o3-mini", "o4-mini"];

const OPERATIONS: &[Operation] = &[Operation::Generate, Operation::Validate, Operation::Quiz];

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAi;

impl Provider for OpenAi {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn supported_models(&self) -> &'static [&'static str] {
        MODELS
    }

    fn operations(&self) -> &'static [Operation] {
        OPERATIONS
    }

    fn supports_temperature(&self, model: &str) -> bool {
        !FIXED_TEMPERATURE
            .iter()
            .any(|m| m.eq_ignore_ascii_case(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue() {
        assert!(OpenAi.supports_model("gpt-4o"));
        assert!(OpenAi.supports_model("GPT-4o-mini"));
        assert!(!OpenAi.supports_model("gpt-3.5-turbo"));
    }

    #[test]
    fn test_temperature_support() {
        assert!(OpenAi.supports_temperature("gpt-4o"));
        assert!(!OpenAi.supports_temperature("o3-mini"));
        assert!(!OpenAi.supports_temperature("o4-mini"));
    }

    #[test]
    fn test_user_quiz_not_supported() {
        assert!(OpenAi.supports(Operation::Quiz));
        assert!(!OpenAi.supports(Operation::UserQuiz));
    }
}
