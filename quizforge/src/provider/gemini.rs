//! Google Gemini models.

use super::{estimate_tokens, Completion, CompletionRequest, Provider};

const MODELS: &[&str] = &["gemini-1.5-pro-latest", "gemini-2.0-flash"];

#[derive(Debug, Clone, Copy, Default)]
pub struct Gemini;

impl Provider for Gemini {
    fn id(&self) -> &'static str {
        "gemini"
    }

    fn supported_models(&self) -> &'static [&'static str] {
        MODELS
    }

    /// The Gemini API reports no usage, so tokens are always estimated.
    fn count_tokens(&self, request: &CompletionRequest, completion: &Completion) -> u64 {
        estimate_tokens(&request.system)
            .saturating_add(estimate_tokens(&request.prompt))
            .saturating_add(estimate_tokens(&completion.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Operation;

    #[test]
    fn test_catalogue() {
        assert!(Gemini.supports_model("gemini-2.0-flash"));
        assert!(!Gemini.supports_model("gemini-ultra"));
        assert!(Operation::ALL.iter().all(|op| Gemini.supports(*op)));
    }

    #[test]
    fn test_tokens_always_estimated() {
        let request = CompletionRequest {
            model: "gemini-2.0-flash".into(),
            system: "abcd".into(),
            prompt: "abcdefgh".into(),
            temperature: Some(0.5),
            max_tokens: 2048,
            api_key: "test-gemini".to_string().into(),
        };
        let completion = Completion::text("abc").with_usage(1000, 1000);
        assert_eq!(Gemini.count_tokens(&request, &completion), 4);
    }
}
