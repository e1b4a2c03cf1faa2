//! Anthropic Claude models.

use once_cell::sync::Lazy;

use super::{prompts::QuestionShape, Provider};

/// Catalogue names and the dated API model each resolves to.
const MODELS: &[(&str, &str)] = &[
    ("claude-3-7-sonnet", "claude-3-7-sonnet-20250219"),
    ("claude-3-5-sonnet", "claude-3-5-sonnet-20240620"),
    ("claude-3-opus", "claude-3-opus-20240229"),
    ("claude-3-sonnet", "claude-3-sonnet-20240229"),
    ("claude-3-haiku", "claude-3-haiku-20240307"),
    ("claude-3-5-haiku", "claude-3-5-haiku-20241022"),
];

static NAMES: Lazy<Vec<&'static str>> = Lazy::new(|| MODELS.iter().map(|(short, _)| *short).collect());

#[derive(Debug, Clone, Copy, Default)]
pub struct Claude;

impl Provider for Claude {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn supported_models(&self) -> &'static [&'static str] {
        NAMES.as_slice()
    }

    fn resolve_model(&self, model: &str) -> String {
        MODELS
            .iter()
            .find(|(short, _)| short.eq_ignore_ascii_case(model))
            .map_or_else(|| model.to_string(), |(_, dated)| (*dated).to_string())
    }

    /// Claude is asked for top-level `platform`, `topic` and `question`.
    fn question_shape(&self) -> QuestionShape {
        QuestionShape::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_model_resolves_to_a_dated_name() {
        let supported = Claude.supported_models();
        assert_eq!(supported.len(), MODELS.len());
        assert_eq!(supported[0], "claude-3-7-sonnet");
        for model in supported {
            let resolved = Claude.resolve_model(model);
            assert!(resolved.starts_with(model) && resolved.len() > model.len(), "{resolved}");
        }
    }

    #[test]
    fn test_resolve_model() {
        assert_eq!(
            Claude.resolve_model("claude-3-7-sonnet"),
            "claude-3-7-sonnet-20250219"
        );
        assert_eq!(Claude.resolve_model("Claude-3-Haiku"), "claude-3-haiku-20240307");
        assert_eq!(Claude.resolve_model("custom"), "custom");
    }

    #[test]
    fn test_flat_generation_prompt() {
        assert_eq!(Claude.question_shape(), QuestionShape::Flat);
        assert!(Claude
            .system_prompt(crate::provider::Operation::Generate)
            .contains("\"platform\": \"iOS\""));
    }
}
