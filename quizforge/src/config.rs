//! Pipeline and provider configuration.

use std::env;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default number of characters kept in error snippets.
pub const DEFAULT_SNIPPET_LEN: usize = 200;

/// Default maximum container nesting accepted by the lenient decoder.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// Default sampling temperature for provider calls.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Default output token limit for provider calls.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Tuning knobs for the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Characters of raw text kept in [`ResponseParseError`](crate::error::ResponseParseError).
    pub snippet_len: usize,
    /// Enables the lenient grammar (full text and extracted candidates).
    pub enable_lenient: bool,
    /// Enables the hard-cut fallback.
    pub enable_hard_cut: bool,
    /// Deepest container nesting the lenient decoder accepts.
    pub max_nesting_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            snippet_len: DEFAULT_SNIPPET_LEN,
            enable_lenient: true,
            enable_hard_cut: true,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl PipelineConfig {
    /// Reads the configuration from `QUIZFORGE_*` environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            snippet_len: env::var("QUIZFORGE_SNIPPET_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.snippet_len),
            enable_lenient: env::var("QUIZFORGE_LENIENT")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_lenient),
            enable_hard_cut: env::var("QUIZFORGE_HARD_CUT")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_hard_cut),
            max_nesting_depth: env::var("QUIZFORGE_MAX_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_nesting_depth),
        }
    }

    /// Rejects values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snippet_len == 0 {
            return Err(ConfigError("snippet_len must be greater than 0".into()));
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError(
                "max_nesting_depth must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Credentials and sampling defaults for the provider adapters.
///
/// Keys are redacted in `Debug` output.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// OpenAI API key.
    pub openai_api_key: Option<SecretString>,
    /// Google Gemini API key.
    pub gemini_api_key: Option<SecretString>,
    /// Anthropic API key.
    pub anthropic_api_key: Option<SecretString>,
    /// DeepSeek API key.
    pub deepseek_api_key: Option<SecretString>,
    /// Temperature used when a request does not specify one.
    pub default_temperature: f32,
    /// Output token limit sent with every request.
    pub max_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            anthropic_api_key: None,
            deepseek_api_key: None,
            default_temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ProviderSettings {
    /// Reads API keys from the conventional provider environment variables.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            gemini_api_key: non_empty_var("GEMINI_API_KEY")
                .or_else(|| non_empty_var("GOOGLE_API_KEY")),
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            deepseek_api_key: non_empty_var("DEEPSEEK_API_KEY"),
            ..Self::default()
        }
    }

    /// Returns the API key configured for `provider`, if any.
    pub fn api_key(&self, provider: &str) -> Option<&SecretString> {
        let key = match provider {
            "openai" => &self.openai_api_key,
            "gemini" => &self.gemini_api_key,
            "claude" => &self.anthropic_api_key,
            "deepseek" => &self.deepseek_api_key,
            _ => return None,
        };
        key.as_ref()
    }

    #[cfg(test)]
    pub fn test_settings() -> Self {
        Self {
            openai_api_key: Some(SecretString::from("test-openai".to_string())),
            gemini_api_key: Some(SecretString::from("test-gemini".to_string())),
            anthropic_api_key: Some(SecretString::from("test-anthropic".to_string())),
            deepseek_api_key: Some(SecretString::from("test-deepseek".to_string())),
            ..Self::default()
        }
    }
}

fn non_empty_var(name: &str) -> Option<SecretString> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.snippet_len, 200);
        assert!(config.enable_lenient);
        assert!(config.enable_hard_cut);
        assert_eq!(config.max_nesting_depth, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_from_env_falls_back() {
        // Unset or garbage values both end up at the defaults.
        let config = PipelineConfig::from_env();
        assert!(config.snippet_len > 0);
        assert!(config.max_nesting_depth > 0);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = PipelineConfig {
            snippet_len: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            max_nesting_depth: 0,
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_nesting_depth"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"snippet_len": 80, "enable_hard_cut": false}"#).unwrap();
        assert_eq!(config.snippet_len, 80);
        assert!(!config.enable_hard_cut);
        assert!(config.enable_lenient);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_provider_api_key_lookup() {
        let settings = ProviderSettings::test_settings();
        assert_eq!(
            settings.api_key("claude").map(|k| k.expose_secret()),
            Some("test-anthropic")
        );
        assert!(settings.api_key("mistral").is_none());
        assert_eq!(settings.default_temperature, 0.5);
        assert_eq!(settings.max_tokens, 2048);
    }

    #[test]
    fn test_debug_redacts_api_keys() {
        let rendered = format!("{:?}", ProviderSettings::test_settings());
        assert!(!rendered.contains("test-openai"));
        assert!(!rendered.contains("test-anthropic"));
        assert!(rendered.contains("default_temperature"));
    }
}
