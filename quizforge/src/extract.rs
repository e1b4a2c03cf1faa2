//! Locating and decoding the JSON document inside a raw model response.

use crate::{
    config::PipelineConfig,
    error::{ResponseParseError, StrategyError},
    parser::{
        sanitize::sanitize_surface,
        TolerantDecoder,
    },
    schema::TargetKind,
    value::ParsedDocument,
};

/// Runs the surface sanitizers and then the tolerant decoder.
#[derive(Debug)]
pub struct ResponseExtractor {
    decoder: TolerantDecoder,
    snippet_len: usize,
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl ResponseExtractor {
    /// Creates an extractor configured by `config`.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            decoder: TolerantDecoder::new(config),
            snippet_len: config.snippet_len,
        }
    }

    /// Extracts a document meant to become a `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseParseError`] when the input is blank or when no
    /// decode strategy succeeds. The error keeps a snippet of the raw text
    /// and one diagnostic per strategy.
    pub fn extract(
        &self,
        raw: &str,
        kind: TargetKind,
    ) -> Result<ParsedDocument, ResponseParseError> {
        if raw.trim().is_empty() {
            return Err(ResponseParseError::new(
                raw,
                self.snippet_len,
                vec![StrategyError::new("extract", "response is empty")],
            ));
        }

        let (sanitized, repairs) = sanitize_surface(raw);
        if !repairs.is_empty() {
            log::debug!(
                "sanitized {} response: {}",
                kind,
                repairs
                    .iter()
                    .map(|r| r.description())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        match self.decoder.decode(&sanitized) {
            Ok(mut doc) => {
                doc.prepend_repairs(&repairs);
                Ok(doc)
            }
            Err(attempts) => {
                let err = ResponseParseError::new(raw, self.snippet_len, attempts);
                log::warn!("could not decode {} response: {:?}", kind, err.snippet);
                Err(err)
            }
        }
    }
}
