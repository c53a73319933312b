// Generation request builder

use crate::types::*;
use crate::utils::{validate_range, StringValidator};

/// A struct for building analyzer requests with a fluent interface.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequestBuilder {
    prompt: Option<String>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GenerationRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user prompt
    pub fn prompt(mut self, prompt: impl Into<String>) -> DashboardResult<Self> {
        self.prompt = Some(StringValidator::not_empty(prompt, "prompt")?);
        Ok(self)
    }

    /// Set the temperature parameter (between 0.0 and 2.0)
    ///
    /// Lower values are more deterministic.
    pub fn temperature(mut self, temperature: f32) -> DashboardResult<Self> {
        self.temperature = Some(validate_range(temperature, 0.0, 2.0, "temperature")?);
        Ok(self)
    }

    /// Set the maximum number of tokens to generate
    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> DashboardResult<Self> {
        if max_output_tokens == 0 {
            return Err(DashboardError::ValidationError(
                "max_output_tokens must be greater than 0".into(),
            ));
        }
        self.max_output_tokens = Some(max_output_tokens);
        Ok(self)
    }

    pub fn build(self) -> DashboardResult<GenerateContentRequest> {
        let prompt = self.prompt.ok_or_else(|| {
            DashboardError::ValidationError("A prompt is required".to_string())
        })?;

        let generation_config = GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        };

        Ok(GenerateContentRequest {
            contents: vec![ContentBlock {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: if generation_config.is_empty() {
                None
            } else {
                Some(generation_config)
            },
        })
    }
}
