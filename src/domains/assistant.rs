// Free-form questions for the analyzer

use crate::builder::GenerationRequestBuilder;
use crate::client::PromptAnalyzer;
use crate::domains::{DomainClient, ValidationOperations};
use crate::types::*;
use crate::utils::StringValidator;
use std::sync::Arc;

/// Shown when the analyzer answers without any text
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response generated.";

pub const MAX_QUESTION_CHARS: usize = 4_000;

/// Passes a parent's question to the analyzer and returns the answer untouched
pub struct AssistantRelay {
    analyzer: Arc<dyn PromptAnalyzer>,
}

impl AssistantRelay {
    pub fn new(analyzer: Arc<dyn PromptAnalyzer>) -> Self {
        Self { analyzer }
    }

    #[tracing::instrument(skip_all, fields(chars = question.len()))]
    pub async fn try_ask(&self, question: &str) -> DashboardResult<String> {
        let question = self.validate_string(question, "question")?;
        let question = StringValidator::max_length(question, MAX_QUESTION_CHARS, "question")?;
        let request = GenerationRequestBuilder::new().prompt(question)?.build()?;

        let response = self.analyzer.generate(request).await?;
        Ok(response
            .text()
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string()))
    }

    pub async fn ask(&self, question: &str) -> Outcome<String> {
        self.try_ask(question).await.into()
    }
}

impl DomainClient for AssistantRelay {
    fn domain_name(&self) -> &str {
        "assistant"
    }
}

impl ValidationOperations for AssistantRelay {}
