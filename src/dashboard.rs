//! The three dashboard views as plain async calls.
//!
//! Every entry point is idempotent and takes the dataset by reference; the
//! caller owns the session. Remote failures never escape as errors here:
//! they arrive as [`Outcome::Failed`] or as messages left out of a summary.

use crate::client::{build_http_client, GeminiAnalyzer, HuggingFaceClassifier, PromptAnalyzer, TextClassifier, TlsConfig};
use crate::config::DashboardConfig;
use crate::dataset::{ActivityOverview, Dataset};
use crate::domains::{AssistantRelay, RiskAssessment, RiskSummarizer, SentimentAggregator, SentimentReport, WellbeingSummary};
use crate::types::*;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Output of the wellbeing view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellbeingReport {
    pub sentiment: SentimentReport,
    pub risk: Outcome<RiskAssessment>,
}

pub struct Dashboard {
    sentiment: SentimentAggregator,
    risk: RiskSummarizer,
    assistant: AssistantRelay,
}

impl Dashboard {
    /// Connect to the configured hosted models
    pub fn from_config(config: &DashboardConfig) -> DashboardResult<Self> {
        config.validate()?;
        let http_client = build_http_client(config.request_timeout, &TlsConfig::default())?;

        let classifier = HuggingFaceClassifier::new(
            http_client.clone(),
            config.classifier_endpoint.clone(),
            config.classifier_key.clone(),
        );
        let analyzer = GeminiAnalyzer::new(
            http_client,
            config.analyzer_endpoint.clone(),
            config.analyzer_key.clone(),
        );

        Self::with_clients(Arc::new(classifier), Arc::new(analyzer), config)
    }

    /// Use caller-supplied model clients; endpoints and keys in `config` are ignored
    pub fn with_clients(
        classifier: Arc<dyn TextClassifier>,
        analyzer: Arc<dyn PromptAnalyzer>,
        config: &DashboardConfig,
    ) -> DashboardResult<Self> {
        Ok(Self {
            sentiment: SentimentAggregator::from_config(classifier, config)?,
            risk: RiskSummarizer::from_config(analyzer.clone(), config),
            assistant: AssistantRelay::new(analyzer),
        })
    }

    pub fn sentiment(&self) -> &SentimentAggregator {
        &self.sentiment
    }

    pub fn risk(&self) -> &RiskSummarizer {
        &self.risk
    }

    pub fn overview(&self, dataset: &Dataset) -> ActivityOverview {
        dataset.overview()
    }

    #[tracing::instrument(skip_all, fields(rows = dataset.len()))]
    pub async fn aggregate_sentiment(&self, dataset: &Dataset) -> WellbeingSummary {
        self.sentiment.aggregate(&dataset.combined_texts()).await
    }

    #[tracing::instrument(skip_all, fields(rows = dataset.len()))]
    pub async fn assess_risk(&self, dataset: &Dataset) -> Outcome<RiskAssessment> {
        self.risk.assess(&dataset.combined_texts()).await
    }

    /// Sentiment and risk for the same dataset, requested concurrently
    #[tracing::instrument(skip_all, fields(rows = dataset.len()))]
    pub async fn wellbeing(&self, dataset: &Dataset) -> WellbeingReport {
        let texts = dataset.combined_texts();
        let (sentiment, risk) = tokio::join!(self.sentiment.analyze(&texts), self.risk.assess(&texts));
        WellbeingReport { sentiment, risk }
    }

    /// Like [`wellbeing`](Self::wellbeing); on cancellation the sentiment part
    /// keeps what was collected and the risk part reports the cancellation.
    #[tracing::instrument(skip_all, fields(rows = dataset.len()))]
    pub async fn wellbeing_with_cancel(&self, dataset: &Dataset, cancel: &CancellationToken) -> WellbeingReport {
        let texts = dataset.combined_texts();
        let risk = async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Outcome::Failed(DashboardError::Cancelled.user_message()),
                outcome = self.risk.assess(&texts) => outcome,
            }
        };
        let (sentiment, risk) = tokio::join!(self.sentiment.analyze_with_cancel(&texts, cancel), risk);
        WellbeingReport { sentiment, risk }
    }

    #[tracing::instrument(skip_all)]
    pub async fn ask(&self, question: &str) -> Outcome<String> {
        self.assistant.ask(question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_rejects_missing_keys() {
        let config = DashboardConfig::new("", "");
        assert!(Dashboard::from_config(&config).is_err());
    }

    #[test]
    fn from_config_builds_with_keys() {
        let config = DashboardConfig::new("hf_test", "gm_test").with_max_concurrency(2);
        let dashboard = Dashboard::from_config(&config).unwrap();
        assert_eq!(dashboard.sentiment().max_concurrency(), 2);
        assert_eq!(dashboard.sentiment().sample_size(), Some(5));
    }
}
