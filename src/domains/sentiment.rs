// Sentiment aggregation

use crate::client::TextClassifier;
use crate::config::{DashboardConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_SAMPLE_SIZE, MAX_CONCURRENCY_LIMIT};
use crate::domains::{DomainClient, ValidationOperations};
use crate::types::*;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Label counts over the messages that were actually classified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub total: usize,
}

impl LabelCounts {
    /// Anything that is not POSITIVE or NEGATIVE lands in the neutral bucket
    pub fn tally<'a>(labels: impl IntoIterator<Item = &'a Label>) -> Self {
        let mut positive = 0;
        let mut negative = 0;
        let mut total = 0;
        for label in labels {
            match label {
                Label::Positive => positive += 1,
                Label::Negative => negative += 1,
                Label::Neutral | Label::Other(_) => {}
            }
            total += 1;
        }
        Self {
            positive,
            negative,
            neutral: total - positive - negative,
            total,
        }
    }
}

/// The aggregate wellbeing product of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellbeingSummary {
    /// (positive - negative) / total * 10, rounded to 2 places; in [-10, 10]
    pub score: f64,
    pub positive_pct: String,
    pub neutral_pct: String,
    pub negative_pct: String,
    pub counts: LabelCounts,
}

impl WellbeingSummary {
    /// Summary of a batch with nothing classified
    pub fn empty() -> Self {
        Self::from_counts(LabelCounts::default())
    }

    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a Label>) -> Self {
        Self::from_counts(LabelCounts::tally(labels))
    }

    pub fn from_counts(counts: LabelCounts) -> Self {
        if counts.total == 0 {
            return Self {
                score: 0.0,
                positive_pct: "0%".to_string(),
                neutral_pct: "0%".to_string(),
                negative_pct: "0%".to_string(),
                counts,
            };
        }

        let total = counts.total as f64;
        let net = counts.positive as i64 - counts.negative as i64;
        let score = score_hundredths(net, counts.total as i64) as f64 / 100.0;

        Self {
            score,
            positive_pct: percent(counts.positive, total),
            neutral_pct: percent(counts.neutral, total),
            negative_pct: percent(counts.negative, total),
            counts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.total == 0
    }
}

/// `net / total * 10` in hundredths, rounded half to even on the exact ratio.
///
/// Integer arithmetic keeps ties such as 0.625 exact, and never yields -0.0.
fn score_hundredths(net: i64, total: i64) -> i64 {
    let scaled = net * 1000;
    let mut quotient = scaled.div_euclid(total);
    let twice_rem = 2 * scaled.rem_euclid(total);
    if twice_rem > total || (twice_rem == total && quotient % 2 != 0) {
        quotient += 1;
    }
    quotient.clamp(-1000, 1000)
}

fn percent(count: usize, total: f64) -> String {
    format!("{:.2}%", count as f64 / total * 100.0)
}

/// Classification of one sampled message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSentiment {
    /// Position of the message in the dataset
    pub index: usize,
    pub label: Label,
    pub confidence: Option<f32>,
}

/// Summary plus the per-message results it was computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentReport {
    pub summary: WellbeingSummary,
    pub messages: Vec<MessageSentiment>,
    /// Messages sent to the classifier
    pub sampled: usize,
    /// Calls that failed and were left out of the totals
    pub failed: usize,
    pub cancelled: bool,
}

/// Folds per-message classifier labels into a [`WellbeingSummary`].
///
/// Only a prefix of the batch is classified (`sample_size`, 5 by default) to
/// keep the number of paid calls bounded. A call that fails drops that one
/// message from the totals; it never fails the aggregation.
pub struct SentimentAggregator {
    classifier: Arc<dyn TextClassifier>,
    sample_size: Option<usize>,
    max_concurrency: usize,
}

impl SentimentAggregator {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self {
            classifier,
            sample_size: Some(DEFAULT_SAMPLE_SIZE),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn from_config(classifier: Arc<dyn TextClassifier>, config: &DashboardConfig) -> DashboardResult<Self> {
        Self::new(classifier)
            .with_sample_size(config.sample_size)?
            .with_max_concurrency(config.max_concurrency)
    }

    /// `None` classifies the whole batch
    pub fn with_sample_size(mut self, sample_size: Option<usize>) -> DashboardResult<Self> {
        if let Some(size) = sample_size {
            self.validate_range(size, 1, usize::MAX, "sample_size")?;
        }
        self.sample_size = sample_size;
        Ok(self)
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> DashboardResult<Self> {
        self.max_concurrency = self.validate_range(max_concurrency, 1, MAX_CONCURRENCY_LIMIT, "max_concurrency")?;
        Ok(self)
    }

    pub fn sample_size(&self) -> Option<usize> {
        self.sample_size
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// The prefix of `texts` that will be classified
    pub fn sample<'a>(&self, texts: &'a [String]) -> &'a [String] {
        match self.sample_size {
            Some(size) => &texts[..texts.len().min(size)],
            None => texts,
        }
    }

    pub async fn aggregate(&self, texts: &[String]) -> WellbeingSummary {
        self.analyze(texts).await.summary
    }

    /// Like [`aggregate`](Self::aggregate), returning the partial summary on cancellation
    pub async fn aggregate_with_cancel(&self, texts: &[String], cancel: &CancellationToken) -> WellbeingSummary {
        self.analyze_with_cancel(texts, cancel).await.summary
    }

    #[tracing::instrument(skip_all, fields(texts = texts.len()))]
    pub async fn analyze(&self, texts: &[String]) -> SentimentReport {
        self.run(texts, None).await
    }

    #[tracing::instrument(skip_all, fields(texts = texts.len()))]
    pub async fn analyze_with_cancel(&self, texts: &[String], cancel: &CancellationToken) -> SentimentReport {
        self.run(texts, Some(cancel)).await
    }

    async fn run(&self, texts: &[String], cancel: Option<&CancellationToken>) -> SentimentReport {
        let sampled = self.sample(texts);
        let classifier = &self.classifier;

        // Completion order varies with concurrency; only the counts matter
        let calls = futures::stream::iter(sampled.iter().enumerate())
            .map(|(index, text)| async move { (index, classifier.classify(text).await) })
            .buffer_unordered(self.max_concurrency);
        let mut calls = std::pin::pin!(calls);

        let mut messages = Vec::with_capacity(sampled.len());
        let mut failed = 0;
        let mut cancelled = false;

        loop {
            let next = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        cancelled = true;
                        None
                    }
                    item = calls.next() => item,
                },
                None => calls.next().await,
            };

            let Some((index, result)) = next else { break };
            match result {
                Ok(classification) => messages.push(MessageSentiment {
                    index,
                    label: classification.label,
                    confidence: classification.confidence,
                }),
                Err(err) => {
                    failed += 1;
                    log::warn!("message {} left out of sentiment totals: {}", index, err);
                }
            }
        }

        messages.sort_by_key(|m| m.index);
        let summary = WellbeingSummary::from_labels(messages.iter().map(|m| &m.label));

        if cancelled {
            tracing::info!(classified = messages.len(), "sentiment aggregation cancelled");
        } else {
            tracing::info!(
                classified = messages.len(),
                failed,
                score = summary.score,
                "sentiment aggregation finished"
            );
        }

        SentimentReport {
            summary,
            messages,
            sampled: sampled.len(),
            failed,
            cancelled,
        }
    }
}

impl DomainClient for SentimentAggregator {
    fn domain_name(&self) -> &str {
        "sentiment_analysis"
    }
}

impl ValidationOperations for SentimentAggregator {}
