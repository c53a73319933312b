//! # wellbeing-rs: school email wellbeing analysis
//!
//! Loads a CSV export of a child's school mailbox and produces three views
//! for a parent: activity metrics, a wellbeing analysis (risk categories
//! plus a sentiment score) and a free-form assistant. The analysis itself is
//! delegated to two hosted models:
//!
//! - a text classifier (Hugging Face inference protocol) labelling each
//!   message POSITIVE / NEGATIVE
//! - a language model (`generateContent` protocol) answering prompts
//!
//! ## Basic Usage
//!
//! ```no_run
//! use wellbeing_rs::{Dashboard, Dataset, Outcome, from_env};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dashboard = from_env()?;
//!     let dataset = Dataset::from_path("emails.csv")?;
//!
//!     let report = dashboard.wellbeing(&dataset).await;
//!     println!("score: {}", report.sentiment.summary.score);
//!
//!     if let Outcome::Ready(risk) = report.risk {
//!         for category in &risk.categories_found {
//!             println!("flagged: {}", category);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod client;
pub mod config;
pub mod builder;
mod context;
pub mod dataset;
pub mod domains;
pub mod dashboard;
pub mod render;
pub mod utils;

pub use builder::GenerationRequestBuilder;
pub use client::{build_http_client, GeminiAnalyzer, HuggingFaceClassifier, PromptAnalyzer, TextClassifier, TlsConfig};
pub use config::DashboardConfig;
pub use context::{BudgetedBatch, PromptBudget};
pub use dashboard::{Dashboard, WellbeingReport};
pub use dataset::{ActivityOverview, Dataset, Direction, EmailMessage};
pub use types::{
    sanitize_error_message, ClassificationResult, DashboardError, DashboardResult, GenerateContentRequest,
    GenerateContentResponse, Label, Outcome, SecureApiKey,
};
pub use utils::token_counter::{Cl100kTokenCounter, SimpleTokenCounter, TokenCounter};

pub use domains::{
    AssistantRelay, DomainClient, LabelCounts, MessageSentiment, RiskAssessment, RiskCategory, RiskSummarizer,
    SentimentAggregator, SentimentReport, ValidationOperations, WellbeingSummary, NO_RESPONSE_PLACEHOLDER,
};

pub mod prelude {
    //! Convenient imports for commonly used types and functions
    pub use crate::{from_env, Dashboard, DashboardConfig, DashboardError, DashboardResult, Dataset, Outcome};
    pub use crate::{PromptAnalyzer, TextClassifier};
    pub use crate::domains::{RiskAssessment, RiskCategory, WellbeingSummary};
}

/// Build a [`Dashboard`] from environment variables.
///
/// See [`DashboardConfig::from_env`] for the variables read.
pub fn from_env() -> DashboardResult<Dashboard> {
    let config = DashboardConfig::from_env()?;
    Dashboard::from_config(&config)
}
