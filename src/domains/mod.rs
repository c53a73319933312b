//! Domain-Specific Analysis Components
//!
//! Each component wraps one remote capability and owns the contract around
//! it: what gets sent, how the reply is interpreted, and which failures are
//! absorbed at the call site.
//!
//! - [`SentimentAggregator`]: per-message classification folded into a
//!   single [`WellbeingSummary`]
//! - [`RiskSummarizer`]: one prompt over the whole batch, checked against a
//!   closed category vocabulary
//! - [`AssistantRelay`]: a single question passed through verbatim
//!
//! All components implement [`DomainClient`] and get the parameter checks of
//! [`ValidationOperations`] for free.

pub mod sentiment;
pub mod risk;
pub mod assistant;

pub use sentiment::{SentimentAggregator, SentimentReport, MessageSentiment, WellbeingSummary, LabelCounts};
pub use risk::{RiskSummarizer, RiskAssessment, RiskCategory};
pub use assistant::{AssistantRelay, NO_RESPONSE_PLACEHOLDER};

use crate::types::*;
use crate::domain_error;

/// Common trait for all domain components
pub trait DomainClient: Send + Sync {
    /// The domain name used in errors and logs
    fn domain_name(&self) -> &str;
}

/// Common trait for validation operations
pub trait ValidationOperations: DomainClient {
    /// Creates a domain-specific error
    fn domain_error<T>(&self, message: impl Into<String>) -> DashboardResult<T> {
        Err(domain_error!(self.domain_name(), message.into()))
    }

    /// Validate a string parameter
    fn validate_string<S: Into<String>>(&self, value: S, param_name: &str) -> DashboardResult<String> {
        let string = value.into();
        if string.trim().is_empty() {
            return Err(DashboardError::ValidationError(format!(
                "{} cannot be empty",
                param_name
            )));
        }
        Ok(string)
    }

    /// Validate a numeric parameter is within range
    fn validate_range<T: PartialOrd + Copy + std::fmt::Debug>(
        &self,
        value: T,
        min: T,
        max: T,
        param_name: &str,
    ) -> DashboardResult<T> {
        if value < min || value > max {
            return self.domain_error(format!(
                "{} must be between {:?} and {:?}",
                param_name, min, max
            ));
        }
        Ok(value)
    }
}
