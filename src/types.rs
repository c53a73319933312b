// Core types and errors

use serde::{Deserialize, Serialize};
use thiserror::Error;
use std::time::Duration;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// The result type used throughout the crate
pub type DashboardResult<T> = Result<T, DashboardError>;

/// Convert reqwest::Error to our DashboardError
impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "could not connect to the service".to_string()
        } else {
            sanitize_error_message(&err.to_string())
        };

        DashboardError::RequestError {
            message,
            details: None,
            location: None,
            source: Some(Arc::new(err) as Arc<dyn std::error::Error + Send + Sync>),
        }
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        let message = match err.position() {
            Some(position) => format!("{} (line {})", err, position.line()),
            None => err.to_string(),
        };
        DashboardError::DatasetError {
            message,
            location: None,
            source: Some(Arc::new(err) as Arc<dyn std::error::Error + Send + Sync>),
        }
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::DatasetError {
            message: err.to_string(),
            location: None,
            source: Some(Arc::new(err) as Arc<dyn std::error::Error + Send + Sync>),
        }
    }
}

/// A secure container for API keys that zeroes its memory when dropped
pub struct SecureApiKey {
    key: String,
}

impl SecureApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.key.trim().is_empty()
    }
}

impl Deref for SecureApiKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.key
    }
}

impl Drop for SecureApiKey {
    fn drop(&mut self) {
        // SAFETY: writing zero bytes keeps the buffer valid UTF-8
        unsafe {
            let bytes = self.key.as_bytes_mut();
            bytes.iter_mut().for_each(|b| *b = 0);
        }
    }
}

// Keys never show up in logs or debug output
impl fmt::Debug for SecureApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureApiKey([REDACTED])")
    }
}

impl fmt::Display for SecureApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED API KEY]")
    }
}

impl Clone for SecureApiKey {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum DashboardError {
    #[error("Request failed: {message}")]
    RequestError {
        message: String,
        details: Option<String>,
        location: Option<String>,
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to parse response: {message}")]
    ParseError {
        message: String,
        source_text: Option<String>,
        location: Option<String>,
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Rate limited by {service}: retry after {retry_after:?}")]
    RateLimited {
        service: String,
        retry_after: Option<Duration>,
        location: Option<String>,
    },

    #[error("API key not provided for {service}")]
    MissingApiKey {
        service: String,
        location: Option<String>,
    },

    #[error("{service} returned error: {status} - {message}")]
    ApiError {
        service: String,
        status: u16,
        message: String,
        location: Option<String>,
    },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Could not read dataset: {message}")]
    DatasetError {
        message: String,
        location: Option<String>,
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Domain error: {domain}: {message}")]
    DomainError {
        domain: String,
        message: String,
        details: Option<String>,
        location: Option<String>,
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DashboardError {
    pub fn request_error<T: Into<String>>(
        message: T,
        details: Option<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
        location: Option<&str>,
    ) -> Self {
        let error = Self::RequestError {
            message: message.into(),
            details,
            location: location.map(String::from),
            source: source.map(|e| Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>),
        };
        error.log();
        error
    }

    pub fn parse_error<T: Into<String>>(
        message: T,
        source_text: Option<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
        location: Option<&str>,
    ) -> Self {
        let error = Self::ParseError {
            message: message.into(),
            source_text,
            location: location.map(String::from),
            source: source.map(|e| Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>),
        };
        error.log();
        error
    }

    pub fn domain_error<T: Into<String>>(
        message: T,
        domain: Option<String>,
        details: Option<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
        location: Option<&str>,
    ) -> Self {
        let error = Self::DomainError {
            message: message.into(),
            domain: domain.unwrap_or_default(),
            details,
            location: location.map(String::from),
            source: source.map(|e| Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>),
        };
        error.log();
        error
    }

    pub fn api_error<T: Into<String>>(
        service: impl Into<String>,
        message: T,
        status: Option<u16>,
        location: Option<&str>,
    ) -> Self {
        let error = Self::ApiError {
            service: service.into(),
            message: message.into(),
            status: status.unwrap_or(500),
            location: location.map(String::from),
        };
        error.log();
        error
    }

    pub fn dataset_error<T: Into<String>>(message: T, location: Option<&str>) -> Self {
        let error = Self::DatasetError {
            message: message.into(),
            location: location.map(String::from),
            source: None,
        };
        error.log();
        error
    }

    pub fn rate_limited(service: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            service: service.into(),
            retry_after,
            location: None,
        }
    }

    pub fn missing_api_key(service: impl Into<String>) -> Self {
        Self::MissingApiKey {
            service: service.into(),
            location: None,
        }
    }

    pub fn simple_parse_error<T: Into<String>>(message: T) -> Self {
        Self::parse_error(message, None, None::<serde_json::Error>, None)
    }

    fn log(&self) {
        if let Some(loc) = self.location() {
            log::error!("{} at {}", self, loc);
        } else {
            log::error!("{}", self);
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::RequestError { location, .. } => location.as_deref(),
            Self::ParseError { location, .. } => location.as_deref(),
            Self::RateLimited { location, .. } => location.as_deref(),
            Self::MissingApiKey { location, .. } => location.as_deref(),
            Self::ApiError { location, .. } => location.as_deref(),
            Self::DatasetError { location, .. } => location.as_deref(),
            Self::DomainError { location, .. } => location.as_deref(),
            _ => None,
        }
    }

    /// Human-readable status shown to the user in place of a result
    pub fn user_message(&self) -> String {
        match self {
            Self::ApiError { service, status, message, .. } => {
                format!("{} request failed with status {}: {}", service, status, message)
            }
            Self::RateLimited { service, retry_after: Some(after), .. } => format!(
                "{} is rate limiting requests; try again in {} seconds.",
                service,
                after.as_secs()
            ),
            Self::RateLimited { service, retry_after: None, .. } => {
                format!("{} is rate limiting requests; try again later.", service)
            }
            Self::RequestError { message, .. } => {
                format!("Could not reach the analysis service: {}", message)
            }
            Self::ParseError { message, .. } => {
                format!("The analysis service returned an unreadable response: {}", message)
            }
            Self::MissingApiKey { service, .. } => {
                format!("No API key is configured for {}.", service)
            }
            Self::DatasetError { message, .. } => {
                format!("Please upload a valid email CSV file ({}).", message)
            }
            Self::ValidationError(message) => message.clone(),
            Self::DomainError { message, .. } => message.clone(),
            Self::Cancelled => "The analysis was cancelled.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Create a domain error that records the call site
#[macro_export]
macro_rules! domain_error {
    ($domain:expr, $message:expr) => {
        $crate::types::DashboardError::domain_error($message, Some($domain.to_string()), None, None::<reqwest::Error>, Some(concat!(file!(), ":", line!())))
    };
    ($domain:expr, $message:expr, $details:expr) => {
        $crate::types::DashboardError::domain_error($message, Some($domain.to_string()), Some($details), None::<reqwest::Error>, Some(concat!(file!(), ":", line!())))
    };
}

lazy_static::lazy_static! {
    static ref KEY_LIKE_TOKEN: regex::Regex = regex::Regex::new(r"[A-Za-z0-9_-]{20,}").unwrap();
    static ref KEY_QUERY_PARAM: regex::Regex = regex::Regex::new(r"(?i)(key=)[^&\s]+").unwrap();
}

/// Redacts anything that looks like a credential from text shown to the user
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = KEY_QUERY_PARAM.replace_all(message, "${1}[REDACTED]");
    KEY_LIKE_TOKEN.replace_all(&sanitized, "[REDACTED]").into_owned()
}

/// A display-ready result, or the message shown in its place
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ready(T),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Outcome::Ready(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Outcome::Ready(_) => None,
            Outcome::Failed(message) => Some(message),
        }
    }
}

impl<T> From<DashboardResult<T>> for Outcome<T> {
    fn from(result: DashboardResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Ready(value),
            Err(err) => Outcome::Failed(err.user_message()),
        }
    }
}

/// Sentiment label returned by the text classifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Positive,
    Negative,
    Neutral,
    /// Any other label the model emits; counted as neutral
    Other(String),
}

impl Label {
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "POSITIVE" => Label::Positive,
            "NEGATIVE" => Label::Negative,
            "NEUTRAL" => Label::Neutral,
            _ => Label::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Label::Positive => "POSITIVE",
            Label::Negative => "NEGATIVE",
            Label::Neutral => "NEUTRAL",
            Label::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Output of classifying one message's combined text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: Label,
    pub confidence: Option<f32>,
}

impl ClassificationResult {
    pub fn new(label: Label) -> Self {
        Self { label, confidence: None }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

// Text classifier wire format

#[derive(Debug, Serialize, Clone)]
pub struct ClassifierRequest {
    pub inputs: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// The inference API nests scores one level deeper for single inputs on some models
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum ClassifierResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error {
        error: String,
        #[serde(default)]
        estimated_time: Option<f32>,
    },
}

impl ClassifierResponse {
    /// The highest-scoring label, or an error describing why there is none
    pub fn into_result(self) -> DashboardResult<ClassificationResult> {
        let scores = match self {
            ClassifierResponse::Nested(outer) => outer.into_iter().next().unwrap_or_default(),
            ClassifierResponse::Flat(scores) => scores,
            ClassifierResponse::Error { error, estimated_time } => {
                let details = estimated_time.map(|t| format!("estimated time {:.0}s", t));
                return Err(DashboardError::parse_error(
                    format!("classifier reported an error: {}", sanitize_error_message(&error)),
                    details,
                    None::<serde_json::Error>,
                    Some(concat!(file!(), ":", line!())),
                ));
            }
        };

        scores
            .into_iter()
            .filter(|s| s.score.is_finite())
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
            .map(|best| ClassificationResult::new(Label::from_raw(&best.label)).with_confidence(best.score))
            .ok_or_else(|| DashboardError::simple_parse_error("classifier returned no labels"))
    }
}

// Prompt analyzer wire format (generateContent)

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContentBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    pub fn is_empty(&self) -> bool {
        *self == GenerationConfig::default()
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Text of the first user turn
    pub fn prompt_text(&self) -> Option<&str> {
        self.contents
            .first()
            .and_then(|c| c.parts.iter().find_map(|p| p.text.as_deref()))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ContentBlock>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Build a single-candidate response, mostly useful for tests and fakes
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(ContentBlock {
                    role: Some("model".to_string()),
                    parts: vec![Part { text: Some(text.into()) }],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        }
    }

    /// Concatenated text parts of the first candidate, if there are any
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_parsing_is_case_insensitive() {
        assert_eq!(Label::from_raw("positive"), Label::Positive);
        assert_eq!(Label::from_raw(" NEGATIVE "), Label::Negative);
        assert_eq!(Label::from_raw("Neutral"), Label::Neutral);
        assert_eq!(Label::from_raw("LABEL_1"), Label::Other("LABEL_1".to_string()));
    }

    #[test]
    fn classifier_response_picks_highest_score() {
        let body = r#"[[{"label":"NEGATIVE","score":0.12},{"label":"POSITIVE","score":0.88}]]"#;
        let response: ClassifierResponse = serde_json::from_str(body).unwrap();
        let result = response.into_result().unwrap();
        assert_eq!(result.label, Label::Positive);
        assert!((result.confidence.unwrap() - 0.88).abs() < 1e-6);

        let body = r#"[{"label":"NEGATIVE","score":0.97},{"label":"POSITIVE","score":0.03}]"#;
        let response: ClassifierResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_result().unwrap().label, Label::Negative);
    }

    #[test]
    fn classifier_error_body_is_an_error() {
        let body = r#"{"error":"Model is currently loading","estimated_time":20.0}"#;
        let response: ClassifierResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(response.into_result(), Err(DashboardError::ParseError { .. })));

        let response: ClassifierResponse = serde_json::from_str("[[]]").unwrap();
        assert!(response.into_result().is_err());
    }

    #[test]
    fn generate_response_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"there"}]},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello there"));

        let blocked = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(blocked).unwrap();
        assert_eq!(response.text(), None);
        assert_eq!(response.block_reason(), Some("SAFETY"));
    }

    #[test]
    fn sanitize_redacts_keys_and_query_params() {
        let message = "bad request to https://host/v1/models?key=AIzaShort for token hf_abcdefghijklmnopqrstuvwxyz";
        let sanitized = sanitize_error_message(message);
        assert!(!sanitized.contains("AIzaShort"));
        assert!(!sanitized.contains("hf_abcdefghijklmnopqrstuvwxyz"));
        assert!(sanitized.contains("key=[REDACTED]"));

        let plain = "temperature must be between 0 and 2";
        assert_eq!(sanitize_error_message(plain), plain);
    }

    #[test]
    fn outcome_from_error_uses_user_message() {
        let result: DashboardResult<String> = Err(DashboardError::ApiError {
            service: "analyzer".to_string(),
            status: 403,
            message: "permission denied".to_string(),
            location: None,
        });
        let outcome = Outcome::from(result);
        assert_eq!(
            outcome.failure(),
            Some("analyzer request failed with status 403: permission denied")
        );
    }

    #[test]
    fn secure_key_is_redacted() {
        let key = SecureApiKey::new("secret-value");
        assert_eq!(format!("{:?}", key), "SecureApiKey([REDACTED])");
        assert_eq!(key.to_string(), "[REDACTED API KEY]");
        assert_eq!(key.as_str(), "secret-value");
    }
}
