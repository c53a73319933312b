//! Runtime configuration for the classifier and analyzer clients.
//!
//! Everything the pipeline needs from the outside world is gathered here once
//! at startup and passed into client constructors. Business logic never reads
//! the environment itself.

use crate::types::*;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Hosted binary sentiment model used when no classifier endpoint is configured
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/siebert/sentiment-roberta-large-english";

/// Hosted language model used when no analyzer endpoint is configured
pub const DEFAULT_ANALYZER_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of messages sent to the classifier per analysis
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

/// Upper bound accepted for `max_concurrency`
pub const MAX_CONCURRENCY_LIMIT: usize = 64;

pub const DEFAULT_MAX_PROMPT_TOKENS: u32 = 24_000;

/// Explicit configuration injected into the clients
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub classifier_endpoint: String,
    pub classifier_key: SecureApiKey,
    pub analyzer_endpoint: String,
    pub analyzer_key: SecureApiKey,
    pub request_timeout: Duration,
    /// Prefix of the dataset sent to the classifier; `None` classifies every message
    pub sample_size: Option<usize>,
    /// Upper bound on in-flight classifier calls
    pub max_concurrency: usize,
    /// Token budget for the message section of the risk prompt
    pub max_prompt_tokens: u32,
}

impl DashboardConfig {
    /// Configuration with default endpoints and the given keys
    pub fn new(classifier_key: impl Into<String>, analyzer_key: impl Into<String>) -> Self {
        Self {
            classifier_endpoint: DEFAULT_CLASSIFIER_ENDPOINT.to_string(),
            classifier_key: SecureApiKey::new(classifier_key),
            analyzer_endpoint: DEFAULT_ANALYZER_ENDPOINT.to_string(),
            analyzer_key: SecureApiKey::new(analyzer_key),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sample_size: Some(DEFAULT_SAMPLE_SIZE),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_prompt_tokens: DEFAULT_MAX_PROMPT_TOKENS,
        }
    }

    pub fn with_classifier_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.classifier_endpoint = endpoint.into();
        self
    }

    pub fn with_analyzer_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.analyzer_endpoint = endpoint.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_sample_size(mut self, sample_size: Option<usize>) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_max_prompt_tokens(mut self, max_prompt_tokens: u32) -> Self {
        self.max_prompt_tokens = max_prompt_tokens;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Keys fall back to `HF_API_KEY` and `GEMINI_API_KEY` so existing
    /// deployments keep working.
    pub fn from_env() -> DashboardResult<Self> {
        let classifier_key = env_any(&["CLASSIFIER_API_KEY", "HF_API_KEY"])
            .ok_or_else(|| DashboardError::missing_api_key("classifier"))?;
        let analyzer_key = env_any(&["ANALYZER_API_KEY", "GEMINI_API_KEY"])
            .ok_or_else(|| DashboardError::missing_api_key("analyzer"))?;

        let mut config = Self::new(classifier_key, analyzer_key);
        if let Some(endpoint) = env_any(&["CLASSIFIER_ENDPOINT"]) {
            config.classifier_endpoint = endpoint;
        }
        if let Some(endpoint) = env_any(&["ANALYZER_ENDPOINT"]) {
            config.analyzer_endpoint = endpoint;
        }
        if let Some(secs) = env_parse::<u64>("REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = env_parse::<usize>("SENTIMENT_SAMPLE_SIZE")? {
            config.sample_size = if size == 0 { None } else { Some(size) };
        }
        if let Some(concurrency) = env_parse::<usize>("MAX_CONCURRENCY")? {
            config.max_concurrency = concurrency;
        }
        if let Some(tokens) = env_parse::<u32>("MAX_PROMPT_TOKENS")? {
            config.max_prompt_tokens = tokens;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> DashboardResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> DashboardResult<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| DashboardError::ConfigError(format!("invalid config file: {}", e)))?;
        let config = file.into_config();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DashboardResult<()> {
        validate_endpoint(&self.classifier_endpoint, "classifier_endpoint")?;
        validate_endpoint(&self.analyzer_endpoint, "analyzer_endpoint")?;

        if self.classifier_key.is_empty() {
            return Err(DashboardError::missing_api_key("classifier"));
        }
        if self.analyzer_key.is_empty() {
            return Err(DashboardError::missing_api_key("analyzer"));
        }
        if self.request_timeout.is_zero() {
            return Err(DashboardError::ConfigError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(DashboardError::ConfigError(format!(
                "max_concurrency must be between 1 and {}",
                MAX_CONCURRENCY_LIMIT
            )));
        }
        if self.sample_size == Some(0) {
            return Err(DashboardError::ConfigError(
                "sample_size must be greater than 0 when set".to_string(),
            ));
        }
        if self.max_prompt_tokens == 0 {
            return Err(DashboardError::ConfigError(
                "max_prompt_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_endpoint(endpoint: &str, name: &str) -> DashboardResult<()> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|e| DashboardError::ConfigError(format!("{} is not a valid URL: {}", name, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(DashboardError::ConfigError(format!(
            "{} must use http or https, got {}",
            name, other
        ))),
    }
}

fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> DashboardResult<Option<T>> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            DashboardError::ConfigError(format!("{} must be a number, got {:?}", name, value))
        }),
        Err(_) => Ok(None),
    }
}

/// On-disk layout of the TOML configuration
#[derive(Debug, Deserialize)]
struct ConfigFile {
    classifier: ServiceSection,
    analyzer: ServiceSection,
    #[serde(default)]
    analysis: AnalysisSection,
}

#[derive(Debug, Deserialize)]
struct ServiceSection {
    api_key: String,
    #[serde(default)]
    endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalysisSection {
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_sample_size")]
    sample_size: usize,
    #[serde(default = "default_max_concurrency")]
    max_concurrency: usize,
    #[serde(default = "default_max_prompt_tokens")]
    max_prompt_tokens: u32,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout_secs(),
            sample_size: default_sample_size(),
            max_concurrency: default_max_concurrency(),
            max_prompt_tokens: default_max_prompt_tokens(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_max_prompt_tokens() -> u32 {
    DEFAULT_MAX_PROMPT_TOKENS
}

impl ConfigFile {
    fn into_config(self) -> DashboardConfig {
        let mut config = DashboardConfig::new(self.classifier.api_key, self.analyzer.api_key)
            .with_request_timeout(Duration::from_secs(self.analysis.request_timeout_secs))
            .with_max_concurrency(self.analysis.max_concurrency)
            .with_max_prompt_tokens(self.analysis.max_prompt_tokens)
            // 0 in the file means "classify every message"
            .with_sample_size(match self.analysis.sample_size {
                0 => None,
                n => Some(n),
            });
        if let Some(endpoint) = self.classifier.endpoint {
            config.classifier_endpoint = endpoint;
        }
        if let Some(endpoint) = self.analyzer.endpoint {
            config.analyzer_endpoint = endpoint;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DashboardConfig::new("hf-key", "gemini-key");
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_size, Some(DEFAULT_SAMPLE_SIZE));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrency, 1);
    }

    #[test]
    fn rejects_bad_values() {
        let config = DashboardConfig::new("", "gemini-key");
        assert!(matches!(config.validate(), Err(DashboardError::MissingApiKey { .. })));

        let config = DashboardConfig::new("k", "k").with_classifier_endpoint("not a url");
        assert!(matches!(config.validate(), Err(DashboardError::ConfigError(_))));

        let config = DashboardConfig::new("k", "k").with_analyzer_endpoint("ftp://example.com/x");
        assert!(matches!(config.validate(), Err(DashboardError::ConfigError(_))));

        let config = DashboardConfig::new("k", "k").with_request_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = DashboardConfig::new("k", "k").with_max_concurrency(0);
        assert!(config.validate().is_err());

        let config = DashboardConfig::new("k", "k").with_sample_size(Some(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_toml() {
        let content = r#"
            [classifier]
            api_key = "hf-key"

            [analyzer]
            api_key = "gemini-key"
            endpoint = "http://localhost:8080/generate"

            [analysis]
            request_timeout_secs = 10
            sample_size = 0
            max_concurrency = 4
        "#;
        let config = DashboardConfig::from_toml_str(content).unwrap();
        assert_eq!(config.classifier_endpoint, DEFAULT_CLASSIFIER_ENDPOINT);
        assert_eq!(config.analyzer_endpoint, "http://localhost:8080/generate");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.sample_size, None);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.max_prompt_tokens, DEFAULT_MAX_PROMPT_TOKENS);
        assert_eq!(config.analyzer_key.as_str(), "gemini-key");
    }

    #[test]
    fn toml_without_keys_is_rejected() {
        let content = r#"
            [classifier]
            endpoint = "http://localhost/x"
        "#;
        assert!(matches!(
            DashboardConfig::from_toml_str(content),
            Err(DashboardError::ConfigError(_))
        ));
    }
}
