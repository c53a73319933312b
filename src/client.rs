// Core Client Implementation

use crate::config::DashboardConfig;
use crate::types::*;
use async_trait::async_trait;
use reqwest::{header, Client as HttpClient};
use std::time::Duration;

pub const CLASSIFIER_SERVICE: &str = "classifier";
pub const ANALYZER_SERVICE: &str = "analyzer";

/// A remote model that labels one piece of text
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> DashboardResult<ClassificationResult>;
}

/// A remote model that answers one prompt
#[async_trait]
pub trait PromptAnalyzer: Send + Sync {
    async fn generate(&self, request: GenerateContentRequest) -> DashboardResult<GenerateContentResponse>;
}

/// Configuration for TLS
#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub min_tls_version: Option<reqwest::tls::Version>,
    pub cert_verification: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_tls_version: Some(reqwest::tls::Version::TLS_1_2),
            cert_verification: true,
        }
    }
}

/// Build the shared HTTP client; every request is bounded by `timeout`
pub fn build_http_client(timeout: Duration, tls_config: &TlsConfig) -> DashboardResult<HttpClient> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    let mut builder = HttpClient::builder()
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .danger_accept_invalid_certs(!tls_config.cert_verification);

    if let Some(version) = tls_config.min_tls_version {
        builder = builder.min_tls_version(version);
    }

    builder.build().map_err(|e| {
        DashboardError::request_error(
            "failed to create HTTP client",
            None,
            Some(e),
            Some(concat!(file!(), ":", line!())),
        )
    })
}

/// Turn a non-success response into a descriptive error
async fn handle_error_response(service: &str, response: reqwest::Response) -> DashboardResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    if status == 429 {
        let retry_after = headers
            .get(header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        return Err(DashboardError::rate_limited(service, retry_after));
    }

    let message = sanitize_error_message(&error_message_from_body(&error_text));

    Err(DashboardError::api_error(service, message, Some(status), Some(concat!(file!(), ":", line!()))))
}

/// Pull the human-readable part out of a JSON error body when there is one
fn error_message_from_body(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|value| match value.get("error") {
        Some(serde_json::Value::String(message)) => Some(message.clone()),
        Some(serde_json::Value::Object(error)) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from),
        _ => None,
    });

    match message {
        Some(message) => message,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.chars().take(300).collect(),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> DashboardResult<T> {
    let body = response.text().await?;
    serde_json::from_str::<T>(&body).map_err(|e| {
        DashboardError::parse_error(
            e.to_string(),
            Some(body.chars().take(300).collect()),
            Some(e),
            Some(concat!(file!(), ":", line!())),
        )
    })
}

/// Text classifier speaking the hosted inference API protocol
#[derive(Clone, Debug)]
pub struct HuggingFaceClassifier {
    http_client: HttpClient,
    api_key: SecureApiKey,
    pub endpoint: String,
}

impl HuggingFaceClassifier {
    pub fn new(http_client: HttpClient, endpoint: impl Into<String>, api_key: SecureApiKey) -> Self {
        Self {
            http_client,
            api_key,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> DashboardResult<Self> {
        let http_client = build_http_client(config.request_timeout, &TlsConfig::default())?;
        Ok(Self::new(
            http_client,
            config.classifier_endpoint.clone(),
            config.classifier_key.clone(),
        ))
    }
}

#[async_trait]
impl TextClassifier for HuggingFaceClassifier {
    async fn classify(&self, text: &str) -> DashboardResult<ClassificationResult> {
        if self.api_key.is_empty() {
            return Err(DashboardError::missing_api_key(CLASSIFIER_SERVICE));
        }

        tracing::debug!(chars = text.len(), "classifying message");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.as_str())
            .json(&ClassifierRequest { inputs: text.to_string() })
            .send()
            .await?;

        let response = handle_error_response(CLASSIFIER_SERVICE, response).await?;
        let parsed: ClassifierResponse = read_json(response).await?;
        parsed.into_result()
    }
}

/// Prompt analyzer speaking the generateContent protocol
#[derive(Clone, Debug)]
pub struct GeminiAnalyzer {
    http_client: HttpClient,
    api_key: SecureApiKey,
    pub endpoint: String,
}

impl GeminiAnalyzer {
    pub fn new(http_client: HttpClient, endpoint: impl Into<String>, api_key: SecureApiKey) -> Self {
        Self {
            http_client,
            api_key,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> DashboardResult<Self> {
        let http_client = build_http_client(config.request_timeout, &TlsConfig::default())?;
        Ok(Self::new(
            http_client,
            config.analyzer_endpoint.clone(),
            config.analyzer_key.clone(),
        ))
    }
}

#[async_trait]
impl PromptAnalyzer for GeminiAnalyzer {
    async fn generate(&self, request: GenerateContentRequest) -> DashboardResult<GenerateContentResponse> {
        if self.api_key.is_empty() {
            return Err(DashboardError::missing_api_key(ANALYZER_SERVICE));
        }

        tracing::debug!(
            prompt_chars = request.prompt_text().map(str::len).unwrap_or(0),
            "sending prompt to analyzer"
        );

        // The key goes in a header so it never ends up in a logged URL
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&request)
            .send()
            .await?;

        let response = handle_error_response(ANALYZER_SERVICE, response).await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_error_fields() {
        assert_eq!(
            error_message_from_body(r#"{"error":"Authorization header is invalid"}"#),
            "Authorization header is invalid"
        );
        assert_eq!(
            error_message_from_body(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#),
            "API key not valid"
        );
        assert_eq!(error_message_from_body("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message_from_body(""), "empty response body");
    }

    #[test]
    fn http_client_builds_with_defaults() {
        assert!(build_http_client(Duration::from_secs(5), &TlsConfig::default()).is_ok());
    }
}
