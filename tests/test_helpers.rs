use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wellbeing_rs::types::*;
use wellbeing_rs::{Dashboard, DashboardConfig, Dataset, PromptAnalyzer, TextClassifier};

pub const SAMPLE_CSV: &str = "\
direction,sender,recipient,subject,body,timestamp
inbound,teacher@school.org,kid@school.org,Great work,Your project was excellent,2024-03-04 09:00:00
outbound,kid@school.org,friend@school.org,Weekend,I am so happy about the trip,2024-03-04 17:30:00
inbound,promo@luckybet.biz,kid@school.org,Free spins,Deposit now and win big tonight,2024-03-05 23:45:00
inbound,unknown@mail.com,kid@school.org,Meet up,Don't tell your parents about our chat,2024-03-06 22:10:00
outbound,kid@school.org,teacher@school.org,Homework,I hate this and I feel awful,2024-03-07 08:05:00
";

#[allow(dead_code)]
pub fn sample_dataset() -> Dataset {
    Dataset::from_reader(SAMPLE_CSV.as_bytes()).expect("sample CSV parses")
}

#[allow(dead_code)]
pub fn test_config() -> DashboardConfig {
    DashboardConfig::new("hf_test_key", "gm_test_key")
}

/// Classifier that labels by keyword and records every text it receives.
///
/// Texts containing a failure marker return an API error instead.
#[allow(dead_code)]
pub struct MockClassifier {
    rules: Vec<(String, Label)>,
    failure_marker: Option<String>,
    delay: Duration,
    history: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl MockClassifier {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            failure_marker: None,
            delay: Duration::ZERO,
            history: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn label_when(mut self, keyword: &str, label: Label) -> Self {
        self.rules.push((keyword.to_string(), label));
        self
    }

    pub fn fail_when(mut self, marker: &str) -> Self {
        self.failure_marker = Some(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextClassifier for MockClassifier {
    async fn classify(&self, text: &str) -> DashboardResult<ClassificationResult> {
        self.history.lock().unwrap().push(text.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(marker) = &self.failure_marker {
            if text.contains(marker.as_str()) {
                return Err(DashboardError::api_error("classifier", "model is loading", Some(503), None));
            }
        }

        let label = self
            .rules
            .iter()
            .find(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, label)| label.clone())
            .unwrap_or(Label::Neutral);
        Ok(ClassificationResult::new(label).with_confidence(0.99))
    }
}

/// Analyzer that replays scripted responses in order and records prompts.
///
/// Once the script runs out it answers with `[]`.
#[allow(dead_code)]
pub struct MockAnalyzer {
    script: Mutex<VecDeque<DashboardResult<GenerateContentResponse>>>,
    history: Mutex<Vec<GenerateContentRequest>>,
}

#[allow(dead_code)]
impl MockAnalyzer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(GenerateContentResponse::from_text(text)));
        self
    }

    pub fn fail(self, error: DashboardError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn history(&self) -> Vec<GenerateContentRequest> {
        self.history.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.history()
            .iter()
            .map(|r| r.prompt_text().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl PromptAnalyzer for MockAnalyzer {
    async fn generate(&self, request: GenerateContentRequest) -> DashboardResult<GenerateContentResponse> {
        self.history.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GenerateContentResponse::from_text("[]")))
    }
}

/// Dashboard over the given mocks with the default test configuration
#[allow(dead_code)]
pub fn mock_dashboard(
    classifier: Arc<MockClassifier>,
    analyzer: Arc<MockAnalyzer>,
    config: &DashboardConfig,
) -> Dashboard {
    Dashboard::with_clients(classifier, analyzer, config).expect("valid mock dashboard")
}
