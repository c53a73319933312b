// Risk and tone summary over a whole batch

use crate::builder::GenerationRequestBuilder;
use crate::client::PromptAnalyzer;
use crate::config::{DashboardConfig, DEFAULT_MAX_PROMPT_TOKENS};
use crate::context::PromptBudget;
use crate::domains::{DomainClient, ValidationOperations};
use crate::types::*;
use crate::utils::json_extractor::find_string_array;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Bumped whenever a category is added, removed or renamed
pub const RISK_VOCABULARY_VERSION: u32 = 1;

/// Separator placed between messages in the prompt
pub const MESSAGE_SEPARATOR: &str = "\n\n";

/// Output cap for risk replies; a category list never needs more
pub const RISK_MAX_OUTPUT_TOKENS: u32 = 256;

/// The closed set of tags the summarizer may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskCategory {
    Violence,
    SelfHarm,
    Gambling,
    SexualContent,
    InappropriateLanguage,
    ScamPhishing,
    AcademicCheating,
    ExternalContact,
    LateNightUse,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 9] = [
        RiskCategory::Violence,
        RiskCategory::SelfHarm,
        RiskCategory::Gambling,
        RiskCategory::SexualContent,
        RiskCategory::InappropriateLanguage,
        RiskCategory::ScamPhishing,
        RiskCategory::AcademicCheating,
        RiskCategory::ExternalContact,
        RiskCategory::LateNightUse,
    ];

    /// The name exactly as it appears in the prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Violence => "Violence",
            RiskCategory::SelfHarm => "Self-harm",
            RiskCategory::Gambling => "Gambling",
            RiskCategory::SexualContent => "Sexual content",
            RiskCategory::InappropriateLanguage => "Inappropriate language",
            RiskCategory::ScamPhishing => "Scam/Phishing",
            RiskCategory::AcademicCheating => "Academic cheating",
            RiskCategory::ExternalContact => "External contact",
            RiskCategory::LateNightUse => "Late-night use",
        }
    }

    /// Case-insensitive exact match against the vocabulary
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RiskCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// What the analyzer reported for one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub categories_found: BTreeSet<RiskCategory>,
    /// Terms the model returned that are not in the vocabulary
    pub unrecognized: Vec<String>,
    pub raw_text: String,
    pub messages_included: usize,
    pub messages_total: usize,
}

impl RiskAssessment {
    pub fn is_clear(&self) -> bool {
        self.categories_found.is_empty()
    }

    pub fn is_trimmed(&self) -> bool {
        self.messages_included < self.messages_total
    }
}

/// Render the full prompt around an already joined message section
pub fn build_prompt(messages: &str) -> String {
    let mut prompt = String::from(
        "You are reviewing a child's school email activity on behalf of a parent.\n\
         Decide which of the following risk categories are present in the messages below.\n\n\
         Categories:\n",
    );
    for category in RiskCategory::ALL {
        prompt.push_str("- ");
        prompt.push_str(category.as_str());
        prompt.push('\n');
    }
    prompt.push_str(
        "\nRules:\n\
         - Reply with a JSON array of category names copied exactly from the list, for example [\"Gambling\", \"Late-night use\"].\n\
         - Only use categories from the list.\n\
         - Reply with [] if none of the categories apply.\n\
         - Do not rewrite or summarise the messages and do not give advice.\n\n\
         Messages:\n",
    );
    prompt.push_str(messages);
    prompt
}

fn clean_term(term: &str) -> &str {
    term.trim()
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '-' | '.' | '[' | ']' | '•'))
}

fn is_none_marker(term: &str) -> bool {
    ["none", "n/a", "no categories", "no categories apply"]
        .iter()
        .any(|marker| term.eq_ignore_ascii_case(marker))
}

/// Split a reply into vocabulary categories and leftover terms.
///
/// A JSON array is preferred; otherwise the reply is treated as a comma or
/// newline separated list. Duplicates collapse.
pub fn parse_categories(reply: &str) -> (BTreeSet<RiskCategory>, Vec<String>) {
    let terms = match find_string_array(reply) {
        Some(items) => items,
        None => {
            log::debug!("risk reply has no JSON array, splitting as a list");
            reply.split([',', '\n']).map(str::to_string).collect()
        }
    };

    let mut found = BTreeSet::new();
    let mut unrecognized: Vec<String> = Vec::new();

    for term in &terms {
        let cleaned = clean_term(term);
        if cleaned.is_empty() || is_none_marker(cleaned) {
            continue;
        }
        match RiskCategory::from_label(cleaned) {
            Some(category) => {
                found.insert(category);
            }
            None => {
                if !unrecognized.iter().any(|u| u == cleaned) {
                    unrecognized.push(cleaned.to_string());
                }
            }
        }
    }

    (found, unrecognized)
}

/// Asks the analyzer which vocabulary categories a batch touches.
pub struct RiskSummarizer {
    analyzer: Arc<dyn PromptAnalyzer>,
    budget: PromptBudget,
}

impl RiskSummarizer {
    pub fn new(analyzer: Arc<dyn PromptAnalyzer>) -> Self {
        Self {
            analyzer,
            budget: PromptBudget::new(DEFAULT_MAX_PROMPT_TOKENS),
        }
    }

    pub fn from_config(analyzer: Arc<dyn PromptAnalyzer>, config: &DashboardConfig) -> Self {
        Self::new(analyzer).with_budget(PromptBudget::new(config.max_prompt_tokens))
    }

    pub fn with_budget(mut self, budget: PromptBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Prompt for `texts` after the budget is applied, and how many texts made it in
    pub fn prepare_prompt(&self, texts: &[String]) -> (String, usize) {
        let batch = self.budget.fit(texts, MESSAGE_SEPARATOR);
        (build_prompt(&batch.join(MESSAGE_SEPARATOR)), batch.included().len())
    }

    #[tracing::instrument(skip_all, fields(texts = texts.len()))]
    pub async fn try_assess(&self, texts: &[String]) -> DashboardResult<RiskAssessment> {
        if texts.is_empty() {
            return Ok(RiskAssessment::default());
        }

        let (prompt, included) = self.prepare_prompt(texts);
        let request = GenerationRequestBuilder::new()
            .prompt(prompt)?
            .temperature(0.0)?
            .max_output_tokens(RISK_MAX_OUTPUT_TOKENS)?
            .build()?;

        let response = self.analyzer.generate(request).await?;
        let raw_text = match response.text() {
            Some(text) => text,
            None => {
                let reason = match response.block_reason() {
                    Some(reason) => format!("the analyzer declined the request ({})", reason),
                    None => "the analyzer returned no text".to_string(),
                };
                return self.domain_error(reason);
            }
        };

        let (categories_found, unrecognized) = parse_categories(&raw_text);
        if !unrecognized.is_empty() {
            log::warn!(
                "analyzer returned terms outside risk vocabulary v{}: {:?}",
                RISK_VOCABULARY_VERSION,
                unrecognized
            );
        }

        tracing::info!(
            categories = categories_found.len(),
            included,
            total = texts.len(),
            "risk assessment finished"
        );

        Ok(RiskAssessment {
            categories_found,
            unrecognized,
            raw_text,
            messages_included: included,
            messages_total: texts.len(),
        })
    }

    /// Like [`try_assess`](Self::try_assess), with failures turned into a display message
    pub async fn assess(&self, texts: &[String]) -> Outcome<RiskAssessment> {
        self.try_assess(texts).await.into()
    }
}

impl DomainClient for RiskSummarizer {
    fn domain_name(&self) -> &str {
        "risk_assessment"
    }
}

impl ValidationOperations for RiskSummarizer {}
