// Prompt budget for message batches

use crate::utils::token_counter::{default_token_counter, TokenCounter};
use std::sync::Arc;

/// # Prompt Budget
///
/// Keeps the message section of a prompt inside a token limit by dropping
/// whole messages from the end of the batch. Order is preserved and the
/// first message is always kept, even when it alone exceeds the limit.
///
/// ```
/// # use wellbeing_rs::PromptBudget;
/// let budget = PromptBudget::new(10_000);
/// let texts = vec!["inbound a@school b@home Trip Bring a coat".to_string()];
/// let batch = budget.fit(&texts, "\n\n");
/// assert_eq!(batch.included().len(), 1);
/// assert!(!batch.is_trimmed());
/// ```
#[derive(Clone)]
pub struct PromptBudget {
    max_tokens: u32,
    token_counter: Arc<dyn TokenCounter>,
}

impl std::fmt::Debug for PromptBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptBudget")
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// The part of a batch that fits the budget
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetedBatch<'a> {
    included: &'a [String],
    total: usize,
    tokens: u32,
}

impl<'a> BudgetedBatch<'a> {
    pub fn included(&self) -> &'a [String] {
        self.included
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    pub fn is_trimmed(&self) -> bool {
        self.included.len() < self.total
    }

    pub fn join(&self, separator: &str) -> String {
        self.included.join(separator)
    }
}

impl PromptBudget {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            token_counter: default_token_counter(),
        }
    }

    pub fn with_counter(max_tokens: u32, token_counter: impl TokenCounter + 'static) -> Self {
        Self {
            max_tokens,
            token_counter: Arc::new(token_counter),
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Longest prefix of `texts` whose joined size stays within the budget
    pub fn fit<'a>(&self, texts: &'a [String], separator: &str) -> BudgetedBatch<'a> {
        let separator_tokens = self.token_counter.count_tokens(separator);
        let mut used = 0u32;
        let mut count = 0usize;

        for (index, text) in texts.iter().enumerate() {
            let cost = self.token_counter.count_tokens(text)
                + if index > 0 { separator_tokens } else { 0 };
            if index > 0 && used.saturating_add(cost) > self.max_tokens {
                break;
            }
            used = used.saturating_add(cost);
            count += 1;
        }

        if count < texts.len() {
            log::warn!(
                "risk prompt trimmed to {} of {} messages ({} of {} tokens)",
                count,
                texts.len(),
                used,
                self.max_tokens
            );
        }

        BudgetedBatch {
            included: &texts[..count],
            total: texts.len(),
            tokens: used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::token_counter::SimpleTokenCounter;

    fn texts(n: usize) -> Vec<String> {
        // 8 chars each: 2 simple tokens
        (0..n).map(|i| format!("message{}", i)).collect()
    }

    #[test]
    fn keeps_everything_under_budget() {
        let budget = PromptBudget::with_counter(100, SimpleTokenCounter);
        let batch = texts(5);
        let fitted = budget.fit(&batch, "\n\n");
        assert_eq!(fitted.included().len(), 5);
        assert!(!fitted.is_trimmed());
        // 5 * 2 tokens + 4 separators of 1 token
        assert_eq!(fitted.tokens(), 14);
    }

    #[test]
    fn drops_messages_from_the_end() {
        let budget = PromptBudget::with_counter(8, SimpleTokenCounter);
        let batch = texts(5);
        let fitted = budget.fit(&batch, "\n\n");
        // 2 + 3 + 3 = 8
        assert_eq!(fitted.included(), &batch[..3]);
        assert!(fitted.is_trimmed());
        assert_eq!(fitted.total(), 5);
        assert_eq!(fitted.join(" | "), "message0 | message1 | message2");
    }

    #[test]
    fn always_keeps_first_message() {
        let budget = PromptBudget::with_counter(1, SimpleTokenCounter);
        let batch = vec!["a very long message that blows the budget".to_string(), "x".to_string()];
        let fitted = budget.fit(&batch, "\n\n");
        assert_eq!(fitted.included().len(), 1);
    }

    #[test]
    fn empty_batch() {
        let budget = PromptBudget::new(10);
        let fitted = budget.fit(&[], "\n\n");
        assert!(fitted.included().is_empty());
        assert_eq!(fitted.total(), 0);
    }
}
