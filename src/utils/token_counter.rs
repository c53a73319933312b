//! Token counting utilities
//!
//! Used to estimate how much of the analyzer's context window a batch of
//! emails will take before the risk prompt is sent. The cl100k tokenizer is
//! not the analyzer's own tokenizer, so counts are estimates that err on the
//! high side for English text.

use lazy_static::lazy_static;
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};

lazy_static! {
    static ref CL100K_BPE: Option<CoreBPE> = match cl100k_base() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            log::warn!("cl100k tokenizer unavailable, falling back to estimates: {}", e);
            None
        }
    };
}

/// Trait for token counting strategies
pub trait TokenCounter: Send + Sync {
    /// Count tokens in a text string
    fn count_tokens(&self, text: &str) -> u32;

}

/// Token counter backed by the cl100k_base BPE
pub struct Cl100kTokenCounter;

impl TokenCounter for Cl100kTokenCounter {
    fn count_tokens(&self, text: &str) -> u32 {
        match CL100K_BPE.as_ref() {
            Some(bpe) => bpe.encode_ordinary(text).len() as u32,
            None => SimpleTokenCounter.count_tokens(text),
        }
    }
}

/// Character-based estimate, roughly 4 characters per token
pub struct SimpleTokenCounter;

impl TokenCounter for SimpleTokenCounter {
    fn count_tokens(&self, text: &str) -> u32 {
        (text.chars().count() as u32).div_ceil(4)
    }
}

pub fn default_token_counter() -> Arc<dyn TokenCounter> {
    Arc::new(Cl100kTokenCounter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cl100k_counter_counts_something() {
        let counter = Cl100kTokenCounter;
        assert!(counter.count_tokens("Hello, world! This is a test.") > 0);
        assert_eq!(counter.count_tokens(""), 0);
    }

    #[test]
    fn simple_counter_rounds_up() {
        let counter = SimpleTokenCounter;
        assert_eq!(counter.count_tokens("abcd"), 1);
        assert_eq!(counter.count_tokens("abcde"), 2);
        assert_eq!(counter.count_tokens(""), 0);
    }

}
