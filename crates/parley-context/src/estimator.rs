/// Fixed per-message overhead added on top of the content estimate
pub const MESSAGE_OVERHEAD_TOKENS: usize = 10;

/// Approximate token counter
///
/// Budget thresholds are tuned against the heuristic; swapping in a precise
/// tokenizer shifts when compaction kicks in.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// `ceil(chars / 4)`
#[derive(Debug, Clone, Copy)]
pub struct HeuristicEstimator {
    chars_per_token: usize,
}

impl HeuristicEstimator {
    pub fn new() -> Self {
        Self { chars_per_token: 4 }
    }

    pub fn with_chars_per_token(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}
