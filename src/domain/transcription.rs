// ============================================================
// Layer 3: Transcription Output
// ============================================================

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Ordered LaTeX tokens produced by one decoding run. Never contains
/// `<sos>`, `<eos>` or `<pad>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSequence(Vec<String>);

impl TokenSequence {
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

impl Deref for TokenSequence {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

/// Why the decoding loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The decoder picked `<eos>`.
    EndToken,
    /// `max_length` tokens were emitted without seeing `<eos>`.
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub tokens:      TokenSequence,
    pub stop_reason: StopReason,
    /// Decoder invocations, including the one that produced `<eos>`.
    pub steps:       usize,
}

impl Transcription {
    /// Tokens joined with single spaces, the usual LaTeX rendering.
    pub fn latex(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::BudgetExhausted
    }
}
