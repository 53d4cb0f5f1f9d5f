// ============================================================
// Layer 3: Error Taxonomy
// ============================================================
// Every failure the core can report. None of them are retried
// internally; they surface to whoever called the core and are
// wrapped with anyhow context at the application boundary.
//
// Running out of decoding budget is NOT listed here: it is a
// normal terminal state (see StopReason::BudgetExhausted).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscribeError {
    /// A corpus line does not follow the `<prefix><index>.<ext><label>` layout.
    /// `line` is 1-based.
    #[error("corpus line {line}: {reason}")]
    CorpusFormat { line: usize, reason: String },

    /// A vocabulary record violates the token/id bijection.
    #[error("invalid vocabulary: {0}")]
    Vocabulary(String),

    /// The image cannot be fed through the encoder stages.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A non-finite value or an inconsistent tensor appeared while
    /// encoding or decoding.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The encoder stage list or decoder sizes were rejected while
    /// building the network.
    #[error("invalid architecture: {0}")]
    Architecture(String),
}

impl TranscribeError {
    pub fn corpus(line: usize, reason: impl Into<String>) -> Self {
        Self::CorpusFormat { line, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_error_mentions_line() {
        let e = TranscribeError::corpus(7, "missing '.' after index");
        assert_eq!(e.to_string(), "corpus line 7: missing '.' after index");
    }
}
