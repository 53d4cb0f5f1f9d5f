// ============================================================
// Layer 3: Vocabulary
// ============================================================
// The bijection between LaTeX tokens and integer ids.
//
// Layout of the id space (fixed):
//   [0 .. n)      corpus tokens in first-seen order
//   n             <sos>
//   n + 1         <eos>
//   n + 2         <pad>
//
// max_length is the largest `token_count + 2` seen in the corpus
// and doubles as the decoding budget. It is never below 2.
//
// The value is built once (see data::corpus) and then shared
// read-only between requests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::TranscribeError;

pub const START_TOKEN: &str = "<sos>";
pub const END_TOKEN: &str = "<eos>";
pub const PAD_TOKEN: &str = "<pad>";

/// The three control tokens, in the order they are appended.
pub const SPECIAL_TOKENS: [&str; 3] = [START_TOKEN, END_TOKEN, PAD_TOKEN];

/// Smallest legal budget: room for `<sos>` and `<eos>`.
pub const MIN_MAX_LENGTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyRecord", into = "VocabularyRecord")]
pub struct Vocabulary {
    token_to_id: HashMap<String, usize>,
    id_to_token: Vec<String>,
    start_id:    usize,
    end_id:      usize,
    pad_id:      usize,
    max_length:  usize,
}

/// On-disk shape of a vocabulary: the ordered token list is enough to
/// rebuild every other field.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VocabularyRecord {
    tokens:     Vec<String>,
    max_length: usize,
}

impl Vocabulary {
    /// Build a vocabulary from corpus tokens (first-seen order, no
    /// duplicates) and the observed maximum length. The special tokens
    /// are appended here.
    pub fn from_corpus_tokens(
        corpus_tokens: Vec<String>,
        max_length:    usize,
    ) -> Result<Self, TranscribeError> {
        let mut tokens = corpus_tokens;
        tokens.extend(SPECIAL_TOKENS.iter().map(|t| t.to_string()));
        Self::from_ordered_tokens(tokens, max_length)
    }

    /// Rebuild from a complete id-ordered token list whose last three
    /// entries are `<sos>`, `<eos>`, `<pad>`.
    pub fn from_ordered_tokens(
        id_to_token: Vec<String>,
        max_length:  usize,
    ) -> Result<Self, TranscribeError> {
        let n = id_to_token.len();
        if n < SPECIAL_TOKENS.len() {
            return Err(TranscribeError::Vocabulary(format!(
                "expected at least {} tokens, got {n}",
                SPECIAL_TOKENS.len()
            )));
        }
        let tail = &id_to_token[n - SPECIAL_TOKENS.len()..];
        if tail.iter().map(String::as_str).ne(SPECIAL_TOKENS.iter().copied()) {
            return Err(TranscribeError::Vocabulary(format!(
                "vocabulary must end with {SPECIAL_TOKENS:?}, found {tail:?}"
            )));
        }
        if max_length < MIN_MAX_LENGTH {
            return Err(TranscribeError::Vocabulary(format!(
                "max_length must be at least {MIN_MAX_LENGTH}, got {max_length}"
            )));
        }

        let mut token_to_id = HashMap::with_capacity(n);
        for (id, token) in id_to_token.iter().enumerate() {
            if token_to_id.insert(token.clone(), id).is_some() {
                return Err(TranscribeError::Vocabulary(format!(
                    "token {token:?} appears more than once"
                )));
            }
        }

        Ok(Self {
            token_to_id,
            id_to_token,
            start_id: n - 3,
            end_id:   n - 2,
            pad_id:   n - 1,
            max_length,
        })
    }

    /// Number of ids, special tokens included.
    pub fn size(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.token_to_id.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.id_to_token.get(id).map(String::as_str)
    }

    /// All tokens in id order.
    pub fn tokens(&self) -> &[String] {
        &self.id_to_token
    }

    pub fn start_id(&self) -> usize { self.start_id }

    pub fn end_id(&self) -> usize { self.end_id }

    pub fn pad_id(&self) -> usize { self.pad_id }

    /// Decoding budget in tokens.
    pub fn max_length(&self) -> usize { self.max_length }

    /// Corpus tokens only, i.e. everything below `<sos>`.
    pub fn corpus_size(&self) -> usize {
        self.start_id
    }

    pub fn is_special(&self, id: usize) -> bool {
        id >= self.start_id && id < self.size()
    }
}

impl TryFrom<VocabularyRecord> for Vocabulary {
    type Error = TranscribeError;

    fn try_from(record: VocabularyRecord) -> Result<Self, Self::Error> {
        Self::from_ordered_tokens(record.tokens, record.max_length)
    }
}

impl From<Vocabulary> for VocabularyRecord {
    fn from(v: Vocabulary) -> Self {
        Self { tokens: v.id_to_token, max_length: v.max_length }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vocabulary {
        let tokens = ["x", "^", "2", "\\frac"].iter().map(|s| s.to_string()).collect();
        Vocabulary::from_corpus_tokens(tokens, 5).unwrap()
    }

    #[test]
    fn test_special_ids_follow_corpus_tokens() {
        let v = sample();
        assert_eq!(v.size(), 7);
        assert_eq!(v.start_id(), 4);
        assert_eq!(v.end_id(), 5);
        assert_eq!(v.pad_id(), 6);
        assert_eq!(v.token(v.start_id()), Some(START_TOKEN));
        assert_eq!(v.token(v.end_id()), Some(END_TOKEN));
        assert_eq!(v.token(v.pad_id()), Some(PAD_TOKEN));
        assert_eq!(v.corpus_size(), 4);
    }

    #[test]
    fn test_round_trip_every_token() {
        let v = sample();
        for token in v.tokens() {
            let id = v.id(token).unwrap();
            assert_eq!(v.token(id), Some(token.as_str()));
        }
        for id in 0..v.size() {
            assert_eq!(v.id(v.token(id).unwrap()), Some(id));
        }
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let tokens = vec!["x".to_string(), "x".to_string()];
        let err = Vocabulary::from_corpus_tokens(tokens, 3).unwrap_err();
        assert!(matches!(err, TranscribeError::Vocabulary(_)));
    }

    #[test]
    fn test_max_length_below_two_rejected() {
        assert!(Vocabulary::from_corpus_tokens(Vec::new(), 1).is_err());
        assert!(Vocabulary::from_corpus_tokens(Vec::new(), 2).is_ok());
    }

    #[test]
    fn test_missing_special_tail_rejected() {
        let tokens = vec!["a".to_string(), "<eos>".to_string(), "<sos>".to_string(), "<pad>".to_string()];
        assert!(Vocabulary::from_ordered_tokens(tokens, 4).is_err());
    }

    #[test]
    fn test_json_round_trip_preserves_ids() {
        let v    = sample();
        let json = serde_json::to_string(&v).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn test_json_with_broken_tail_fails_to_load() {
        let json = r#"{"tokens":["a","<sos>","<eos>"],"max_length":3}"#;
        assert!(serde_json::from_str::<Vocabulary>(json).is_err());
    }

    #[test]
    fn test_is_special() {
        let v = sample();
        assert!(!v.is_special(0));
        assert!(v.is_special(v.start_id()));
        assert!(v.is_special(v.pad_id()));
        assert!(!v.is_special(v.size()));
    }
}
