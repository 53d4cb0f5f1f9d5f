// ============================================================
// Layer 4: Corpus Parser / Vocabulary Builder
// ============================================================
// Reads the labelled formula list and derives the Vocabulary.
//
// Line layout (fixed-width positional format):
//
//   train_00017.png\t\frac { a } { b }\n
//   └────┘└───┘└──┘└──────────────────┘└┘
//   prefix index ext label              terminator
//
//   prefix     6 chars in train mode ("train_"),
//              4 chars otherwise ("val_", "test")
//   index      digits up to the first '.'
//   ext        the '.' plus 3 chars (".png"); the label starts
//              4 chars after the '.'
//   label      whitespace-separated LaTeX tokens
//   terminator the final char of the line, always dropped
//
// Tokens get ids in first-seen order; the three control tokens
// are appended afterwards by Vocabulary::from_corpus_tokens.
// A malformed line aborts the build: no partial vocabulary.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::error::TranscribeError;
use crate::domain::vocabulary::{Vocabulary, MIN_MAX_LENGTH, SPECIAL_TOKENS};

/// Chars from the index terminator '.' to the first label char.
pub const LABEL_GAP: usize = 4;

/// Slots reserved in max_length for `<sos>` and `<eos>`.
pub const RESERVED_SLOTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusMode {
    /// Lines start with the 6-char `train_` prefix.
    Train,
    /// Any other split; lines start with a 4-char prefix.
    Eval,
}

impl CorpusMode {
    /// `"train"` selects Train, every other name selects Eval.
    pub fn from_name(name: &str) -> Self {
        if name == "train" { Self::Train } else { Self::Eval }
    }

    /// Char offset where the numeric index begins.
    pub fn index_offset(self) -> usize {
        match self {
            Self::Train => 6,
            Self::Eval  => 4,
        }
    }
}

/// One parsed corpus line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry<'a> {
    pub index: u64,
    pub label: &'a str,
}

impl<'a> CorpusEntry<'a> {
    pub fn tokens(&self) -> impl Iterator<Item = &'a str> {
        self.label.split_whitespace()
    }
}

/// Parse one line (terminator included). `line_no` is 1-based and only
/// used for error reporting.
pub fn parse_line(line: &str, mode: CorpusMode, line_no: usize) -> Result<CorpusEntry<'_>, TranscribeError> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let offset = mode.index_offset();
    if chars.len() <= offset {
        return Err(TranscribeError::corpus(
            line_no,
            format!("line has {} chars, shorter than the {offset}-char prefix", chars.len()),
        ));
    }

    let dot = chars[offset..]
        .iter()
        .position(|&(_, c)| c == '.')
        .map(|p| p + offset)
        .ok_or_else(|| TranscribeError::corpus(line_no, "no '.' terminating the index"))?;

    // Byte position of char `k`, or the end of the line.
    let byte_at = |k: usize| chars.get(k).map_or(line.len(), |&(b, _)| b);

    let index_text = &line[byte_at(offset)..byte_at(dot)];
    let index = index_text.parse::<u64>().map_err(|_| {
        TranscribeError::corpus(line_no, format!("index {index_text:?} is not a number"))
    })?;

    let label_start = dot + LABEL_GAP;
    let label_end   = chars.len() - 1;
    if label_start > label_end {
        return Err(TranscribeError::corpus(
            line_no,
            format!("label would start at char {label_start}, past the end of the line"),
        ));
    }

    Ok(CorpusEntry { index, label: &line[byte_at(label_start)..byte_at(label_end)] })
}

/// Derives a Vocabulary from corpus text.
#[derive(Debug, Clone, Copy)]
pub struct VocabularyBuilder {
    mode: CorpusMode,
}

impl VocabularyBuilder {
    pub fn new(mode: CorpusMode) -> Self {
        Self { mode }
    }

    pub fn build_from_str(&self, content: &str) -> Result<Vocabulary, TranscribeError> {
        let mut tokens: Vec<String> = Vec::new();
        let mut seen:   HashSet<&str> = HashSet::new();
        let mut max_length = 0usize;
        let mut lines      = 0usize;

        for (i, line) in content.split_inclusive('\n').enumerate() {
            if line.trim().is_empty() {
                tracing::debug!("Skipping blank corpus line {}", i + 1);
                continue;
            }
            let entry = parse_line(line, self.mode, i + 1)?;
            lines += 1;

            let mut count = 0usize;
            for token in entry.tokens() {
                count += 1;
                if SPECIAL_TOKENS.contains(&token) {
                    return Err(TranscribeError::corpus(
                        i + 1,
                        format!("label uses reserved token {token:?}"),
                    ));
                }
                if seen.insert(token) {
                    tokens.push(token.to_string());
                }
            }
            max_length = max_length.max(count + RESERVED_SLOTS);
        }

        let max_length = max_length.max(MIN_MAX_LENGTH);
        tracing::info!(
            "Parsed {} corpus lines: {} distinct tokens, max_length={}",
            lines,
            tokens.len(),
            max_length,
        );
        Vocabulary::from_corpus_tokens(tokens, max_length)
    }

    pub fn build_from_file(&self, path: impl AsRef<Path>) -> anyhow::Result<Vocabulary> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read corpus '{}'", path.display()))?;
        self.build_from_str(&content)
            .with_context(|| format!("Malformed corpus '{}'", path.display()))
    }
}
