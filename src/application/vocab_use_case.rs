// ============================================================
// Layer 2: Vocab Use Case
// ============================================================
// Parse the corpus, report the vocabulary, optionally save it.

use std::path::Path;

use anyhow::Result;

use crate::application::config::AppConfig;
use crate::data::corpus::VocabularyBuilder;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::vocab_store::VocabularyStore;

pub struct VocabUseCase {
    config: AppConfig,
}

impl VocabUseCase {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Build the vocabulary; when `out_dir` is given, write vocab.json there.
    pub fn execute(&self, out_dir: Option<&Path>) -> Result<Vocabulary> {
        let vocab = VocabularyBuilder::new(self.config.corpus_mode)
            .build_from_file(&self.config.corpus_path)?;

        if let Some(dir) = out_dir {
            VocabularyStore::new(dir).save(&vocab)?;
        }
        Ok(vocab)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::corpus::CorpusMode;

    #[test]
    fn test_execute_reports_and_saves() {
        let dir    = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("labels.txt");
        std::fs::write(&corpus, "val_1.png a + b\nval_2.png c\n").unwrap();

        let cfg = AppConfig {
            corpus_path: corpus.display().to_string(),
            corpus_mode: CorpusMode::Eval,
            ..AppConfig::default()
        };
        let out   = dir.path().join("out");
        let vocab = VocabUseCase::new(cfg).execute(Some(&out)).unwrap();
        assert_eq!(vocab.size(), 7);
        assert_eq!(vocab.max_length(), 5);
        assert!(VocabularyStore::new(&out).exists());
    }
}
