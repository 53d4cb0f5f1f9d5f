// ============================================================
// Layer 6: Vocabulary Store
// ============================================================
// Keeps vocab.json next to the weights so a snapshot is always
// read with the id assignment it was built with.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data::corpus::{CorpusMode, VocabularyBuilder};
use crate::domain::traits::Persistable;
use crate::domain::vocabulary::Vocabulary;

pub const VOCAB_FILE: &str = "vocab.json";

impl Persistable for Vocabulary {
    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid vocabulary file '{}'", path.display()))
    }
}

pub struct VocabularyStore {
    dir: PathBuf,
}

impl VocabularyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(VOCAB_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Load the stored vocabulary, or build one from the corpus and store it.
    pub fn load_or_build(&self, corpus: impl AsRef<Path>, mode: CorpusMode) -> Result<Vocabulary> {
        if self.exists() {
            tracing::info!("Loading existing vocabulary from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building vocabulary from '{}'", corpus.as_ref().display());
            let vocab = VocabularyBuilder::new(mode).build_from_file(corpus)?;
            self.save(&vocab)?;
            Ok(vocab)
        }
    }

    pub fn load(&self) -> Result<Vocabulary> {
        Vocabulary::load(&self.path())
    }

    pub fn save(&self, vocab: &Vocabulary) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        vocab.save(&self.path())?;
        tracing::info!("Vocabulary ({} tokens) saved to '{}'", vocab.size(), self.path().display());
        Ok(())
    }
}
