// ============================================================
// Layer 2: Transcribe Use Case
// ============================================================
// Load once, transcribe many:
//   1. Vocabulary from the snapshot (built from the corpus if the
//      snapshot has none yet)
//   2. Architecture + weights from the checkpoint directory
//   3. Per request: decode file → preprocess → greedy decode

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::config::AppConfig;
use crate::data::image::ImagePreprocessor;
use crate::domain::traits::Transcriber;
use crate::domain::transcription::Transcription;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabularyStore};
use crate::ml::{InferBackend, InferenceContext};

pub struct TranscribeUseCase {
    context:      InferenceContext<InferBackend>,
    preprocessor: ImagePreprocessor,
}

impl TranscribeUseCase {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let vocab = VocabularyStore::new(&config.checkpoint_dir)
            .load_or_build(&config.corpus_path, config.corpus_mode)?;
        let ckpt    = CheckpointManager::new(&config.checkpoint_dir);
        let context = InferenceContext::from_checkpoint(&ckpt, vocab, Default::default())?;

        // The snapshot decides the input size, not the CLI.
        let preprocessor = ImagePreprocessor::new(context.config().image_size);
        Ok(Self { context, preprocessor })
    }

    pub fn transcribe_file(&self, path: impl AsRef<Path>) -> Result<Transcription> {
        let path  = path.as_ref();
        let image = self.preprocessor.load(path)?;
        let out   = self.context.transcribe(&image)
            .with_context(|| format!("Transcription of '{}' failed", path.display()))?;

        if out.is_truncated() {
            tracing::warn!(
                "'{}' hit the {}-token budget without <eos>",
                path.display(),
                self.context.vocabulary().max_length()
            );
        }
        Ok(out)
    }
}
