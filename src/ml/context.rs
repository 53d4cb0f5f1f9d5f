// ============================================================
// Layer 5: Inference Context
// ============================================================
// Owns everything a transcription needs: the vocabulary, the
// loaded parameters and the device they live on. Built once,
// then only read; each transcribe call keeps its embedding and
// decoder state on its own stack.

use std::sync::Arc;

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::domain::error::TranscribeError;
use crate::domain::image::ImageTensor;
use crate::domain::traits::Transcriber;
use crate::domain::transcription::Transcription;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::driver::TranscriptionDriver;
use crate::ml::model::{ModelConfig, TranscriptionModel};

pub struct InferenceContext<B: Backend> {
    vocab:  Arc<Vocabulary>,
    model:  TranscriptionModel<B>,
    config: ModelConfig,
    device: B::Device,
}

impl<B: Backend> InferenceContext<B> {
    pub fn new(
        config: ModelConfig,
        model:  TranscriptionModel<B>,
        vocab:  impl Into<Arc<Vocabulary>>,
        device: B::Device,
    ) -> Result<Self, TranscribeError> {
        let vocab = vocab.into();
        check_vocab_size(&config, &vocab)?;
        Ok(Self { vocab, model, config, device })
    }

    /// Context with freshly initialised parameters.
    pub fn fresh(
        config: ModelConfig,
        vocab:  impl Into<Arc<Vocabulary>>,
        device: B::Device,
    ) -> Result<Self, TranscribeError> {
        let model = config.init(&device)?;
        Self::new(config, model, vocab, device)
    }

    /// Rebuild the architecture from the saved config, then load the
    /// latest weights into it.
    pub fn from_checkpoint(
        ckpt:   &CheckpointManager,
        vocab:  impl Into<Arc<Vocabulary>>,
        device: B::Device,
    ) -> Result<Self> {
        let vocab  = vocab.into();
        let config = ckpt.load_config()?;
        if let Err(e) = check_vocab_size(&config, &vocab) {
            bail!("Checkpoint in '{}' does not match the corpus: {e}", ckpt.dir().display());
        }

        let model = config.init::<B>(&device)?;
        let model = ckpt.load_model(model, &device)?;
        tracing::info!(
            "Model loaded: vocab={}, image={}x{}",
            vocab.size(),
            config.image_size[0],
            config.image_size[1],
        );
        Ok(Self::new(config, model, vocab, device)?)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn model(&self) -> &TranscriptionModel<B> {
        &self.model
    }
}

fn check_vocab_size(config: &ModelConfig, vocab: &Vocabulary) -> Result<(), TranscribeError> {
    if config.decoder.vocab_size != vocab.size() {
        return Err(TranscribeError::Vocabulary(format!(
            "parameters expect {} tokens, vocabulary has {}",
            config.decoder.vocab_size,
            vocab.size()
        )));
    }
    Ok(())
}

impl<B: Backend> Transcriber for InferenceContext<B> {
    fn transcribe(&self, image: &ImageTensor) -> Result<Transcription, TranscribeError> {
        TranscriptionDriver::new(&self.model.encoder, &self.model.decoder, &self.vocab, &self.device)
            .run(image)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::decoder::TokenDecoderConfig;
    use crate::ml::encoder::{FeatureEncoderConfig, StageConfig};

    type TestBackend = NdArray;

    fn vocab() -> Vocabulary {
        let tokens = ["x", "^", "2", "+", "y"].iter().map(|s| s.to_string()).collect();
        Vocabulary::from_corpus_tokens(tokens, 6).unwrap()
    }

    fn small_config(vocab_size: usize) -> ModelConfig {
        ModelConfig::new(
            FeatureEncoderConfig::new(vec![
                StageConfig::conv2d(3, 4, 3),
                StageConfig::max_pool2d(2),
            ]),
            TokenDecoderConfig::new(vocab_size).with_feature_dim(4).with_hidden_size(8),
            [8, 8],
        )
    }

    fn image() -> ImageTensor {
        let data = (0..3 * 8 * 8).map(|i| ((i * 7) % 11) as f32 / 11.0 - 0.5).collect();
        ImageTensor::new(3, 8, 8, data).unwrap()
    }

    #[test]
    fn test_transcription_is_deterministic_and_bounded() {
        let v   = vocab();
        let ctx = InferenceContext::<TestBackend>::fresh(small_config(v.size()), v, Default::default()).unwrap();
        let a = ctx.transcribe(&image()).unwrap();
        let b = ctx.transcribe(&image()).unwrap();
        assert_eq!(a, b);
        assert!(a.tokens.len() <= ctx.vocabulary().max_length());
        assert!(a.tokens.iter().all(|t| t != "<eos>"));
    }

    #[test]
    fn test_vocab_size_mismatch_rejected() {
        let v   = vocab();
        let err = InferenceContext::<TestBackend>::fresh(small_config(v.size() + 2), v, Default::default());
        assert!(matches!(err, Err(TranscribeError::Vocabulary(_))));
    }

    #[test]
    fn test_checkpoint_loads_are_reproducible() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let v    = vocab();
        let cfg  = small_config(v.size());

        let ctx = InferenceContext::<TestBackend>::fresh(cfg.clone(), v.clone(), Default::default()).unwrap();
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_model(ctx.model(), 0).unwrap();

        // Weights are stored at half precision, so compare two loads
        // rather than the fresh model against a load.
        let a = InferenceContext::<TestBackend>::from_checkpoint(&ckpt, v.clone(), Default::default()).unwrap();
        let b = InferenceContext::<TestBackend>::from_checkpoint(&ckpt, v, Default::default()).unwrap();
        assert_eq!(a.config().image_size, [8, 8]);
        assert_eq!(a.transcribe(&image()).unwrap(), b.transcribe(&image()).unwrap());
    }

    #[test]
    fn test_checkpoint_for_other_vocabulary_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        ckpt.save_config(&small_config(4)).unwrap();
        assert!(InferenceContext::<TestBackend>::from_checkpoint(&ckpt, vocab(), Default::default()).is_err());
    }
}
