// ============================================================
// Layer 2: Snapshot Use Case
// ============================================================
// Writes a freshly initialised parameter snapshot sized to the
// corpus vocabulary, so the predict path can be exercised end
// to end before real weights exist:
//
//   Step 1: Build the vocabulary       (Layer 4 - data)
//   Step 2: Size the architecture      (Layer 5 - ml)
//   Step 3: Initialise parameters      (Layer 5 - ml)
//   Step 4: Save config, weights, vocab (Layer 6 - infra)

use anyhow::Result;

use crate::application::config::AppConfig;
use crate::data::corpus::VocabularyBuilder;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabularyStore};
use crate::ml::{model::ModelConfig, InferBackend};

pub struct SnapshotUseCase {
    config:       AppConfig,
    architecture: Option<ModelConfig>,
}

impl SnapshotUseCase {
    pub fn new(config: AppConfig) -> Self {
        Self { config, architecture: None }
    }

    /// Use `architecture` instead of the standard one. Its vocabulary size
    /// is replaced by the corpus vocabulary size.
    pub fn with_architecture(mut self, architecture: ModelConfig) -> Self {
        self.architecture = Some(architecture);
        self
    }

    /// Returns the config that was written.
    pub fn execute(&self) -> Result<ModelConfig> {
        let cfg = &self.config;

        // ── Step 1: Vocabulary ────────────────────────────────────────────────
        let vocab = VocabularyBuilder::new(cfg.corpus_mode).build_from_file(&cfg.corpus_path)?;

        // ── Step 2: Architecture ──────────────────────────────────────────────
        let mut model_cfg = match &self.architecture {
            Some(arch) => arch.clone(),
            None => {
                let mut standard = ModelConfig::standard(vocab.size());
                standard.image_size = cfg.image_size;
                standard
            }
        };
        model_cfg.decoder.vocab_size = vocab.size();

        // ── Step 3: Parameters ────────────────────────────────────────────────
        let device = Default::default();
        let model  = model_cfg.init::<InferBackend>(&device)?;

        // ── Step 4: Persist ───────────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_config(&model_cfg)?;
        ckpt.save_model(&model, 0)?;
        VocabularyStore::new(&cfg.checkpoint_dir).save(&vocab)?;

        tracing::info!(
            "Snapshot written to '{}' (vocab={}, image={}x{})",
            cfg.checkpoint_dir,
            vocab.size(),
            model_cfg.image_size[0],
            model_cfg.image_size[1],
        );
        Ok(model_cfg)
    }
}
