// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Saves and restores the parameter snapshot with Burn's
// CompactRecorder (MessagePack, half precision).
//
// Layout of a checkpoint directory:
//
//   checkpoints/
//     model_epoch_0.mpk      ← weights
//     latest_epoch.json      ← which epoch to load
//     model_config.json      ← architecture (ModelConfig)
//     vocab.json             ← token list (see vocab_store)
//
// The config is needed to rebuild the module tree before the
// weights can be loaded into it; loading fails if the two
// disagree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::{ModelConfig, TranscriptionModel};

pub const CONFIG_FILE: &str = "model_config.json";
pub const LATEST_FILE: &str = "latest_epoch.json";

/// Manages saving and loading of parameter snapshots in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))
    }

    /// Write `model_epoch_{epoch}.mpk` and point `latest_epoch.json` at it.
    pub fn save_model<B: Backend>(&self, model: &TranscriptionModel<B>, epoch: usize) -> Result<()> {
        self.ensure_dir()?;
        // The recorder appends the extension.
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        fs::write(self.dir.join(LATEST_FILE), serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest weights into `model`, which must already have the
    /// saved architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  TranscriptionModel<B>,
        device: &B::Device,
    ) -> Result<TranscriptionModel<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you run 'init' first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &ModelConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ModelConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read config from '{}'. Make sure you have run 'init'.", path.display())
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))
    }

    /// Epoch number stored in `latest_epoch.json`.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'init' first?", path.display()))?;

        Ok(serde_json::from_str::<usize>(s.trim())?)
    }
}
