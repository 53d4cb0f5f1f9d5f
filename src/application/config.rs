use serde::{Deserialize, Serialize};

use crate::data::corpus::CorpusMode;
use crate::data::image::DEFAULT_IMAGE_SIZE;

// ─── Application Configuration ───────────────────────────────────────────────
// Everything the use cases need to locate their inputs. Built from CLI
// flags (see cli::commands); the application layer never sees clap types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub corpus_path:    String,
    pub corpus_mode:    CorpusMode,
    pub checkpoint_dir: String,
    /// Input size for new snapshots; existing snapshots carry their own.
    pub image_size:     [usize; 2],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corpus_path:    "data/train_val_labels.txt".to_string(),
            corpus_mode:    CorpusMode::Train,
            checkpoint_dir: "checkpoints".to_string(),
            image_size:     DEFAULT_IMAGE_SIZE,
        }
    }
}
