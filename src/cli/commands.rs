// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Three subcommands: `vocab`, `init` and `predict`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use img2latex::application::config::AppConfig;
use img2latex::data::corpus::CorpusMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the vocabulary from a corpus and report its size
    Vocab(VocabArgs),

    /// Write a freshly initialised parameter snapshot for a corpus
    Init(InitArgs),

    /// Transcribe an image into LaTeX tokens
    Predict(PredictArgs),
}

/// Flags shared by every subcommand that reads the corpus.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Labelled formula list, one `<prefix><index>.png <label>` per line
    #[arg(long, default_value = "data/train_val_labels.txt")]
    pub corpus: String,

    /// Corpus split: "train" reads the 6-char `train_` prefix,
    /// anything else a 4-char prefix
    #[arg(long, default_value = "train")]
    pub mode: String,
}

#[derive(Args, Debug)]
pub struct VocabArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Directory to write vocab.json into
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Directory to write the snapshot into
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Input image height
    #[arg(long, default_value_t = 224)]
    pub height: usize,

    /// Input image width
    #[arg(long, default_value_t = 224)]
    pub width: usize,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to transcribe (PNG or JPEG)
    #[arg(long)]
    pub image: String,

    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Directory holding the snapshot written by `init`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

impl CorpusArgs {
    fn apply(self, cfg: AppConfig) -> AppConfig {
        AppConfig {
            corpus_path: self.corpus,
            corpus_mode: CorpusMode::from_name(&self.mode),
            ..cfg
        }
    }
}

impl From<VocabArgs> for AppConfig {
    fn from(a: VocabArgs) -> Self {
        a.corpus.apply(AppConfig::default())
    }
}

impl From<InitArgs> for AppConfig {
    fn from(a: InitArgs) -> Self {
        a.corpus.apply(AppConfig {
            checkpoint_dir: a.checkpoint_dir,
            image_size:     [a.height, a.width],
            ..AppConfig::default()
        })
    }
}

impl From<&PredictArgs> for AppConfig {
    fn from(a: &PredictArgs) -> Self {
        a.corpus.clone().apply(AppConfig {
            checkpoint_dir: a.checkpoint_dir.clone(),
            ..AppConfig::default()
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_name_maps_to_corpus_mode() {
        let args = VocabArgs {
            corpus: CorpusArgs { corpus: "labels.txt".into(), mode: "val".into() },
            out:    None,
        };
        let cfg = AppConfig::from(args);
        assert_eq!(cfg.corpus_mode, CorpusMode::Eval);
        assert_eq!(cfg.corpus_path, "labels.txt");
    }

    #[test]
    fn test_init_args_carry_image_size() {
        let args = InitArgs {
            corpus:         CorpusArgs { corpus: "c.txt".into(), mode: "train".into() },
            checkpoint_dir: "snap".into(),
            height:         128,
            width:          512,
        };
        let cfg = AppConfig::from(args);
        assert_eq!(cfg.image_size, [128, 512]);
        assert_eq!(cfg.checkpoint_dir, "snap");
        assert_eq!(cfg.corpus_mode, CorpusMode::Train);
    }
}
