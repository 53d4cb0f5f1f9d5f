// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2. The only
// layer that prints.
//
//   1. `vocab`    parse the corpus, report the vocabulary
//   2. `init`     write a fresh parameter snapshot
//   3. `predict`  transcribe one image
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InitArgs, PredictArgs, VocabArgs};

#[derive(Parser, Debug)]
#[command(
    name = "img2latex",
    version = "0.1.0",
    about = "Transcribe images of formulas into LaTeX tokens."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Vocab(args)   => run_vocab(args),
            Commands::Init(args)    => run_init(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_vocab(args: VocabArgs) -> Result<()> {
    use img2latex::application::vocab_use_case::VocabUseCase;

    let out   = args.out.clone();
    let vocab = VocabUseCase::new(args.into()).execute(out.as_deref().map(Path::new))?;

    println!("Tokens:     {} ({} from corpus)", vocab.size(), vocab.corpus_size());
    println!("Max length: {}", vocab.max_length());
    if let Some(dir) = out {
        println!("Saved to:   {dir}");
    }
    Ok(())
}

fn run_init(args: InitArgs) -> Result<()> {
    use img2latex::application::snapshot_use_case::SnapshotUseCase;

    tracing::info!("Initialising snapshot in: {}", args.checkpoint_dir);
    let dir = args.checkpoint_dir.clone();
    let cfg = SnapshotUseCase::new(args.into()).execute()?;

    println!(
        "Snapshot written to '{dir}' (vocab={}, image={}x{}).",
        cfg.decoder.vocab_size, cfg.image_size[0], cfg.image_size[1]
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use img2latex::application::transcribe_use_case::TranscribeUseCase;

    let use_case = TranscribeUseCase::new(&(&args).into())?;
    let out      = use_case.transcribe_file(&args.image)?;

    println!("\nLaTeX: {}", out.latex());
    println!("Stop:  {:?} after {} steps", out.stop_reason, out.steps);
    Ok(())
}
