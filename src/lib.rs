//! Image-to-LaTeX transcription engine.
//!
//! A corpus of labelled formulas defines the [`Vocabulary`]; a convolutional
//! [`FeatureEncoder`](ml::encoder::FeatureEncoder) reduces a normalised
//! 3×H×W image to one embedding; an LSTM
//! [`TokenDecoder`](ml::decoder::TokenDecoder) is driven greedily by the
//! [`TranscriptionDriver`](ml::driver::TranscriptionDriver) until it emits
//! `<eos>` or runs out of budget.
//!
//! ```rust,ignore
//! use img2latex::data::{corpus::{CorpusMode, VocabularyBuilder}, image::ImagePreprocessor};
//! use img2latex::domain::traits::Transcriber;
//! use img2latex::infra::checkpoint::CheckpointManager;
//! use img2latex::ml::{InferBackend, InferenceContext};
//!
//! let vocab = VocabularyBuilder::new(CorpusMode::Train).build_from_file("labels.txt")?;
//! let ctx = InferenceContext::<InferBackend>::from_checkpoint(
//!     &CheckpointManager::new("checkpoints"),
//!     vocab,
//!     Default::default(),
//! )?;
//! let image = ImagePreprocessor::new(ctx.config().image_size).load("eq.png")?;
//! let out = ctx.transcribe(&image)?;
//! println!("{}", out.latex());
//! ```
#![recursion_limit = "256"]

pub mod application;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;

pub use domain::error::TranscribeError;
pub use domain::image::ImageTensor;
pub use domain::transcription::{StopReason, TokenSequence, Transcription};
pub use domain::vocabulary::Vocabulary;
