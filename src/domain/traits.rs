// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The seams other layers program against:
//   - Transcriber  → implemented by ml::InferenceContext
//   - Persistable  → implemented by Vocabulary (infra::vocab_store)

use std::path::Path;

use anyhow::Result;

use crate::domain::error::TranscribeError;
use crate::domain::image::ImageTensor;
use crate::domain::transcription::Transcription;

// ─── Transcriber ──────────────────────────────────────────────────────────────
/// Anything that can turn a prepared image into LaTeX tokens.
pub trait Transcriber {
    fn transcribe(&self, image: &ImageTensor) -> Result<Transcription, TranscribeError>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
pub trait Persistable: Sized {
    /// Save this component's state to the given path
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a component's state from the given path.
    fn load(path: &Path) -> Result<Self>;
}
