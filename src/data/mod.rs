// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything between files on disk and the values the ml
// layer consumes:
//
//   labels.txt ──► corpus::VocabularyBuilder ──► Vocabulary
//
//   eq.png     ──► image::ImagePreprocessor  ──► ImageTensor
//
// Neither module touches Burn.

/// Corpus line parsing and vocabulary construction
pub mod corpus;

/// Image decoding, resizing and normalisation
pub mod image;
