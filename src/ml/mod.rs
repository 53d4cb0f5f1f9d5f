// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All Burn framework code lives here. The domain and data layers
// stay backend-free and testable without a GPU.
//
//   encoder.rs   StageConfig list → validated conv/pool stack,
//                image → embedding
//   decoder.rs   Embedding + LSTM + Linear, one token per step
//   driver.rs    greedy INIT → STEP → DONE loop
//   model.rs     ModelConfig and the saved parameter bundle
//   context.rs   vocabulary + parameters + device, built once
//
// The CPU backend (NdArray) is the default; build with
// `--features wgpu` to run on the GPU instead.

/// Convolutional feature encoder and its stage builder
pub mod encoder;

/// LSTM token decoder
pub mod decoder;

/// Greedy decoding state machine
pub mod driver;

/// Architecture config and parameter bundle
pub mod model;

/// Load-once inference context
pub mod context;

pub use context::InferenceContext;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;
