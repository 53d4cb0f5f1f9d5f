// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust structs, enums, and traits describing what the
// transcription engine works with.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only values, invariants, and the error taxonomy
//
// Everything tensor-shaped crosses into the ml layer as a
// plain Vec<f32> plus a shape, and comes back out as token
// strings.

// The typed error taxonomy shared by every layer below the CLI
pub mod error;

// Channel-major image tensor handed to the encoder
pub mod image;

// Token <-> id bijection plus special tokens and length budget
pub mod vocabulary;

// Terminal output of one decoding run
pub mod transcription;

// Core abstractions (traits) that other layers implement
pub mod traits;
