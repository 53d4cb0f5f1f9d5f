// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor code, no printing, no
// direct file formats. Each use case tells the data, ml and
// infra layers what to do in order.
//
// Reference: Clean Architecture pattern

/// Paths and modes shared by every use case
pub mod config;

/// Build and report the vocabulary
pub mod vocab_use_case;

/// Write a freshly initialised parameter snapshot
pub mod snapshot_use_case;

/// Load a snapshot and transcribe images
pub mod transcribe_use_case;
