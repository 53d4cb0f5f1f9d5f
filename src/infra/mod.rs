// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Everything that touches the checkpoint directory:
//
//   checkpoint.rs    weights (CompactRecorder), model_config.json,
//                    latest_epoch.json
//
//   vocab_store.rs   vocab.json; reuses a stored vocabulary so
//                    the ids always match the saved weights
//
// Reference: Burn Book §5 (Records and Checkpointing)

/// Parameter snapshot saving and loading
pub mod checkpoint;

/// Vocabulary persistence
pub mod vocab_store;
