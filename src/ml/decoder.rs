// ============================================================
// Layer 5: Token Decoder
// ============================================================
// One recurrent step per emitted token:
//
//   input  [1, feature_dim + hidden]   image embedding ‖ token embedding
//     │
//   LSTM (feature_dim + hidden → hidden)
//     │
//   Linear (hidden → vocab)
//     │
//   logits [1, vocab]
//
// The first step has no state; the LSTM starts from zeros. Every
// later step receives the state returned by the previous one.

use std::fmt;

use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig, Lstm, LstmConfig, LstmState},
    prelude::*,
    tensor::TensorData,
};

use crate::domain::error::TranscribeError;

/// What the transcription loop needs from a decoder.
pub trait StepDecoder<B: Backend> {
    /// Recurrent state carried from one step to the next.
    type State;

    fn vocab_size(&self) -> usize;

    /// Embedding of a single token id as a `[1, width]` tensor.
    fn embed_token(&self, id: usize) -> Tensor<B, 2>;

    /// `state` is `None` on the first step only.
    fn step(&self, input: Tensor<B, 2>, state: Option<Self::State>) -> (Tensor<B, 2>, Self::State);
}

#[derive(Config, Debug)]
pub struct TokenDecoderConfig {
    pub vocab_size:  usize,
    #[config(default = 512)]
    pub feature_dim: usize,
    #[config(default = 512)]
    pub hidden_size: usize,
}

impl TokenDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<TokenDecoder<B>, TranscribeError> {
        if self.vocab_size == 0 || self.feature_dim == 0 || self.hidden_size == 0 {
            return Err(TranscribeError::Architecture(format!(
                "decoder sizes must be positive (vocab={}, feature={}, hidden={})",
                self.vocab_size, self.feature_dim, self.hidden_size
            )));
        }
        // Token ids travel to the embedding as i64.
        if i64::try_from(self.vocab_size).is_err() {
            return Err(TranscribeError::Architecture(format!(
                "vocabulary of {} tokens does not fit i64 ids",
                self.vocab_size
            )));
        }
        let embedding  = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let lstm       = LstmConfig::new(self.feature_dim + self.hidden_size, self.hidden_size, true).init(device);
        let projection = LinearConfig::new(self.hidden_size, self.vocab_size).init(device);
        Ok(TokenDecoder {
            embedding, lstm, projection,
            vocab_size:  self.vocab_size,
            hidden_size: self.hidden_size,
        })
    }
}

#[derive(Module, Debug)]
pub struct TokenDecoder<B: Backend> {
    pub embedding:   Embedding<B>,
    pub lstm:        Lstm<B>,
    pub projection:  Linear<B>,
    pub vocab_size:  usize,
    pub hidden_size: usize,
}

/// LSTM hidden and cell state for one request.
pub struct DecoderState<B: Backend> {
    lstm: LstmState<B, 2>,
}

impl<B: Backend> fmt::Debug for DecoderState<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderState")
            .field("hidden", &self.lstm.hidden.dims())
            .field("cell", &self.lstm.cell.dims())
            .finish()
    }
}

impl<B: Backend> StepDecoder<B> for TokenDecoder<B> {
    type State = DecoderState<B>;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn embed_token(&self, id: usize) -> Tensor<B, 2> {
        let device = self.embedding.weight.val().device();
        // init() guarantees every id below vocab_size fits i64.
        let ids    = Tensor::<B, 2, Int>::from_data(TensorData::new(vec![id as i64], [1, 1]), &device);
        self.embedding.forward(ids).reshape([1, self.hidden_size])
    }

    fn step(&self, input: Tensor<B, 2>, state: Option<DecoderState<B>>) -> (Tensor<B, 2>, DecoderState<B>) {
        let [batch, width] = input.dims();
        let sequence = input.reshape([batch, 1, width]);

        let (output, lstm) = match state {
            None       => self.lstm.forward(sequence, None),
            Some(prev) => self.lstm.forward(sequence, Some(prev.lstm)),
        };

        let hidden = output.reshape([batch, self.hidden_size]);
        (self.projection.forward(hidden), DecoderState { lstm })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small_decoder() -> TokenDecoder<TestBackend> {
        TokenDecoderConfig::new(7)
            .with_feature_dim(4)
            .with_hidden_size(6)
            .init(&Default::default())
            .unwrap()
    }

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_default_sizes() {
        let cfg = TokenDecoderConfig::new(10);
        assert_eq!(cfg.feature_dim, 512);
        assert_eq!(cfg.hidden_size, 512);
    }

    #[test]
    fn test_zero_vocab_rejected() {
        let err = TokenDecoderConfig::new(0).init::<TestBackend>(&Default::default()).unwrap_err();
        assert!(matches!(err, TranscribeError::Architecture(_)));
    }

    #[test]
    fn test_vocab_beyond_i64_ids_rejected() {
        if let Ok(too_big) = usize::try_from(i64::MAX as u64 + 1) {
            let err = TokenDecoderConfig::new(too_big).init::<TestBackend>(&Default::default()).unwrap_err();
            assert!(matches!(err, TranscribeError::Architecture(_)));
        }
    }

    #[test]
    fn test_embed_token_shape() {
        let dec = small_decoder();
        assert_eq!(dec.embed_token(3).dims(), [1, 6]);
    }

    #[test]
    fn test_embed_token_selects_embedding_row() {
        let dec  = small_decoder();
        let row  = dec.embedding.weight.val().slice([6..7, 0..6]);
        assert_eq!(values(dec.embed_token(6)), values(row));
    }

    #[test]
    fn test_state_debug_shows_shapes() {
        let dec   = small_decoder();
        let input = Tensor::<TestBackend, 2>::ones([1, 10], &Default::default());
        let (_, state) = dec.step(input, None);
        let text = format!("{state:?}");
        assert!(text.contains("DecoderState"));
        assert!(text.contains("[1, 6]"));
    }

    #[test]
    fn test_step_produces_vocab_logits() {
        let dec   = small_decoder();
        let input = Tensor::<TestBackend, 2>::ones([1, 10], &Default::default());
        let (logits, _state) = dec.step(input, None);
        assert_eq!(logits.dims(), [1, 7]);
    }

    #[test]
    fn test_step_is_pure_given_state() {
        let dec   = small_decoder();
        let input = Tensor::<TestBackend, 2>::ones([1, 10], &Default::default());
        let (a, _) = dec.step(input.clone(), None);
        let (b, _) = dec.step(input, None);
        assert_eq!(values(a), values(b));
    }

    #[test]
    fn test_state_changes_next_step() {
        let dec   = small_decoder();
        let input = Tensor::<TestBackend, 2>::ones([1, 10], &Default::default());
        let (first, state) = dec.step(input.clone(), None);
        let (second, _)    = dec.step(input, Some(state));
        assert_ne!(values(first), values(second));
    }
}
