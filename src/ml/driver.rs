// ============================================================
// Layer 5: Transcription Driver
// ============================================================
// Greedy decoding as an explicit state machine:
//
//   INIT ──encode, feed <sos>──▶ STEP ──<eos> picked──▶ DONE
//                                 │ ▲
//                                 └─┘ token appended
//                                 │
//                                 └──max_length tokens──▶ DONE
//
// Each step feeds concat(embedding, embed(previous token)) into
// the decoder and takes the argmax of its logits, lowest id on a
// tie. <sos> and <pad> are never candidates, so the output holds
// corpus tokens only. The embedding is computed once per request
// and reused.

use burn::prelude::*;

use crate::domain::error::TranscribeError;
use crate::domain::image::ImageTensor;
use crate::domain::transcription::{StopReason, TokenSequence, Transcription};
use crate::domain::vocabulary::Vocabulary;
use crate::ml::decoder::StepDecoder;
use crate::ml::encoder::FeatureEncoder;

/// Index of the largest logit outside `excluded`; the lowest id wins a
/// tie. Any NaN or infinite logit is an `Inference` error, excluded or not.
pub fn select_greedy(logits: &[f32], excluded: &[usize]) -> Result<usize, TranscribeError> {
    let mut best: Option<(usize, f32)> = None;
    for (id, &value) in logits.iter().enumerate() {
        if !value.is_finite() {
            return Err(TranscribeError::Inference(format!("logit {id} is {value}")));
        }
        if excluded.contains(&id) {
            continue;
        }
        if best.map_or(true, |(_, top)| value > top) {
            best = Some((id, value));
        }
    }
    best.map(|(id, _)| id)
        .ok_or_else(|| TranscribeError::Inference("no selectable logits".into()))
}

struct Cursor<B: Backend, S> {
    embedding: Tensor<B, 2>,
    input:     Tensor<B, 2>,
    state:     Option<S>,
    output:    Vec<String>,
    steps:     usize,
}

enum Phase<B: Backend, S> {
    Init,
    Step(Cursor<B, S>),
    Done(Transcription),
}

pub struct TranscriptionDriver<'a, B: Backend, D: StepDecoder<B>> {
    encoder: &'a FeatureEncoder<B>,
    decoder: &'a D,
    vocab:   &'a Vocabulary,
    device:  &'a B::Device,
}

impl<'a, B: Backend, D: StepDecoder<B>> TranscriptionDriver<'a, B, D> {
    pub fn new(
        encoder: &'a FeatureEncoder<B>,
        decoder: &'a D,
        vocab:   &'a Vocabulary,
        device:  &'a B::Device,
    ) -> Self {
        Self { encoder, decoder, vocab, device }
    }

    /// Run the loop to completion for one image.
    pub fn run(&self, image: &ImageTensor) -> Result<Transcription, TranscribeError> {
        let mut phase = Phase::Init;
        loop {
            phase = match phase {
                Phase::Init         => Phase::Step(self.start(image)?),
                Phase::Step(cursor) => self.advance(cursor)?,
                Phase::Done(result) => return Ok(result),
            };
        }
    }

    fn start(&self, image: &ImageTensor) -> Result<Cursor<B, D::State>, TranscribeError> {
        if self.decoder.vocab_size() != self.vocab.size() {
            return Err(TranscribeError::Inference(format!(
                "decoder predicts {} ids, vocabulary has {}",
                self.decoder.vocab_size(),
                self.vocab.size()
            )));
        }

        let embedding = self.encoder.encode(image, self.device)?;
        let input     = self.next_input(&embedding, self.vocab.start_id());
        Ok(Cursor { embedding, input, state: None, output: Vec::new(), steps: 0 })
    }

    fn advance(&self, cursor: Cursor<B, D::State>) -> Result<Phase<B, D::State>, TranscribeError> {
        let Cursor { embedding, input, state, mut output, steps } = cursor;

        if output.len() >= self.vocab.max_length() {
            tracing::debug!("Budget of {} tokens exhausted", self.vocab.max_length());
            return Ok(Phase::Done(Transcription {
                tokens:      TokenSequence::new(output),
                stop_reason: StopReason::BudgetExhausted,
                steps,
            }));
        }

        let (logits, state) = self.decoder.step(input, state);
        let steps  = steps + 1;
        let scores = logits.into_data().to_vec::<f32>()
            .map_err(|e| TranscribeError::Inference(format!("cannot read logits: {e:?}")))?;
        if scores.len() != self.vocab.size() {
            return Err(TranscribeError::Inference(format!(
                "step {steps} produced {} logits for a vocabulary of {}",
                scores.len(),
                self.vocab.size()
            )));
        }

        let next = select_greedy(&scores, &[self.vocab.start_id(), self.vocab.pad_id()])?;
        if next == self.vocab.end_id() {
            tracing::debug!("<eos> after {} tokens", output.len());
            return Ok(Phase::Done(Transcription {
                tokens:      TokenSequence::new(output),
                stop_reason: StopReason::EndToken,
                steps,
            }));
        }

        let token = self.vocab.token(next)
            .ok_or_else(|| TranscribeError::Inference(format!("id {next} outside vocabulary")))?;
        tracing::trace!("step {}: {} ({})", steps, token, next);
        output.push(token.to_string());

        let input = self.next_input(&embedding, next);
        Ok(Phase::Step(Cursor { embedding, input, state: Some(state), output, steps }))
    }

    fn next_input(&self, embedding: &Tensor<B, 2>, token: usize) -> Tensor<B, 2> {
        Tensor::cat(vec![embedding.clone(), self.decoder.embed_token(token)], 1)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    use crate::ml::encoder::{FeatureEncoderConfig, StageConfig};

    type TestBackend = NdArray;

    /// Emits `script[i]` at step `i`, repeating the last entry forever.
    struct ScriptedDecoder {
        script:     Vec<usize>,
        vocab_size: usize,
    }

    impl StepDecoder<TestBackend> for ScriptedDecoder {
        type State = usize;

        fn vocab_size(&self) -> usize {
            self.vocab_size
        }

        fn embed_token(&self, _id: usize) -> Tensor<TestBackend, 2> {
            Tensor::zeros([1, 3], &Default::default())
        }

        fn step(&self, input: Tensor<TestBackend, 2>, state: Option<usize>) -> (Tensor<TestBackend, 2>, usize) {
            assert_eq!(input.dims(), [1, 5]);
            let pos  = state.map_or(0, |p| p + 1);
            let pick = self.script[pos.min(self.script.len() - 1)];
            let mut logits = vec![0.0f32; self.vocab_size];
            logits[pick] = 1.0;
            let data = TensorData::new(logits, [1, self.vocab_size]);
            (Tensor::from_data(data, &Default::default()), pos)
        }
    }

    fn vocab(max_length: usize) -> Vocabulary {
        Vocabulary::from_corpus_tokens(vec!["a".into(), "b".into(), "c".into()], max_length).unwrap()
    }

    fn encoder() -> FeatureEncoder<TestBackend> {
        FeatureEncoderConfig::new(vec![StageConfig::conv2d(3, 2, 3)])
            .init(&Default::default())
            .unwrap()
    }

    fn image() -> ImageTensor {
        ImageTensor::filled(3, 6, 6, 0.25).unwrap()
    }

    fn run(script: Vec<usize>, vocab: &Vocabulary) -> Result<Transcription, TranscribeError> {
        let enc = encoder();
        let dec = ScriptedDecoder { script, vocab_size: vocab.size() };
        let device = Default::default();
        TranscriptionDriver::new(&enc, &dec, vocab, &device).run(&image())
    }

    #[test]
    fn test_select_greedy_picks_max() {
        assert_eq!(select_greedy(&[0.1, 2.0, -1.0], &[]).unwrap(), 1);
    }

    #[test]
    fn test_select_greedy_ties_go_to_lowest_id() {
        assert_eq!(select_greedy(&[0.5, 3.0, 3.0, 3.0], &[]).unwrap(), 1);
    }

    #[test]
    fn test_select_greedy_rejects_non_finite() {
        assert!(matches!(select_greedy(&[0.0, f32::NAN], &[]), Err(TranscribeError::Inference(_))));
        assert!(select_greedy(&[f32::INFINITY, 0.0], &[]).is_err());
        assert!(select_greedy(&[0.0, f32::NAN], &[1]).is_err());
        assert!(select_greedy(&[], &[]).is_err());
    }

    #[test]
    fn test_select_greedy_skips_excluded_ids() {
        assert_eq!(select_greedy(&[0.1, 9.0, 0.5, 9.0], &[1, 3]).unwrap(), 2);
        // Ties among the remaining ids still go to the lowest one.
        assert_eq!(select_greedy(&[1.0, 5.0, 1.0], &[1]).unwrap(), 0);
        assert!(select_greedy(&[1.0, 2.0], &[0, 1]).is_err());
    }

    #[test]
    fn test_never_ending_decoder_hits_budget() {
        let v   = vocab(5);
        let out = run(vec![0], &v).unwrap();
        assert_eq!(out.tokens.len(), 5);
        assert!(out.tokens.iter().all(|t| t == "a"));
        assert_eq!(out.stop_reason, StopReason::BudgetExhausted);
        assert_eq!(out.steps, 5);
    }

    #[test]
    fn test_end_token_at_step_k_yields_k_tokens() {
        let v   = vocab(10);
        let out = run(vec![2, 1, 0, v.end_id()], &v).unwrap();
        assert_eq!(out.latex(), "c b a");
        assert_eq!(out.stop_reason, StopReason::EndToken);
        assert_eq!(out.steps, 4);
    }

    #[test]
    fn test_immediate_end_token_gives_empty_sequence() {
        let v   = vocab(4);
        let out = run(vec![v.end_id()], &v).unwrap();
        assert!(out.tokens.is_empty());
        assert_eq!(out.stop_reason, StopReason::EndToken);
    }

    #[test]
    fn test_start_and_pad_are_never_emitted() {
        let v = vocab(3);
        for sentinel in [v.start_id(), v.pad_id()] {
            let out = run(vec![sentinel], &v).unwrap();
            assert_eq!(out.tokens.len(), 3);
            assert!(out.tokens.iter().all(|t| !["<sos>", "<eos>", "<pad>"].contains(&t.as_str())));
            assert!(out.is_truncated());
        }
    }

    #[test]
    fn test_smallest_budget() {
        let v   = vocab(2);
        let out = run(vec![1], &v).unwrap();
        assert_eq!(out.tokens.len(), 2);
        assert!(out.is_truncated());
    }

    #[test]
    fn test_decoder_vocab_mismatch_is_inference_error() {
        let v   = vocab(4);
        let enc = encoder();
        let dec = ScriptedDecoder { script: vec![0], vocab_size: v.size() + 1 };
        let device = Default::default();
        let err = TranscriptionDriver::new(&enc, &dec, &v, &device).run(&image()).unwrap_err();
        assert!(matches!(err, TranscribeError::Inference(_)));
    }

    #[test]
    fn test_bad_image_fails_before_decoding() {
        let v   = vocab(4);
        let enc = encoder();
        let dec = ScriptedDecoder { script: vec![0], vocab_size: v.size() };
        let device = Default::default();
        let gray = ImageTensor::filled(1, 6, 6, 0.0).unwrap();
        let err = TranscriptionDriver::new(&enc, &dec, &v, &device).run(&gray).unwrap_err();
        assert!(matches!(err, TranscribeError::ShapeMismatch(_)));
    }
}
