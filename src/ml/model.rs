use burn::prelude::*;

use crate::data::image::DEFAULT_IMAGE_SIZE;
use crate::domain::error::TranscribeError;
use crate::ml::decoder::{TokenDecoder, TokenDecoderConfig};
use crate::ml::encoder::{FeatureEncoder, FeatureEncoderConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct ModelConfig {
    pub encoder:    FeatureEncoderConfig,
    pub decoder:    TokenDecoderConfig,
    /// `[height, width]` images are resized to before encoding.
    pub image_size: [usize; 2],
}

impl ModelConfig {
    /// Standard encoder, 512-wide decoder, 224 × 224 input.
    pub fn standard(vocab_size: usize) -> Self {
        Self::new(
            FeatureEncoderConfig::standard(),
            TokenDecoderConfig::new(vocab_size),
            DEFAULT_IMAGE_SIZE,
        )
    }

    /// Check that the encoder and decoder fit together and that the
    /// configured image size survives the encoder.
    pub fn validate(&self) -> Result<(), TranscribeError> {
        let features = self.encoder.output_dim()?;
        if features != self.decoder.feature_dim {
            return Err(TranscribeError::Architecture(format!(
                "encoder yields {features} features, decoder expects {}",
                self.decoder.feature_dim
            )));
        }
        self.encoder
            .output_extent(self.image_size)
            .map_err(|e| TranscribeError::Architecture(e.to_string()))?;
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<TranscriptionModel<B>, TranscribeError> {
        self.validate()?;
        Ok(TranscriptionModel {
            encoder: self.encoder.init(device)?,
            decoder: self.decoder.init(device)?,
        })
    }
}

/// Every learned parameter of the system, saved and loaded as one record.
#[derive(Module, Debug)]
pub struct TranscriptionModel<B: Backend> {
    pub encoder: FeatureEncoder<B>,
    pub decoder: TokenDecoder<B>,
}
