// ============================================================
// Layer 3: Image Tensor
// ============================================================
// A channel-major (C × H × W) f32 image, already normalised by
// the preprocessing step. The encoder only accepts C == 3;
// single-channel images must be replicated first.

use crate::domain::error::TranscribeError;

/// Channels the encoder expects.
pub const ENCODER_CHANNELS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    channels: usize,
    height:   usize,
    width:    usize,
    data:     Vec<f32>,
}

impl ImageTensor {
    /// Wrap channel-major pixel data. Fails if `data.len()` is not
    /// `channels * height * width` or any dimension is zero.
    pub fn new(
        channels: usize,
        height:   usize,
        width:    usize,
        data:     Vec<f32>,
    ) -> Result<Self, TranscribeError> {
        if channels == 0 || height == 0 || width == 0 {
            return Err(TranscribeError::ShapeMismatch(format!(
                "image dimensions must be non-zero, got {channels}x{height}x{width}"
            )));
        }
        let expected = element_count(channels, height, width)?;
        if data.len() != expected {
            return Err(TranscribeError::ShapeMismatch(format!(
                "{channels}x{height}x{width} image needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { channels, height, width, data })
    }

    /// Tensor filled with a constant value. Same shape rules as `new`.
    pub fn filled(
        channels: usize,
        height:   usize,
        width:    usize,
        value:    f32,
    ) -> Result<Self, TranscribeError> {
        let len = element_count(channels, height, width)?;
        Self::new(channels, height, width, vec![value; len])
    }

    /// `[channels, height, width]`
    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// One channel plane as a slice.
    pub fn plane(&self, channel: usize) -> Option<&[f32]> {
        let plane = self.height * self.width;
        (channel < self.channels).then(|| &self.data[channel * plane..(channel + 1) * plane])
    }

    /// Copy a single-channel image into every channel of a
    /// `ENCODER_CHANNELS`-channel image. Three-channel input is returned
    /// unchanged; anything else is a shape mismatch.
    pub fn to_encoder_channels(&self) -> Result<Self, TranscribeError> {
        match self.channels {
            ENCODER_CHANNELS => Ok(self.clone()),
            1 => Ok(Self {
                channels: ENCODER_CHANNELS,
                height:   self.height,
                width:    self.width,
                data:     self.data.repeat(ENCODER_CHANNELS),
            }),
            c => Err(TranscribeError::ShapeMismatch(format!(
                "cannot expand a {c}-channel image to {ENCODER_CHANNELS} channels"
            ))),
        }
    }
}

fn element_count(channels: usize, height: usize, width: usize) -> Result<usize, TranscribeError> {
    channels
        .checked_mul(height)
        .and_then(|n| n.checked_mul(width))
        .ok_or_else(|| TranscribeError::ShapeMismatch(format!(
            "{channels}x{height}x{width} image is too large to address"
        )))
}
