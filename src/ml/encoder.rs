// ============================================================
// Layer 5: Feature Encoder
// ============================================================
// Reduces a normalised 3 × H × W image to one embedding vector.
//
// The network is described by an ordered list of StageConfig
// values (a closed set of kinds, each with typed parameters).
// FeatureEncoderConfig::init validates the whole list before any
// parameter is allocated:
//
//   spatial stages   conv2d, max_pool2d, avg_pool2d   [B, C, H, W]
//   ── global mean over H, W ──────────────────────────────────
//   vector stages    linear                           [B, D]
//   either side      dropout
//
// The standard topology is five conv(5×5) → max-pool(2) rounds
// (3 → 32 → 64 → 128 → 256 → 512 channels) and a 3×3 average
// pool. For a 224 × 224 input that leaves 512 × 1 × 1, so the
// global mean is exact; other sizes are still collapsed to 512.

use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AvgPool2d, AvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::TensorData,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::TranscribeError;
use crate::domain::image::{ImageTensor, ENCODER_CHANNELS};

fn default_stride() -> usize { 1 }

/// One encoder stage. Unknown `kind` values fail to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageConfig {
    Conv2d {
        in_channels:  usize,
        out_channels: usize,
        kernel_size:  usize,
        #[serde(default = "default_stride")]
        stride:       usize,
        #[serde(default)]
        padding:      usize,
    },
    MaxPool2d {
        kernel_size: usize,
        stride:      usize,
    },
    AvgPool2d {
        kernel_size: usize,
        stride:      usize,
    },
    Linear {
        in_features:  usize,
        out_features: usize,
    },
    Dropout {
        prob: f64,
    },
}

impl StageConfig {
    pub fn conv2d(in_channels: usize, out_channels: usize, kernel_size: usize) -> Self {
        Self::Conv2d { in_channels, out_channels, kernel_size, stride: 1, padding: 0 }
    }

    /// Pool whose stride equals its kernel.
    pub fn max_pool2d(kernel_size: usize) -> Self {
        Self::MaxPool2d { kernel_size, stride: kernel_size }
    }

    pub fn avg_pool2d(kernel_size: usize) -> Self {
        Self::AvgPool2d { kernel_size, stride: kernel_size }
    }

    fn is_spatial(&self) -> bool {
        matches!(self, Self::Conv2d { .. } | Self::MaxPool2d { .. } | Self::AvgPool2d { .. })
    }

    /// Output extent along one spatial axis, or `None` if the window does
    /// not fit. Non-spatial stages pass the extent through.
    fn output_extent(&self, extent: usize) -> Option<usize> {
        let (kernel, stride, padding) = match *self {
            Self::Conv2d { kernel_size, stride, padding, .. } => (kernel_size, stride, padding),
            Self::MaxPool2d { kernel_size, stride } | Self::AvgPool2d { kernel_size, stride } => {
                (kernel_size, stride, 0)
            }
            Self::Linear { .. } | Self::Dropout { .. } => return Some(extent),
        };
        let padded = extent + 2 * padding;
        (padded >= kernel).then(|| (padded - kernel) / stride + 1)
    }
}

#[derive(Config, Debug)]
pub struct FeatureEncoderConfig {
    pub stages: Vec<StageConfig>,
}

impl FeatureEncoderConfig {
    /// The encoder used for inference: five conv/max-pool rounds and a
    /// final 3×3 average pool, producing 512 features.
    pub fn standard() -> Self {
        const CHANNELS: [usize; 6] = [3, 32, 64, 128, 256, 512];
        let mut stages = Vec::new();
        for pair in CHANNELS.windows(2) {
            stages.push(StageConfig::conv2d(pair[0], pair[1], 5));
            stages.push(StageConfig::max_pool2d(2));
        }
        stages.push(StageConfig::avg_pool2d(3));
        Self::new(stages)
    }

    /// Width of the embedding this stage list produces. Fails with
    /// `Architecture` when the list is inconsistent.
    pub fn output_dim(&self) -> Result<usize, TranscribeError> {
        let mut channels  = ENCODER_CHANNELS;
        let mut collapsed = false;

        if self.stages.is_empty() {
            return Err(TranscribeError::Architecture("encoder has no stages".into()));
        }

        for (i, stage) in self.stages.iter().enumerate() {
            let bad = |msg: String| TranscribeError::Architecture(format!("stage {i}: {msg}"));
            if collapsed && stage.is_spatial() {
                return Err(bad(format!("{stage:?} follows a vector stage")));
            }
            match *stage {
                StageConfig::Conv2d { in_channels, out_channels, kernel_size, stride, .. } => {
                    if in_channels != channels {
                        return Err(bad(format!(
                            "conv2d expects {in_channels} input channels, previous stage gives {channels}"
                        )));
                    }
                    if out_channels == 0 || kernel_size == 0 || stride == 0 {
                        return Err(bad("conv2d sizes must be positive".into()));
                    }
                    channels = out_channels;
                }
                StageConfig::MaxPool2d { kernel_size, stride }
                | StageConfig::AvgPool2d { kernel_size, stride } => {
                    if kernel_size == 0 || stride == 0 {
                        return Err(bad("pool sizes must be positive".into()));
                    }
                }
                StageConfig::Linear { in_features, out_features } => {
                    collapsed = true;
                    if in_features != channels {
                        return Err(bad(format!(
                            "linear expects {in_features} features, previous stage gives {channels}"
                        )));
                    }
                    if out_features == 0 {
                        return Err(bad("linear output must be positive".into()));
                    }
                    channels = out_features;
                }
                StageConfig::Dropout { prob } => {
                    if !(0.0..1.0).contains(&prob) {
                        return Err(bad(format!("dropout probability {prob} outside [0, 1)")));
                    }
                }
            }
        }
        Ok(channels)
    }

    /// Spatial extent left after every stage for an `[height, width]`
    /// input, or a `ShapeMismatch` naming the stage where it vanished.
    pub fn output_extent(&self, size: [usize; 2]) -> Result<[usize; 2], TranscribeError> {
        check_extent(&self.stages, size)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<FeatureEncoder<B>, TranscribeError> {
        let embedding_dim = self.output_dim()?;
        let mut spatial = Vec::new();
        let mut head    = Vec::new();

        for stage in &self.stages {
            let in_head = !head.is_empty() || matches!(stage, StageConfig::Linear { .. });
            match *stage {
                StageConfig::Conv2d { in_channels, out_channels, kernel_size, stride, padding } => {
                    let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
                        .with_stride([stride, stride])
                        .with_padding(PaddingConfig2d::Explicit(padding, padding))
                        .init(device);
                    spatial.push(SpatialStage::Conv(conv));
                }
                StageConfig::MaxPool2d { kernel_size, stride } => {
                    let pool = MaxPool2dConfig::new([kernel_size, kernel_size])
                        .with_strides([stride, stride])
                        .init();
                    spatial.push(SpatialStage::MaxPool(pool));
                }
                StageConfig::AvgPool2d { kernel_size, stride } => {
                    let pool = AvgPool2dConfig::new([kernel_size, kernel_size])
                        .with_strides([stride, stride])
                        .init();
                    spatial.push(SpatialStage::AvgPool(pool));
                }
                StageConfig::Linear { in_features, out_features } => {
                    head.push(VectorStage::Linear(LinearConfig::new(in_features, out_features).init(device)));
                }
                StageConfig::Dropout { prob } => {
                    let dropout = DropoutConfig::new(prob).init();
                    if in_head {
                        head.push(VectorStage::Dropout(dropout));
                    } else {
                        spatial.push(SpatialStage::Dropout(dropout));
                    }
                }
            }
        }

        Ok(FeatureEncoder {
            spatial,
            head,
            stages: Ignored(self.stages.clone()),
            embedding_dim,
        })
    }
}

fn check_extent(stages: &[StageConfig], [height, width]: [usize; 2]) -> Result<[usize; 2], TranscribeError> {
    let (mut h, mut w) = (height, width);
    for (i, stage) in stages.iter().enumerate() {
        match (stage.output_extent(h), stage.output_extent(w)) {
            (Some(nh), Some(nw)) => (h, w) = (nh, nw),
            _ => {
                return Err(TranscribeError::ShapeMismatch(format!(
                    "{height}x{width} input shrinks to {h}x{w} before stage {i} ({stage:?})"
                )))
            }
        }
    }
    Ok([h, w])
}

#[derive(Module, Debug)]
pub enum SpatialStage<B: Backend> {
    Conv(Conv2d<B>),
    MaxPool(MaxPool2d),
    AvgPool(AvgPool2d),
    Dropout(Dropout),
}

#[derive(Module, Debug)]
pub enum VectorStage<B: Backend> {
    Linear(Linear<B>),
    Dropout(Dropout),
}

#[derive(Module, Debug)]
pub struct FeatureEncoder<B: Backend> {
    pub spatial:       Vec<SpatialStage<B>>,
    pub head:          Vec<VectorStage<B>>,
    pub stages:        Ignored<Vec<StageConfig>>,
    pub embedding_dim: usize,
}

impl<B: Backend> FeatureEncoder<B> {
    /// images: [batch, 3, H, W] → embeddings: [batch, embedding_dim]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for stage in &self.spatial {
            x = match stage {
                SpatialStage::Conv(conv)    => conv.forward(x),
                SpatialStage::MaxPool(pool) => pool.forward(x),
                SpatialStage::AvgPool(pool) => pool.forward(x),
                SpatialStage::Dropout(d)    => d.forward(x),
            };
        }

        // Global mean absorbs whatever spatial extent is left.
        let [batch, channels, _, _] = x.dims();
        let mut v = x.mean_dim(3).mean_dim(2).reshape([batch, channels]);

        for stage in &self.head {
            v = match stage {
                VectorStage::Linear(linear) => linear.forward(v),
                VectorStage::Dropout(d)     => d.forward(v),
            };
        }
        v
    }

    /// Encode one image into a `[1, embedding_dim]` tensor.
    pub fn encode(&self, image: &ImageTensor, device: &B::Device) -> Result<Tensor<B, 2>, TranscribeError> {
        let [channels, height, width] = image.shape();
        if channels != ENCODER_CHANNELS {
            return Err(TranscribeError::ShapeMismatch(format!(
                "encoder needs {ENCODER_CHANNELS} channels, image has {channels}"
            )));
        }
        check_extent(&self.stages, [height, width])?;

        let data   = TensorData::new(image.data().to_vec(), [1, channels, height, width]);
        let input  = Tensor::<B, 4>::from_data(data, device);
        let embedding = self.forward(input);

        let values = embedding.clone().into_data().to_vec::<f32>()
            .map_err(|e| TranscribeError::Inference(format!("cannot read embedding: {e:?}")))?;
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(TranscribeError::Inference(format!(
                "embedding component {pos} is {}", values[pos]
            )));
        }
        tracing::debug!("Encoded {}x{} image into {} features", height, width, values.len());
        Ok(embedding)
    }
}
