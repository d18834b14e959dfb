//! Burn models for binary posture classification.
//!
//! `PostureNet` is a small CNN: three conv/pool stages followed by a dense
//! head with dropout and a single sigmoid output. It is a pure Burn `Module`
//! with no awareness of frames or classifiers; the `inference` crate wraps it
//! into a `Classifier` for runtime use.

use burn::module::Module;
use burn::nn;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

const CONV_CHANNELS: [usize; 3] = [32, 64, 128];

#[derive(Debug, Clone)]
pub struct PostureNetConfig {
    /// Square input side in pixels.
    pub input_size: usize,
    pub hidden: usize,
    pub dropout: f64,
}

impl Default for PostureNetConfig {
    fn default() -> Self {
        Self {
            input_size: 64,
            hidden: 256,
            dropout: 0.5,
        }
    }
}

impl PostureNetConfig {
    /// Spatial side after the three valid 3x3 conv + 2x2 pool stages.
    pub fn feature_side(&self) -> usize {
        let mut side = self.input_size;
        for _ in CONV_CHANNELS {
            side = side.saturating_sub(2) / 2;
        }
        side
    }

    pub fn flattened_features(&self) -> usize {
        CONV_CHANNELS[2] * self.feature_side() * self.feature_side()
    }
}

#[derive(Debug, Module)]
pub struct PostureNet<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool: MaxPool2d,
    dense: nn::Linear<B>,
    dropout: nn::Dropout,
    head: nn::Linear<B>,
}

impl<B: Backend> PostureNet<B> {
    pub fn new(cfg: PostureNetConfig, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([3, CONV_CHANNELS[0]], [3, 3]).init(device);
        let conv2 = Conv2dConfig::new([CONV_CHANNELS[0], CONV_CHANNELS[1]], [3, 3]).init(device);
        let conv3 = Conv2dConfig::new([CONV_CHANNELS[1], CONV_CHANNELS[2]], [3, 3]).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let dense = nn::LinearConfig::new(cfg.flattened_features().max(1), cfg.hidden).init(device);
        let dropout = nn::DropoutConfig::new(cfg.dropout).init();
        let head = nn::LinearConfig::new(cfg.hidden, 1).init(device);
        Self {
            conv1,
            conv2,
            conv3,
            pool,
            dense,
            dropout,
            head,
        }
    }

    /// `[batch, 3, side, side]` in 0..1 -> logits `[batch, 1]`.
    pub fn forward_logits(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv1.forward(images)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = self.pool.forward(relu(self.conv3.forward(x)));
        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = self.dropout.forward(relu(self.dense.forward(x)));
        self.head.forward(x)
    }

    /// Abnormal-posture probabilities `[batch, 1]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        sigmoid(self.forward_logits(images))
    }
}

/// Weight-record persistence for `PostureNet` at full or half precision.
pub mod checkpoint {
    use super::{PostureNet, PostureNetConfig};
    use burn::module::Module;
    use burn::record::{BinFileRecorder, FullPrecisionSettings, HalfPrecisionSettings, RecorderError};
    use burn::tensor::backend::Backend;
    use std::path::Path;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RecordPrecision {
        Full,
        Half,
    }

    pub fn save<B: Backend>(
        model: &PostureNet<B>,
        path: &Path,
        precision: RecordPrecision,
    ) -> Result<(), RecorderError> {
        match precision {
            RecordPrecision::Full => model.clone().save_file(
                path.to_path_buf(),
                &BinFileRecorder::<FullPrecisionSettings>::new(),
            ),
            RecordPrecision::Half => model.clone().save_file(
                path.to_path_buf(),
                &BinFileRecorder::<HalfPrecisionSettings>::new(),
            ),
        }
    }

    pub fn load<B: Backend>(
        cfg: PostureNetConfig,
        path: &Path,
        precision: RecordPrecision,
        device: &B::Device,
    ) -> Result<PostureNet<B>, RecorderError> {
        let model = PostureNet::<B>::new(cfg, device);
        match precision {
            RecordPrecision::Full => model.load_file(
                path.to_path_buf(),
                &BinFileRecorder::<FullPrecisionSettings>::new(),
                device,
            ),
            RecordPrecision::Half => model.load_file(
                path.to_path_buf(),
                &BinFileRecorder::<HalfPrecisionSettings>::new(),
                device,
            ),
        }
    }
}

pub mod prelude {
    pub use super::checkpoint::RecordPrecision;
    pub use super::{PostureNet, PostureNetConfig};
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn feature_side_matches_conv_stack() {
        let cfg = PostureNetConfig::default();
        assert_eq!(cfg.feature_side(), 6);
        assert_eq!(cfg.flattened_features(), 128 * 6 * 6);
        let big = PostureNetConfig {
            input_size: 128,
            ..Default::default()
        };
        assert_eq!(big.feature_side(), 14);
    }

    #[test]
    fn forward_outputs_probabilities() {
        let device = Default::default();
        let cfg = PostureNetConfig {
            input_size: 32,
            hidden: 8,
            dropout: 0.5,
        };
        let model = PostureNet::<B>::new(cfg, &device);
        let input = Tensor::<B, 4>::zeros([2, 3, 32, 32], &device);
        let out = model.forward(input);
        assert_eq!(out.dims(), [2, 1]);
        let values = out.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}
