//! Discriminator network for DCGAN
//!
//! The Discriminator classifies images as real or fake.
//! Architecture uses strided 2D convolutions to downsample to a single logit.

use tch::{nn, nn::ModuleT, Tensor};

use crate::error::{DcganError, Result};
use super::generator::resolution_stages;

/// Discriminator network configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscriminatorConfig {
    /// Filters in the first layer (ndf); later layers use multiples
    pub base_filters: i64,
    /// Input image channels (nc)
    pub channels: i64,
    /// Input image height and width
    pub image_size: i64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            base_filters: 64,
            channels: 3,
            image_size: 64,
        }
    }
}

/// LeakyReLU with the 0.2 slope used throughout DCGAN discriminators
fn leaky_relu(xs: &Tensor) -> Tensor {
    xs.maximum(&(xs * 0.2))
}

/// Discriminator network
///
/// Architecture (64x64 input, ndf = 64):
/// 1. Conv2d nc -> 64, LeakyReLU (no batch norm on the input layer)
/// 2. Conv2d 64 -> 128 -> 256 -> 512 with BatchNorm and LeakyReLU
/// 3. Conv2d 512 -> 1 over the final 4x4 map
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    net: nn::SequentialT,
}

impl Discriminator {
    /// Create a new Discriminator network
    pub fn new(vs: &nn::Path, config: DiscriminatorConfig) -> Result<Self> {
        let stages = resolution_stages(config.image_size)?;
        if config.base_filters <= 0 || config.channels <= 0 {
            return Err(DcganError::Config(format!(
                "discriminator dimensions must be positive: {:?}",
                config
            )));
        }

        let downsample = nn::ConvConfig {
            stride: 2,
            padding: 1,
            bias: false,
            ..Default::default()
        };
        let score = nn::ConvConfig {
            stride: 1,
            padding: 0,
            bias: false,
            ..Default::default()
        };

        let mut filters = config.base_filters;
        let mut net = nn::seq_t()
            .add(nn::conv2d(vs / "conv0", config.channels, filters, 4, downsample))
            .add_fn(leaky_relu);

        for i in 1..stages {
            let out = filters * 2;
            net = net
                .add(nn::conv2d(vs / format!("conv{}", i), filters, out, 4, downsample))
                .add(nn::batch_norm2d(vs / format!("bn{}", i), out, Default::default()))
                .add_fn(leaky_relu);
            filters = out;
        }

        let net = net.add(nn::conv2d(vs / format!("conv{}", stages), filters, 1, 4, score));

        Ok(Self { config, net })
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, channels, image_size, image_size)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size) with logits (not sigmoid)
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        self.net.forward_t(input, train).view([-1])
    }

    /// Classify images (inference mode)
    ///
    /// Returns probability of being real (after sigmoid)
    pub fn classify(&self, input: &Tensor) -> Tensor {
        tch::no_grad(|| self.forward_t(input, false).sigmoid())
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }
}

impl ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Discriminator::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    #[test]
    fn test_discriminator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let config = DiscriminatorConfig {
            base_filters: 8,
            channels: 3,
            image_size: 64,
        };
        let disc = Discriminator::new(&vs.root(), config).unwrap();

        let input = Tensor::randn([4, 3, 64, 64], (Kind::Float, Device::Cpu));
        let output = disc.forward_t(&input, false);

        assert_eq!(output.size(), vec![4]);
    }

    #[test]
    fn test_discriminator_classify() {
        let vs = VarStore::new(Device::Cpu);
        let config = DiscriminatorConfig {
            base_filters: 8,
            channels: 1,
            image_size: 32,
        };
        let disc = Discriminator::new(&vs.root(), config).unwrap();

        let input = Tensor::randn([2, 1, 32, 32], (Kind::Float, Device::Cpu));
        let probs = disc.classify(&input);

        // Probabilities should be in [0, 1]
        let min_val: f64 = probs.min().double_value(&[]);
        let max_val: f64 = probs.max().double_value(&[]);
        assert!(min_val >= 0.0 && max_val <= 1.0);
    }

    #[test]
    fn test_leaky_relu_slope() {
        let xs = Tensor::from_slice(&[-1.0f32, 0.0, 2.0]);
        let out = Vec::<f32>::try_from(&leaky_relu(&xs)).unwrap();
        assert!((out[0] + 0.2).abs() < 1e-6);
        assert_eq!(out[1], 0.0);
        assert_eq!(out[2], 2.0);
    }

    #[test]
    fn test_rejects_bad_image_size() {
        let vs = VarStore::new(Device::Cpu);
        let config = DiscriminatorConfig {
            image_size: 40,
            ..Default::default()
        };
        assert!(Discriminator::new(&vs.root(), config).is_err());
    }
}
