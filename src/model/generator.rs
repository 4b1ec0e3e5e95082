//! Generator network for DCGAN
//!
//! The Generator transforms latent noise vectors into images.
//! Architecture uses transposed 2D convolutions to upsample from a 1x1
//! latent "image" to the target resolution.

use tch::{nn, nn::ModuleT, Device, Tensor};

use crate::error::{DcganError, Result};
use super::latent::sample_latent;

/// Generator network configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector (nz)
    pub latent_dim: i64,
    /// Filters in the last hidden layer (ngf); earlier layers use multiples
    pub base_filters: i64,
    /// Output image channels (nc)
    pub channels: i64,
    /// Output image height and width
    pub image_size: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 100,
            base_filters: 64,
            channels: 3,
            image_size: 64,
        }
    }
}

/// Number of stride-2 resampling stages needed to go between a 4x4 feature
/// map and an `image_size` square image.
pub fn resolution_stages(image_size: i64) -> Result<i64> {
    if image_size < 16 || image_size & (image_size - 1) != 0 {
        return Err(DcganError::Config(format!(
            "image size must be a power of two and at least 16, got {}",
            image_size
        )));
    }
    Ok(image_size.trailing_zeros() as i64 - 2)
}

/// Generator network
///
/// Architecture (64x64 output, ngf = 64):
/// 1. ConvTranspose2d nz -> 512, 1x1 -> 4x4, BatchNorm, ReLU
/// 2. ConvTranspose2d 512 -> 256 -> 128 -> 64, doubling resolution, BatchNorm, ReLU
/// 3. ConvTranspose2d 64 -> nc, 32x32 -> 64x64, Tanh
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    net: nn::SequentialT,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Result<Self> {
        let stages = resolution_stages(config.image_size)?;
        if config.latent_dim <= 0 || config.base_filters <= 0 || config.channels <= 0 {
            return Err(DcganError::Config(format!(
                "generator dimensions must be positive: {:?}",
                config
            )));
        }

        let project = nn::ConvTransposeConfig {
            stride: 1,
            padding: 0,
            bias: false,
            ..Default::default()
        };
        let upsample = nn::ConvTransposeConfig {
            stride: 2,
            padding: 1,
            bias: false,
            ..Default::default()
        };

        let mut filters = config.base_filters << (stages - 1);
        let mut net = nn::seq_t()
            .add(nn::conv_transpose2d(vs / "convt0", config.latent_dim, filters, 4, project))
            .add(nn::batch_norm2d(vs / "bn0", filters, Default::default()))
            .add_fn(|x| x.relu());

        for i in 1..stages {
            let out = filters / 2;
            net = net
                .add(nn::conv_transpose2d(vs / format!("convt{}", i), filters, out, 4, upsample))
                .add(nn::batch_norm2d(vs / format!("bn{}", i), out, Default::default()))
                .add_fn(|x| x.relu());
            filters = out;
        }

        let net = net
            .add(nn::conv_transpose2d(
                vs / format!("convt{}", stages),
                filters,
                config.channels,
                4,
                upsample,
            ))
            .add_fn(|x| x.tanh());

        Ok(Self { config, net })
    }

    /// Generate images from noise
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim) or (batch_size, latent_dim, 1, 1)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, channels, image_size, image_size) in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, train: bool) -> Tensor {
        let z = noise.view([-1, self.config.latent_dim, 1, 1]);
        self.net.forward_t(&z, train)
    }

    /// Generate images (inference mode, no gradient tracking)
    pub fn generate(&self, noise: &Tensor) -> Tensor {
        tch::no_grad(|| self.forward_t(noise, false))
    }

    /// Generate images from freshly sampled noise
    pub fn generate_random(&self, num_samples: i64, device: Device) -> Tensor {
        let noise = sample_latent(num_samples, self.config.latent_dim, device);
        self.generate(&noise)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}
