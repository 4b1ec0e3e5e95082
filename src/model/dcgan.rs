//! DCGAN wrapper combining Generator and Discriminator
//!
//! Provides convenient methods for training and generation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Tensor};

use crate::error::Result;
use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::generator::{resolution_stages, Generator, GeneratorConfig};
use super::latent::{self, InterpolationMode};
use super::weights::init_weights;

/// Hyperparameters shared by both networks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Size of the latent vector (nz)
    pub latent_dim: i64,
    /// Generator base filters (ngf)
    pub gen_filters: i64,
    /// Discriminator base filters (ndf)
    pub disc_filters: i64,
    /// Image channels (nc)
    pub channels: i64,
    /// Image height and width
    pub image_size: i64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            latent_dim: 100,
            gen_filters: 64,
            disc_filters: 64,
            channels: 3,
            image_size: 64,
        }
    }
}

impl NetworkConfig {
    /// Check that the networks can be built from this configuration
    pub fn validate(&self) -> Result<()> {
        resolution_stages(self.image_size)?;
        Ok(())
    }

    pub fn generator(&self) -> GeneratorConfig {
        GeneratorConfig {
            latent_dim: self.latent_dim,
            base_filters: self.gen_filters,
            channels: self.channels,
            image_size: self.image_size,
        }
    }

    pub fn discriminator(&self) -> DiscriminatorConfig {
        DiscriminatorConfig {
            base_filters: self.disc_filters,
            channels: self.channels,
            image_size: self.image_size,
        }
    }
}

/// Complete DCGAN model
pub struct DCGAN {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for discriminator
    pub disc_vs: VarStore,
    config: NetworkConfig,
    device: Device,
}

impl DCGAN {
    /// Create a new DCGAN model with freshly initialised weights
    ///
    /// # Arguments
    ///
    /// * `config` - Shared network hyperparameters
    /// * `device` - Device to create model on
    pub fn new(config: NetworkConfig, device: Device) -> Result<Self> {
        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), config.generator())?;
        let discriminator = Discriminator::new(&disc_vs.root(), config.discriminator())?;

        init_weights(&gen_vs);
        init_weights(&disc_vs);

        Ok(Self {
            generator,
            discriminator,
            gen_vs,
            disc_vs,
            config,
            device,
        })
    }

    /// Generate images from random latent vectors
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, channels, image_size, image_size)
    pub fn generate(&self, num_samples: i64) -> Tensor {
        self.generator.generate_random(num_samples, self.device)
    }

    /// Generate images from specific noise vectors
    pub fn generate_from_noise(&self, noise: &Tensor) -> Tensor {
        self.generator.generate(&noise.to_device(self.device))
    }

    /// Discriminate images (get probability of being real)
    pub fn discriminate(&self, images: &Tensor) -> Tensor {
        self.discriminator.classify(&images.to_device(self.device))
    }

    /// Images along a path between two points in latent space
    ///
    /// # Returns
    ///
    /// Tensor of shape (steps, channels, image_size, image_size)
    pub fn interpolate(
        &self,
        z1: &Tensor,
        z2: &Tensor,
        steps: i64,
        mode: InterpolationMode,
    ) -> Result<Tensor> {
        let path = latent::interpolate(z1, z2, steps, mode)?;
        Ok(self.generate_from_noise(&path))
    }

    /// Adam optimizer over the generator parameters
    pub fn gen_optimizer(&self, lr: f64, beta1: f64, beta2: f64) -> Result<nn::Optimizer> {
        Ok(nn::adam(beta1, beta2, 0.0).build(&self.gen_vs, lr)?)
    }

    /// Adam optimizer over the discriminator parameters
    pub fn disc_optimizer(&self, lr: f64, beta1: f64, beta2: f64) -> Result<nn::Optimizer> {
        Ok(nn::adam(beta1, beta2, 0.0).build(&self.disc_vs, lr)?)
    }

    /// Save both networks
    pub fn save<P: AsRef<Path>, Q: AsRef<Path>>(&self, gen_path: P, disc_path: Q) -> Result<()> {
        self.gen_vs.save(gen_path)?;
        self.disc_vs.save(disc_path)?;
        Ok(())
    }

    /// Load both networks
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, gen_path: P, disc_path: Q) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        self.disc_vs.load(disc_path)?;
        Ok(())
    }

    /// Load generator weights only (enough for sampling)
    pub fn load_generator<P: AsRef<Path>>(&mut self, gen_path: P) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        Ok(())
    }

    /// Load discriminator weights only
    pub fn load_discriminator<P: AsRef<Path>>(&mut self, disc_path: P) -> Result<()> {
        self.disc_vs.load(disc_path)?;
        Ok(())
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn latent_dim(&self) -> i64 {
        self.config.latent_dim
    }

    pub fn image_size(&self) -> i64 {
        self.config.image_size
    }

    pub fn channels(&self) -> i64 {
        self.config.channels
    }
}
