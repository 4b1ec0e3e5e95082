//! Model module containing GAN architecture components
//!
//! This module provides:
//! - Generator network for creating synthetic images
//! - Discriminator network for distinguishing real from fake
//! - Weight initialisation and latent space utilities
//! - DCGAN wrapper combining both networks

mod dcgan;
mod discriminator;
mod generator;
pub mod latent;
pub mod weights;

pub use dcgan::{NetworkConfig, DCGAN};
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{resolution_stages, Generator, GeneratorConfig};
pub use latent::{interpolate, lerp, sample_latent, slerp, InterpolationMode};
pub use weights::init_weights;
