//! # DCGAN for Image Synthesis
//!
//! This crate provides a modular implementation of Deep Convolutional Generative
//! Adversarial Networks (DCGAN) for generating synthetic images such as faces
//! and bedrooms.
//!
//! ## Modules
//!
//! - `data`: Image datasets, preprocessing and batching
//! - `model`: DCGAN architecture (Generator and Discriminator)
//! - `training`: Training loop and loss functions
//! - `pipeline`: Train, generate and interpolate workflows used by the binaries
//! - `utils`: Configuration, checkpoints and visualization

pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod training;
pub mod utils;

pub use data::{DataLoader, DatasetKind, ImageDataset};
pub use error::{DcganError, Result};
pub use model::{DCGAN, Discriminator, Generator, InterpolationMode, NetworkConfig};
pub use training::{Trainer, TrainingConfig, TrainingMetrics};
pub use utils::{load_checkpoint, save_checkpoint, save_image_grid, Config};
