//! Data module for loading and preprocessing training images
//!
//! This module provides:
//! - Dataset sources (image folders, LSUN, CIFAR-10, MNIST, fake)
//! - Image preprocessing and normalization
//! - DataLoader for batching images

mod dataset;
mod loader;
pub mod transform;

pub use dataset::{DatasetKind, ImageDataset, FAKE_DATASET_LEN};
pub use loader::{DataLoader, DataLoaderIter};
pub use transform::{denormalize_pixel, normalize_pixel, ImageTransform};
