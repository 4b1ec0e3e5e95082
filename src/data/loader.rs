//! DataLoader for batching and iterating over training images
//!
//! Provides batching for GAN training with support for:
//! - Random shuffling (seeded)
//! - Drop last incomplete batch
//! - Parallel image decoding on a dedicated worker pool

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::Tensor;

use crate::error::{DcganError, Result};
use super::dataset::ImageDataset;

/// DataLoader for iterating over batched images
pub struct DataLoader {
    dataset: ImageDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    /// Current visiting order
    indices: Vec<usize>,
    /// Current position in iteration
    current_idx: usize,
    rng: StdRng,
    pool: rayon::ThreadPool,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `dataset` - Source of images
    /// * `batch_size` - Number of images per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `drop_last` - Whether to drop incomplete final batch
    /// * `workers` - Threads used to decode image files
    /// * `seed` - Seed for the shuffling RNG
    pub fn new(
        dataset: ImageDataset,
        batch_size: usize,
        shuffle: bool,
        drop_last: bool,
        workers: usize,
        seed: u64,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(DcganError::Config("batch size must be > 0".to_string()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("dcgan-loader-{}", i))
            .build()
            .map_err(|e| DcganError::Dataset(format!("failed to start loader workers: {}", e)))?;

        let indices: Vec<usize> = (0..dataset.len()).collect();

        let mut loader = Self {
            dataset,
            batch_size,
            shuffle,
            drop_last,
            indices,
            current_idx: 0,
            rng: StdRng::seed_from_u64(seed),
            pool,
        };

        if shuffle {
            loader.shuffle_indices();
        }

        Ok(loader)
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.num_samples();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            (num_samples + self.batch_size - 1) / self.batch_size
        }
    }

    /// Get total number of images
    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    fn shuffle_indices(&mut self) {
        self.indices.shuffle(&mut self.rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<Result<Tensor>> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);

        // Skip incomplete batch if drop_last
        if self.drop_last && end - start < self.batch_size {
            return None;
        }

        self.current_idx = end;
        Some(self.dataset.batch(&self.indices[start..end], &self.pool))
    }

    /// Iterate over all batches of a fresh epoch
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Result<Tensor>;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}
