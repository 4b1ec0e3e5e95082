//! Training module for DCGAN
//!
//! This module provides:
//! - Training loop implementation
//! - Loss functions (Binary Cross Entropy on logits)
//! - Training configuration and metrics

mod trainer;
mod losses;
mod metrics;

pub use trainer::{train_step, StepOutput, Trainer, TrainingConfig, SAMPLE_BATCH};
pub use losses::{discriminator_loss, discriminator_loss_smoothed, generator_loss};
pub use metrics::{EMATracker, EpochStats, IterationStats, TrainingMetrics};
