//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint save/load utilities
//! - Visualization helpers

mod config;
mod checkpoint;
pub mod visualize;

pub use config::{ensure_config_exists, Config, DataConfig, ModelConfig, TrainingConfigFile};
pub use checkpoint::{
    find_latest_checkpoint, list_checkpoints, load_checkpoint, load_checkpoint_meta,
    locate_generator, save_checkpoint, CheckpointMeta, RUN_CONFIG_FILE,
};
pub use visualize::{plot_losses, save_image_grid, save_images_individually};
