//! Checkpoint save/load utilities
//!
//! Provides functions for saving and loading model checkpoints
//! along with training state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::config::Config;
use crate::model::{NetworkConfig, DCGAN};
use crate::training::TrainingMetrics;

const CHECKPOINT_PREFIX: &str = "checkpoint_epoch_";
const GENERATOR_FILE: &str = "generator.ot";
const DISCRIMINATOR_FILE: &str = "discriminator.ot";
const META_FILE: &str = "meta.json";
const METRICS_FILE: &str = "metrics.csv";
/// Effective configuration written into a training output directory
pub const RUN_CONFIG_FILE: &str = "config.json";

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Number of completed epochs
    pub epoch: usize,
    /// Generator loss at checkpoint
    pub gen_loss: f64,
    /// Discriminator loss at checkpoint
    pub disc_loss: f64,
    /// Timestamp of checkpoint
    pub timestamp: String,
    /// Network hyperparameters needed to rebuild the model
    pub network: NetworkConfig,
}

/// Save a complete checkpoint (model + metadata)
///
/// # Arguments
///
/// * `model` - DCGAN model to save
/// * `metrics` - Training metrics
/// * `epoch` - Number of completed epochs
/// * `dir` - Directory to save checkpoint
///
/// # Returns
///
/// Path to saved checkpoint
pub fn save_checkpoint(
    model: &DCGAN,
    metrics: &TrainingMetrics,
    epoch: usize,
    dir: &Path,
) -> anyhow::Result<PathBuf> {
    let checkpoint_dir = dir.join(format!("{}{:04}", CHECKPOINT_PREFIX, epoch));
    std::fs::create_dir_all(&checkpoint_dir)?;

    // Save model weights
    model.save(
        checkpoint_dir.join(GENERATOR_FILE),
        checkpoint_dir.join(DISCRIMINATOR_FILE),
    )?;

    // Save metadata
    let meta = CheckpointMeta {
        epoch,
        gen_loss: metrics.latest_gen_loss().unwrap_or(0.0),
        disc_loss: metrics.latest_disc_loss().unwrap_or(0.0),
        timestamp: chrono::Utc::now().to_rfc3339(),
        network: *model.config(),
    };
    let meta_json = serde_json::to_string_pretty(&meta)?;
    std::fs::write(checkpoint_dir.join(META_FILE), meta_json)?;

    // Save metrics
    metrics.save_csv(checkpoint_dir.join(METRICS_FILE))?;

    tracing::info!("Saved checkpoint to {}", checkpoint_dir.display());
    Ok(checkpoint_dir)
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta(checkpoint_dir: &Path) -> anyhow::Result<CheckpointMeta> {
    let content = std::fs::read_to_string(checkpoint_dir.join(META_FILE))?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Load a complete checkpoint
///
/// # Arguments
///
/// * `model` - DCGAN model to load weights into
/// * `checkpoint_dir` - Directory containing checkpoint
///
/// # Returns
///
/// Tuple of (epoch, metrics)
pub fn load_checkpoint(
    model: &mut DCGAN,
    checkpoint_dir: &Path,
) -> anyhow::Result<(usize, TrainingMetrics)> {
    let meta = load_checkpoint_meta(checkpoint_dir)?;
    if meta.network != *model.config() {
        anyhow::bail!(
            "checkpoint {} was trained with {:?}, model is {:?}",
            checkpoint_dir.display(),
            meta.network,
            model.config()
        );
    }

    model.load(
        checkpoint_dir.join(GENERATOR_FILE),
        checkpoint_dir.join(DISCRIMINATOR_FILE),
    )?;

    let metrics_path = checkpoint_dir.join(METRICS_FILE);
    let metrics = if metrics_path.exists() {
        TrainingMetrics::load_csv(&metrics_path)?
    } else {
        TrainingMetrics::new()
    };

    tracing::info!(
        "Loaded checkpoint from {} (epoch {})",
        checkpoint_dir.display(),
        meta.epoch
    );
    Ok((meta.epoch, metrics))
}

fn checkpoint_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(CHECKPOINT_PREFIX))
                .unwrap_or(false)
        })
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}

/// Find the latest checkpoint in a directory
pub fn find_latest_checkpoint(dir: &Path) -> Option<PathBuf> {
    checkpoint_dirs(dir).pop()
}

/// List all checkpoints in a directory, oldest first
pub fn list_checkpoints(dir: &Path) -> Vec<(PathBuf, CheckpointMeta)> {
    checkpoint_dirs(dir)
        .into_iter()
        .filter_map(|path| load_checkpoint_meta(&path).ok().map(|meta| (path, meta)))
        .collect()
}

/// Network shape recorded next to weights in `dir`
///
/// Checkpoint metadata wins over the `config.json` written by a training run.
fn saved_network(dir: &Path) -> Option<NetworkConfig> {
    if dir.join(META_FILE).is_file() {
        if let Ok(meta) = load_checkpoint_meta(dir) {
            return Some(meta.network);
        }
    }

    let run_config = dir.join(RUN_CONFIG_FILE);
    if run_config.is_file() {
        match Config::load(&run_config) {
            Ok(config) => return Some(config.network_config()),
            Err(e) => tracing::warn!("Ignoring unreadable {}: {}", run_config.display(), e),
        }
    }

    // Fall back to the latest checkpoint of a training output dir
    find_latest_checkpoint(&dir.join("checkpoints"))
        .and_then(|ckpt| load_checkpoint_meta(&ckpt).ok())
        .map(|meta| meta.network)
}

/// Resolve a `--model` argument to a generator weight file
///
/// Accepts a checkpoint directory, a training output directory holding
/// `generator_final.ot`, or a weight file such as `netG_epoch_3.ot`.
/// Returns the network configuration when the weights' directory records one.
pub fn locate_generator(path: &Path) -> anyhow::Result<(PathBuf, Option<NetworkConfig>)> {
    if path.is_file() {
        let network = path.parent().and_then(saved_network);
        return Ok((path.to_path_buf(), network));
    }
    if !path.is_dir() {
        anyhow::bail!("model path {} does not exist", path.display());
    }

    if path.join(META_FILE).is_file() {
        let meta = load_checkpoint_meta(path)?;
        return Ok((path.join(GENERATOR_FILE), Some(meta.network)));
    }

    let final_weights = path.join("generator_final.ot");
    if final_weights.is_file() {
        return Ok((final_weights, saved_network(path)));
    }

    anyhow::bail!("no generator weights found in {}", path.display())
}
