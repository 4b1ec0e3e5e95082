//! Configuration management
//!
//! Provides unified configuration for the entire DCGAN pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::DatasetKind;
use crate::model::NetworkConfig;
use crate::training::TrainingConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    #[serde(default)]
    pub data: DataConfig,
    /// Model configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Training configuration
    #[serde(default)]
    pub training: TrainingConfigFile,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Dataset kind (folder, imagenet, lfw, lsun, cifar10, mnist, fake)
    pub dataset: DatasetKind,
    /// Root directory of the dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataroot: Option<PathBuf>,
    /// LSUN classes to use, e.g. ["bedroom_train"]
    pub classes: Vec<String>,
    /// Height and width of training images
    pub image_size: i64,
    /// Batch size
    pub batch_size: usize,
    /// Image decoding threads
    pub workers: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::Folder,
            dataroot: None,
            classes: Vec::new(),
            image_size: 64,
            batch_size: 64,
            workers: 2,
        }
    }
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Latent dimension size (nz)
    pub latent_dim: i64,
    /// Base filters for generator (ngf)
    pub gen_filters: i64,
    /// Base filters for discriminator (ndf)
    pub disc_filters: i64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_dim: 100,
            gen_filters: 64,
            disc_filters: 64,
        }
    }
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfigFile {
    /// Number of epochs
    pub epochs: usize,
    /// Adam learning rate
    pub lr: f64,
    /// Adam beta1
    pub beta1: f64,
    /// Adam beta2
    pub beta2: f64,
    /// Use label smoothing
    pub label_smoothing: bool,
    /// Log every N iterations
    pub log_every: usize,
    /// Save sample grids every N iterations
    pub sample_every: usize,
    /// Checkpoint save frequency in epochs
    pub checkpoint_every: usize,
    /// Output directory for samples, weights and checkpoints
    pub output_dir: PathBuf,
    /// Device: "cpu" or "cuda"
    pub device: String,
    /// Random seed; drawn at random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for TrainingConfigFile {
    fn default() -> Self {
        Self {
            epochs: 25,
            lr: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
            label_smoothing: false,
            log_every: 1,
            sample_every: 100,
            checkpoint_every: 5,
            output_dir: PathBuf::from("output"),
            device: "cpu".to_string(),
            seed: None,
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("toml"))
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration, choosing TOML or JSON by file extension
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if is_toml(path) {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Save configuration, choosing TOML or JSON by file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if is_toml(path) {
            self.save_toml(path)
        } else {
            self.save_json(path)
        }
    }

    /// Load configuration from TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data.batch_size == 0 {
            anyhow::bail!("Batch size must be > 0");
        }
        if self.data.dataset.requires_dataroot() && self.data.dataroot.is_none() {
            anyhow::bail!("Dataset '{}' requires a dataroot", self.data.dataset);
        }
        if self.model.latent_dim <= 0 {
            anyhow::bail!("Latent dimension must be > 0");
        }
        if self.model.gen_filters <= 0 || self.model.disc_filters <= 0 {
            anyhow::bail!("Filter counts must be > 0");
        }
        if self.training.epochs == 0 {
            anyhow::bail!("Number of epochs must be > 0");
        }
        if !(self.training.lr > 0.0) {
            anyhow::bail!("Learning rate must be > 0");
        }
        for (name, beta) in [("beta1", self.training.beta1), ("beta2", self.training.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                anyhow::bail!("{} must be in [0, 1), got {}", name, beta);
            }
        }
        self.network_config().validate()?;
        Ok(())
    }

    /// Network hyperparameters, with channels implied by the dataset
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            latent_dim: self.model.latent_dim,
            gen_filters: self.model.gen_filters,
            disc_filters: self.model.disc_filters,
            channels: self.data.dataset.channels(),
            image_size: self.data.image_size,
        }
    }

    /// Trainer settings derived from the file configuration
    pub fn training_config(&self) -> TrainingConfig {
        let t = &self.training;
        TrainingConfig {
            epochs: t.epochs,
            lr: t.lr,
            beta1: t.beta1,
            beta2: t.beta2,
            label_smoothing: t.label_smoothing,
            log_every: t.log_every,
            sample_every: t.sample_every,
            checkpoint_every: t.checkpoint_every,
            output_dir: t.output_dir.clone(),
            ..TrainingConfig::default()
        }
    }
}

/// Create default configuration file if it doesn't exist
pub fn ensure_config_exists<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();
    if path.exists() {
        Config::load(path)
    } else {
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.data.dataset, DatasetKind::Folder);
        assert_eq!(config.data.image_size, 64);
        assert_eq!(config.model.latent_dim, 100);
        assert_eq!(config.training.beta1, 0.5);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = Config::default();
        config.data.dataroot = Some(PathBuf::from("/data/celeba"));
        config.training.seed = Some(999);

        let json = serde_json::to_string(&config).unwrap();
        let loaded: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.data.dataroot, config.data.dataroot);
        assert_eq!(loaded.training.seed, Some(999));
        assert_eq!(loaded.model.latent_dim, config.model.latent_dim);
    }

    #[test]
    fn test_config_toml_partial() {
        let loaded: Config = toml::from_str(
            r#"
            [data]
            dataset = "lsun"
            dataroot = "/data/lsun"
            classes = ["bedroom_train"]

            [training]
            epochs = 3
            "#,
        )
        .unwrap();

        assert_eq!(loaded.data.dataset, DatasetKind::Lsun);
        assert_eq!(loaded.data.classes, vec!["bedroom_train".to_string()]);
        assert_eq!(loaded.data.batch_size, 64);
        assert_eq!(loaded.training.epochs, 3);
        assert_eq!(loaded.model.gen_filters, 64);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        // folder needs a dataroot
        assert!(config.validate().is_err());

        config.data.dataset = DatasetKind::Fake;
        assert!(config.validate().is_ok());

        config.data.image_size = 48;
        assert!(config.validate().is_err());
        config.data.image_size = 32;

        config.training.beta1 = 1.0;
        assert!(config.validate().is_err());
        config.training.beta1 = 0.5;

        config.data.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_network_channels_follow_dataset() {
        let mut config = Config::default();
        config.data.dataset = DatasetKind::Mnist;
        assert_eq!(config.network_config().channels, 1);
        config.data.dataset = DatasetKind::Cifar10;
        assert_eq!(config.network_config().channels, 3);
    }

    #[test]
    fn test_ensure_config_exists() {
        let dir = tempfile::tempdir().unwrap();

        for name in ["config.json", "config.toml"] {
            let path = dir.path().join(name);
            let created = ensure_config_exists(&path).unwrap();
            assert!(path.exists());

            let loaded = ensure_config_exists(&path).unwrap();
            assert_eq!(loaded.model.latent_dim, created.model.latent_dim);
            assert_eq!(loaded.training.output_dir, created.training.output_dir);
        }
    }
}
