//! End-to-end workflows shared by the binaries
//!
//! Each function takes a validated [`Config`] and performs one user-facing
//! job: training, sampling a grid of images or walking the latent space.

use std::path::{Path, PathBuf};

use tch::Tensor;
use tracing::info;

use crate::data::{DataLoader, ImageDataset};
use crate::model::{sample_latent, InterpolationMode, DCGAN};
use crate::training::{Trainer, TrainingMetrics};
use crate::utils::{
    load_checkpoint, locate_generator, save_image_grid, save_images_individually, Config, RUN_CONFIG_FILE,
};

/// Where to pick up weights before training
#[derive(Debug, Clone, Default)]
pub struct Resume {
    /// Checkpoint directory; restores both networks, metrics and epoch
    pub checkpoint: Option<PathBuf>,
    /// Generator weights to start from
    pub net_g: Option<PathBuf>,
    /// Discriminator weights to start from
    pub net_d: Option<PathBuf>,
}

/// Seed libtorch with `seed`, or with a fresh random seed
///
/// # Returns
///
/// The seed actually used, so runs can be reproduced
pub fn seed_everything(seed: Option<u64>) -> u64 {
    let seed = seed.unwrap_or_else(rand::random);
    info!("Random Seed: {}", seed);
    tch::manual_seed(seed as i64);
    seed
}

/// Train a DCGAN as described by `config`
///
/// Writes sample grids, weights, checkpoints and metrics below
/// `config.training.output_dir`.
pub fn train(config: &Config, resume: &Resume, dry_run: bool) -> anyhow::Result<TrainingMetrics> {
    config.validate()?;
    let seed = seed_everything(config.training.seed);

    let data = &config.data;
    let dataset = ImageDataset::open(data.dataset, data.dataroot.as_deref(), data.image_size, &data.classes)?;
    let mut data_loader = DataLoader::new(dataset, data.batch_size, true, false, data.workers, seed)?;

    let (mut model, start_epoch, metrics) = build_model(config, resume)?;

    std::fs::create_dir_all(&config.training.output_dir)?;
    let mut used = config.clone();
    used.training.seed = Some(seed);
    used.save_json(config.training.output_dir.join(RUN_CONFIG_FILE))?;

    let mut training_config = config.training_config();
    training_config.start_epoch = start_epoch;
    training_config.dry_run = dry_run;

    let mut trainer = Trainer::with_metrics(training_config, metrics);
    let metrics = trainer.train(&mut model, &mut data_loader)?;

    info!(
        "Training complete. Final G_loss: {:.4}, D_loss: {:.4}",
        metrics.latest_gen_loss().unwrap_or(0.0),
        metrics.latest_disc_loss().unwrap_or(0.0)
    );

    Ok(metrics.clone())
}

/// Create the model for a training run and apply `resume`
///
/// A checkpoint is restored first; `net_g` and `net_d` then override
/// the weights of their network.
///
/// # Returns
///
/// The model, the epoch to start from and the metrics history so far
pub fn build_model(config: &Config, resume: &Resume) -> anyhow::Result<(DCGAN, usize, TrainingMetrics)> {
    let device = config.get_device();
    info!("Using device: {:?}", device);
    let mut model = DCGAN::new(config.network_config(), device)?;

    let mut start_epoch = 0;
    let mut metrics = TrainingMetrics::new();
    if let Some(checkpoint) = &resume.checkpoint {
        let (epoch, restored) = load_checkpoint(&mut model, checkpoint)?;
        info!("Resumed from epoch {}", epoch);
        start_epoch = epoch;
        metrics = restored;
    }
    if let Some(path) = &resume.net_g {
        model.load_generator(path)?;
        info!("Loaded generator weights from {}", path.display());
    }
    if let Some(path) = &resume.net_d {
        model.load_discriminator(path)?;
        info!("Loaded discriminator weights from {}", path.display());
    }

    Ok((model, start_epoch, metrics))
}

/// Build a model around trained generator weights
///
/// The network shape comes from checkpoint metadata or the `config.json`
/// of the training run when available, otherwise from `config`.
pub fn load_generator_model(model_path: &Path, config: &Config) -> anyhow::Result<DCGAN> {
    let (weights, network) = locate_generator(model_path)?;
    let network = network.unwrap_or_else(|| config.network_config());
    network.validate()?;

    let mut model = DCGAN::new(network, config.get_device())?;
    model.load_generator(&weights)?;
    info!("Loaded generator from {}", weights.display());
    Ok(model)
}

/// Options for [`generate_images`]
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub num_images: i64,
    /// Images per grid row
    pub nrow: i64,
    pub output: PathBuf,
    /// Also write every image to this directory
    pub individual_dir: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            num_images: 64,
            nrow: 8,
            output: PathBuf::from("generated.png"),
            individual_dir: None,
            seed: None,
        }
    }
}

/// Sample images from a generator and save them as a grid
///
/// # Returns
///
/// Generated images in [-1, 1], shape (num_images, channels, size, size)
pub fn generate_images(model: &DCGAN, options: &GenerateOptions) -> anyhow::Result<Tensor> {
    if options.num_images <= 0 {
        anyhow::bail!("number of images must be > 0, got {}", options.num_images);
    }
    if let Some(seed) = options.seed {
        tch::manual_seed(seed as i64);
    }

    info!("Generating {} images", options.num_images);
    let images = model.generate(options.num_images);
    save_image_grid(&images, options.nrow, 2, &options.output)?;
    info!("Saved image grid to {}", options.output.display());

    if let Some(dir) = &options.individual_dir {
        let written = save_images_individually(&images, dir, "sample")?;
        info!("Saved {} images to {}", written, dir.display());
    }

    Ok(images)
}

/// Options for [`interpolate_images`]
#[derive(Debug, Clone)]
pub struct InterpolateOptions {
    /// Number of endpoint pairs, one grid row each
    pub rows: i64,
    /// Images per row, endpoints included
    pub steps: i64,
    pub mode: InterpolationMode,
    pub output: PathBuf,
    pub seed: Option<u64>,
}

impl Default for InterpolateOptions {
    fn default() -> Self {
        Self {
            rows: 8,
            steps: 10,
            mode: InterpolationMode::Linear,
            output: PathBuf::from("interpolation.png"),
            seed: None,
        }
    }
}

/// Walk between random latent points and save one row per walk
///
/// # Returns
///
/// All images, shape (rows * steps, channels, size, size)
pub fn interpolate_images(model: &DCGAN, options: &InterpolateOptions) -> anyhow::Result<Tensor> {
    if options.rows <= 0 {
        anyhow::bail!("number of rows must be > 0, got {}", options.rows);
    }
    if let Some(seed) = options.seed {
        tch::manual_seed(seed as i64);
    }

    let mut rows = Vec::with_capacity(options.rows as usize);
    for _ in 0..options.rows {
        let endpoints = sample_latent(2, model.latent_dim(), model.device());
        rows.push(model.interpolate(&endpoints.get(0), &endpoints.get(1), options.steps, options.mode)?);
    }

    let images = Tensor::cat(&rows, 0);
    save_image_grid(&images, options.steps, 2, &options.output)?;
    info!(
        "Saved {} x {} {} interpolation to {}",
        options.rows,
        options.steps,
        options.mode,
        options.output.display()
    );
    Ok(images)
}
