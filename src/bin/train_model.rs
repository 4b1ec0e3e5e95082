//! Standalone binary for training DCGAN model
//!
//! Mirrors the flags of the classic DCGAN training script.
//!
//! Usage:
//!   cargo run --bin train_model -- --dataset lsun --dataroot data/lsun --classes bedroom_train --cuda

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use dcgan_images::{
    data::DatasetKind,
    pipeline::{self, Resume},
    utils::Config,
};

/// Train DCGAN on an image dataset
#[derive(Parser)]
#[command(name = "train_model")]
#[command(about = "Train DCGAN on faces, bedrooms and other image datasets")]
struct Args {
    /// cifar10 | lsun | mnist | imagenet | folder | lfw | fake
    #[arg(long)]
    dataset: DatasetKind,

    /// Path to dataset
    #[arg(long)]
    dataroot: Option<PathBuf>,

    /// Number of data loading workers
    #[arg(long, default_value = "2")]
    workers: usize,

    /// Input batch size
    #[arg(long, default_value = "64")]
    batch_size: usize,

    /// Height / width of the input image to network
    #[arg(long, default_value = "64")]
    image_size: i64,

    /// Size of the latent z vector
    #[arg(long, default_value = "100")]
    nz: i64,

    #[arg(long, default_value = "64")]
    ngf: i64,

    #[arg(long, default_value = "64")]
    ndf: i64,

    /// Number of epochs to train for
    #[arg(long, default_value = "25")]
    niter: usize,

    /// Learning rate
    #[arg(long, default_value = "0.0002")]
    lr: f64,

    /// Beta1 for adam
    #[arg(long, default_value = "0.5")]
    beta1: f64,

    /// Enables cuda
    #[arg(long)]
    cuda: bool,

    /// Path to generator weights (to continue training)
    #[arg(long)]
    net_g: Option<PathBuf>,

    /// Path to discriminator weights (to continue training)
    #[arg(long)]
    net_d: Option<PathBuf>,

    /// Folder to output images and model checkpoints
    #[arg(long, default_value = ".")]
    outf: PathBuf,

    /// Manual seed
    #[arg(long)]
    manual_seed: Option<u64>,

    /// Comma separated list of classes for the lsun data set
    #[arg(long, default_value = "bedroom_train")]
    classes: String,

    /// Check a single training cycle works
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn into_config(self) -> (Config, Resume, bool) {
        let mut config = Config::default();

        config.data.dataset = self.dataset;
        config.data.dataroot = self.dataroot;
        config.data.workers = self.workers;
        config.data.batch_size = self.batch_size;
        config.data.image_size = self.image_size;
        config.data.classes = self
            .classes
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();

        config.model.latent_dim = self.nz;
        config.model.gen_filters = self.ngf;
        config.model.disc_filters = self.ndf;

        config.training.epochs = self.niter;
        config.training.lr = self.lr;
        config.training.beta1 = self.beta1;
        config.training.output_dir = self.outf;
        config.training.seed = self.manual_seed;
        if self.cuda {
            config.training.device = "cuda".to_string();
        }

        let resume = Resume {
            checkpoint: None,
            net_g: self.net_g,
            net_d: self.net_d,
        };
        (config, resume, self.dry_run)
    }
}

fn main() -> Result<()> {
    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    if !args.cuda && tch::Cuda::is_available() {
        tracing::warn!("You have a CUDA device, so you should probably run with --cuda");
    }

    let (config, resume, dry_run) = args.into_config();
    pipeline::train(&config, &resume, dry_run)?;

    Ok(())
}
