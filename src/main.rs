//! DCGAN for Image Synthesis
//!
//! Main entry point providing CLI interface for:
//! - Training DCGAN model on image datasets
//! - Generating image grids
//! - Latent space interpolation
//! - Plotting training losses and inspecting checkpoints

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dcgan_images::{
    data::DatasetKind,
    model::InterpolationMode,
    pipeline::{self, GenerateOptions, InterpolateOptions, Resume},
    training::TrainingMetrics,
    utils::{list_checkpoints, plot_losses, Config},
};

/// DCGAN for Synthetic Images
#[derive(Parser)]
#[command(name = "dcgan")]
#[command(version)]
#[command(about = "Train DCGANs on face and scene images and sample from them")]
struct Cli {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    /// Use CUDA if available
    #[arg(long, global = true)]
    cuda: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Train the DCGAN model
    Train {
        /// Dataset kind: folder, imagenet, lfw, lsun, cifar10, mnist, fake
        #[arg(long)]
        dataset: Option<DatasetKind>,

        /// Path to dataset
        #[arg(long)]
        dataroot: Option<PathBuf>,

        /// Number of epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Output directory for samples, weights and checkpoints
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Resume from checkpoint directory
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Generator weights to continue training
        #[arg(long)]
        net_g: Option<PathBuf>,

        /// Discriminator weights to continue training
        #[arg(long)]
        net_d: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Run a single iteration only
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a grid of images
    Generate {
        /// Generator weights, checkpoint directory or training output directory
        #[arg(short, long)]
        model: PathBuf,

        /// Number of images to generate
        #[arg(short, long, default_value = "64")]
        num_images: i64,

        /// Images per grid row
        #[arg(long, default_value = "8")]
        nrow: i64,

        /// Output file path
        #[arg(short, long, default_value = "generated.png")]
        output: PathBuf,

        /// Also save every image separately into this directory
        #[arg(long)]
        individual_dir: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Interpolate between random points of the latent space
    Interpolate {
        /// Generator weights, checkpoint directory or training output directory
        #[arg(short, long)]
        model: PathBuf,

        /// Number of interpolation rows
        #[arg(long, default_value = "8")]
        rows: i64,

        /// Images per row
        #[arg(long, default_value = "10")]
        steps: i64,

        /// Interpolation mode: linear or spherical
        #[arg(long, default_value = "linear")]
        mode: InterpolationMode,

        /// Output file path
        #[arg(short, long, default_value = "interpolation.png")]
        output: PathBuf,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Plot generator and discriminator losses
    Plot {
        /// Metrics CSV written by training
        #[arg(short, long)]
        metrics: PathBuf,

        /// Output PNG path
        #[arg(short, long, default_value = "losses.png")]
        output: PathBuf,
    },

    /// List checkpoints in a directory
    Checkpoints {
        /// Checkpoint directory
        #[arg(short, long, default_value = "output/checkpoints")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { output } => {
            init_config(&output)?;
        }
        Commands::Train {
            dataset,
            dataroot,
            epochs,
            output,
            resume,
            net_g,
            net_d,
            seed,
            dry_run,
        } => {
            let mut config = load_config(&cli.config, cli.cuda)?;
            if let Some(dataset) = dataset {
                config.data.dataset = dataset;
            }
            if dataroot.is_some() {
                config.data.dataroot = dataroot;
            }
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
            }
            if let Some(output) = output {
                config.training.output_dir = output;
            }
            if seed.is_some() {
                config.training.seed = seed;
            }

            let resume = Resume {
                checkpoint: resume,
                net_g,
                net_d,
            };
            pipeline::train(&config, &resume, dry_run)?;
        }
        Commands::Generate {
            model,
            num_images,
            nrow,
            output,
            individual_dir,
            seed,
        } => {
            let config = load_config(&cli.config, cli.cuda)?;
            let model = pipeline::load_generator_model(&model, &config)?;
            let options = GenerateOptions {
                num_images,
                nrow,
                output,
                individual_dir,
                seed,
            };
            pipeline::generate_images(&model, &options)?;
        }
        Commands::Interpolate {
            model,
            rows,
            steps,
            mode,
            output,
            seed,
        } => {
            let config = load_config(&cli.config, cli.cuda)?;
            let model = pipeline::load_generator_model(&model, &config)?;
            let options = InterpolateOptions {
                rows,
                steps,
                mode,
                output,
                seed,
            };
            pipeline::interpolate_images(&model, &options)?;
        }
        Commands::Plot { metrics, output } => {
            let loaded = TrainingMetrics::load_csv(&metrics)?;
            info!(
                "Loaded {} iterations over {} epochs from {}",
                loaded.num_iterations(),
                loaded.num_epochs(),
                metrics.display()
            );
            plot_losses(&loaded, &output)?;
        }
        Commands::Checkpoints { dir } => {
            show_checkpoints(&dir);
        }
    }

    Ok(())
}

/// Load configuration, falling back to defaults when the file is missing
fn load_config(path: &Path, cuda: bool) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)?
    } else {
        info!("Config file {} not found, using defaults", path.display());
        Config::default()
    };

    if cuda {
        config.training.device = "cuda".to_string();
    }
    Ok(config)
}

/// Initialize default configuration file
fn init_config(output_path: &Path) -> Result<()> {
    Config::default().save(output_path)?;
    info!("Created default configuration at {}", output_path.display());
    Ok(())
}

fn show_checkpoints(dir: &Path) {
    let checkpoints = list_checkpoints(dir);
    if checkpoints.is_empty() {
        info!("No checkpoints found in {}", dir.display());
        return;
    }

    for (path, meta) in checkpoints {
        info!(
            "{}: epoch {}, G_loss={:.4}, D_loss={:.4}, image_size={}, saved {}",
            path.display(),
            meta.epoch,
            meta.gen_loss,
            meta.disc_loss,
            meta.network.image_size,
            meta.timestamp
        );
    }
}
