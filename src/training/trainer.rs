//! Training loop implementation for DCGAN
//!
//! Provides the main training loop with alternating updates
//! for discriminator and generator, periodic image samples
//! and per-epoch weight snapshots.

use std::path::PathBuf;

use anyhow::bail;
use indicatif::{ProgressBar, ProgressStyle};
use tch::{nn, Tensor};
use tracing::{debug, info, warn};

use crate::data::DataLoader;
use crate::model::{sample_latent, DCGAN};
use crate::utils::{save_checkpoint, save_image_grid};
use super::losses::{discriminator_loss_smoothed, generator_loss};
use super::metrics::{EMATracker, IterationStats, TrainingMetrics};

/// Size of the fixed noise batch used for progress samples
pub const SAMPLE_BATCH: i64 = 64;

/// Columns of the progress sample grids
const SAMPLE_NROW: i64 = 8;

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Total number of training epochs
    pub epochs: usize,
    /// Epoch to start from (non-zero when resuming)
    pub start_epoch: usize,
    /// Adam learning rate, shared by both networks
    pub lr: f64,
    /// Adam beta1
    pub beta1: f64,
    /// Adam beta2
    pub beta2: f64,
    /// Whether to use label smoothing
    pub label_smoothing: bool,
    /// Smooth label for real samples (e.g., 0.9)
    pub smooth_real: f64,
    /// Smooth label for fake samples (e.g., 0.1)
    pub smooth_fake: f64,
    /// Log losses every N iterations
    pub log_every: usize,
    /// Save sample grids every N iterations
    pub sample_every: usize,
    /// Save a full checkpoint every N epochs (0 disables)
    pub checkpoint_every: usize,
    /// Directory for samples, weights and checkpoints
    pub output_dir: PathBuf,
    /// Stop after a single iteration
    pub dry_run: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 25,
            start_epoch: 0,
            lr: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
            label_smoothing: false,
            smooth_real: 0.9,
            smooth_fake: 0.1,
            log_every: 1,
            sample_every: 100,
            checkpoint_every: 5,
            output_dir: PathBuf::from("output"),
            dry_run: false,
        }
    }
}

impl TrainingConfig {
    /// Targets used for real and fake samples in the discriminator loss
    pub fn labels(&self) -> (f64, f64) {
        if self.label_smoothing {
            (self.smooth_real, self.smooth_fake)
        } else {
            (1.0, 0.0)
        }
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.output_dir.join("checkpoints")
    }
}

/// Result of one discriminator + generator update
#[derive(Debug, Clone, Copy)]
pub struct StepOutput {
    pub disc_loss: f64,
    pub gen_loss: f64,
    /// Mean D(x)
    pub d_real: f64,
    /// Mean D(G(z)) seen by the discriminator step
    pub d_fake_before: f64,
    /// Mean D(G(z)) seen by the generator step
    pub d_fake_after: f64,
}

impl StepOutput {
    fn into_stats(self, epoch: usize, iteration: usize) -> IterationStats {
        IterationStats {
            epoch,
            iteration,
            disc_loss: self.disc_loss,
            gen_loss: self.gen_loss,
            d_real: self.d_real,
            d_fake_before: self.d_fake_before,
            d_fake_after: self.d_fake_after,
        }
    }
}

/// DCGAN Trainer
pub struct Trainer {
    config: TrainingConfig,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig) -> Self {
        Self::with_metrics(config, TrainingMetrics::new())
    }

    /// Create a trainer that continues an existing metrics history
    pub fn with_metrics(config: TrainingConfig, metrics: TrainingMetrics) -> Self {
        Self { config, metrics }
    }

    /// Train the DCGAN model
    ///
    /// # Arguments
    ///
    /// * `model` - DCGAN model to train
    /// * `data_loader` - DataLoader providing training batches
    ///
    /// # Returns
    ///
    /// Training metrics
    pub fn train(
        &mut self,
        model: &mut DCGAN,
        data_loader: &mut DataLoader,
    ) -> anyhow::Result<&TrainingMetrics> {
        let num_batches = data_loader.num_batches();
        if num_batches == 0 {
            bail!(
                "dataset of {} images yields no batch of size {}",
                data_loader.num_samples(),
                data_loader.batch_size()
            );
        }

        let (lr, beta1, beta2) = (self.config.lr, self.config.beta1, self.config.beta2);
        let mut gen_opt = model.gen_optimizer(lr, beta1, beta2)?;
        let mut disc_opt = model.disc_optimizer(lr, beta1, beta2)?;
        let labels = self.config.labels();

        let output_dir = self.config.output_dir.clone();
        std::fs::create_dir_all(&output_dir)?;

        let fixed_noise = sample_latent(SAMPLE_BATCH, model.latent_dim(), model.device());
        let mut iteration = self.metrics.num_iterations();

        info!(
            "Starting training for epochs {}..{}, {} batches per epoch",
            self.config.start_epoch, self.config.epochs, num_batches
        );

        let mut stop = false;
        let mut last_epoch = None;

        for epoch in self.config.start_epoch..self.config.epochs {
            let pb = ProgressBar::new(num_batches as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                    .progress_chars("##-"),
            );

            let mut gen_ema = EMATracker::new(0.1);
            let mut disc_ema = EMATracker::new(0.1);

            for (i, real_batch) in data_loader.iter().enumerate() {
                let real = real_batch?.to_device(model.device());

                let step = train_step(model, &real, &mut gen_opt, &mut disc_opt, labels);
                if !step.disc_loss.is_finite() || !step.gen_loss.is_finite() {
                    pb.abandon();
                    bail!(
                        "non-finite loss at epoch {} iteration {}: Loss_D={} Loss_G={}",
                        epoch, i, step.disc_loss, step.gen_loss
                    );
                }

                self.metrics.record_iteration(step.into_stats(epoch, iteration));
                iteration += 1;

                gen_ema.update(step.gen_loss);
                disc_ema.update(step.disc_loss);
                pb.set_message(format!("G: {:.4}, D: {:.4}", gen_ema.value(), disc_ema.value()));
                pb.inc(1);

                if i % self.config.log_every.max(1) == 0 {
                    info!(
                        "[{}/{}][{}/{}] Loss_D: {:.4} Loss_G: {:.4} D(x): {:.4} D(G(z)): {:.4} / {:.4}",
                        epoch,
                        self.config.epochs,
                        i,
                        num_batches,
                        step.disc_loss,
                        step.gen_loss,
                        step.d_real,
                        step.d_fake_before,
                        step.d_fake_after
                    );
                }

                if i % self.config.sample_every.max(1) == 0 {
                    save_image_grid(&real, SAMPLE_NROW, 2, output_dir.join("real_samples.png"))?;
                    let fake = render_samples(model, &fixed_noise);
                    let name = format!("fake_samples_epoch_{:03}.png", epoch);
                    save_image_grid(&fake, SAMPLE_NROW, 2, output_dir.join(&name))?;
                    debug!("Wrote {}", name);
                }

                if self.config.dry_run {
                    stop = true;
                    break;
                }
            }

            pb.finish_with_message("done");
            last_epoch = Some(epoch);

            model.save(
                output_dir.join(format!("netG_epoch_{}.ot", epoch)),
                output_dir.join(format!("netD_epoch_{}.ot", epoch)),
            )?;

            if let Some(stats) = self.metrics.finish_epoch(epoch) {
                info!(
                    "Epoch {}/{}: G_loss={:.4}, D_loss={:.4}, D(x)={:.4}, D(G(z))={:.4}",
                    epoch + 1,
                    self.config.epochs,
                    stats.gen_loss,
                    stats.disc_loss,
                    stats.d_real,
                    stats.d_fake
                );
            }

            // Check for mode collapse
            if self.metrics.check_mode_collapse(5) {
                warn!("Possible mode collapse detected! Consider adjusting learning rates.");
            } else if !self.metrics.is_balanced(5) {
                debug!("Discriminator and generator look unbalanced over the last 5 epochs");
            }

            // A dry run never completes an epoch, so it leaves no checkpoint
            let every = self.config.checkpoint_every;
            if !stop && every > 0 && (epoch + 1) % every == 0 {
                save_checkpoint(model, &self.metrics, epoch + 1, &self.config.checkpoint_dir())?;
            }

            if stop {
                info!("Dry run: stopping after one iteration");
                break;
            }
        }

        if last_epoch.is_none() {
            warn!(
                "No epochs to run (start epoch {} >= {})",
                self.config.start_epoch, self.config.epochs
            );
        }

        model.save(
            output_dir.join("generator_final.ot"),
            output_dir.join("discriminator_final.ot"),
        )?;
        self.metrics.save_csv(output_dir.join("training_metrics.csv"))?;
        info!("Saved final model and metrics to {}", output_dir.display());

        Ok(&self.metrics)
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

/// Progress samples for the fixed noise batch
///
/// The generator stays in training mode, so batch norm normalizes with the
/// statistics of this batch and its running estimates move as they do in a
/// regular forward pass.
fn render_samples(model: &DCGAN, noise: &Tensor) -> Tensor {
    tch::no_grad(|| model.generator.forward_t(noise, true))
}

fn mean_probability(logits: &Tensor) -> f64 {
    logits.sigmoid().mean(tch::Kind::Float).double_value(&[])
}

/// Single training step
///
/// Updates the discriminator on a real batch and a detached fake batch,
/// then updates the generator by passing the same fake batch through
/// the freshly updated discriminator.
///
/// # Arguments
///
/// * `labels` - (real, fake) targets for the discriminator loss
pub fn train_step(
    model: &DCGAN,
    real_data: &Tensor,
    gen_opt: &mut nn::Optimizer,
    disc_opt: &mut nn::Optimizer,
    labels: (f64, f64),
) -> StepOutput {
    let batch_size = real_data.size()[0];
    let noise = sample_latent(batch_size, model.latent_dim(), model.device());
    let fake_data = model.generator.forward_t(&noise, true);

    // ========== Train Discriminator ==========
    let real_output = model.discriminator.forward_t(real_data, true);
    let fake_output = model.discriminator.forward_t(&fake_data.detach(), true);
    let d_loss = discriminator_loss_smoothed(&real_output, &fake_output, labels.0, labels.1);

    disc_opt.zero_grad();
    d_loss.backward();
    disc_opt.step();

    // ========== Train Generator ==========
    let fake_output_after = model.discriminator.forward_t(&fake_data, true);
    let g_loss = generator_loss(&fake_output_after);

    gen_opt.zero_grad();
    g_loss.backward();
    gen_opt.step();

    StepOutput {
        disc_loss: d_loss.double_value(&[]),
        gen_loss: g_loss.double_value(&[]),
        d_real: mean_probability(&real_output.detach()),
        d_fake_before: mean_probability(&fake_output.detach()),
        d_fake_after: mean_probability(&fake_output_after.detach()),
    }
}
