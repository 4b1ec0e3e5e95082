//! Training metrics for monitoring GAN progress
//!
//! Provides structures for tracking and logging training progress.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Statistics of a single optimisation step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    /// Zero-based epoch
    pub epoch: usize,
    /// Global iteration counter across epochs
    pub iteration: usize,
    pub disc_loss: f64,
    pub gen_loss: f64,
    /// Mean D(x) on the real batch
    pub d_real: f64,
    /// Mean D(G(z)) before the discriminator update
    pub d_fake_before: f64,
    /// Mean D(G(z)) after the discriminator update
    pub d_fake_after: f64,
}

impl IterationStats {
    pub fn is_finite(&self) -> bool {
        self.disc_loss.is_finite() && self.gen_loss.is_finite()
    }
}

/// Averages over one epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub gen_loss: f64,
    pub disc_loss: f64,
    pub d_real: f64,
    pub d_fake: f64,
}

/// Metrics collected during training
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Every recorded step, in order
    pub iterations: Vec<IterationStats>,
    /// Per-epoch averages
    pub epochs: Vec<EpochStats>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_iteration(&mut self, stats: IterationStats) {
        self.iterations.push(stats);
    }

    /// Close an epoch, averaging its iterations
    ///
    /// Returns None if no iteration was recorded for `epoch`.
    pub fn finish_epoch(&mut self, epoch: usize) -> Option<EpochStats> {
        let stats = summarize_epoch(&self.iterations, epoch)?;
        self.epochs.retain(|e| e.epoch != epoch);
        self.epochs.push(stats);
        Some(stats)
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.epochs.len()
    }

    pub fn num_iterations(&self) -> usize {
        self.iterations.len()
    }

    /// Get latest generator loss
    pub fn latest_gen_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.gen_loss)
    }

    /// Get latest discriminator loss
    pub fn latest_disc_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.disc_loss)
    }

    pub fn gen_losses(&self) -> Vec<f64> {
        self.iterations.iter().map(|s| s.gen_loss).collect()
    }

    pub fn disc_losses(&self) -> Vec<f64> {
        self.iterations.iter().map(|s| s.disc_loss).collect()
    }

    /// Calculate moving average of generator loss over recent epochs
    pub fn gen_loss_ma(&self, window: usize) -> f64 {
        let values: Vec<f64> = self.epochs.iter().map(|e| e.gen_loss).collect();
        moving_average(&values, window)
    }

    /// Calculate moving average of discriminator loss over recent epochs
    pub fn disc_loss_ma(&self, window: usize) -> f64 {
        let values: Vec<f64> = self.epochs.iter().map(|e| e.disc_loss).collect();
        moving_average(&values, window)
    }

    /// Check if training appears to have collapsed
    ///
    /// Mode collapse indicators:
    /// - Discriminator loss very low (can easily distinguish)
    /// - Generator loss very high (can't fool discriminator)
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if self.num_epochs() < window {
            return false;
        }

        let disc_ma = self.disc_loss_ma(window);
        let gen_ma = self.gen_loss_ma(window);

        // Heuristic thresholds for mode collapse detection
        disc_ma < 0.1 && gen_ma > 5.0
    }

    /// Check if training is balanced
    ///
    /// In a healthy run D(x) and D(G(z)) both stay away from 0 and 1.
    pub fn is_balanced(&self, window: usize) -> bool {
        if self.num_epochs() < window {
            return true;
        }

        let recent: Vec<_> = self.epochs.iter().rev().take(window).collect();
        let avg_real = recent.iter().map(|e| e.d_real).sum::<f64>() / recent.len() as f64;
        let avg_fake = recent.iter().map(|e| e.d_fake).sum::<f64>() / recent.len() as f64;

        (0.3..0.9).contains(&avg_real) && (0.1..0.7).contains(&avg_fake)
    }

    /// Save per-iteration metrics to CSV file
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for stats in &self.iterations {
            writer.serialize(stats)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load metrics from CSV file, rebuilding the epoch averages
    pub fn load_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut metrics = Self::new();

        for result in reader.deserialize() {
            let stats: IterationStats = result?;
            metrics.record_iteration(stats);
        }

        let mut epochs: Vec<usize> = metrics.iterations.iter().map(|s| s.epoch).collect();
        epochs.dedup();
        for epoch in epochs {
            metrics.finish_epoch(epoch);
        }

        Ok(metrics)
    }
}

fn summarize_epoch(iterations: &[IterationStats], epoch: usize) -> Option<EpochStats> {
    let rows: Vec<_> = iterations.iter().filter(|s| s.epoch == epoch).collect();
    if rows.is_empty() {
        return None;
    }

    let n = rows.len() as f64;
    let mean = |f: fn(&IterationStats) -> f64| rows.iter().map(|s| f(s)).sum::<f64>() / n;
    Some(EpochStats {
        epoch,
        gen_loss: mean(|s| s.gen_loss),
        disc_loss: mean(|s| s.disc_loss),
        d_real: mean(|s| s.d_real),
        d_fake: mean(|s| s.d_fake_before),
    })
}

/// Exponential moving average tracker
#[derive(Debug)]
pub struct EMATracker {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EMATracker {
    /// Create new EMA tracker
    ///
    /// # Arguments
    ///
    /// * `alpha` - Smoothing factor (0 < alpha <= 1). Higher = more weight on recent
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.001, 1.0),
            initialized: false,
        }
    }

    /// Update with new value
    pub fn update(&mut self, new_value: f64) {
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Reset tracker
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.initialized = false;
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = window.min(values.len()).max(1);
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(epoch: usize, iteration: usize, gen_loss: f64, disc_loss: f64) -> IterationStats {
        IterationStats {
            epoch,
            iteration,
            disc_loss,
            gen_loss,
            d_real: 0.6,
            d_fake_before: 0.4,
            d_fake_after: 0.45,
        }
    }

    #[test]
    fn test_training_metrics() {
        let mut metrics = TrainingMetrics::new();

        metrics.record_iteration(step(0, 0, 1.0, 0.8));
        metrics.record_iteration(step(0, 1, 2.0, 0.6));
        let epoch = metrics.finish_epoch(0).unwrap();
        assert_eq!(epoch.gen_loss, 1.5);
        assert!((epoch.disc_loss - 0.7).abs() < 1e-12);

        metrics.record_iteration(step(1, 2, 1.3, 0.75));
        metrics.finish_epoch(1);

        assert_eq!(metrics.num_epochs(), 2);
        assert_eq!(metrics.num_iterations(), 3);
        assert_eq!(metrics.latest_gen_loss(), Some(1.3));
        assert!(metrics.finish_epoch(5).is_none());
    }

    #[test]
    fn test_mode_collapse_detection() {
        let mut metrics = TrainingMetrics::new();
        for epoch in 0..3 {
            metrics.record_iteration(step(epoch, epoch, 8.0, 0.01));
            metrics.finish_epoch(epoch);
        }
        assert!(metrics.check_mode_collapse(3));
        assert!(!metrics.check_mode_collapse(4));
        assert!(metrics.is_balanced(3));
    }

    #[test]
    fn test_csv_roundtrip_rebuilds_epochs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training_metrics.csv");

        let mut metrics = TrainingMetrics::new();
        metrics.record_iteration(step(0, 0, 1.0, 0.5));
        metrics.record_iteration(step(0, 1, 3.0, 0.7));
        metrics.record_iteration(step(1, 2, 2.0, 0.4));
        metrics.finish_epoch(0);
        metrics.finish_epoch(1);
        metrics.save_csv(&path).unwrap();

        let loaded = TrainingMetrics::load_csv(&path).unwrap();
        assert_eq!(loaded.iterations, metrics.iterations);
        assert_eq!(loaded.epochs, metrics.epochs);
    }

    #[test]
    fn test_ema_tracker() {
        let mut ema = EMATracker::new(0.5);

        ema.update(10.0);
        assert_eq!(ema.value(), 10.0);

        ema.update(20.0);
        assert_eq!(ema.value(), 15.0); // 0.5 * 20 + 0.5 * 10

        ema.reset();
        ema.update(4.0);
        assert_eq!(ema.value(), 4.0);
    }

    #[test]
    fn test_moving_average() {
        assert_eq!(moving_average(&[], 3), 0.0);
        assert_eq!(moving_average(&[1.0, 2.0, 3.0, 4.0], 2), 3.5);
        assert_eq!(moving_average(&[1.0, 2.0], 10), 1.5);
    }
}
