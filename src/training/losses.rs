//! Loss functions for GAN training
//!
//! Implements Binary Cross Entropy losses for generator and discriminator.

use tch::{Reduction, Tensor};

/// Mean BCE between logits and a constant target
fn bce_with_logits(logits: &Tensor, target: f64) -> Tensor {
    let targets = Tensor::full_like(logits, target);
    logits.binary_cross_entropy_with_logits::<Tensor>(&targets, None, None, Reduction::Mean)
}

/// Generator loss: -log(D(G(z)))
///
/// The generator wants the discriminator to output 1 (real) for fake samples.
///
/// # Arguments
///
/// * `fake_output` - Discriminator output on generated samples (logits)
///
/// # Returns
///
/// Scalar loss tensor
pub fn generator_loss(fake_output: &Tensor) -> Tensor {
    bce_with_logits(fake_output, 1.0)
}

/// Discriminator loss: -log(D(x)) - log(1-D(G(z)))
///
/// The discriminator wants to output 1 for real samples and 0 for fake samples.
///
/// # Arguments
///
/// * `real_output` - Discriminator output on real samples (logits)
/// * `fake_output` - Discriminator output on generated samples (logits)
///
/// # Returns
///
/// Scalar loss tensor
pub fn discriminator_loss(real_output: &Tensor, fake_output: &Tensor) -> Tensor {
    discriminator_loss_smoothed(real_output, fake_output, 1.0, 0.0)
}

/// Discriminator loss with label smoothing for improved training stability
///
/// Instead of using hard 1s and 0s, use smoothed labels:
/// - Real: 0.9 instead of 1.0
/// - Fake: 0.1 instead of 0.0
///
/// # Arguments
///
/// * `real_output` - Discriminator output on real samples
/// * `fake_output` - Discriminator output on fake samples
/// * `smooth_real` - Smoothed label for real (e.g., 0.9)
/// * `smooth_fake` - Smoothed label for fake (e.g., 0.1)
pub fn discriminator_loss_smoothed(
    real_output: &Tensor,
    fake_output: &Tensor,
    smooth_real: f64,
    smooth_fake: f64,
) -> Tensor {
    bce_with_logits(real_output, smooth_real) + bce_with_logits(fake_output, smooth_fake)
}
