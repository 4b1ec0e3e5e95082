//! Latent space sampling and interpolation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tch::{Device, Kind, Tensor};

use crate::error::{DcganError, Result};

/// Below this |sin(omega)| two latent vectors are treated as parallel
const PARALLEL_EPS: f64 = 1e-6;

/// How to walk between two latent vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// Straight line between the endpoints
    #[default]
    Linear,
    /// Great-circle path, keeps samples near the Gaussian shell
    Spherical,
}

impl FromStr for InterpolationMode {
    type Err = DcganError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" | "lerp" => Ok(Self::Linear),
            "spherical" | "slerp" => Ok(Self::Spherical),
            other => Err(DcganError::Config(format!(
                "unknown interpolation mode '{}', expected linear or spherical",
                other
            ))),
        }
    }
}

impl fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Spherical => write!(f, "spherical"),
        }
    }
}

/// Draw `num_samples` latent vectors from N(0, I)
pub fn sample_latent(num_samples: i64, latent_dim: i64, device: Device) -> Tensor {
    Tensor::randn([num_samples, latent_dim], (Kind::Float, device))
}

fn check_endpoints(z1: &Tensor, z2: &Tensor, steps: i64) -> Result<()> {
    if steps < 1 {
        return Err(DcganError::Config(format!(
            "interpolation needs at least one step, got {}",
            steps
        )));
    }
    if z1.dim() != 1 || z1.size() != z2.size() {
        return Err(DcganError::Config(format!(
            "latent endpoints must be 1-D vectors of equal length, got {:?} and {:?}",
            z1.size(),
            z2.size()
        )));
    }
    Ok(())
}

/// Interpolation weights for `steps` evenly spaced points in [0, 1]
fn alphas(steps: i64) -> Vec<f64> {
    if steps == 1 {
        return vec![0.0];
    }
    (0..steps).map(|i| i as f64 / (steps - 1) as f64).collect()
}

/// Stack `w1[i] * z1 + w2[i] * z2` for every step
fn weighted_sum(z1: &Tensor, z2: &Tensor, w1: &[f64], w2: &[f64]) -> Tensor {
    let kind = z1.kind();
    let device = z1.device();
    let w1 = Tensor::from_slice(w1).to_kind(kind).to_device(device).unsqueeze(1);
    let w2 = Tensor::from_slice(w2).to_kind(kind).to_device(device).unsqueeze(1);
    w1 * z1.unsqueeze(0) + w2 * z2.unsqueeze(0)
}

/// Linear interpolation, returns a (steps, latent_dim) tensor whose first
/// and last rows are `z1` and `z2`
pub fn lerp(z1: &Tensor, z2: &Tensor, steps: i64) -> Result<Tensor> {
    check_endpoints(z1, z2, steps)?;
    let t = alphas(steps);
    let w1: Vec<f64> = t.iter().map(|a| 1.0 - a).collect();
    Ok(weighted_sum(z1, z2, &w1, &t))
}

/// Spherical linear interpolation, returns a (steps, latent_dim) tensor
pub fn slerp(z1: &Tensor, z2: &Tensor, steps: i64) -> Result<Tensor> {
    check_endpoints(z1, z2, steps)?;

    let n1 = f64::try_from(&z1.norm())?;
    let n2 = f64::try_from(&z2.norm())?;
    if n1 == 0.0 || n2 == 0.0 {
        return lerp(z1, z2, steps);
    }

    let dot = f64::try_from(&(z1 * z2).sum(Kind::Double))? / (n1 * n2);
    let omega = dot.clamp(-1.0, 1.0).acos();
    let sin_omega = omega.sin();
    if sin_omega.abs() < PARALLEL_EPS {
        return lerp(z1, z2, steps);
    }

    let t = alphas(steps);
    let w1: Vec<f64> = t.iter().map(|a| ((1.0 - a) * omega).sin() / sin_omega).collect();
    let w2: Vec<f64> = t.iter().map(|a| (a * omega).sin() / sin_omega).collect();
    Ok(weighted_sum(z1, z2, &w1, &w2))
}

/// Interpolate with the given mode
pub fn interpolate(z1: &Tensor, z2: &Tensor, steps: i64, mode: InterpolationMode) -> Result<Tensor> {
    match mode {
        InterpolationMode::Linear => lerp(z1, z2, steps),
        InterpolationMode::Spherical => slerp(z1, z2, steps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_abs_diff(a: &Tensor, b: &Tensor) -> f64 {
        (a - b).abs().max().double_value(&[])
    }

    #[test]
    fn test_sample_latent_shape() {
        let z = sample_latent(5, 100, Device::Cpu);
        assert_eq!(z.size(), vec![5, 100]);
    }

    #[test]
    fn test_lerp_endpoints() {
        let z1 = Tensor::randn([16], (Kind::Float, Device::Cpu));
        let z2 = Tensor::randn([16], (Kind::Float, Device::Cpu));

        let path = lerp(&z1, &z2, 5).unwrap();
        assert_eq!(path.size(), vec![5, 16]);
        assert!(max_abs_diff(&path.get(0), &z1) < 1e-6);
        assert!(max_abs_diff(&path.get(4), &z2) < 1e-6);

        let midpoint = (&z1 + &z2) / 2.0;
        assert!(max_abs_diff(&path.get(2), &midpoint) < 1e-6);
    }

    #[test]
    fn test_single_step_returns_start() {
        let z1 = Tensor::randn([8], (Kind::Float, Device::Cpu));
        let z2 = Tensor::randn([8], (Kind::Float, Device::Cpu));

        let path = slerp(&z1, &z2, 1).unwrap();
        assert_eq!(path.size(), vec![1, 8]);
        assert!(max_abs_diff(&path.get(0), &z1) < 1e-6);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let z = Tensor::randn([8], (Kind::Float, Device::Cpu));
        assert!(lerp(&z, &z, 0).is_err());
    }

    #[test]
    fn test_mismatched_endpoints_rejected() {
        let z1 = Tensor::randn([8], (Kind::Float, Device::Cpu));
        let z2 = Tensor::randn([9], (Kind::Float, Device::Cpu));
        assert!(slerp(&z1, &z2, 3).is_err());
    }

    #[test]
    fn test_slerp_preserves_norm() {
        let z1 = Tensor::randn([64], (Kind::Float, Device::Cpu));
        let z2 = Tensor::randn([64], (Kind::Float, Device::Cpu));
        let z1 = &z1 / z1.norm() * 8.0;
        let z2 = &z2 / z2.norm() * 8.0;

        let path = slerp(&z1, &z2, 7).unwrap();
        let norms = Vec::<f32>::try_from(&path.norm_scalaropt_dim(2, [1], false)).unwrap();
        for n in norms {
            assert!((n - 8.0).abs() < 1e-3, "norm drifted to {}", n);
        }
        assert!(max_abs_diff(&path.get(6), &z2) < 1e-4);
    }

    #[test]
    fn test_slerp_parallel_falls_back_to_lerp() {
        let z1 = Tensor::ones([4], (Kind::Float, Device::Cpu));
        let z2 = &z1 * 3.0;

        let path = slerp(&z1, &z2, 3).unwrap();
        let expected = lerp(&z1, &z2, 3).unwrap();
        assert!(max_abs_diff(&path, &expected) < 1e-6);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("slerp".parse::<InterpolationMode>().unwrap(), InterpolationMode::Spherical);
        assert_eq!("Linear".parse::<InterpolationMode>().unwrap(), InterpolationMode::Linear);
        assert!("cubic".parse::<InterpolationMode>().is_err());
    }
}
