// src/noise.rs

//! Gaussian measurement noise.

use log::warn;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::Error;

/// Adds normally distributed noise to measurements.
#[derive(Debug, Clone)]
pub struct SensorNoise {
    distribution: Normal<f64>,
    rng: StdRng,
}

impl SensorNoise {
    /// Noise with the given mean and standard deviation.
    ///
    /// A `seed` makes the sequence reproducible; `None` seeds from the OS.
    /// The deviation must be finite and not negative.
    pub fn new(mean: f64, std_dev: f64, seed: Option<u64>) -> Result<Self, Error> {
        if !(std_dev.is_finite() && std_dev >= 0.0) {
            warn!("rejected sensor noise configuration: std_dev {}", std_dev);
            return Err(Error::InvalidConfig("std_dev must not be negative"));
        }
        let distribution = Normal::new(mean, std_dev)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(SensorNoise { distribution, rng })
    }

    /// Zero-mean noise with the given standard deviation.
    pub fn with_std_dev(std_dev: f64, seed: Option<u64>) -> Result<Self, Error> {
        Self::new(0.0, std_dev, seed)
    }

    /// Returns `data` plus one noise sample.
    pub fn add_noise(&mut self, data: f64) -> f64 {
        data + self.distribution.sample(&mut self.rng)
    }

    /// Returns `data` plus an independent sample per component.
    pub fn add_noise_vector(&mut self, data: &Vector3<f64>) -> Vector3<f64> {
        data.map(|v| self.add_noise(v))
    }

    /// Mean of the distribution.
    pub fn mean(&self) -> f64 {
        self.distribution.mean()
    }

    /// Standard deviation of the distribution.
    pub fn std_dev(&self) -> f64 {
        self.distribution.std_dev()
    }
}
