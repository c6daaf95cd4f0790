use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::sample::Sample;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Standard deviation of the position random walk, in px.
    pub position_sigma: f32,

    /// Standard deviation of the log-scale random walk.
    pub size_sigma: f32,

    /// Standard deviation of the velocity random walk, in px per frame.
    pub velocity_sigma: f32,

    pub use_velocity: bool,

    /// Factor in [0, 1] applied to the velocity every frame.
    pub velocity_damping: f32,

    pub min_size: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            position_sigma: 4.0,
            size_sigma: 0.05,
            velocity_sigma: 1.0,
            use_velocity: false,
            velocity_damping: 0.9,
            min_size: 4.0,
        }
    }
}

impl MotionConfig {
    pub fn still() -> Self {
        Self {
            position_sigma: 0.0,
            size_sigma: 0.0,
            velocity_sigma: 0.0,
            use_velocity: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("position_sigma", self.position_sigma),
            ("size_sigma", self.size_sigma),
            ("velocity_sigma", self.velocity_sigma),
            ("min_size", self.min_size),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "motion.{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.velocity_damping) {
            return Err(Error::InvalidConfiguration(format!(
                "motion.velocity_damping must be in [0, 1], got {}",
                self.velocity_damping
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MotionModel {
    config: MotionConfig,
}

impl MotionModel {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// A hypothesis around `seed` for the initial population.
    pub fn scatter<R: Rng + ?Sized>(&self, seed: &Sample, rng: &mut R) -> Sample {
        let mut s = Sample::new(seed.x, seed.y, seed.size).with_velocity(seed.vx, seed.vy);

        self.diffuse(&mut s, rng);

        s
    }

    /// Advances one hypothesis by a frame. The weight is reset until measured.
    pub fn predict<R: Rng + ?Sized>(&self, sample: &Sample, rng: &mut R) -> Sample {
        let mut s = *sample;

        if self.config.use_velocity {
            s.x += s.vx;
            s.y += s.vy;
            s.vx = s.vx * self.config.velocity_damping + jitter(rng, self.config.velocity_sigma);
            s.vy = s.vy * self.config.velocity_damping + jitter(rng, self.config.velocity_sigma);
        }

        self.diffuse(&mut s, rng);

        s.weight = 0.0;
        s.generation = s.generation.wrapping_add(1);

        s
    }

    fn diffuse<R: Rng + ?Sized>(&self, s: &mut Sample, rng: &mut R) {
        s.x += jitter(rng, self.config.position_sigma);
        s.y += jitter(rng, self.config.position_sigma);

        if self.config.size_sigma > 0.0 {
            s.size *= jitter(rng, self.config.size_sigma).exp();
        }

        s.size = s.size.max(self.config.min_size);
    }
}

// zero sigma consumes no randomness
#[inline]
fn jitter<R: Rng + ?Sized>(rng: &mut R, sigma: f32) -> f32 {
    if sigma > 0.0 {
        let n: f32 = StandardNormal.sample(rng);
        n * sigma
    } else {
        0.0
    }
}
