use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::learning::LearningKind;
use crate::motion::MotionConfig;
use crate::resampler::ResamplingScheme;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of samples N, fixed for the lifetime of the tracker.
    pub sample_count: usize,

    pub motion: MotionConfig,

    /// Effective sample size under which a frame counts as low confidence.
    pub min_effective_sample_size: f64,

    /// Consecutive low confidence frames before the object is declared lost.
    pub low_confidence_frames: usize,

    /// Consecutive missing frames before the object is declared lost.
    pub max_unavailable_frames: usize,

    pub learning: LearningKind,

    /// Confidence in [0, 1] required for unsupervised learning.
    pub min_learning_confidence: f32,

    pub resampling: ResamplingScheme,

    /// Width over height of the tracked box.
    pub aspect_ratio: f32,

    pub parallel_measurement: bool,

    pub seed: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sample_count: 400,
            motion: MotionConfig::default(),
            min_effective_sample_size: 2.0,
            low_confidence_frames: 5,
            max_unavailable_frames: 3,
            learning: LearningKind::default(),
            min_learning_confidence: 0.1,
            resampling: ResamplingScheme::default(),
            aspect_ratio: 1.0,
            parallel_measurement: true,
            seed: 0,
        }
    }
}

impl TrackerConfig {
    pub fn new(sample_count: usize, seed: u64) -> Self {
        Self {
            sample_count,
            seed,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_count == 0 {
            return Err(Error::InvalidConfiguration(
                "sample_count must be positive".into(),
            ));
        }

        self.motion.validate()?;

        if !self.min_effective_sample_size.is_finite() || self.min_effective_sample_size < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "min_effective_sample_size must be finite and non-negative, got {}",
                self.min_effective_sample_size
            )));
        }

        if self.low_confidence_frames == 0 {
            return Err(Error::InvalidConfiguration(
                "low_confidence_frames must be positive".into(),
            ));
        }

        if self.max_unavailable_frames == 0 {
            return Err(Error::InvalidConfiguration(
                "max_unavailable_frames must be positive".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.min_learning_confidence) {
            return Err(Error::InvalidConfiguration(format!(
                "min_learning_confidence must be in [0, 1], got {}",
                self.min_learning_confidence
            )));
        }

        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "aspect_ratio must be positive, got {}",
                self.aspect_ratio
            )));
        }

        Ok(())
    }
}
