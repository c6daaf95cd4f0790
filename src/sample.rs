use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Xyah};
use crate::error::Error;

/// One weighted hypothesis about the object state.
///
/// `(x, y)` is the center in image coordinates, `size` the box height and
/// `(vx, vy)` the velocity in pixels per frame. `weight` is undefined between
/// prediction and measurement.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub vx: f32,
    pub vy: f32,
    pub weight: f64,

    // number of predictions this hypothesis went through
    #[serde(default)]
    pub generation: u32,
}

impl Sample {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            x,
            y,
            size,
            vx: 0.0,
            vy: 0.0,
            weight: 0.0,
            generation: 0,
        }
    }

    #[inline]
    pub fn with_velocity(mut self, vx: f32, vy: f32) -> Self {
        self.vx = vx;
        self.vy = vy;
        self
    }

    #[inline]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    #[inline]
    pub fn position(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }

    /// `[x, y, size, vx, vy]`
    #[inline]
    pub fn state(&self) -> na::Vector5<f32> {
        na::Vector5::new(self.x, self.y, self.size, self.vx, self.vy)
    }

    pub fn from_state(state: &na::Vector5<f32>, weight: f64) -> Self {
        Self {
            x: state[0],
            y: state[1],
            size: state[2],
            vx: state[3],
            vy: state[4],
            weight,
            generation: 0,
        }
    }

    #[inline]
    pub fn bbox(&self, aspect_ratio: f32) -> BBox<Xyah> {
        BBox::xyah(self.x, self.y, aspect_ratio, self.size)
    }
}

/// The population of hypotheses. Its size never changes once created.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Takes the samples and gives every one of them the weight 1/N.
    pub fn uniform(mut samples: Vec<Sample>) -> Self {
        let w = 1.0 / samples.len().max(1) as f64;
        samples.iter_mut().for_each(|s| s.weight = w);

        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.samples.iter().map(|s| s.weight).sum()
    }

    /// Rescales the weights so that they sum to one.
    pub fn normalize(&mut self) -> Result<(), Error> {
        let total = self.total_weight();

        if !total.is_finite() || total <= 0.0 {
            return Err(Error::DegenerateDistribution);
        }

        self.samples.iter_mut().for_each(|s| s.weight /= total);

        Ok(())
    }

    /// Weighted average of the sample states. Weights are expected to be
    /// normalized; the result is divided by their sum regardless.
    pub fn weighted_mean(&self) -> Result<Sample, Error> {
        let total = self.total_weight();

        if !total.is_finite() || total <= 0.0 {
            return Err(Error::DegenerateDistribution);
        }

        let mut mean = [0.0f64; 5];
        for s in &self.samples {
            let state = s.state();
            for (m, v) in mean.iter_mut().zip(state.iter()) {
                *m += *v as f64 * s.weight;
            }
        }

        let state = na::Vector5::from_iterator(mean.iter().map(|m| (m / total) as f32));

        Ok(Sample::from_state(&state, 1.0))
    }

    /// `1 / Σ w²` of the normalized weights, 0 for an all-zero population.
    pub fn effective_sample_size(&self) -> f64 {
        let sq: f64 = self.samples.iter().map(|s| s.weight * s.weight).sum();

        if sq > 0.0 {
            1.0 / sq
        } else {
            0.0
        }
    }

    /// Effective sample size scaled to [0, 1].
    pub fn confidence(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }

        (self.effective_sample_size() / self.samples.len() as f64).clamp(0.0, 1.0) as f32
    }

    /// Indices ordered by descending weight; ties keep population order.
    pub fn ranked(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.samples.len()).collect();
        idx.sort_by(|&a, &b| {
            self.samples[b]
                .weight
                .partial_cmp(&self.samples[a].weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        idx
    }
}

impl std::ops::Index<usize> for SampleSet {
    type Output = Sample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
