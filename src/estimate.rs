use nalgebra as na;

use crate::bbox::{BBox, Xyah};
use crate::sample::Sample;

/// The per-frame tracker output.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub frame: usize,

    /// Weighted mean of the measured population.
    pub state: Sample,
    pub bbox: BBox<Xyah>,

    /// Effective sample size over N, in [0, 1].
    pub confidence: f32,
    pub effective_sample_size: f64,
}

impl Estimate {
    #[inline]
    pub fn position(&self) -> na::Point2<f32> {
        self.state.position()
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.state.size
    }
}
