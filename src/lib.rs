pub mod bbox;
pub mod config;
pub mod detection;
pub mod error;
pub mod estimate;
pub mod image;
pub mod learning;
pub mod math;
pub mod model;
pub mod motion;
pub mod resampler;
pub mod sample;
pub mod template;
pub mod tracker;

pub use config::TrackerConfig;
pub use detection::Detection;
pub use error::Error;
pub use estimate::Estimate;
pub use image::Image;
pub use learning::{LearningKind, LearningStrategy};
pub use model::MeasurementModel;
pub use sample::{Sample, SampleSet};
pub use template::{TemplateConfig, TemplateModel};
pub use tracker::{CondensationTracker, TrackerState};

/// Source of frames. An `Err` marks the frame as unavailable.
pub trait ImageSupplier {
    fn next_image(&mut self) -> Result<Image, Error>;
}

/// External detector consulted on every frame. A hit re-seeds a lost tracker
/// and guides learning while tracking.
pub trait Reacquisition {
    fn reacquire(&mut self, image: &Image) -> Option<Detection>;
}

pub trait EstimateConsumer {
    fn consume(&mut self, frame: usize, estimate: Option<&Estimate>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoReacquisition;

impl Reacquisition for NoReacquisition {
    #[inline]
    fn reacquire(&mut self, _image: &Image) -> Option<Detection> {
        None
    }
}

impl EstimateConsumer for Vec<Option<Estimate>> {
    fn consume(&mut self, _frame: usize, estimate: Option<&Estimate>) {
        self.push(estimate.cloned());
    }
}
