//! Policies deciding when and how a [`MeasurementModel`] adapts.
//!
//! A strategy only reads the sample population. It never sees the tracker
//! and has no way to change sample weights.

use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::image::Image;
use crate::model::MeasurementModel;
use crate::sample::{Sample, SampleSet};

pub trait LearningStrategy<M: MeasurementModel> {
    /// Called when no position of the object is known for this frame.
    fn update(&mut self, model: &mut M, image: &Image, samples: &SampleSet) -> Result<(), Error>;

    /// Called when a trusted position is known for this frame.
    fn update_with_position(
        &mut self,
        model: &mut M,
        image: &Image,
        samples: &SampleSet,
        position: &Sample,
    ) -> Result<(), Error>;
}

/// Never adapts the model. Positions from a detector are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLearning;

impl<M: MeasurementModel> LearningStrategy<M> for NoLearning {
    fn update(&mut self, _model: &mut M, _image: &Image, _samples: &SampleSet) -> Result<(), Error> {
        Ok(())
    }

    fn update_with_position(
        &mut self,
        _model: &mut M,
        _image: &Image,
        _samples: &SampleSet,
        _position: &Sample,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Self-training: always adapts from the sample population alone, even when a
/// position is supplied, as long as the population confidence reaches
/// `min_confidence`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfLearning {
    pub min_confidence: f32,
}

impl SelfLearning {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }
}

impl<M: MeasurementModel> LearningStrategy<M> for SelfLearning {
    fn update(&mut self, model: &mut M, image: &Image, samples: &SampleSet) -> Result<(), Error> {
        if samples.confidence() < self.min_confidence {
            return Ok(());
        }

        model.apply_unsupervised_update(samples, image)
    }

    fn update_with_position(
        &mut self,
        model: &mut M,
        image: &Image,
        samples: &SampleSet,
        _position: &Sample,
    ) -> Result<(), Error> {
        LearningStrategy::<M>::update(self, model, image, samples)
    }
}

/// Uses a supplied position as a guided update; without one it falls back to
/// an unsupervised update when the population confidence reaches
/// `min_confidence`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionDependentLearning {
    pub min_confidence: f32,
}

impl PositionDependentLearning {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }
}

impl<M: MeasurementModel> LearningStrategy<M> for PositionDependentLearning {
    fn update(&mut self, model: &mut M, image: &Image, samples: &SampleSet) -> Result<(), Error> {
        if samples.confidence() < self.min_confidence {
            return Ok(());
        }

        model.apply_unsupervised_update(samples, image)
    }

    fn update_with_position(
        &mut self,
        model: &mut M,
        image: &Image,
        samples: &SampleSet,
        position: &Sample,
    ) -> Result<(), Error> {
        model.apply_guided_update(samples, image, position)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LearningKind {
    None,
    SelfLearning,
    #[default]
    PositionDependent,
}

impl LearningKind {
    pub fn build<M: MeasurementModel + 'static>(
        self,
        min_confidence: f32,
    ) -> Box<dyn LearningStrategy<M>> {
        match self {
            LearningKind::None => Box::new(NoLearning),
            LearningKind::SelfLearning => Box::new(SelfLearning::new(min_confidence)),
            LearningKind::PositionDependent => {
                Box::new(PositionDependentLearning::new(min_confidence))
            }
        }
    }
}
