use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;
use crate::image::Image;
use crate::math::{gauss, mean_squared_difference};
use crate::model::{extract_patch, mean_patch, MeasurementModel};
use crate::sample::{Sample, SampleSet};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TemplateConfig {
    /// Side of the square intensity grid every region is resampled to.
    pub patch_size: usize,

    /// Kernel width on the root mean squared intensity difference.
    pub sigma: f32,

    /// Blend factor of new exemplars into the templates, in (0, 1].
    pub learning_rate: f32,

    /// Highest-weighted samples used as positives by unsupervised updates.
    pub positive_count: usize,

    /// Lowest-weighted samples used as negatives.
    pub negative_count: usize,

    /// Negatives may overlap the positive region up to this IoU.
    pub max_negative_overlap: f32,

    pub aspect_ratio: f32,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            patch_size: 8,
            sigma: 0.2,
            learning_rate: 0.5,
            positive_count: 10,
            negative_count: 10,
            max_negative_overlap: 0.1,
            aspect_ratio: 1.0,
        }
    }
}

/// Appearance model with an object template and a background template.
///
/// `score = g(d_pos) * (1 - max(0, g(d_neg) - g(d_pos)))` where `d` is the
/// RMS intensity difference of the sample patch to a template and `g` a
/// gaussian kernel. The background template only lowers the score of patches
/// it matches better than the object template, so a guided update always
/// raises the score at the learned position. The object template starts as
/// flat mid gray; there is no background template until negatives were seen.
#[derive(Debug, Clone)]
pub struct TemplateModel {
    config: TemplateConfig,
    positive: Array2<f32>,
    negative: Option<Array2<f32>>,
    updates: usize,
}

impl TemplateModel {
    pub fn new(config: TemplateConfig) -> Result<Self, Error> {
        if config.patch_size == 0 {
            return Err(Error::InvalidConfiguration("template.patch_size must be positive".into()));
        }

        if !(config.sigma.is_finite() && config.sigma > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "template.sigma must be positive, got {}",
                config.sigma
            )));
        }

        if !(config.learning_rate > 0.0 && config.learning_rate <= 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "template.learning_rate must be in (0, 1], got {}",
                config.learning_rate
            )));
        }

        if !(config.aspect_ratio.is_finite() && config.aspect_ratio > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "template.aspect_ratio must be positive, got {}",
                config.aspect_ratio
            )));
        }

        let positive = Array2::from_elem((config.patch_size, config.patch_size), 0.5);

        Ok(Self {
            config,
            positive,
            negative: None,
            updates: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    #[inline]
    pub fn positive_template(&self) -> &Array2<f32> {
        &self.positive
    }

    #[inline]
    pub fn negative_template(&self) -> Option<&Array2<f32>> {
        self.negative.as_ref()
    }

    /// Number of successful updates so far.
    #[inline]
    pub fn updates(&self) -> usize {
        self.updates
    }

    #[inline]
    fn region(&self, sample: &Sample) -> BBox<Ltrb> {
        sample.bbox(self.config.aspect_ratio).as_ltrb()
    }

    fn patch(&self, sample: &Sample, image: &Image) -> Option<Array2<f32>> {
        extract_patch(image, &self.region(sample), self.config.patch_size)
    }

    #[inline]
    fn distance(&self, template: &Array2<f32>, patch: &Array2<f32>) -> f32 {
        mean_squared_difference(template.view(), patch.view()).sqrt()
    }

    fn similarity(&self, template: &Array2<f32>, patch: &Array2<f32>) -> f32 {
        gauss(self.distance(template, patch), self.config.sigma)
    }

    fn blend(&self, template: &Array2<f32>, exemplar: &Array2<f32>) -> Array2<f32> {
        let rate = self.config.learning_rate;

        template * (1.0 - rate) + exemplar * rate
    }

    /// Patches of the lowest-weighted samples that stay clear of `region` and
    /// do not look like `exemplar`.
    fn negatives(
        &self,
        samples: &SampleSet,
        image: &Image,
        region: &BBox<Ltrb>,
        exemplar: &Array2<f32>,
    ) -> Vec<Array2<f32>> {
        samples
            .ranked()
            .into_iter()
            .rev()
            .map(|i| &samples[i])
            .filter(|s| self.region(s).iou(region) <= self.config.max_negative_overlap)
            .filter_map(|s| self.patch(s, image))
            .filter(|p| self.distance(p, exemplar) > self.config.sigma)
            .take(self.config.negative_count)
            .collect()
    }

    // builds both templates before touching `self`
    fn commit(&mut self, exemplar: &Array2<f32>, negatives: &[Array2<f32>]) {
        let positive = self.blend(&self.positive, exemplar);
        let negative = match (mean_patch(negatives), &self.negative) {
            (Some(background), Some(current)) => Some(self.blend(current, &background)),
            (Some(background), None) => Some(background),
            (None, current) => current.clone(),
        };

        // the background may never explain the learned exemplar better than
        // the object template does
        let negative = negative
            .filter(|n| self.distance(n, exemplar) > self.distance(&positive, exemplar));

        self.positive = positive;
        self.negative = negative;
        self.updates += 1;
    }
}

impl MeasurementModel for TemplateModel {
    fn score(&self, sample: &Sample, image: &Image) -> f64 {
        let patch = match self.patch(sample, image) {
            Some(patch) => patch,
            None => return 0.0,
        };

        let object = self.similarity(&self.positive, &patch);
        let background = match &self.negative {
            Some(negative) => self.similarity(negative, &patch),
            None => 0.0,
        };

        // background only counts where it matches better than the object
        (object * (1.0 - (background - object).max(0.0))) as f64
    }

    fn apply_unsupervised_update(
        &mut self,
        samples: &SampleSet,
        image: &Image,
    ) -> Result<(), Error> {
        let ranked = samples.ranked();
        let best = ranked
            .first()
            .map(|&i| &samples[i])
            .filter(|s| s.weight > 0.0)
            .ok_or_else(|| Error::ModelUpdateFailure("no sample carries weight".into()))?;

        let positives: Vec<_> = ranked
            .iter()
            .map(|&i| &samples[i])
            .take_while(|s| s.weight > 0.0)
            .filter_map(|s| self.patch(s, image))
            .take(self.config.positive_count)
            .collect();

        let positive = mean_patch(&positives).ok_or_else(|| {
            Error::ModelUpdateFailure("no positive exemplar lies inside the image".into())
        })?;

        let negatives = self.negatives(samples, image, &self.region(best), &positive);

        self.commit(&positive, &negatives);

        Ok(())
    }

    fn apply_guided_update(
        &mut self,
        samples: &SampleSet,
        image: &Image,
        position: &Sample,
    ) -> Result<(), Error> {
        let positive = self.patch(position, image).ok_or_else(|| {
            Error::ModelUpdateFailure(format!(
                "known position ({}, {}) lies outside the image",
                position.x, position.y
            ))
        })?;

        let negatives = self.negatives(samples, image, &self.region(position), &positive);

        self.commit(&positive, &negatives);

        Ok(())
    }
}
