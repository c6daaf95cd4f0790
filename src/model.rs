use ndarray::Array2;

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;
use crate::image::Image;
use crate::sample::{Sample, SampleSet};

/// Scores hypotheses against image evidence and owns whatever appearance
/// representation it needs for that.
///
/// `score` is pure. The two update methods are the only mutators and must be
/// atomic: on error the model is left exactly as it was.
pub trait MeasurementModel: Sync {
    /// Unnormalized likelihood of `sample` in `image`, 0 meaning no evidence.
    fn score(&self, sample: &Sample, image: &Image) -> f64;

    /// Adapts the model using only the scored population as evidence.
    fn apply_unsupervised_update(&mut self, samples: &SampleSet, image: &Image)
        -> Result<(), Error>;

    /// Adapts the model using a trusted object position.
    fn apply_guided_update(
        &mut self,
        samples: &SampleSet,
        image: &Image,
        position: &Sample,
    ) -> Result<(), Error>;
}

/// Resamples the region under `bbox` to a `size`×`size` grid of intensities.
///
/// Returns `None` when the region is empty or lies completely outside the
/// image. Partially visible regions repeat the border pixels.
pub fn extract_patch(image: &Image, bbox: &BBox<Ltrb>, size: usize) -> Option<Array2<f32>> {
    let (w, h) = (image.width() as f32, image.height() as f32);

    if size == 0
        || bbox.is_empty()
        || bbox.right() <= 0.0
        || bbox.bottom() <= 0.0
        || bbox.left() >= w
        || bbox.top() >= h
    {
        return None;
    }

    let sx = bbox.width() / size as f32;
    let sy = bbox.height() / size as f32;

    Some(Array2::from_shape_fn((size, size), |(r, c)| {
        let px = (bbox.left() + (c as f32 + 0.5) * sx).clamp(0.0, w - 1.0);
        let py = (bbox.top() + (r as f32 + 0.5) * sy).clamp(0.0, h - 1.0);

        image.intensity(px as usize, py as usize)
    }))
}

/// Element-wise mean of equally shaped patches, `None` for an empty list.
pub fn mean_patch(patches: &[Array2<f32>]) -> Option<Array2<f32>> {
    let (first, rest) = patches.split_first()?;
    let mut sum = first.clone();

    for p in rest {
        sum += p;
    }

    Some(sum / patches.len() as f32)
}
