use rand::Rng;
use serde_derive::{Deserialize, Serialize};

use crate::sample::{Sample, SampleSet};

/// Low-variance resampling schemes. Both draw N samples with replacement
/// proportionally to weight and reset every weight to 1/N.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingScheme {
    /// One uniform offset shared by all N evenly spaced pointers.
    #[default]
    Systematic,

    /// One uniform offset per stratum.
    Stratified,
}

impl ResamplingScheme {
    pub fn resample<R: Rng + ?Sized>(&self, samples: &SampleSet, rng: &mut R) -> SampleSet {
        let n = samples.len();

        if n == 0 {
            return SampleSet::new(Vec::new());
        }

        let total = samples.total_weight();
        let step = total / n as f64;
        let uniform = 1.0 / n as f64;

        let shared = match self {
            ResamplingScheme::Systematic => rng.gen::<f64>(),
            ResamplingScheme::Stratified => 0.0,
        };

        let src = samples.as_slice();
        let mut out: Vec<Sample> = Vec::with_capacity(n);
        let mut idx = 0;
        let mut cumulative = src[0].weight;

        for i in 0..n {
            let offset = match self {
                ResamplingScheme::Systematic => shared,
                ResamplingScheme::Stratified => rng.gen::<f64>(),
            };

            let target = (i as f64 + offset) * step;

            // the last index absorbs rounding in the cumulative sum
            while target >= cumulative && idx + 1 < n {
                idx += 1;
                cumulative += src[idx].weight;
            }

            let mut s = src[idx];
            s.weight = uniform;
            out.push(s);
        }

        SampleSet::new(out)
    }
}
