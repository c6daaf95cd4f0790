use serde_derive::{Deserialize, Serialize};

use crate::sample::Sample;

/// An external detector hit: (x,y) of the center and (width,height) of the box.
///
/// Used to re-seed a lost tracker and as a trusted position for guided learning.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(rename = "p")]
    pub confidence: f32,
}

impl Detection {
    pub fn new(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence,
        }
    }
}

impl From<&Detection> for Sample {
    // the box height is the sample size, the aspect ratio is a tracker setting
    fn from(det: &Detection) -> Sample {
        Sample::new(det.x, det.y, det.h).with_weight(det.confidence as f64)
    }
}
