//! Tracks a bright square drifting across a dark synthetic scene.
//!
//! `RUST_LOG=condtrack=debug cargo run --example synthetic` shows the
//! per-frame filter state as well.

use condtrack::{
    CondensationTracker, Error, Estimate, EstimateConsumer, Image, ImageSupplier, NoReacquisition,
    Sample, TemplateConfig, TemplateModel, TrackerConfig,
};
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;
const HALF: f32 = 6.0;

struct Scene {
    frame: usize,
}

impl Scene {
    fn center(frame: usize) -> (f32, f32) {
        let t = frame as f32;

        (30.0 + 1.5 * t, 60.0 + 20.0 * (t / 15.0).sin())
    }
}

impl ImageSupplier for Scene {
    fn next_image(&mut self) -> Result<Image, Error> {
        let frame = self.frame;
        self.frame += 1;

        // every 25th frame goes missing
        if frame > 0 && frame % 25 == 0 {
            return Err(Error::FrameUnavailable(format!("frame {} dropped", frame)));
        }

        let (cx, cy) = Self::center(frame);

        Image::gray_from_fn(WIDTH, HEIGHT, move |x, y| {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);

            if (px - cx).abs() < HALF && (py - cy).abs() < HALF {
                230
            } else {
                20
            }
        })
    }
}

struct Report;

impl EstimateConsumer for Report {
    fn consume(&mut self, frame: usize, estimate: Option<&Estimate>) {
        let (tx, ty) = Scene::center(frame);

        match estimate {
            Some(est) => tracing::info!(
                frame,
                x = est.state.x,
                y = est.state.y,
                truth_x = tx,
                truth_y = ty,
                confidence = est.confidence,
                "estimate"
            ),
            None => tracing::info!(frame, "no estimate"),
        }
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = TrackerConfig {
        sample_count: 500,
        seed: 2024,
        ..Default::default()
    };
    let model = TemplateModel::new(TemplateConfig::default())?;
    let mut tracker = CondensationTracker::new(config, model)?;

    let (x, y) = Scene::center(0);
    tracker.initialize(Sample::new(x, y, 2.0 * HALF))?;

    tracker.run(80, &mut Scene { frame: 0 }, &mut NoReacquisition, &mut Report);

    if let Some(model) = tracker.terminate() {
        tracing::info!(updates = model.updates(), "model released");
    }

    Ok(())
}
