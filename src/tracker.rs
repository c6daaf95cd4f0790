use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::estimate::Estimate;
use crate::image::Image;
use crate::learning::LearningStrategy;
use crate::model::MeasurementModel;
use crate::motion::MotionModel;
use crate::sample::{Sample, SampleSet};
use crate::{EstimateConsumer, ImageSupplier, Reacquisition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    Initialized,
    Tracking,
    Lost,
    Terminated,
}

/// Particle filter following a single object through a frame sequence.
///
/// Every processed frame runs predict, measure, estimate, learn and resample
/// in this order. Resampling happens unconditionally each frame.
pub struct CondensationTracker<M: MeasurementModel> {
    config: TrackerConfig,
    state: TrackerState,
    motion: MotionModel,
    model: Option<M>,
    strategy: Box<dyn LearningStrategy<M>>,
    samples: Option<SampleSet>,
    rng: ChaCha8Rng,

    // trusted position for the first frame after (re)initialization
    seed_position: Option<Sample>,

    frame: usize,
    low_confidence_streak: usize,
    unavailable_streak: usize,
}

impl<M: MeasurementModel + Clone + 'static> CondensationTracker<M> {
    /// Builds the learning strategy selected by `config.learning`.
    pub fn new(config: TrackerConfig, model: M) -> Result<Self, Error> {
        let strategy = config.learning.build(config.min_learning_confidence);

        Self::with_strategy(config, model, strategy)
    }

    pub fn with_strategy(
        config: TrackerConfig,
        model: M,
        strategy: Box<dyn LearningStrategy<M>>,
    ) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            motion: MotionModel::new(config.motion.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            state: TrackerState::Uninitialized,
            model: Some(model),
            strategy,
            samples: None,
            seed_position: None,
            frame: 0,
            low_confidence_streak: 0,
            unavailable_streak: 0,
        })
    }

    #[inline]
    pub fn state(&self) -> TrackerState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The population left by the last resample, `None` before initialization
    /// and after termination.
    #[inline]
    pub fn samples(&self) -> Option<&SampleSet> {
        self.samples.as_ref()
    }

    #[inline]
    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    /// Index the next frame will get.
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame
    }

    /// Scatters N hypotheses around `seed` with uniform weights.
    pub fn initialize(&mut self, seed: Sample) -> Result<(), Error> {
        if self.state == TrackerState::Terminated {
            return Err(Error::Terminated);
        }

        let samples = (0..self.config.sample_count)
            .map(|_| self.motion.scatter(&seed, &mut self.rng))
            .collect();

        self.samples = Some(SampleSet::uniform(samples));
        self.seed_position = Some(seed);
        self.low_confidence_streak = 0;
        self.unavailable_streak = 0;

        info!(x = seed.x, y = seed.y, size = seed.size, "tracker seeded");
        self.transition(TrackerState::Initialized);

        Ok(())
    }

    /// Processes one image. `position` is an optional trusted object position
    /// (e.g. a detector hit): it re-seeds an uninitialized or lost tracker and
    /// is handed to the learning strategy otherwise.
    pub fn process(&mut self, image: &Image, position: Option<&Sample>) -> Option<Estimate> {
        let frame = self.frame;
        self.frame += 1;

        match self.state {
            TrackerState::Terminated => {
                warn!(frame, "frame ignored, tracker is terminated");
                return None;
            }
            TrackerState::Uninitialized | TrackerState::Lost => {
                self.initialize(*position?).ok()?;
            }
            TrackerState::Initialized | TrackerState::Tracking => {}
        }

        self.unavailable_streak = 0;

        let seeded = self.seed_position.take();
        let trusted = position.copied().or(seeded);

        match self.advance(frame, image, trusted.as_ref()) {
            Ok(Some(estimate)) => {
                self.transition(TrackerState::Tracking);
                Some(estimate)
            }
            Ok(None) => {
                self.lose(frame, "effective sample size stayed below the floor");
                None
            }
            Err(err) => {
                self.lose(frame, &err.to_string());
                None
            }
        }
    }

    /// Records that the image supplier failed for this frame. The population is
    /// held as is; enough consecutive failures declare the object lost.
    pub fn frame_unavailable(&mut self) -> Option<Estimate> {
        let frame = self.frame;
        self.frame += 1;

        if matches!(
            self.state,
            TrackerState::Initialized | TrackerState::Tracking
        ) {
            self.unavailable_streak += 1;
            debug!(frame, streak = self.unavailable_streak, "frame unavailable");

            if self.unavailable_streak >= self.config.max_unavailable_frames {
                self.lose(frame, "too many consecutive frames unavailable");
            }
        }

        None
    }

    /// Pulls one image, asks `reacquisition` for a position and processes it.
    pub fn step<S, R>(&mut self, supplier: &mut S, reacquisition: &mut R) -> Option<Estimate>
    where
        S: ImageSupplier + ?Sized,
        R: Reacquisition + ?Sized,
    {
        match supplier.next_image() {
            Ok(image) => {
                let hint = reacquisition.reacquire(&image).map(|det| Sample::from(&det));

                self.process(&image, hint.as_ref())
            }
            Err(err) => {
                debug!(%err, "image supplier failed");
                self.frame_unavailable()
            }
        }
    }

    /// Runs `frames` steps, handing every outcome to `consumer`. Stops early
    /// once terminated.
    pub fn run<S, R, C>(&mut self, frames: usize, supplier: &mut S, reacquisition: &mut R, consumer: &mut C)
    where
        S: ImageSupplier + ?Sized,
        R: Reacquisition + ?Sized,
        C: EstimateConsumer + ?Sized,
    {
        for _ in 0..frames {
            if self.state == TrackerState::Terminated {
                break;
            }

            let frame = self.frame;
            let estimate = self.step(supplier, reacquisition);

            consumer.consume(frame, estimate.as_ref());
        }
    }

    /// Stops tracking and hands the measurement model back.
    pub fn terminate(&mut self) -> Option<M> {
        self.samples = None;
        self.seed_position = None;
        self.transition(TrackerState::Terminated);

        self.model.take()
    }

    fn advance(
        &mut self,
        frame: usize,
        image: &Image,
        trusted: Option<&Sample>,
    ) -> Result<Option<Estimate>, Error> {
        let model = self.model.as_mut().ok_or(Error::Terminated)?;
        let prior = self.samples.as_ref().ok_or(Error::Terminated)?;

        // Predict
        let mut samples = SampleSet::new(
            prior
                .iter()
                .map(|s| self.motion.predict(s, &mut self.rng))
                .collect(),
        );

        // Measure
        {
            let model: &M = model;

            if self.config.parallel_measurement {
                samples
                    .as_mut_slice()
                    .par_iter_mut()
                    .for_each(|s| s.weight = measure(model, s, image));
            } else {
                samples
                    .as_mut_slice()
                    .iter_mut()
                    .for_each(|s| s.weight = measure(model, s, image));
            }
        }

        samples.normalize()?;

        // Estimate
        let mean = samples.weighted_mean()?;
        let effective_sample_size = samples.effective_sample_size();
        let estimate = Estimate {
            frame,
            state: mean,
            bbox: mean.bbox(self.config.aspect_ratio),
            confidence: samples.confidence(),
            effective_sample_size,
        };

        debug!(
            frame,
            x = mean.x,
            y = mean.y,
            size = mean.size,
            ess = effective_sample_size,
            "frame measured"
        );

        if effective_sample_size < self.config.min_effective_sample_size {
            self.low_confidence_streak += 1;
        } else {
            self.low_confidence_streak = 0;
        }

        if self.low_confidence_streak >= self.config.low_confidence_frames {
            self.samples = Some(samples);
            return Ok(None);
        }

        // Learn
        let backup = model.clone();
        let learned = match trusted {
            Some(position) => self
                .strategy
                .update_with_position(model, image, &samples, position),
            None => self.strategy.update(model, image, &samples),
        };

        if let Err(err) = learned {
            warn!(frame, %err, "model update failed, keeping previous model");
            *model = backup;
        }

        // Resample
        self.samples = Some(self.config.resampling.resample(&samples, &mut self.rng));

        Ok(Some(estimate))
    }

    fn lose(&mut self, frame: usize, reason: &str) {
        info!(frame, reason, "object lost");

        self.low_confidence_streak = 0;
        self.unavailable_streak = 0;
        self.seed_position = None;
        self.transition(TrackerState::Lost);
    }

    fn transition(&mut self, next: TrackerState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "tracker state changed");
            self.state = next;
        }
    }
}

// negative scores count as no evidence, non-finite ones poison the frame
#[inline]
fn measure<M: MeasurementModel + ?Sized>(model: &M, sample: &Sample, image: &Image) -> f64 {
    let w = model.score(sample, image);

    if w < 0.0 {
        0.0
    } else {
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::{LearningKind, NoLearning, PositionDependentLearning};
    use crate::motion::MotionConfig;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    /// Scores 1 exactly at `(cx, cy)` and 0 elsewhere.
    #[derive(Debug, Clone)]
    struct PointModel {
        cx: f32,
        cy: f32,
    }

    impl MeasurementModel for PointModel {
        fn score(&self, sample: &Sample, _image: &Image) -> f64 {
            if sample.x == self.cx && sample.y == self.cy {
                1.0
            } else {
                0.0
            }
        }

        fn apply_unsupervised_update(&mut self, _: &SampleSet, _: &Image) -> Result<(), Error> {
            Ok(())
        }

        fn apply_guided_update(&mut self, _: &SampleSet, _: &Image, p: &Sample) -> Result<(), Error> {
            self.cx = p.x;
            self.cy = p.y;
            Ok(())
        }
    }

    /// Gaussian blob around a fixed center; learning corrupts it and fails.
    #[derive(Debug, Clone, PartialEq)]
    struct BlobModel {
        cx: f32,
        cy: f32,
        guided: usize,
        unsupervised: usize,
        broken: bool,
    }

    impl BlobModel {
        fn at(cx: f32, cy: f32) -> Self {
            Self {
                cx,
                cy,
                guided: 0,
                unsupervised: 0,
                broken: false,
            }
        }
    }

    impl MeasurementModel for BlobModel {
        fn score(&self, sample: &Sample, _image: &Image) -> f64 {
            let d = ((sample.x - self.cx).powi(2) + (sample.y - self.cy).powi(2)).sqrt();

            crate::math::gauss(d as f64, 5.0)
        }

        fn apply_unsupervised_update(&mut self, _: &SampleSet, _: &Image) -> Result<(), Error> {
            self.unsupervised += 1;

            if self.broken {
                self.cx = f32::NAN;
                return Err(Error::ModelUpdateFailure("broken".into()));
            }

            Ok(())
        }

        fn apply_guided_update(&mut self, _: &SampleSet, _: &Image, _: &Sample) -> Result<(), Error> {
            self.guided += 1;
            Ok(())
        }
    }

    fn still_config(n: usize) -> TrackerConfig {
        TrackerConfig {
            sample_count: n,
            motion: MotionConfig::still(),
            parallel_measurement: false,
            seed: 1,
            ..Default::default()
        }
    }

    fn blank() -> Image {
        Image::gray_from_fn(100, 100, |_, _| 0).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let model = PointModel { cx: 0.0, cy: 0.0 };

        assert!(matches!(
            CondensationTracker::new(still_config(0), model.clone()),
            Err(Error::InvalidConfiguration(_))
        ));

        let mut config = still_config(10);
        config.motion.position_sigma = -2.0;
        assert!(matches!(
            CondensationTracker::new(config, model),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn point_target_single_frame() {
        let mut tracker =
            CondensationTracker::with_strategy(still_config(100), PointModel { cx: 50.0, cy: 50.0 }, Box::new(NoLearning))
                .unwrap();

        tracker.initialize(Sample::new(50.0, 50.0, 10.0)).unwrap();
        assert_eq!(tracker.state(), TrackerState::Initialized);

        let est = tracker.process(&blank(), None).unwrap();

        assert_abs_diff_eq!(est.state.x, 50.0, epsilon = 1e-4);
        assert_abs_diff_eq!(est.state.y, 50.0, epsilon = 1e-4);
        assert_relative_eq!(est.confidence, 1.0, epsilon = 1e-6);
        assert_eq!(tracker.state(), TrackerState::Tracking);

        let samples = tracker.samples().unwrap();
        assert_eq!(samples.len(), 100);
        assert!(samples.iter().all(|s| s.weight == 0.01));
    }

    #[test]
    fn uninitialized_waits_for_position() {
        let mut tracker = CondensationTracker::new(still_config(20), PointModel { cx: 5.0, cy: 5.0 }).unwrap();

        assert!(tracker.process(&blank(), None).is_none());
        assert_eq!(tracker.state(), TrackerState::Uninitialized);

        let est = tracker.process(&blank(), Some(&Sample::new(5.0, 5.0, 4.0)));
        assert!(est.is_some());
        assert_eq!(tracker.state(), TrackerState::Tracking);
    }

    #[test]
    fn unavailable_frames_escalate_to_lost() {
        let mut config = still_config(10);
        config.max_unavailable_frames = 3;
        let mut tracker = CondensationTracker::new(config, BlobModel::at(50.0, 50.0)).unwrap();
        tracker.initialize(Sample::new(50.0, 50.0, 10.0)).unwrap();

        let before = tracker.samples().cloned();
        assert!(tracker.frame_unavailable().is_none());
        assert!(tracker.frame_unavailable().is_none());
        assert_eq!(tracker.state(), TrackerState::Initialized);
        assert_eq!(tracker.samples().cloned(), before);

        assert!(tracker.frame_unavailable().is_none());
        assert_eq!(tracker.state(), TrackerState::Lost);
        assert_eq!(tracker.frame_index(), 3);
    }

    #[test]
    fn processed_frame_resets_unavailable_streak() {
        let mut config = still_config(10);
        config.max_unavailable_frames = 2;
        let mut tracker = CondensationTracker::new(config, BlobModel::at(50.0, 50.0)).unwrap();
        tracker.initialize(Sample::new(50.0, 50.0, 10.0)).unwrap();

        tracker.frame_unavailable();
        assert!(tracker.process(&blank(), None).is_some());
        tracker.frame_unavailable();

        assert_eq!(tracker.state(), TrackerState::Tracking);
    }

    #[test]
    fn degenerate_frame_loses_until_reseeded() {
        let mut tracker = CondensationTracker::new(still_config(30), PointModel { cx: 50.0, cy: 50.0 }).unwrap();
        tracker.initialize(Sample::new(20.0, 20.0, 10.0)).unwrap();

        // the seed learning step cannot run: the frame is degenerate before it
        assert!(tracker.process(&blank(), None).is_none());
        assert_eq!(tracker.state(), TrackerState::Lost);

        assert!(tracker.process(&blank(), None).is_none());
        assert_eq!(tracker.state(), TrackerState::Lost);

        let est = tracker
            .process(&blank(), Some(&Sample::new(50.0, 50.0, 10.0)))
            .unwrap();
        assert_abs_diff_eq!(est.state.x, 50.0, epsilon = 1e-4);
        assert_eq!(tracker.state(), TrackerState::Tracking);
    }

    #[test]
    fn persistent_low_confidence_loses() {
        let mut config = still_config(25);
        config.min_effective_sample_size = 26.0;
        config.low_confidence_frames = 2;
        let mut tracker = CondensationTracker::new(config, BlobModel::at(50.0, 50.0)).unwrap();
        tracker.initialize(Sample::new(50.0, 50.0, 10.0)).unwrap();

        assert!(tracker.process(&blank(), None).is_some());
        assert_eq!(tracker.state(), TrackerState::Tracking);

        assert!(tracker.process(&blank(), None).is_none());
        assert_eq!(tracker.state(), TrackerState::Lost);
    }

    #[test]
    fn failed_learning_is_rolled_back() {
        let mut model = BlobModel::at(50.0, 50.0);
        model.broken = true;

        let mut tracker = CondensationTracker::with_strategy(
            still_config(20),
            model,
            Box::new(PositionDependentLearning::new(0.0)),
        )
        .unwrap();
        tracker.initialize(Sample::new(50.0, 50.0, 10.0)).unwrap();

        // first frame learns from the seed, the following ones unsupervised
        for _ in 0..3 {
            assert!(tracker.process(&blank(), None).is_some());
        }

        let model = tracker.model().unwrap();
        assert_eq!(model.guided, 1);
        assert_eq!(model.unsupervised, 0);
        assert!(!model.cx.is_nan());
        assert_eq!(tracker.state(), TrackerState::Tracking);
    }

    #[test]
    fn seed_is_learned_once() {
        let mut tracker = CondensationTracker::new(
            TrackerConfig {
                learning: LearningKind::PositionDependent,
                min_learning_confidence: 0.0,
                ..still_config(20)
            },
            BlobModel::at(50.0, 50.0),
        )
        .unwrap();
        tracker.initialize(Sample::new(50.0, 50.0, 10.0)).unwrap();

        tracker.process(&blank(), None).unwrap();
        tracker.process(&blank(), None).unwrap();
        tracker
            .process(&blank(), Some(&Sample::new(50.0, 50.0, 10.0)))
            .unwrap();

        let model = tracker.model().unwrap();
        assert_eq!(model.guided, 2);
        assert_eq!(model.unsupervised, 1);
    }

    #[test]
    fn terminate_releases_model() {
        let mut tracker = CondensationTracker::new(still_config(10), BlobModel::at(1.0, 1.0)).unwrap();
        tracker.initialize(Sample::new(1.0, 1.0, 10.0)).unwrap();

        let model = tracker.terminate();
        assert_eq!(model, Some(BlobModel::at(1.0, 1.0)));
        assert_eq!(tracker.state(), TrackerState::Terminated);
        assert!(tracker.samples().is_none());
        assert!(tracker.model().is_none());

        assert!(tracker
            .process(&blank(), Some(&Sample::new(1.0, 1.0, 10.0)))
            .is_none());
        assert!(matches!(
            tracker.initialize(Sample::new(1.0, 1.0, 10.0)),
            Err(Error::Terminated)
        ));
    }

    #[test]
    fn fixed_seed_is_bit_reproducible() {
        let run = |parallel: bool| {
            let config = TrackerConfig {
                sample_count: 200,
                parallel_measurement: parallel,
                seed: 99,
                motion: MotionConfig {
                    use_velocity: true,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut tracker = CondensationTracker::new(config, BlobModel::at(40.0, 60.0)).unwrap();
            tracker.initialize(Sample::new(45.0, 55.0, 10.0)).unwrap();

            let estimates: Vec<_> = (0..6).map(|_| tracker.process(&blank(), None)).collect();

            (tracker.samples().cloned(), estimates)
        };

        let a = run(false);
        assert_eq!(a, run(false));
        assert_eq!(a, run(true));
    }
}
