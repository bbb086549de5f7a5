//! humanclick - human-like clicking for color-driven game automation
//!
//! This library decides where to click in a captured frame and how to get
//! the pointer there: target pixels are picked by blob segmentation,
//! exclusion-marker filtering and centre-weighted sampling, and pointer
//! paths are stitched together from a bank of recorded human mouse
//! trajectories.
//!
//! Screen capture and OS input injection stay outside the crate: frames come
//! in as [`image::RgbImage`], pointer actions go out through
//! [`input::PointerDriver`].
//!
//! ## Anti-Detection
//!
//! The `stealth` module varies playback speed and click timing, and the
//! composer picks among several similar recordings, so repeated moves do
//! not replay identically.

pub mod config;
pub mod error;
pub mod input;
pub mod motion;
pub mod stealth;
pub mod vision;

pub use error::{Error, Result};

use image::RgbImage;
use rand::Rng;

use crate::config::{CorpusSettings, Settings};
use crate::input::{MouseButton, PointerDriver, ScreenRegion};
use crate::motion::{
    augment_with_rotations, load_corpus, ComposedPath, CompositionOutcome, ExecutionSummary,
    MotionExecutor, Pacer, PathComposer, Point, ThreadSleep, TrajectoryBank,
};
use crate::vision::{select_random_pixel, SelectionMethod, TargetSelector};

/// Load, augment and deduplicate the trajectory corpus described by `corpus`
pub fn load_bank(corpus: &CorpusSettings) -> Result<TrajectoryBank> {
    let mut raw = load_corpus(&corpus.path)?;
    if !corpus.rotation_angles.is_empty() {
        raw = augment_with_rotations(&raw, &corpus.rotation_angles);
    }

    let bank = TrajectoryBank::load(raw)?;
    Ok(match corpus.dedup_tolerance {
        Some(tolerance) => bank.dedup(tolerance),
        None => bank,
    })
}

/// Result of one pointer move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub path: ComposedPath,
    pub execution: ExecutionSummary,
}

/// Select, compose, execute, click
pub struct HumanClick<P: Pacer = ThreadSleep> {
    settings: Settings,
    composer: Option<PathComposer>,
    executor: MotionExecutor<P>,
}

impl HumanClick<ThreadSleep> {
    /// Create an instance without a trajectory bank; moves go straight to the target
    pub fn new(settings: Settings) -> Self {
        Self::with_pacer(settings, ThreadSleep)
    }

    /// Validate settings and load the corpus they point at
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let bank = load_bank(&settings.corpus)?;
        Ok(Self::new(settings).with_bank(bank))
    }
}

impl<P: Pacer> HumanClick<P> {
    /// Create an instance with a custom pacer
    pub fn with_pacer(settings: Settings, pacer: P) -> Self {
        let executor =
            MotionExecutor::with_pacer(settings.movement.sample_rate, settings.humanizer(), pacer);
        Self {
            settings,
            composer: None,
            executor,
        }
    }

    /// Use `bank` for pointer paths
    pub fn with_bank(mut self, bank: TrajectoryBank) -> Self {
        self.composer = Some(PathComposer::new(bank, self.settings.composer_config()));
        self
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The path composer, if a bank is loaded
    pub fn composer(&self) -> Option<&PathComposer> {
        self.composer.as_ref()
    }

    /// The motion executor
    pub fn executor(&self) -> &MotionExecutor<P> {
        &self.executor
    }

    /// Waypoints from `start` to `target` under the current settings
    pub fn plan_path<R: Rng + ?Sized>(&self, start: Point, target: Point, rng: &mut R) -> ComposedPath {
        let movement = &self.settings.movement;
        match &self.composer {
            Some(composer) if movement.enabled => composer.compose(
                start,
                target,
                movement.use_iterative_movement,
                movement.max_iterations,
                movement.tolerance,
                rng,
            ),
            _ => ComposedPath {
                points: vec![target],
                outcome: CompositionOutcome::Reached,
                iterations: 0,
                segments: 0,
            },
        }
    }

    /// Move the pointer from where it is to `target`
    pub fn move_to<D, R>(&mut self, pointer: &mut D, rng: &mut R, target: (i32, i32)) -> Result<MoveReport>
    where
        D: PointerDriver + ?Sized,
        R: Rng + ?Sized,
    {
        let start = Point::from(pointer.position()?);
        let path = self.plan_path(start, Point::from(target), rng);
        if !path.reached() {
            log::debug!(
                "Path to {:?} ended {:.1}px short ({:?})",
                target,
                path.residual(Point::from(target)).unwrap_or(f64::NAN),
                path.outcome
            );
        }

        let execution = self.executor.execute(pointer, &path.points, rng)?;
        Ok(MoveReport { path, execution })
    }

    /// Move to `target`, pause briefly, then click
    pub fn click_at<D, R>(
        &mut self,
        pointer: &mut D,
        rng: &mut R,
        target: (i32, i32),
        button: MouseButton,
    ) -> Result<MoveReport>
    where
        D: PointerDriver + ?Sized,
        R: Rng + ?Sized,
    {
        let report = self.move_to(pointer, rng, target)?;
        let pause = self.executor.humanizer().click_pause(rng);
        self.executor.pause(pause);
        pointer.click(button)?;
        Ok(report)
    }

    /// Find the configured target color in `frame` and click it.
    ///
    /// `region` is where the frame was captured on screen. Returns the
    /// clicked screen position, or `None` when no valid target is visible.
    pub fn click_color<D, R>(
        &mut self,
        frame: &RgbImage,
        region: ScreenRegion,
        pointer: &mut D,
        rng: &mut R,
    ) -> Result<Option<(i32, i32)>>
    where
        D: PointerDriver + ?Sized,
        R: Rng + ?Sized,
    {
        let selection = &self.settings.selection;
        let picked = match selection.method {
            SelectionMethod::Smart => {
                TargetSelector::new(self.settings.selection_params(), selection.exclusion)
                    .select(frame, rng)?
            }
            SelectionMethod::Random => {
                select_random_pixel(frame, selection.target_color, selection.tolerance, rng)
            }
        };

        let Some(local) = picked else {
            return Ok(None);
        };

        let target = region.clamp(region.to_screen(local));
        self.click_at(pointer, rng, target, MouseButton::Left)?;
        Ok(Some(target))
    }

    /// Move `distance` pixels in a random direction, staying inside `bounds`
    pub fn move_randomly<D, R>(
        &mut self,
        pointer: &mut D,
        rng: &mut R,
        distance: f64,
        bounds: ScreenRegion,
    ) -> Result<MoveReport>
    where
        D: PointerDriver + ?Sized,
        R: Rng + ?Sized,
    {
        let (x, y) = pointer.position()?;
        let heading = self.executor.humanizer().random_heading(rng);
        let target = bounds.clamp((
            (x as f64 + distance * heading.cos()).round() as i32,
            (y as f64 + distance * heading.sin()).round() as i32,
        ));
        log::debug!("Random move from {:?} to {:?}", (x, y), target);
        self.move_to(pointer, rng, target)
    }
}
