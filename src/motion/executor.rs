//! Motion execution
//!
//! Walks a composed path on the pointer, pausing between waypoints so the
//! motion plays back at roughly the speed it was recorded at.

use std::time::Duration;

use rand::Rng;

use super::trajectory::Point;
use crate::input::{InputError, PointerDriver};
use crate::stealth::Humanizer;

/// Rate the default corpus was recorded at, in samples per second
pub const DEFAULT_SAMPLE_RATE: u32 = 50;

/// Something that waits
pub trait Pacer {
    fn pause(&mut self, duration: Duration);
}

/// Blocks the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested pauses without waiting
#[derive(Debug, Clone, Default)]
pub struct NoPause {
    pub requested: Vec<Duration>,
}

impl NoPause {
    /// Sum of all requested pauses
    pub fn total(&self) -> Duration {
        self.requested.iter().sum()
    }
}

impl Pacer for NoPause {
    fn pause(&mut self, duration: Duration) {
        self.requested.push(duration);
    }
}

/// What an execution did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionSummary {
    /// Pointer moves issued
    pub moves: usize,
    /// Total time spent pausing between waypoints
    pub elapsed: Duration,
    /// Final pointer position, if anything moved
    pub end: Option<(i32, i32)>,
}

/// Plays paths back on a pointer
#[derive(Debug, Clone)]
pub struct MotionExecutor<P: Pacer = ThreadSleep> {
    sample_rate: u32,
    humanizer: Humanizer,
    pacer: P,
}

impl MotionExecutor<ThreadSleep> {
    /// Executor that really sleeps
    pub fn new(sample_rate: u32, humanizer: Humanizer) -> Self {
        Self::with_pacer(sample_rate, humanizer, ThreadSleep)
    }
}

impl Default for MotionExecutor<ThreadSleep> {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, Humanizer::default())
    }
}

impl<P: Pacer> MotionExecutor<P> {
    /// Executor with a custom pacer
    pub fn with_pacer(sample_rate: u32, humanizer: Humanizer, pacer: P) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            humanizer,
            pacer,
        }
    }

    /// Samples per second the paths were recorded at
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Timing source
    pub fn humanizer(&self) -> &Humanizer {
        &self.humanizer
    }

    /// The pacer
    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    /// Pause for an arbitrary duration through the pacer
    pub fn pause(&mut self, duration: Duration) {
        self.pacer.pause(duration);
    }

    /// Move to `path[0]` at once, then to each later waypoint after a
    /// `multiplier / sample_rate` second pause.
    ///
    /// Driver failures are returned as-is; waypoints already visited stay visited.
    pub fn execute<D, R>(&mut self, pointer: &mut D, path: &[Point], rng: &mut R) -> Result<ExecutionSummary, InputError>
    where
        D: PointerDriver + ?Sized,
        R: Rng + ?Sized,
    {
        let mut summary = ExecutionSummary::default();
        let Some((first, rest)) = path.split_first() else {
            return Ok(summary);
        };

        let (x, y) = first.rounded();
        pointer.move_to(x, y)?;
        summary.moves += 1;
        summary.end = Some((x, y));

        for waypoint in rest {
            let delay = self.humanizer.step_delay(self.sample_rate, rng);
            self.pacer.pause(delay);
            summary.elapsed += delay;

            let (x, y) = waypoint.rounded();
            pointer.move_to(x, y)?;
            summary.moves += 1;
            summary.end = Some((x, y));
        }

        log::debug!(
            "Executed {} waypoints in {:?}",
            summary.moves,
            summary.elapsed
        );
        Ok(summary)
    }
}
