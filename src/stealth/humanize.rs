//! Human timing variance
//!
//! Sources of jitter for pointer motion: per-step speed, the pause between
//! arriving on a target and clicking it, and headings for idle movement.

use std::f64::consts::TAU;
use std::time::Duration;

use rand::Rng;

/// Default speed multiplier range
pub const DEFAULT_SPEED_RANGE: (f64, f64) = (0.5, 2.0);

/// Default pause before a click, in milliseconds
pub const DEFAULT_CLICK_PAUSE_MS: (u64, u64) = (50, 150);

/// Humanizer for motion timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Humanizer {
    speed_range: (f64, f64),
    click_pause_ms: (u64, u64),
}

impl Default for Humanizer {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_RANGE, DEFAULT_CLICK_PAUSE_MS)
    }
}

impl Humanizer {
    /// Create a humanizer. Reversed ranges are swapped, negative speeds
    /// clamped to zero and a non-finite speed range replaced by the default.
    pub fn new(speed_range: (f64, f64), click_pause_ms: (u64, u64)) -> Self {
        let (lo, hi) = if speed_range.0.is_finite() && speed_range.1.is_finite() {
            speed_range
        } else {
            log::warn!("Ignoring non-finite speed range {:?}", speed_range);
            DEFAULT_SPEED_RANGE
        };
        let (lo, hi) = (lo.min(hi).max(0.0), lo.max(hi).max(0.0));
        let (pause_lo, pause_hi) = click_pause_ms;
        Self {
            speed_range: (lo, hi),
            click_pause_ms: (pause_lo.min(pause_hi), pause_lo.max(pause_hi)),
        }
    }

    /// Speed multiplier range `(min, max)`
    pub fn speed_range(&self) -> (f64, f64) {
        self.speed_range
    }

    /// Click pause range in milliseconds
    pub fn click_pause_range(&self) -> (u64, u64) {
        self.click_pause_ms
    }

    /// Uniform speed multiplier from the configured range
    pub fn speed_multiplier<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (lo, hi) = self.speed_range;
        if lo >= hi {
            return lo;
        }
        rng.gen_range(lo..=hi)
    }

    /// Delay before the next waypoint of a path recorded at `sample_rate` Hz
    pub fn step_delay<R: Rng + ?Sized>(&self, sample_rate: u32, rng: &mut R) -> Duration {
        let multiplier = self.speed_multiplier(rng);
        Duration::from_secs_f64(multiplier / f64::from(sample_rate.max(1)))
    }

    /// Pause between arriving on a target and clicking it
    pub fn click_pause<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let (lo, hi) = self.click_pause_ms;
        Duration::from_millis(rng.gen_range(lo..=hi))
    }

    /// Uniform heading in radians for an idle move
    pub fn random_heading<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(0.0..TAU)
    }
}
