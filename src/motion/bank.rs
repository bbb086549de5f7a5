//! Trajectory bank
//!
//! The immutable set of recorded paths, each paired with its displacement.
//! Built once at startup; nothing mutates it afterwards.

use std::collections::HashMap;
use std::fmt;

use super::trajectory::{Displacement, Point, Trajectory};
use super::MotionError;

/// Recorded trajectories with their displacements (`trajectories[i]` ↔ `displacements[i]`)
#[derive(Debug, Clone)]
pub struct TrajectoryBank {
    trajectories: Vec<Trajectory>,
    displacements: Vec<Displacement>,
}

impl TrajectoryBank {
    /// Build a bank from raw point sequences.
    ///
    /// Sequences with fewer than two points are skipped. Fails with
    /// [`MotionError::EmptyCorpus`] if nothing usable remains.
    pub fn load<I>(corpus: I) -> Result<Self, MotionError>
    where
        I: IntoIterator<Item = Vec<Point>>,
    {
        let mut rejected = 0usize;
        let trajectories: Vec<Trajectory> = corpus
            .into_iter()
            .filter_map(|points| {
                let trajectory = Trajectory::new(points);
                if trajectory.is_none() {
                    rejected += 1;
                }
                trajectory
            })
            .collect();

        if rejected > 0 {
            log::warn!("Skipped {} trajectories with fewer than 2 points", rejected);
        }

        Self::from_trajectories(trajectories)
    }

    /// Build a bank from already validated trajectories
    pub fn from_trajectories(trajectories: Vec<Trajectory>) -> Result<Self, MotionError> {
        if trajectories.is_empty() {
            return Err(MotionError::EmptyCorpus);
        }

        let displacements = trajectories.iter().map(Trajectory::displacement).collect();
        let bank = Self {
            trajectories,
            displacements,
        };

        log::info!("Loaded {} trajectories", bank.len());
        log::info!("Displacement range: {}", bank.stats());
        Ok(bank)
    }

    /// Number of trajectories
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    /// Never true: construction rejects empty corpora
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Trajectory at `index`
    pub fn get(&self, index: usize) -> Option<&Trajectory> {
        self.trajectories.get(index)
    }

    /// All trajectories
    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    /// All displacements, parallel to [`trajectories`](Self::trajectories)
    pub fn displacements(&self) -> &[Displacement] {
        &self.displacements
    }

    /// Drop trajectories whose displacement lies within `tolerance` of an
    /// earlier kept one. The first occurrence wins.
    pub fn dedup(self, tolerance: f64) -> Self {
        if tolerance <= 0.0 {
            return self;
        }

        let before = self.len();
        // Bucket displacements into a grid of `tolerance`-sized cells so each
        // check only looks at the 3x3 neighbouring cells
        let cell = |d: &Displacement| {
            (
                (d.dx / tolerance).floor() as i64,
                (d.dy / tolerance).floor() as i64,
            )
        };
        let mut grid: HashMap<(i64, i64), Vec<Displacement>> = HashMap::new();
        let mut trajectories = Vec::with_capacity(before);
        let mut displacements = Vec::with_capacity(before);

        for (trajectory, displacement) in self.trajectories.into_iter().zip(self.displacements) {
            let (cx, cy) = cell(&displacement);
            let duplicate = (cx - 1..=cx + 1).any(|x| {
                (cy - 1..=cy + 1).any(|y| {
                    grid.get(&(x, y)).is_some_and(|seen| {
                        seen.iter().any(|s| s.distance(&displacement) < tolerance)
                    })
                })
            });

            if !duplicate {
                grid.entry((cx, cy)).or_default().push(displacement);
                trajectories.push(trajectory);
                displacements.push(displacement);
            }
        }

        log::info!(
            "Removed {} duplicate trajectories ({} remain)",
            before - trajectories.len(),
            trajectories.len()
        );

        Self {
            trajectories,
            displacements,
        }
    }

    /// Per-axis min, max and mean of the displacements
    pub fn stats(&self) -> DisplacementStats {
        let n = self.displacements.len() as f64;
        let mut stats = DisplacementStats {
            min: Displacement::new(f64::INFINITY, f64::INFINITY),
            max: Displacement::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            mean: Displacement::default(),
        };

        for d in &self.displacements {
            stats.min.dx = stats.min.dx.min(d.dx);
            stats.min.dy = stats.min.dy.min(d.dy);
            stats.max.dx = stats.max.dx.max(d.dx);
            stats.max.dy = stats.max.dy.max(d.dy);
            stats.mean.dx += d.dx / n;
            stats.mean.dy += d.dy / n;
        }

        stats
    }
}

/// Summary of the bank's displacement coverage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementStats {
    pub min: Displacement,
    pub max: Displacement,
    pub mean: Displacement,
}

impl fmt::Display for DisplacementStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X: {:.1} to {:.1} (mean: {:.1}), Y: {:.1} to {:.1} (mean: {:.1})",
            self.min.dx, self.max.dx, self.mean.dx, self.min.dy, self.max.dy, self.mean.dy
        )
    }
}

/// Extend a corpus with copies of every path rotated about the origin.
///
/// Originals come first, followed by one full rotated copy per angle (degrees).
/// Empty paths are not rotated.
pub fn augment_with_rotations(corpus: &[Vec<Point>], angles: &[f64]) -> Vec<Vec<Point>> {
    let mut augmented = corpus.to_vec();
    for &angle in angles {
        augmented.extend(
            corpus
                .iter()
                .filter(|path| !path.is_empty())
                .map(|path| path.iter().map(|p| p.rotated(angle)).collect::<Vec<_>>()),
        );
    }

    if !corpus.is_empty() {
        log::info!(
            "Augmented {} paths to {} ({:.1}x) with {} rotations",
            corpus.len(),
            augmented.len(),
            augmented.len() as f64 / corpus.len() as f64,
            angles.len()
        );
    }
    augmented
}

/// Evenly spaced rotation angles in `(0, 360)`, `step` degrees apart
pub fn rotation_angles(step: f64) -> Vec<f64> {
    if step <= 0.0 {
        return Vec::new();
    }
    let mut angles = Vec::new();
    let mut angle = step;
    while angle < 360.0 {
        angles.push(angle);
        angle += step;
    }
    angles
}
