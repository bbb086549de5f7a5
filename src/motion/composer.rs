//! Path composition
//!
//! Turns a (start, target) request into absolute waypoints by retrieving
//! recorded trajectories whose displacement best matches what is left to
//! travel. In iterative mode several recordings are chained, each one
//! correcting the residual error of the previous one.

use rand::Rng;

use super::bank::TrajectoryBank;
use super::index::{DisplacementIndex, Neighbor};
use super::trajectory::{Displacement, Point};

/// Retrieval settings for the composer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposerConfig {
    /// Neighbours considered per lookup
    pub k_nearest: usize,
    /// Pick uniformly among the `k_nearest` instead of always the closest
    pub random_selection: bool,
    /// Moving-average window applied to retrieved paths (`None` = raw)
    pub smoothing_window: Option<usize>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            k_nearest: 8,
            random_selection: true,
            smoothing_window: None,
        }
    }
}

/// One retrieved trajectory placed in screen space
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Absolute waypoints, starting at the requested start
    pub points: Vec<Point>,
    /// Bank index of the trajectory used
    pub trajectory: usize,
    /// Distance between requested and recorded displacement
    pub displacement_error: f64,
}

/// How a composition ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionOutcome {
    /// Came within tolerance; the target itself is the last waypoint
    Reached,
    /// Single lookup; the path ends wherever the recording ends
    SingleShot,
    /// Ran out of iterations before coming within tolerance
    IterationLimit,
    /// A lookup returned nothing; the path holds progress made so far
    SegmentUnavailable,
}

/// Waypoints produced for one movement request
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPath {
    pub points: Vec<Point>,
    pub outcome: CompositionOutcome,
    /// Loop passes executed (lookups plus the final tolerance check)
    pub iterations: usize,
    /// Segments appended
    pub segments: usize,
}

impl ComposedPath {
    /// Whether the path ends within tolerance of the target
    pub fn reached(&self) -> bool {
        self.outcome == CompositionOutcome::Reached
    }

    /// Last waypoint, if any
    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Distance from the last waypoint to `target`
    pub fn residual(&self, target: Point) -> Option<f64> {
        self.end().map(|end| end.distance(&target))
    }
}

/// Diagnostics for the trajectory a displacement query resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathInfo {
    pub index: usize,
    pub distance: f64,
    /// Arc length of the recorded path
    pub path_length: f64,
    pub num_points: usize,
    pub actual_displacement: Displacement,
    pub requested_displacement: Displacement,
}

/// Composes human-like paths from a trajectory bank
#[derive(Debug, Clone)]
pub struct PathComposer {
    bank: TrajectoryBank,
    index: DisplacementIndex,
    config: ComposerConfig,
}

impl PathComposer {
    /// Index the bank and wrap it
    pub fn new(bank: TrajectoryBank, config: ComposerConfig) -> Self {
        let index = DisplacementIndex::build(bank.displacements());
        log::info!("Displacement index built over {} paths", index.len());
        Self {
            bank,
            index,
            config,
        }
    }

    /// The underlying bank
    pub fn bank(&self) -> &TrajectoryBank {
        &self.bank
    }

    /// The displacement index
    pub fn index(&self) -> &DisplacementIndex {
        &self.index
    }

    /// Retrieval settings
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Resolve a displacement to a bank entry
    fn lookup<R: Rng + ?Sized>(&self, displacement: Displacement, rng: &mut R) -> Option<Neighbor> {
        if self.config.random_selection {
            self.index
                .nearest_random(displacement, self.config.k_nearest, rng)
        } else {
            self.index.nearest(displacement, 1).into_iter().next()
        }
    }

    /// Retrieve one trajectory for `start -> target` and anchor it at `start`
    pub fn segment<R: Rng + ?Sized>(&self, start: Point, target: Point, rng: &mut R) -> Option<Segment> {
        let displacement = target - start;
        let hit = self.lookup(displacement, rng)?;
        let trajectory = self.bank.get(hit.index)?;

        let points = match self.config.smoothing_window {
            Some(window) => trajectory.smoothed(window).anchored_at(start),
            None => trajectory.anchored_at(start),
        };

        log::debug!(
            "Displacement ({:.1}, {:.1}) -> path {} (error {:.2})",
            displacement.dx,
            displacement.dy,
            hit.index,
            hit.distance
        );

        Some(Segment {
            points,
            trajectory: hit.index,
            displacement_error: hit.distance,
        })
    }

    /// Compose a path from `start` to `target`.
    ///
    /// Non-iterative mode does one lookup and ends wherever that recording
    /// ends. Iterative mode chains lookups from the current end point until
    /// it is within `tolerance` of the target (then appends the target
    /// itself) or `max_iterations` passes have run.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        start: Point,
        target: Point,
        iterative: bool,
        max_iterations: usize,
        tolerance: f64,
        rng: &mut R,
    ) -> ComposedPath {
        if !iterative {
            return match self.segment(start, target, rng) {
                Some(segment) => ComposedPath {
                    points: segment.points,
                    outcome: CompositionOutcome::SingleShot,
                    iterations: 1,
                    segments: 1,
                },
                None => ComposedPath {
                    points: Vec::new(),
                    outcome: CompositionOutcome::SegmentUnavailable,
                    iterations: 1,
                    segments: 0,
                },
            };
        }

        let mut points: Vec<Point> = Vec::new();
        let mut current = start;
        let mut segments = 0;

        for iteration in 1..=max_iterations {
            let remaining = current.distance(&target);
            if remaining <= tolerance {
                points.push(target);
                log::debug!("Reached target after {} iterations", iteration);
                return ComposedPath {
                    points,
                    outcome: CompositionOutcome::Reached,
                    iterations: iteration,
                    segments,
                };
            }

            let Some(segment) = self.segment(current, target, rng) else {
                log::warn!(
                    "No path segment for iteration {} ({:.1}px remaining)",
                    iteration,
                    remaining
                );
                return ComposedPath {
                    points,
                    outcome: CompositionOutcome::SegmentUnavailable,
                    iterations: iteration,
                    segments,
                };
            };

            // Each segment starts where the previous one ended; skip the repeated seam point
            let skip = usize::from(!points.is_empty());
            points.extend(segment.points.into_iter().skip(skip));
            segments += 1;

            if let Some(&last) = points.last() {
                current = last;
            }
            log::debug!(
                "Iteration {}: now at ({:.1}, {:.1}), {:.1}px from target",
                iteration,
                current.x,
                current.y,
                current.distance(&target)
            );
        }

        log::warn!(
            "Gave up after {} iterations, {:.1}px from target",
            max_iterations,
            current.distance(&target)
        );
        ComposedPath {
            points,
            outcome: CompositionOutcome::IterationLimit,
            iterations: max_iterations,
            segments,
        }
    }

    /// Describe the closest trajectory for a displacement
    pub fn path_info(&self, displacement: Displacement) -> Option<PathInfo> {
        let hit = self.index.nearest(displacement, 1).into_iter().next()?;
        let trajectory = self.bank.get(hit.index)?;
        Some(PathInfo {
            index: hit.index,
            distance: hit.distance,
            path_length: trajectory.length(),
            num_points: trajectory.len(),
            actual_displacement: self.bank.displacements()[hit.index],
            requested_displacement: displacement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn straight(dx: f64, dy: f64, steps: usize) -> Vec<Point> {
        (0..=steps)
            .map(|i| {
                let t = i as f64 / steps as f64;
                Point::new(dx * t, dy * t)
            })
            .collect()
    }

    fn composer(paths: Vec<Vec<Point>>, random_selection: bool) -> PathComposer {
        let bank = TrajectoryBank::load(paths).unwrap();
        PathComposer::new(
            bank,
            ComposerConfig {
                k_nearest: 1,
                random_selection,
                smoothing_window: None,
            },
        )
    }

    #[test]
    fn test_lookup_scenario() {
        let composer = composer(
            vec![
                straight(100.0, 0.0, 4),
                straight(0.0, 100.0, 4),
                straight(50.0, 50.0, 4),
            ],
            true,
        );
        let mut rng = StdRng::seed_from_u64(0);

        let segment = composer
            .segment(Point::new(0.0, 0.0), Point::new(60.0, 40.0), &mut rng)
            .unwrap();
        assert_eq!(segment.trajectory, 2);
        assert!((segment.displacement_error - 200f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_single_shot_translates_to_start() {
        let composer = composer(vec![straight(50.0, 50.0, 5)], false);
        let mut rng = StdRng::seed_from_u64(0);

        let path = composer.compose(
            Point::new(200.0, 100.0),
            Point::new(260.0, 140.0),
            false,
            5,
            10.0,
            &mut rng,
        );
        assert_eq!(path.outcome, CompositionOutcome::SingleShot);
        assert_eq!(path.points.len(), 6);
        assert_eq!(path.points[0], Point::new(200.0, 100.0));
        assert_eq!(path.end(), Some(Point::new(250.0, 150.0)));
        assert!((path.residual(Point::new(260.0, 140.0)).unwrap() - 200f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_applies_to_segments() {
        let bank = TrajectoryBank::load(vec![straight(100.0, 0.0, 4)]).unwrap();
        let composer = PathComposer::new(
            bank,
            ComposerConfig {
                k_nearest: 1,
                random_selection: false,
                smoothing_window: Some(3),
            },
        );
        let mut rng = StdRng::seed_from_u64(0);

        // Averaging pulls the ends inwards: 12.5, 25, 50, 75, 87.5, then anchored at x = 10
        let segment = composer
            .segment(Point::new(10.0, 5.0), Point::new(110.0, 5.0), &mut rng)
            .unwrap();
        let xs: Vec<f64> = segment.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![10.0, 22.5, 47.5, 72.5, 85.0]);
        assert!(segment.points.iter().all(|p| p.y == 5.0));

        let path = composer.compose(
            Point::new(10.0, 5.0),
            Point::new(110.0, 5.0),
            false,
            5,
            1.0,
            &mut rng,
        );
        assert_eq!(path.points, segment.points);
    }

    #[test]
    fn test_zero_displacement_terminates_immediately() {
        let composer = composer(vec![straight(10.0, 0.0, 2)], true);
        let mut rng = StdRng::seed_from_u64(0);

        let path = composer.compose(Point::default(), Point::default(), true, 5, 10.0, &mut rng);
        assert!(path.reached());
        assert_eq!(path.iterations, 1);
        assert_eq!(path.segments, 0);
        assert_eq!(path.points, vec![Point::new(0.0, 0.0)]);
    }

    #[test]
    fn test_iteration_bound_respected() {
        // Only short hops available; the target is far away
        let composer = composer(vec![straight(10.0, 0.0, 2)], true);
        let mut rng = StdRng::seed_from_u64(0);

        let path = composer.compose(
            Point::new(0.0, 0.0),
            Point::new(1000.0, 0.0),
            true,
            1,
            5.0,
            &mut rng,
        );
        assert_eq!(path.outcome, CompositionOutcome::IterationLimit);
        assert!(!path.reached());
        assert_eq!(path.iterations, 1);
        assert_eq!(path.segments, 1);
        assert_eq!(path.points.len(), 3);
    }

    #[test]
    fn test_iterative_relay_converges() {
        let composer = composer(vec![straight(100.0, 0.0, 4), straight(10.0, 0.0, 2)], false);
        let mut rng = StdRng::seed_from_u64(0);

        let target = Point::new(310.0, 0.0);
        let path = composer.compose(Point::default(), target, true, 10, 1.0, &mut rng);

        assert!(path.reached());
        assert_eq!(path.end(), Some(target));
        // Three long hops, one short hop, then the tolerance check
        assert_eq!(path.segments, 4);
        assert_eq!(path.iterations, 5);

        // Seams are not duplicated; only the appended target repeats the last hop's end
        let hops = &path.points[..path.points.len() - 1];
        assert!(hops.windows(2).all(|w| w[0] != w[1]));
        // 5 + 4 + 4 + 2 hop points + target
        assert_eq!(path.points.len(), 5 + 4 + 4 + 2 + 1);
    }

    #[test]
    fn test_iterative_zero_iterations() {
        let composer = composer(vec![straight(10.0, 0.0, 2)], true);
        let mut rng = StdRng::seed_from_u64(0);
        let path = composer.compose(Point::default(), Point::new(50.0, 0.0), true, 0, 1.0, &mut rng);
        assert_eq!(path.outcome, CompositionOutcome::IterationLimit);
        assert!(path.points.is_empty());
    }

    #[test]
    fn test_unavailable_segment_keeps_partial_path() {
        // k = 0 makes every lookup come back empty
        let bank = TrajectoryBank::load(vec![straight(10.0, 0.0, 2)]).unwrap();
        let composer = PathComposer::new(
            bank,
            ComposerConfig {
                k_nearest: 0,
                random_selection: true,
                smoothing_window: None,
            },
        );
        let mut rng = StdRng::seed_from_u64(0);

        let path = composer.compose(Point::default(), Point::new(50.0, 0.0), true, 5, 1.0, &mut rng);
        assert_eq!(path.outcome, CompositionOutcome::SegmentUnavailable);
        assert!(path.points.is_empty());

        let single = composer.compose(Point::default(), Point::new(50.0, 0.0), false, 5, 1.0, &mut rng);
        assert_eq!(single.outcome, CompositionOutcome::SegmentUnavailable);
    }

    #[test]
    fn test_random_selection_varies_paths() {
        let paths: Vec<Vec<Point>> = (0..8)
            .map(|i| straight(100.0 + i as f64, 0.0, 3))
            .collect();
        let bank = TrajectoryBank::load(paths).unwrap();
        let composer = PathComposer::new(
            bank,
            ComposerConfig {
                k_nearest: 4,
                random_selection: true,
                smoothing_window: None,
            },
        );
        let mut rng = StdRng::seed_from_u64(21);

        let mut used = std::collections::HashSet::new();
        for _ in 0..100 {
            let segment = composer
                .segment(Point::default(), Point::new(100.0, 0.0), &mut rng)
                .unwrap();
            assert!(segment.trajectory < 4);
            used.insert(segment.trajectory);
        }
        assert_eq!(used.len(), 4);
    }

    #[test]
    fn test_path_info() {
        let composer = composer(vec![straight(30.0, 40.0, 5), straight(-10.0, 0.0, 1)], true);
        let info = composer.path_info(Displacement::new(28.0, 41.0)).unwrap();
        assert_eq!(info.index, 0);
        assert_eq!(info.num_points, 6);
        assert!((info.path_length - 50.0).abs() < 1e-9);
        assert_eq!(info.actual_displacement, Displacement::new(30.0, 40.0));
    }
}
