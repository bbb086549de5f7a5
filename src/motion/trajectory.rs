//! Points, displacements and recorded trajectories

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A 2D point. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (*other - *self).norm()
    }

    /// Round to integer screen coordinates
    pub fn rounded(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }

    /// Rotate around the origin, counter-clockwise by `degrees`
    pub fn rotated(&self, degrees: f64) -> Point {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x as f64, y as f64)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl Sub for Point {
    type Output = Displacement;

    fn sub(self, rhs: Point) -> Displacement {
        Displacement::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Displacement> for Point {
    type Output = Point;

    fn add(self, rhs: Displacement) -> Point {
        Point::new(self.x + rhs.dx, self.y + rhs.dy)
    }
}

/// Net movement between two points; the lookup key for trajectories
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
}

impl Displacement {
    /// Create a displacement
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Length of the vector
    pub fn norm(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Euclidean distance to another displacement
    pub fn distance(&self, other: &Displacement) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Squared Euclidean distance to another displacement
    pub fn distance_squared(&self, other: &Displacement) -> f64 {
        let ddx = self.dx - other.dx;
        let ddy = self.dy - other.dy;
        ddx * ddx + ddy * ddy
    }

    /// Component along a k-d tree axis (0 = x, 1 = y)
    pub(crate) fn axis(&self, axis: usize) -> f64 {
        if axis == 0 {
            self.dx
        } else {
            self.dy
        }
    }
}

impl From<(f64, f64)> for Displacement {
    fn from((dx, dy): (f64, f64)) -> Self {
        Self::new(dx, dy)
    }
}

/// A recorded mouse path with at least two points.
///
/// Coordinates are relative; the first point need not be the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    points: Vec<Point>,
}

impl Trajectory {
    /// Wrap a point sequence; `None` for fewer than two points
    pub fn new(points: Vec<Point>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self { points })
    }

    /// Waypoints
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of waypoints
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Never true for a constructed trajectory
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last point minus first point
    pub fn displacement(&self) -> Displacement {
        self.points[self.points.len() - 1] - self.points[0]
    }

    /// Total arc length
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum()
    }

    /// Rotate every point around the origin
    pub fn rotated(&self, degrees: f64) -> Trajectory {
        Trajectory {
            points: self.points.iter().map(|p| p.rotated(degrees)).collect(),
        }
    }

    /// Centred moving-average smoothing; the window shrinks at the ends.
    ///
    /// Paths shorter than the window are returned unchanged.
    pub fn smoothed(&self, window: usize) -> Trajectory {
        if window < 2 || self.points.len() < window {
            return self.clone();
        }

        let half = window / 2;
        let n = self.points.len();
        let points = (0..n)
            .map(|i| {
                let lo = i.saturating_sub(half);
                let hi = (i + half + 1).min(n);
                let slice = &self.points[lo..hi];
                let count = slice.len() as f64;
                let (sx, sy) = slice.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
                Point::new(sx / count, sy / count)
            })
            .collect();

        Trajectory { points }
    }

    /// Place the path so its first point lands on `start`
    pub fn anchored_at(&self, start: Point) -> Vec<Point> {
        let origin = self.points[0];
        self.points.iter().map(|&p| start + (p - origin)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(points: &[(f64, f64)]) -> Trajectory {
        Trajectory::new(points.iter().map(|&p| Point::from(p)).collect()).unwrap()
    }

    #[test]
    fn test_displacement_uses_first_and_last_points() {
        let t = path(&[(0.0, 0.0), (10.0, 5.0), (20.0, 20.0)]);
        assert_eq!(t.displacement(), Displacement::new(20.0, 20.0));

        let offset = path(&[(5.0, 5.0), (9.0, 1.0), (8.0, 12.0)]);
        assert_eq!(offset.displacement(), Displacement::new(3.0, 7.0));
    }

    #[test]
    fn test_single_point_rejected() {
        assert!(Trajectory::new(vec![Point::new(1.0, 1.0)]).is_none());
        assert!(Trajectory::new(Vec::new()).is_none());
    }

    #[test]
    fn test_length() {
        let t = path(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert!((t.length() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation() {
        let t = path(&[(0.0, 0.0), (10.0, 0.0)]).rotated(90.0);
        let d = t.displacement();
        assert!(d.dx.abs() < 1e-9);
        assert!((d.dy - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_moving_average() {
        let t = path(&[(0.0, 0.0), (3.0, 3.0), (6.0, 0.0), (9.0, 3.0)]);
        let s = t.smoothed(3);
        assert_eq!(s.len(), 4);
        assert_eq!(s.points()[0], Point::new(1.5, 1.5));
        assert_eq!(s.points()[1], Point::new(3.0, 1.0));

        let short = path(&[(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(short.smoothed(3), short);
    }

    #[test]
    fn test_anchored_at() {
        let t = path(&[(2.0, 2.0), (4.0, 3.0), (12.0, 2.0)]);
        let abs = t.anchored_at(Point::new(100.0, 50.0));
        assert_eq!(abs[0], Point::new(100.0, 50.0));
        assert_eq!(abs[2], Point::new(110.0, 50.0));
    }

    #[test]
    fn test_point_serde_as_pair() {
        let json = serde_json::to_string(&Point::new(1.5, -2.0)).unwrap();
        assert_eq!(json, "[1.5,-2.0]");
        let p: Point = serde_json::from_str("[3, 4]").unwrap();
        assert_eq!(p, Point::new(3.0, 4.0));
    }
}
