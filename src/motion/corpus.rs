//! Trajectory corpus storage
//!
//! A corpus file is a JSON array of paths, each path an array of `[x, y]`
//! pairs, e.g. `[[[0, 0], [3, 1], [9, 4]], [[0, 0], [-2, 7]]]`.

use std::fs;
use std::path::Path;

use super::trajectory::{Point, Trajectory};
use super::MotionError;

/// Parse a corpus from JSON text
pub fn parse_corpus(json: &str) -> Result<Vec<Vec<Point>>, MotionError> {
    Ok(serde_json::from_str(json)?)
}

/// Load a corpus file
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<Point>>, MotionError> {
    let path = path.as_ref();
    log::info!("Loading paths from {}", path.display());
    let text = fs::read_to_string(path)?;
    parse_corpus(&text)
}

/// Write trajectories to a corpus file
pub fn save_corpus<P: AsRef<Path>>(path: P, trajectories: &[Trajectory]) -> Result<(), MotionError> {
    let raw: Vec<&[Point]> = trajectories.iter().map(Trajectory::points).collect();
    let json = serde_json::to_string(&raw)?;
    fs::write(path.as_ref(), json)?;
    log::info!(
        "Saved {} paths to {}",
        trajectories.len(),
        path.as_ref().display()
    );
    Ok(())
}
