//! Motion module
//!
//! Human-like pointer motion built from recorded trajectories:
//! - `trajectory` - points, displacements and recorded paths
//! - `bank` / `index` - the trajectory store and its displacement k-d tree
//! - `corpus` - JSON corpus files
//! - `composer` - chaining retrieved paths toward a target
//! - `executor` - playing a path back on the pointer

pub mod bank;
pub mod composer;
pub mod corpus;
pub mod executor;
pub mod index;
pub mod trajectory;

pub use bank::{augment_with_rotations, rotation_angles, DisplacementStats, TrajectoryBank};
pub use composer::{ComposedPath, ComposerConfig, CompositionOutcome, PathComposer, PathInfo, Segment};
pub use corpus::{load_corpus, parse_corpus, save_corpus};
pub use executor::{ExecutionSummary, MotionExecutor, NoPause, Pacer, ThreadSleep};
pub use index::{DisplacementIndex, Neighbor};
pub use trajectory::{Displacement, Point, Trajectory};

use crate::input::InputError;

/// Motion errors
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("No usable trajectories in corpus")]
    EmptyCorpus,
    #[error("Failed to read corpus: {0}")]
    CorpusIo(#[from] std::io::Error),
    #[error("Malformed corpus: {0}")]
    CorpusFormat(#[from] serde_json::Error),
    #[error("Pointer error: {0}")]
    Input(#[from] InputError),
}
