//! Crate-wide error type

use crate::config::ConfigError;
use crate::input::InputError;
use crate::motion::MotionError;
use crate::vision::VisionError;

/// Any error the crate can return
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error(transparent)]
    Motion(#[from] MotionError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
