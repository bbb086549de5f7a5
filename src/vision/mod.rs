//! Vision and target selection module
//!
//! Turns captured frames into a single pixel to click: color matching,
//! blob segmentation, exclusion-marker filtering and centre-weighted
//! sampling. Frames come from an external capture collaborator; nothing here
//! touches the screen.

pub mod blob;
pub mod color;
pub mod frame;
pub mod selection;

pub use blob::{BlobSegmenter, Connectivity, LabelMap, Segmentation};
pub use color::{ChannelThreshold, Color, PixelPredicate, ToleranceMatch};
pub use frame::PixelMask;
pub use selection::{
    select_random_pixel, select_target, SelectionMethod, SelectionParams, SelectionReport,
    TargetSelector,
};

/// Vision system errors
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Invalid color format: {0:?}")]
    InvalidColorFormat(String),
    #[error("Invalid frame data")]
    InvalidFrameData,
    #[error("Invalid downsample factor: {0}")]
    InvalidDownsampleFactor(u32),
}
