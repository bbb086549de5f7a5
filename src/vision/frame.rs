//! Frame handling
//!
//! Receives raw pixel buffers from the screen-capture collaborator, turns
//! them into RGB frames, and provides the boolean masks and the area-based
//! downsampling used by target selection.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};

use super::VisionError;

/// Build an RGB frame from a raw RGBA buffer (alpha is dropped)
pub fn frame_from_rgba(frame_data: &[u8], width: u32, height: u32) -> Result<RgbImage, VisionError> {
    frame_from_raw(frame_data, width, height, 4)
}

/// Build an RGB frame from a raw, tightly packed RGB buffer
pub fn frame_from_rgb(frame_data: &[u8], width: u32, height: u32) -> Result<RgbImage, VisionError> {
    frame_from_raw(frame_data, width, height, 3)
}

fn frame_from_raw(
    frame_data: &[u8],
    width: u32,
    height: u32,
    channels: usize,
) -> Result<RgbImage, VisionError> {
    // Validate frame data size
    let expected_size = width as usize * height as usize * channels;
    if frame_data.len() != expected_size {
        return Err(VisionError::InvalidFrameData);
    }

    let rgb: Vec<u8> = if channels == 3 {
        frame_data.to_vec()
    } else {
        frame_data
            .chunks_exact(channels)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    };

    ImageBuffer::from_raw(width, height, rgb).ok_or(VisionError::InvalidFrameData)
}

/// Shrink a frame by an integer factor, averaging each `factor x factor` block.
///
/// Trailing rows/columns that do not fill a whole block are dropped. A factor
/// of 1 returns a copy of the input.
pub fn downsample(frame: &RgbImage, factor: u32) -> Result<RgbImage, VisionError> {
    if factor == 0 {
        return Err(VisionError::InvalidDownsampleFactor(factor));
    }
    if factor == 1 {
        return Ok(frame.clone());
    }

    let (width, height) = frame.dimensions();
    let out_width = width / factor;
    let out_height = height / factor;
    let area = factor * factor;

    let image = ImageBuffer::from_fn(out_width, out_height, |ox, oy| {
        let mut sums = [0u32; 3];
        for y in oy * factor..(oy + 1) * factor {
            for x in ox * factor..(ox + 1) * factor {
                let pixel = frame.get_pixel(x, y);
                sums[0] += pixel[0] as u32;
                sums[1] += pixel[1] as u32;
                sums[2] += pixel[2] as u32;
            }
        }
        // Round to nearest
        image::Rgb([
            ((sums[0] + area / 2) / area) as u8,
            ((sums[1] + area / 2) / area) as u8,
            ((sums[2] + area / 2) / area) as u8,
        ])
    });

    Ok(image)
}

/// Map a coordinate in a downsampled frame back to the centre of its block
/// in the original resolution
pub fn upsample_point(point: (u32, u32), factor: u32) -> (u32, u32) {
    if factor <= 1 {
        return point;
    }
    (
        point.0 * factor + factor / 2,
        point.1 * factor + factor / 2,
    )
}

/// Boolean grid with the same dimensions as the frame it was computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl PixelMask {
    /// Create an all-false mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    /// Create a mask by evaluating `f` at every coordinate
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Mask dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Value at (x, y); out-of-bounds reads are false
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x < self.width && y < self.height {
            self.cells[self.offset(x, y)]
        } else {
            false
        }
    }

    /// Set the value at (x, y). Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let offset = self.offset(x, y);
            self.cells[offset] = value;
        }
    }

    /// Number of true cells
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Whether no cell is set
    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }

    /// Coordinates of all true cells in row-major order
    pub fn coordinates(&self) -> Vec<(u32, u32)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c)
            .map(|(i, _)| ((i % self.width as usize) as u32, (i / self.width as usize) as u32))
            .collect()
    }

    /// Render as a binary grayscale image (255 = set) for imageproc operators
    pub fn to_gray_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
