//! Color parsing and matching
//!
//! Target colors are matched by Euclidean RGB distance. Exclusion markers use
//! hard per-channel thresholds instead, so both rules implement
//! [`PixelPredicate`] and the selector does not care which one it is given.

use std::fmt;
use std::str::FromStr;

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use super::frame::PixelMask;
use super::VisionError;

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Create a color from its channels
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB` or `RRGGBBAA`, with or without a leading `#`.
    ///
    /// The alpha byte of an 8-digit string is accepted and ignored.
    pub fn from_hex(hex: &str) -> Result<Self, VisionError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);

        if !(digits.len() == 6 || digits.len() == 8) || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(VisionError::InvalidColorFormat(hex.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| VisionError::InvalidColorFormat(hex.to_string()))
        };

        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Uppercase `RRGGBB` representation
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Squared Euclidean distance between two colors
    pub fn distance_squared(&self, other: &Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// Euclidean distance between two colors
    pub fn distance(&self, other: &Color) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    /// Whether `other` lies within `tolerance` of this color
    pub fn matches(&self, other: &Color, tolerance: f64) -> bool {
        within(self.distance_squared(other), tolerance)
    }
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Rgb<u8>> for Color {
    fn from(pixel: Rgb<u8>) -> Self {
        Self::new(pixel[0], pixel[1], pixel[2])
    }
}

impl FromStr for Color {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = VisionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Tolerance test on a squared distance. A negative tolerance matches nothing.
fn within(distance_squared: u32, tolerance: f64) -> bool {
    tolerance >= 0.0 && distance_squared as f64 <= tolerance * tolerance
}

/// Whether a pixel matches a target color within tolerance
pub fn matches(pixel: Color, target: Color, tolerance: f64) -> bool {
    pixel.matches(&target, tolerance)
}

/// Mask of every pixel within `tolerance` of `target`
pub fn find_all(frame: &RgbImage, target: Color, tolerance: f64) -> PixelMask {
    mask_where(frame, &ToleranceMatch::new(target, tolerance))
}

/// Mask of every pixel accepted by `predicate`
pub fn mask_where<P: PixelPredicate + ?Sized>(frame: &RgbImage, predicate: &P) -> PixelMask {
    let (width, height) = frame.dimensions();
    PixelMask::from_fn(width, height, |x, y| {
        predicate.accepts(Color::from(*frame.get_pixel(x, y)))
    })
}

/// A per-pixel color test
pub trait PixelPredicate {
    /// Whether the pixel is accepted
    fn accepts(&self, pixel: Color) -> bool;
}

impl<F> PixelPredicate for F
where
    F: Fn(Color) -> bool,
{
    fn accepts(&self, pixel: Color) -> bool {
        self(pixel)
    }
}

/// Euclidean-distance match against one target color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceMatch {
    pub target: Color,
    pub tolerance: f64,
}

impl ToleranceMatch {
    /// Create a tolerance matcher
    pub fn new(target: Color, tolerance: f64) -> Self {
        Self { target, tolerance }
    }
}

impl PixelPredicate for ToleranceMatch {
    fn accepts(&self, pixel: Color) -> bool {
        within(pixel.distance_squared(&self.target), self.tolerance)
    }
}

/// Hard channel thresholds: green above `min_green`, red and blue below
/// their maxima (all strict).
///
/// The default describes the bright-green combat marker drawn next to
/// monsters that are already engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelThreshold {
    pub min_green: u8,
    pub max_red: u8,
    pub max_blue: u8,
}

impl Default for ChannelThreshold {
    fn default() -> Self {
        Self {
            min_green: 200,
            max_red: 20,
            max_blue: 20,
        }
    }
}

impl PixelPredicate for ChannelThreshold {
    fn accepts(&self, pixel: Color) -> bool {
        pixel.g > self.min_green && pixel.r < self.max_red && pixel.b < self.max_blue
    }
}
