//! Target pixel selection
//!
//! Picks where to click: match the target color, segment the matches into
//! blobs, throw away blobs whose immediate surroundings show an exclusion
//! marker, then sample one surviving pixel with a preference for the centre
//! of the frame.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::blob::{scaled_min_pixels, Blob, BlobSegmenter, Connectivity, Segmentation};
use super::color::{find_all, mask_where, Color, PixelPredicate};
use super::frame::{downsample, upsample_point, PixelMask};
use super::VisionError;

/// Radius of the square neighbourhood inspected around each blob (5x5)
const BORDER_RADIUS: u8 = 2;

/// How a target pixel is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Blob segmentation, exclusion check and centre-weighted sampling
    #[default]
    Smart,
    /// Uniform pick among all matching pixels
    Random,
}

/// Parameters for smart selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionParams {
    /// Color to click on
    pub target: Color,
    /// Euclidean tolerance for the target color
    pub tolerance: f64,
    /// Integer shrink factor applied before segmentation (1 = none)
    pub downsample_factor: u32,
    /// Minimum blob size at full resolution
    pub min_blob_pixels: usize,
    /// Decay rate of the centre weighting (0 = uniform)
    pub center_falloff: f64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            target: Color::new(0, 255, 255),
            tolerance: 10.0,
            downsample_factor: 4,
            min_blob_pixels: 1000,
            center_falloff: 4.0,
        }
    }
}

/// Diagnostics from one selection pass
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionReport {
    /// Blobs that passed the size filter
    pub blob_count: usize,
    /// Blobs that also passed the exclusion check
    pub valid_blob_count: usize,
    /// Pixels eligible for sampling (at the working resolution)
    pub candidate_count: usize,
    /// Chosen pixel in original-frame coordinates
    pub selected: Option<(u32, u32)>,
    /// Sampling probability of the chosen pixel
    pub probability: Option<f64>,
}

impl SelectionReport {
    fn empty(blob_count: usize, valid_blob_count: usize) -> Self {
        Self {
            blob_count,
            valid_blob_count,
            candidate_count: 0,
            selected: None,
            probability: None,
        }
    }
}

/// Smart target selector
pub struct TargetSelector<P> {
    params: SelectionParams,
    exclusion: P,
    connectivity: Connectivity,
}

impl<P: PixelPredicate> TargetSelector<P> {
    /// Create a selector with an exclusion predicate
    pub fn new(params: SelectionParams, exclusion: P) -> Self {
        Self {
            params,
            exclusion,
            connectivity: Connectivity::Eight,
        }
    }

    /// Override the blob connectivity
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Selection parameters
    pub fn params(&self) -> &SelectionParams {
        &self.params
    }

    /// Choose a pixel to click, or `None` when no valid target is visible
    pub fn select<R: Rng + ?Sized>(
        &self,
        frame: &RgbImage,
        rng: &mut R,
    ) -> Result<Option<(u32, u32)>, VisionError> {
        Ok(self.select_with_report(frame, rng)?.selected)
    }

    /// Choose a pixel and report how the decision was reached
    pub fn select_with_report<R: Rng + ?Sized>(
        &self,
        frame: &RgbImage,
        rng: &mut R,
    ) -> Result<SelectionReport, VisionError> {
        let factor = self.params.downsample_factor;
        let working = downsample(frame, factor)?;
        let (width, height) = working.dimensions();
        if factor > 1 {
            log::debug!(
                "Downsampled {}x{} to {}x{}",
                frame.width(),
                frame.height(),
                width,
                height
            );
        }

        let target_mask = find_all(&working, self.params.target, self.params.tolerance);
        let exclusion_mask = mask_where(&working, &self.exclusion);

        let segmentation = BlobSegmenter::new()
            .with_connectivity(self.connectivity)
            .with_min_pixels(scaled_min_pixels(self.params.min_blob_pixels, factor))
            .segment(&target_mask);
        log::debug!("Found {} candidate targets", segmentation.blob_count());

        let valid = valid_blobs(&segmentation, &exclusion_mask);
        let valid_blob_count = valid.iter().filter(|&&v| v).count();
        log::debug!("Found {} valid targets", valid_blob_count);

        let candidates = candidate_pixels(&segmentation, &valid);
        if candidates.is_empty() {
            log::info!(
                "No valid target for {} ({} blobs, all excluded or none found)",
                self.params.target,
                segmentation.blob_count()
            );
            return Ok(SelectionReport::empty(
                segmentation.blob_count(),
                valid_blob_count,
            ));
        }

        let weights = center_weights(&candidates, width, height, self.params.center_falloff);
        let (chosen, probability) = sample_weighted(&weights, rng);
        let selected = upsample_point(candidates[chosen], factor);

        log::info!(
            "Selected {:?} from {} candidate pixels (p = {:.5})",
            selected,
            candidates.len(),
            probability
        );

        Ok(SelectionReport {
            blob_count: segmentation.blob_count(),
            valid_blob_count,
            candidate_count: candidates.len(),
            selected: Some(selected),
            probability: Some(probability),
        })
    }
}

/// One-shot smart selection
pub fn select_target<P, R>(
    frame: &RgbImage,
    params: SelectionParams,
    exclusion: P,
    rng: &mut R,
) -> Result<Option<(u32, u32)>, VisionError>
where
    P: PixelPredicate,
    R: Rng + ?Sized,
{
    TargetSelector::new(params, exclusion).select(frame, rng)
}

/// Pick any pixel matching `target`, uniformly, with no blob analysis
pub fn select_random_pixel<R: Rng + ?Sized>(
    frame: &RgbImage,
    target: Color,
    tolerance: f64,
    rng: &mut R,
) -> Option<(u32, u32)> {
    let coords = find_all(frame, target, tolerance).coordinates();
    let chosen = coords.choose(rng).copied();
    if chosen.is_none() {
        log::info!("No pixels found with color {}", target);
    }
    chosen
}

/// Per-blob validity, indexed by `label - 1`
fn valid_blobs(segmentation: &Segmentation, exclusion: &PixelMask) -> Vec<bool> {
    segmentation
        .blobs
        .iter()
        .map(|blob| !border_touches(segmentation, blob, exclusion))
        .collect()
}

/// Whether any exclusion pixel lies in the blob's 5x5 dilation ring
fn border_touches(segmentation: &Segmentation, blob: &Blob, exclusion: &PixelMask) -> bool {
    let (width, height) = segmentation.labels.dimensions();
    let radius = BORDER_RADIUS as u32;
    let (min_x, min_y, max_x, max_y) = blob.bounds;

    // Work in a window around the blob, clamped to the frame
    let x0 = min_x.saturating_sub(radius);
    let y0 = min_y.saturating_sub(radius);
    let x1 = (max_x + radius).min(width - 1);
    let y1 = (max_y + radius).min(height - 1);

    let local: GrayImage = ImageBuffer::from_fn(x1 - x0 + 1, y1 - y0 + 1, |lx, ly| {
        if segmentation.labels.label(x0 + lx, y0 + ly) == blob.label {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    let dilated = dilate(&local, Norm::LInf, BORDER_RADIUS);

    dilated.enumerate_pixels().any(|(lx, ly, px)| {
        px[0] > 0 && local.get_pixel(lx, ly)[0] == 0 && exclusion.get(x0 + lx, y0 + ly)
    })
}

/// Pixels of every valid blob in row-major order
fn candidate_pixels(segmentation: &Segmentation, valid: &[bool]) -> Vec<(u32, u32)> {
    let (width, height) = segmentation.labels.dimensions();
    let mut candidates = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let label = segmentation.labels.label(x, y);
            if label > 0 && valid[label as usize - 1] {
                candidates.push((x, y));
            }
        }
    }
    candidates
}

/// Unnormalised weights `exp(-falloff * d)`, where `d` is the distance from the
/// frame centre after scaling each axis by the frame size
pub fn center_weights(candidates: &[(u32, u32)], width: u32, height: u32, falloff: f64) -> Vec<f64> {
    let center_x = (width / 2) as f64;
    let center_y = (height / 2) as f64;
    let width = width.max(1) as f64;
    let height = height.max(1) as f64;

    candidates
        .iter()
        .map(|&(x, y)| {
            let nx = (x as f64 - center_x) / width;
            let ny = (y as f64 - center_y) / height;
            (-falloff * (nx * nx + ny * ny).sqrt()).exp()
        })
        .collect()
}

/// Draw an index proportionally to `weights`, falling back to a uniform draw
/// when the weights are degenerate. Returns the index and its probability.
fn sample_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> (usize, f64) {
    let total: f64 = weights.iter().sum();
    if total.is_finite() && total > 0.0 {
        match WeightedIndex::new(weights) {
            Ok(dist) => {
                let index = dist.sample(rng);
                return (index, weights[index] / total);
            }
            Err(e) => log::warn!("Falling back to uniform sampling: {}", e),
        }
    } else {
        log::warn!("Falling back to uniform sampling: weight total is {}", total);
    }

    let index = rng.gen_range(0..weights.len());
    (index, 1.0 / weights.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::ChannelThreshold;
    use image::Rgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CYAN: Rgb<u8> = Rgb([0, 255, 255]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn params(factor: u32, min_pixels: usize, falloff: f64) -> SelectionParams {
        SelectionParams {
            target: Color::new(0, 255, 255),
            tolerance: 10.0,
            downsample_factor: factor,
            min_blob_pixels: min_pixels,
            center_falloff: falloff,
        }
    }

    fn paint(frame: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                frame.put_pixel(x, y, color);
            }
        }
    }

    #[test]
    fn test_selects_pixel_inside_target() {
        let mut frame = RgbImage::from_pixel(40, 40, BLACK);
        paint(&mut frame, 10, 10, 6, 6, CYAN);

        let selector = TargetSelector::new(params(1, 4, 4.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let (x, y) = selector.select(&frame, &mut rng).unwrap().unwrap();
            assert!((10..16).contains(&x) && (10..16).contains(&y));
        }
    }

    #[test]
    fn test_surrounded_blob_is_excluded() {
        let mut frame = RgbImage::from_pixel(30, 30, BLACK);
        // Green ring two pixels wide around a cyan square
        paint(&mut frame, 8, 8, 14, 14, GREEN);
        paint(&mut frame, 10, 10, 10, 10, CYAN);

        let selector = TargetSelector::new(params(1, 4, 4.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(1);

        let report = selector.select_with_report(&frame, &mut rng).unwrap();
        assert_eq!(report.blob_count, 1);
        assert_eq!(report.valid_blob_count, 0);
        assert_eq!(report.selected, None);
    }

    #[test]
    fn test_single_marker_pixel_excludes_whole_blob() {
        let mut frame = RgbImage::from_pixel(40, 20, BLACK);
        paint(&mut frame, 2, 2, 8, 8, CYAN);
        paint(&mut frame, 25, 2, 8, 8, CYAN);
        // One marker pixel two columns right of the first blob
        frame.put_pixel(11, 5, GREEN);

        let selector = TargetSelector::new(params(1, 4, 0.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(3);

        let report = selector.select_with_report(&frame, &mut rng).unwrap();
        assert_eq!(report.blob_count, 2);
        assert_eq!(report.valid_blob_count, 1);
        assert_eq!(report.candidate_count, 64);
        for _ in 0..50 {
            let (x, _) = selector.select(&frame, &mut rng).unwrap().unwrap();
            assert!(x >= 25);
        }
    }

    #[test]
    fn test_marker_outside_ring_is_ignored() {
        let mut frame = RgbImage::from_pixel(30, 20, BLACK);
        paint(&mut frame, 2, 2, 8, 8, CYAN);
        // Three columns away: outside the 5x5 neighbourhood
        frame.put_pixel(12, 5, GREEN);

        let selector = TargetSelector::new(params(1, 4, 4.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(3);
        assert!(selector.select(&frame, &mut rng).unwrap().is_some());
    }

    #[test]
    fn test_no_match_returns_none() {
        let frame = RgbImage::from_pixel(20, 20, BLACK);
        let mut rng = StdRng::seed_from_u64(0);
        let result = select_target(
            &frame,
            params(1, 1, 4.0),
            ChannelThreshold::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_small_blobs_are_filtered() {
        let mut frame = RgbImage::from_pixel(20, 20, BLACK);
        paint(&mut frame, 5, 5, 2, 2, CYAN);

        let selector = TargetSelector::new(params(1, 10, 4.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(0);
        let report = selector.select_with_report(&frame, &mut rng).unwrap();
        assert_eq!(report.blob_count, 0);
        assert_eq!(report.selected, None);
    }

    #[test]
    fn test_downsampled_selection_is_upsampled() {
        let mut frame = RgbImage::from_pixel(64, 64, BLACK);
        paint(&mut frame, 16, 16, 16, 16, CYAN);

        // 16x16 block at factor 4 becomes 4x4; threshold 64 / 16 = 4 pixels
        let selector = TargetSelector::new(params(4, 64, 4.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            let (x, y) = selector.select(&frame, &mut rng).unwrap().unwrap();
            assert!((16..32).contains(&x) && (16..32).contains(&y));
            // Always the centre of a 4x4 block
            assert_eq!(x % 4, 2);
            assert_eq!(y % 4, 2);
        }
    }

    #[test]
    fn test_center_bias() {
        // Two equal blobs: one at the centre, one in the corner
        let mut frame = RgbImage::from_pixel(100, 100, BLACK);
        paint(&mut frame, 48, 48, 4, 4, CYAN);
        paint(&mut frame, 0, 0, 4, 4, CYAN);

        let selector = TargetSelector::new(params(1, 4, 4.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(42);

        let mut central = 0;
        let mut corner = 0;
        for _ in 0..2000 {
            let (x, _) = selector.select(&frame, &mut rng).unwrap().unwrap();
            if x >= 48 {
                central += 1;
            } else {
                corner += 1;
            }
        }
        assert!(central > corner, "central {central} vs corner {corner}");
        // exp(-4 * ~0.68) is roughly 0.066, so the corner should be rare
        assert!(corner < 300);
    }

    #[test]
    fn test_zero_falloff_is_uniform() {
        let mut frame = RgbImage::from_pixel(100, 100, BLACK);
        paint(&mut frame, 48, 48, 4, 4, CYAN);
        paint(&mut frame, 0, 0, 4, 4, CYAN);

        let selector = TargetSelector::new(params(1, 4, 0.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 4000;
        let central = (0..trials)
            .filter(|_| {
                let (x, _) = selector.select(&frame, &mut rng).unwrap().unwrap();
                x >= 48
            })
            .count();
        // Expected 2000 with standard deviation ~32
        assert!((1800..=2200).contains(&central), "central {central}");
    }

    #[test]
    fn test_center_weights() {
        let weights = center_weights(&[(50, 50), (0, 50), (100, 100)], 100, 100, 2.0);
        assert!((weights[0] - 1.0).abs() < 1e-12);
        assert!((weights[1] - (-1.0f64).exp()).abs() < 1e-12);
        assert!(weights[2] < weights[1]);

        let flat = center_weights(&[(0, 0), (50, 50)], 100, 100, 0.0);
        assert_eq!(flat, vec![1.0, 1.0]);
    }

    #[test]
    fn test_degenerate_weights_fall_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = [0usize; 3];
        for _ in 0..300 {
            let (index, probability) = sample_weighted(&[0.0, 0.0, 0.0], &mut rng);
            assert!((probability - 1.0 / 3.0).abs() < 1e-12);
            seen[index] += 1;
        }
        assert!(seen.iter().all(|&n| n > 50));
    }

    #[test]
    fn test_overflowing_weights_fall_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(5);
        for weights in [
            [f64::INFINITY, 1.0, 1.0],
            [f64::MAX, f64::MAX, 1.0],
            [f64::NAN, 1.0, 1.0],
        ] {
            let (index, probability) = sample_weighted(&weights, &mut rng);
            assert!(index < 3);
            assert!((probability - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_negative_falloff_does_not_panic() {
        // Edge pixels get weights near exp(2000 * 0.7), which overflows
        let mut frame = RgbImage::from_pixel(100, 100, BLACK);
        paint(&mut frame, 0, 0, 4, 4, CYAN);

        let selector = TargetSelector::new(params(1, 4, -2000.0), ChannelThreshold::default());
        let mut rng = StdRng::seed_from_u64(0);
        let report = selector.select_with_report(&frame, &mut rng).unwrap();

        let (x, y) = report.selected.unwrap();
        assert!(x < 4 && y < 4);
        assert_eq!(report.probability, Some(1.0 / 16.0));

        // Extreme positive falloff underflows every weight to zero instead
        let selector = TargetSelector::new(params(1, 4, 5000.0), ChannelThreshold::default());
        let (x, y) = selector.select(&frame, &mut rng).unwrap().unwrap();
        assert!(x < 4 && y < 4);
    }

    #[test]
    fn test_random_pixel_select() {
        let mut frame = RgbImage::from_pixel(10, 10, BLACK);
        frame.put_pixel(3, 7, CYAN);
        let mut rng = StdRng::seed_from_u64(9);

        assert_eq!(
            select_random_pixel(&frame, Color::new(0, 255, 255), 0.0, &mut rng),
            Some((3, 7))
        );
        assert_eq!(
            select_random_pixel(&frame, Color::new(255, 0, 0), 10.0, &mut rng),
            None
        );
    }
}
