//! Connected-component labelling of match masks
//!
//! Anti-aliased UI text and outlines often touch only diagonally, so the
//! default connectivity is 8-way. Labels are dense: after the minimum-size
//! filter, surviving blobs are renumbered `1..=blob_count` and 0 is background.

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity as ImageprocConnectivity};

use super::frame::PixelMask;

/// Neighbourhood used to decide whether two cells belong to the same blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Orthogonal neighbours only
    Four,
    /// Orthogonal and diagonal neighbours
    #[default]
    Eight,
}

impl From<Connectivity> for ImageprocConnectivity {
    fn from(conn: Connectivity) -> Self {
        match conn {
            Connectivity::Four => ImageprocConnectivity::Four,
            Connectivity::Eight => ImageprocConnectivity::Eight,
        }
    }
}

/// Per-pixel blob labels (0 = background)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl LabelMap {
    /// Map dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Label at (x, y); out-of-bounds reads are background
    pub fn label(&self, x: u32, y: u32) -> u32 {
        if x < self.width && y < self.height {
            self.labels[y as usize * self.width as usize + x as usize]
        } else {
            0
        }
    }

    /// Member pixels of a blob, in row-major order
    pub fn pixels_of(&self, label: u32) -> Vec<(u32, u32)> {
        if label == 0 {
            return Vec::new();
        }
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == label)
            .map(|(i, _)| self.coords(i))
            .collect()
    }

    fn coords(&self, offset: usize) -> (u32, u32) {
        (
            (offset % self.width as usize) as u32,
            (offset / self.width as usize) as u32,
        )
    }
}

/// Summary of one labelled region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    /// Label in the [`LabelMap`] (>= 1)
    pub label: u32,
    /// Number of member pixels
    pub pixel_count: usize,
    /// Inclusive bounding box `(min_x, min_y, max_x, max_y)`
    pub bounds: (u32, u32, u32, u32),
}

/// Result of segmenting a mask
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub labels: LabelMap,
    /// Blobs ordered by label; `blobs[i].label == i + 1`
    pub blobs: Vec<Blob>,
}

impl Segmentation {
    /// Number of blobs (the highest label in use)
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Blob with the given label
    pub fn blob(&self, label: u32) -> Option<&Blob> {
        if label == 0 {
            return None;
        }
        self.blobs.get(label as usize - 1)
    }
}

/// Minimum blob size after downsampling by `factor`.
///
/// Downsampling shrinks a blob's area by roughly `factor²`, so the threshold
/// shrinks with it.
pub fn scaled_min_pixels(base_threshold: usize, factor: u32) -> usize {
    let factor = factor.max(1) as usize;
    base_threshold / (factor * factor)
}

/// Connected-component labeller with a minimum-size filter
#[derive(Debug, Clone, Copy)]
pub struct BlobSegmenter {
    connectivity: Connectivity,
    min_pixels: usize,
}

impl Default for BlobSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobSegmenter {
    /// 8-connected segmenter that keeps every blob
    pub fn new() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            min_pixels: 0,
        }
    }

    /// Set the connectivity
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Discard blobs smaller than `min_pixels`
    pub fn with_min_pixels(mut self, min_pixels: usize) -> Self {
        self.min_pixels = min_pixels;
        self
    }

    /// Label the mask, drop undersized blobs and renumber the rest densely
    pub fn segment(&self, mask: &PixelMask) -> Segmentation {
        let (width, height) = mask.dimensions();
        let raw = connected_components(&mask.to_gray_image(), self.connectivity.into(), Luma([0u8]));

        let raw_labels: Vec<u32> = raw.pixels().map(|p| p[0]).collect();
        let max_label = raw_labels.iter().copied().max().unwrap_or(0) as usize;

        let mut counts = vec![0usize; max_label + 1];
        for &label in &raw_labels {
            counts[label as usize] += 1;
        }

        // old label -> new dense label (0 = dropped)
        let mut remap = vec![0u32; max_label + 1];
        let mut next = 1u32;
        for old in 1..=max_label {
            if counts[old] > 0 && counts[old] >= self.min_pixels {
                remap[old] = next;
                next += 1;
            }
        }

        let kept = (next - 1) as usize;
        let mut blobs: Vec<Blob> = (1..=kept as u32)
            .map(|label| Blob {
                label,
                pixel_count: 0,
                bounds: (u32::MAX, u32::MAX, 0, 0),
            })
            .collect();

        let labels: Vec<u32> = raw_labels
            .iter()
            .enumerate()
            .map(|(i, &old)| {
                let new = remap[old as usize];
                if new > 0 {
                    let x = (i % width as usize) as u32;
                    let y = (i / width as usize) as u32;
                    let blob = &mut blobs[new as usize - 1];
                    blob.pixel_count += 1;
                    blob.bounds.0 = blob.bounds.0.min(x);
                    blob.bounds.1 = blob.bounds.1.min(y);
                    blob.bounds.2 = blob.bounds.2.max(x);
                    blob.bounds.3 = blob.bounds.3.max(y);
                }
                new
            })
            .collect();

        let dropped = max_label - kept;
        if dropped > 0 {
            log::debug!(
                "Dropped {} of {} blobs below {} pixels",
                dropped,
                max_label,
                self.min_pixels
            );
        }

        Segmentation {
            labels: LabelMap {
                width,
                height,
                labels,
            },
            blobs,
        }
    }
}

/// Label a mask with 8-connectivity and no size filter
pub fn segment(mask: &PixelMask) -> Segmentation {
    BlobSegmenter::new().segment(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_rect(mask: &mut PixelMask, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set(x, y, true);
            }
        }
    }

    #[test]
    fn test_diagonal_pixels_join_under_eight_connectivity() {
        let mut mask = PixelMask::new(4, 4);
        mask.set(1, 1, true);
        mask.set(2, 2, true);

        let eight = BlobSegmenter::new().segment(&mask);
        assert_eq!(eight.blob_count(), 1);

        let four = BlobSegmenter::new()
            .with_connectivity(Connectivity::Four)
            .segment(&mask);
        assert_eq!(four.blob_count(), 2);
    }

    #[test]
    fn test_min_size_filter_relabels_densely() {
        let mut mask = PixelMask::new(60, 60);
        // 5-pixel blob in the top-left corner
        fill_rect(&mut mask, 0, 0, 5, 1);
        // 2000-pixel blob well away from it
        fill_rect(&mut mask, 10, 10, 50, 40);

        let seg = BlobSegmenter::new().with_min_pixels(1000).segment(&mask);
        assert_eq!(seg.blob_count(), 1);

        let blob = seg.blob(1).unwrap();
        assert_eq!(blob.label, 1);
        assert_eq!(blob.pixel_count, 2000);
        assert_eq!(blob.bounds, (10, 10, 59, 49));

        // Small blob went back to background
        assert_eq!(seg.labels.label(0, 0), 0);
        assert_eq!(seg.labels.label(20, 20), 1);
    }

    #[test]
    fn test_labels_have_no_gaps() {
        let mut mask = PixelMask::new(20, 3);
        // Sizes 3, 1, 3, 1, 3 separated by empty columns
        fill_rect(&mut mask, 0, 0, 1, 3);
        mask.set(2, 0, true);
        fill_rect(&mut mask, 4, 0, 1, 3);
        mask.set(6, 0, true);
        fill_rect(&mut mask, 8, 0, 1, 3);

        let seg = BlobSegmenter::new().with_min_pixels(2).segment(&mask);
        assert_eq!(seg.blob_count(), 3);
        for label in 1..=seg.blob_count() as u32 {
            assert_eq!(seg.labels.pixels_of(label).len(), 3);
            assert_eq!(seg.blob(label).unwrap().label, label);
        }
    }

    #[test]
    fn test_empty_mask() {
        let seg = segment(&PixelMask::new(5, 5));
        assert_eq!(seg.blob_count(), 0);
        assert!(seg.blob(1).is_none());
        assert!(seg.labels.pixels_of(0).is_empty());
    }

    #[test]
    fn test_scaled_min_pixels() {
        assert_eq!(scaled_min_pixels(1000, 1), 1000);
        assert_eq!(scaled_min_pixels(1000, 4), 62);
        assert_eq!(scaled_min_pixels(1000, 0), 1000);
    }
}
