//! Perceptual distance between a reference image and a decoded candidate.

use dssim_core::Dssim;
use rgb::RGB8;

use crate::error::{Error, Result};
use crate::pixels::PixelBuffer;

/// Smallest side handed to the comparator; smaller images are edge-padded.
const MIN_SIDE: usize = 8;

/// A distance where 0.0 means identical and larger means more visible error.
pub trait DistortionMetric: Sync {
    /// Compare `candidate` against `reference`. Both must share dimensions.
    fn distance(&self, reference: &PixelBuffer, candidate: &PixelBuffer) -> Result<f64>;
}

/// Multi-scale structural dissimilarity (DSSIM).
pub struct DssimMetric {
    attr: Dssim,
}

impl DssimMetric {
    pub fn new() -> Self {
        Self { attr: Dssim::new() }
    }
}

impl Default for DssimMetric {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DssimMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DssimMetric")
    }
}

impl DistortionMetric for DssimMetric {
    fn distance(&self, reference: &PixelBuffer, candidate: &PixelBuffer) -> Result<f64> {
        if reference.width() != candidate.width() || reference.height() != candidate.height() {
            return Err(Error::SizeMismatch {
                expected: reference.len(),
                actual: candidate.len(),
            });
        }

        let (orig, width, height) = padded_rgb(reference);
        let (dec, _, _) = padded_rgb(candidate);

        // Only fails for buffers shorter than width * height, which
        // padded_rgb never produces.
        let rejected = || Error::Metric(format!("comparator rejected a {width}x{height} image"));
        let orig_img = self
            .attr
            .create_image_rgb(&orig, width, height)
            .ok_or_else(rejected)?;
        let dec_img = self
            .attr
            .create_image_rgb(&dec, width, height)
            .ok_or_else(rejected)?;

        let (dssim, _) = self.attr.compare(&orig_img, dec_img);
        Ok(dssim.into())
    }
}

/// Convert to `RGB8`, replicating the last row/column up to `MIN_SIDE`.
fn padded_rgb(pixels: &PixelBuffer) -> (Vec<RGB8>, usize, usize) {
    let src_w = pixels.width() as usize;
    let src_h = pixels.height() as usize;
    let width = src_w.max(MIN_SIDE);
    let height = src_h.max(MIN_SIDE);
    let data = pixels.as_bytes();

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let sy = y.min(src_h - 1);
        for x in 0..width {
            let p = (sy * src_w + x.min(src_w - 1)) * 3;
            out.push(RGB8::new(data[p], data[p + 1], data[p + 2]));
        }
    }
    (out, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(width: u32, height: u32, seed: u32) -> PixelBuffer {
        let mut state = seed;
        let data = (0..width * height * 3)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect();
        PixelBuffer::new(data, width, height).unwrap()
    }

    #[test]
    fn test_identical_images_have_zero_distance() {
        let img = noise(32, 32, 7);
        let d = DssimMetric::new().distance(&img, &img).unwrap();
        assert!(d.abs() < 1e-5, "distance = {d}");
    }

    #[test]
    fn test_different_images_have_positive_distance() {
        let a = noise(32, 32, 7);
        let b = noise(32, 32, 8);
        assert!(DssimMetric::new().distance(&a, &b).unwrap() > 0.0);
    }

    #[test]
    fn test_tiny_images_are_padded() {
        let white = PixelBuffer::new(vec![255; 12], 2, 2).unwrap();
        let d = DssimMetric::new().distance(&white, &white).unwrap();
        assert!(d.abs() < 1e-5);
    }

    #[test]
    fn test_metric_error_message() {
        let err = Error::Metric("comparator rejected a 8x8 image".to_string());
        assert_eq!(
            err.to_string(),
            "Distortion metric failed: comparator rejected a 8x8 image"
        );
    }

    #[test]
    fn test_padded_length_matches_dimensions() {
        for (w, h) in [(1, 1), (3, 17), (9, 2), (8, 8)] {
            let img = noise(w, h, 3);
            let (px, pw, ph) = padded_rgb(&img);
            assert_eq!(px.len(), pw * ph);
            assert!(pw >= MIN_SIDE && ph >= MIN_SIDE);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = noise(8, 8, 1);
        let b = noise(8, 9, 1);
        assert!(matches!(
            DssimMetric::new().distance(&a, &b),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_padded_rgb_replicates_edges() {
        let img = PixelBuffer::new(vec![1, 2, 3, 4, 5, 6], 2, 1).unwrap();
        let (px, w, h) = padded_rgb(&img);
        assert_eq!((w, h), (8, 8));
        assert_eq!(px[0], RGB8::new(1, 2, 3));
        assert_eq!(px[7], RGB8::new(4, 5, 6));
        assert_eq!(px[8 * 7 + 7], RGB8::new(4, 5, 6));
    }
}
