//! Owned RGB pixel buffers.

use crate::error::{Error, Result};

/// Maximum dimension a baseline JPEG frame header can describe.
pub const MAX_DIMENSION: u32 = 65535;

/// Interleaved, row-major 8-bit RGB samples with their dimensions.
///
/// The buffer always holds exactly `width * height * 3` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Take ownership of `samples` as a `width` x `height` RGB image.
    ///
    /// # Errors
    /// - [`Error::InvalidDimensions`] if either dimension is zero.
    /// - [`Error::ImageTooLarge`] if either dimension exceeds [`MAX_DIMENSION`].
    /// - [`Error::SizeMismatch`] if `samples.len() != width * height * 3`.
    pub fn new(samples: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::ImageTooLarge {
                width,
                height,
                max: MAX_DIMENSION,
            });
        }

        let expected = width as usize * height as usize * 3;
        if samples.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }

        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Copy `samples` into a new buffer.
    pub fn from_slice(samples: &[u8], width: u32, height: u32) -> Result<Self> {
        Self::new(samples.to_vec(), width, height)
    }

    /// Expand 8-bit grayscale samples to RGB.
    pub fn from_gray(gray: &[u8], width: u32, height: u32) -> Result<Self> {
        let samples = gray.iter().flat_map(|&v| [v, v, v]).collect();
        Self::new(samples, width, height)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes held (`width * height * 3`).
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; a buffer holds at least one pixel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// True when every pixel has R == G == B.
    pub fn is_grayscale(&self) -> bool {
        self.samples
            .chunks_exact(3)
            .all(|px| px[0] == px[1] && px[1] == px[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let buf = PixelBuffer::new(vec![0xFF; 12], 2, 2).unwrap();
        assert_eq!(buf.width(), 2);
        assert_eq!(buf.height(), 2);
        assert_eq!(buf.len(), 12);
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_new_size_mismatch() {
        let err = PixelBuffer::new(vec![0; 11], 2, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::SizeMismatch {
                expected: 12,
                actual: 11
            }
        ));
    }

    #[test]
    fn test_new_zero_dimension() {
        assert!(matches!(
            PixelBuffer::new(Vec::new(), 0, 4),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_new_too_large() {
        assert!(matches!(
            PixelBuffer::new(vec![0; 65536 * 3], 65536, 1),
            Err(Error::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn test_from_gray_expands() {
        let buf = PixelBuffer::from_gray(&[10, 20], 2, 1).unwrap();
        assert_eq!(buf.as_bytes(), &[10, 10, 10, 20, 20, 20]);
        assert!(buf.is_grayscale());
    }

    #[test]
    fn test_is_grayscale_detects_color() {
        let buf = PixelBuffer::new(vec![10, 10, 10, 10, 11, 10], 2, 1).unwrap();
        assert!(!buf.is_grayscale());
    }

    #[test]
    fn test_into_samples_returns_storage() {
        let samples = vec![1, 2, 3];
        let buf = PixelBuffer::new(samples.clone(), 1, 1).unwrap();
        assert_eq!(buf.into_samples(), samples);
    }
}
