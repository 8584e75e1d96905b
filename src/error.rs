//! Error types for the perceptual-jpeg library.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::image::ImageKind;

/// Result type alias for perceptual-jpeg operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, decoding or optimizing an image.
#[derive(Debug)]
pub enum Error {
    /// Sample buffer length doesn't match `width * height * 3`.
    SizeMismatch {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes provided.
        actual: usize,
    },
    /// Invalid image dimensions (zero width or height).
    InvalidDimensions {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
    /// Image dimensions exceed what a baseline JPEG frame can describe.
    ImageTooLarge {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Maximum supported dimension.
        max: u32,
    },
    /// Invalid quality parameter (must be 0-100).
    InvalidQuality(u8),
    /// An optimizer option is out of range.
    InvalidOption(&'static str),
    /// Input bytes are not a recognized image container.
    UnsupportedFormat,
    /// Input was recognized but could not be decoded.
    Decode {
        /// Container the bytes were sniffed as.
        kind: ImageKind,
        /// Decoder message.
        reason: String,
    },
    /// The distortion metric could not compare two images.
    Metric(String),
    /// File could not be read or written.
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// No candidate met the distortion target (strict mode only).
    DistortionUnreachable {
        /// Distortion budget for the requested quality.
        threshold: f64,
        /// Lowest distortion any candidate reached.
        best_distortion: f64,
        /// Number of candidates evaluated.
        iterations: u32,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SizeMismatch { expected, actual } => {
                write!(
                    f,
                    "Invalid pixel data length: expected {} bytes of RGB data, got {}",
                    expected, actual
                )
            }
            Error::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            Error::ImageTooLarge { width, height, max } => {
                write!(
                    f,
                    "Image {}x{} exceeds maximum dimension {}",
                    width, height, max
                )
            }
            Error::InvalidQuality(q) => {
                write!(f, "Invalid quality {}: must be 0-100", q)
            }
            Error::InvalidOption(msg) => write!(f, "Invalid option: {}", msg),
            Error::UnsupportedFormat => {
                write!(f, "Unsupported image format: expected JPEG or PNG")
            }
            Error::Decode { kind, reason } => {
                write!(f, "Failed to decode {:?} image: {}", kind, reason)
            }
            Error::Metric(reason) => write!(f, "Distortion metric failed: {}", reason),
            Error::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            Error::DistortionUnreachable {
                threshold,
                best_distortion,
                iterations,
            } => {
                write!(
                    f,
                    "No candidate reached distortion {:.6} after {} trials (best {:.6})",
                    threshold, iterations, best_distortion
                )
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
