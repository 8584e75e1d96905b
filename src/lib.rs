//! # perceptual-jpeg
//!
//! Perceptually guided JPEG re-encoding.
//!
//! Given RGB pixels or an existing JPEG/PNG, the optimizer searches over
//! quantization tables for the smallest baseline JPEG whose structural
//! dissimilarity (DSSIM) against the input stays within a budget derived
//! from a 0-100 quality setting.
//!
//! ## Features
//!
//! - **Baseline JPEG encoder** with DCT, quantization and optimized Huffman coding
//! - **Candidate search** that re-quantizes a single forward transform
//! - **JPEG and PNG input** via `jpeg-decoder` and `png`
//! - Optional parallel trials via the `parallel` feature
//! - Command-line tool `pjpeg` via the `cli` feature
//!
//! ## Example
//!
//! ```rust
//! use perceptual_jpeg::{optimize_rgb_array, DEFAULT_QUALITY};
//!
//! let white = vec![255u8; 2 * 2 * 3]; // 2x2 white RGB
//! let jpeg = optimize_rgb_array(&white, 2, 2, DEFAULT_QUALITY).unwrap();
//! assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
//! ```

#![forbid(unsafe_code)]

pub mod bits;
pub mod color;
pub mod decode;
pub mod error;
pub mod image;
pub mod jpeg;
pub mod metric;
pub mod optimize;
pub mod pixels;
pub mod search;

pub use color::ColorType;
pub use decode::decode;
pub use error::{Error, Result};
pub use image::{read_file, write_file, EncodedImage, ImageKind};
pub use jpeg::Subsampling;
pub use metric::{DistortionMetric, DssimMetric};
pub use optimize::{
    encode_from_jpeg, encode_from_pixels, optimize_image, optimize_rgb_array, read_pixels,
    OptimizeOptions, Optimized, Optimizer, DEFAULT_QUALITY,
};
pub use pixels::PixelBuffer;
pub use search::{QuantizationCandidate, SearchReport};
