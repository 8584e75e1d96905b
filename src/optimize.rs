//! Public optimization entry points.
//!
//! Ties the pieces together: decode input, pick a frame layout, run the
//! candidate search and wrap the winner as an [`EncodedImage`].

use std::path::Path;

use tracing::{debug, info};

use crate::color::ColorType;
use crate::decode::decode;
use crate::error::{Error, Result};
use crate::image::{read_file, EncodedImage, ImageKind};
use crate::jpeg::quantize::{closest_level, read_luminance_table};
use crate::jpeg::{BlockImage, JpegOptions, Subsampling};
use crate::metric::{DistortionMetric, DssimMetric};
use crate::pixels::PixelBuffer;
use crate::search::{search, SearchParams, SearchReport};

/// Quality used when the caller does not pick one.
pub const DEFAULT_QUALITY: u8 = 95;

/// Options for a single optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Quality 0-100; sets the distortion budget.
    pub quality: u8,
    /// Maximum number of candidates to evaluate (at least 1).
    pub max_iterations: u32,
    /// Fail with [`Error::DistortionUnreachable`] instead of returning a
    /// best-effort result.
    pub strict: bool,
    /// Chroma subsampling for color images.
    pub subsampling: Subsampling,
    /// If true, build image-optimized Huffman tables.
    pub optimize_huffman: bool,
    /// If true, neutral images are written as single-component JPEGs.
    pub detect_grayscale: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl OptimizeOptions {
    /// Balanced defaults at `quality`.
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            max_iterations: 16,
            strict: false,
            subsampling: Subsampling::S444,
            optimize_huffman: true,
            detect_grayscale: true,
        }
    }

    /// Few trials and standard Huffman tables.
    pub fn fast(quality: u8) -> Self {
        Self {
            max_iterations: 4,
            optimize_huffman: false,
            ..Self::new(quality)
        }
    }

    /// Exhaustive search with 4:2:0 chroma.
    pub fn max(quality: u8) -> Self {
        Self {
            max_iterations: 32,
            subsampling: Subsampling::S420,
            ..Self::new(quality)
        }
    }

    /// Create from preset (0=fast, 1=balanced, 2=max).
    pub fn from_preset(quality: u8, preset: u8) -> Self {
        match preset {
            0 => Self::fast(quality),
            2 => Self::max(quality),
            _ => Self::new(quality),
        }
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn subsampling(mut self, subsampling: Subsampling) -> Self {
        self.subsampling = subsampling;
        self
    }

    pub fn optimize_huffman(mut self, optimize_huffman: bool) -> Self {
        self.optimize_huffman = optimize_huffman;
        self
    }

    pub fn detect_grayscale(mut self, detect_grayscale: bool) -> Self {
        self.detect_grayscale = detect_grayscale;
        self
    }

    /// Check ranges; done before any decoding or encoding work.
    pub fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(Error::InvalidQuality(self.quality));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidOption("max_iterations must be at least 1"));
        }
        Ok(())
    }

    fn search_params(&self, min_level: u8) -> SearchParams {
        SearchParams {
            min_level,
            quality: self.quality,
            max_iterations: self.max_iterations,
            strict: self.strict,
            optimize_huffman: self.optimize_huffman,
            probes_per_round: probes_per_round(),
        }
    }
}

#[cfg(feature = "parallel")]
fn probes_per_round() -> u8 {
    rayon::current_num_threads().clamp(1, 8) as u8
}

#[cfg(not(feature = "parallel"))]
fn probes_per_round() -> u8 {
    1
}

/// An optimized JPEG and the search that produced it.
#[derive(Debug, Clone)]
pub struct Optimized {
    pub image: EncodedImage,
    pub report: SearchReport,
    /// The input JPEG was returned unchanged because nothing smaller was found.
    pub kept_input: bool,
}

impl Optimized {
    pub fn into_bytes(self) -> Vec<u8> {
        self.image.into_bytes()
    }
}

/// Runs searches with a fixed set of options and a distortion metric.
pub struct Optimizer<M = DssimMetric> {
    options: OptimizeOptions,
    metric: M,
}

impl Optimizer<DssimMetric> {
    pub fn new(options: OptimizeOptions) -> Self {
        Self::with_metric(options, DssimMetric::new())
    }
}

impl Default for Optimizer<DssimMetric> {
    fn default() -> Self {
        Self::new(OptimizeOptions::default())
    }
}

impl<M: DistortionMetric> Optimizer<M> {
    /// Use a custom distance instead of DSSIM.
    pub fn with_metric(options: OptimizeOptions, metric: M) -> Self {
        Self { options, metric }
    }

    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    /// Search for the smallest JPEG of `pixels` within the distortion budget.
    pub fn optimize_pixels(&self, pixels: &PixelBuffer) -> Result<Optimized> {
        self.optimize_above(pixels, 1)
    }

    /// Search with candidate levels at or above `min_level`.
    fn optimize_above(&self, pixels: &PixelBuffer, min_level: u8) -> Result<Optimized> {
        self.options.validate()?;

        let color_type = if self.options.detect_grayscale && pixels.is_grayscale() {
            ColorType::Gray
        } else {
            ColorType::Rgb
        };
        let jpeg_options = JpegOptions {
            color_type,
            subsampling: self.options.subsampling,
            optimize_huffman: self.options.optimize_huffman,
        };
        let blocks = BlockImage::new(pixels, &jpeg_options);
        let params = self.options.search_params(min_level);
        let (best, report) = search(pixels, &blocks, &self.metric, &params)?;

        info!(
            width = pixels.width(),
            height = pixels.height(),
            ?color_type,
            level = report.level,
            size = report.encoded_size,
            iterations = report.iterations,
            target_met = report.target_met,
            "optimized image"
        );

        Ok(Optimized {
            image: EncodedImage::new(best.into_bytes()),
            report,
            kept_input: false,
        })
    }

    /// Decode `image` and optimize it. A JPEG input is never grown: when the
    /// search result is not smaller, the input bytes come back unchanged.
    ///
    /// Candidates for a JPEG input start at the level estimated from its own
    /// luminance table, so repeated passes do not stack quantization error.
    pub fn optimize_encoded(&self, image: &EncodedImage) -> Result<Optimized> {
        self.options.validate()?;
        let pixels = decode(image)?;
        let min_level = match image.kind() {
            ImageKind::Jpeg => read_luminance_table(image.as_bytes())
                .map(|table| closest_level(&table))
                .unwrap_or(1),
            _ => 1,
        };
        if min_level > 1 {
            debug!(min_level, "input JPEG tables bound the search");
        }
        let optimized = self.optimize_above(&pixels, min_level)?;

        if image.kind() == ImageKind::Jpeg && optimized.image.len() >= image.len() {
            info!(
                input = image.len(),
                candidate = optimized.image.len(),
                "keeping input JPEG"
            );
            return Ok(Optimized {
                image: image.clone(),
                report: optimized.report,
                kept_input: true,
            });
        }
        Ok(optimized)
    }
}

/// Optimize raw pixels. See [`Optimizer::optimize_pixels`].
pub fn encode_from_pixels(pixels: &PixelBuffer, options: &OptimizeOptions) -> Result<Optimized> {
    Optimizer::new(*options).optimize_pixels(pixels)
}

/// Optimize an encoded JPEG or PNG. See [`Optimizer::optimize_encoded`].
pub fn encode_from_jpeg(image: &EncodedImage, options: &OptimizeOptions) -> Result<Optimized> {
    Optimizer::new(*options).optimize_encoded(image)
}

/// Optimize an encoded image held in memory and return JPEG bytes.
///
/// # Errors
/// - [`Error::InvalidQuality`] if `quality > 100`.
/// - [`Error::UnsupportedFormat`] if `bytes` is neither JPEG nor PNG.
pub fn optimize_image(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let options = OptimizeOptions::new(quality);
    options.validate()?;
    Ok(encode_from_jpeg(&EncodedImage::from_slice(bytes), &options)?.into_bytes())
}

/// Optimize interleaved RGB samples and return JPEG bytes.
///
/// # Errors
/// - [`Error::InvalidQuality`] if `quality > 100`.
/// - [`Error::SizeMismatch`] if `rgb.len() != width * height * 3`.
pub fn optimize_rgb_array(rgb: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    let options = OptimizeOptions::new(quality);
    options.validate()?;
    let pixels = PixelBuffer::from_slice(rgb, width, height)?;
    Ok(encode_from_pixels(&pixels, &options)?.into_bytes())
}

/// Read and decode an image file.
pub fn read_pixels(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    decode(&read_file(path)?)
}
