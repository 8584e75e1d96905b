//! Decoding JPEG and PNG containers into RGB pixel buffers.
//!
//! Stream parsing is delegated to `jpeg-decoder` and `png`; this module
//! only normalizes their output to 8-bit RGB.

use std::io::Cursor;

use crate::color::blend_on_black;
use crate::error::{Error, Result};
use crate::image::{EncodedImage, ImageKind};
use crate::pixels::PixelBuffer;

/// Decode an encoded image to RGB pixels.
///
/// # Errors
/// - [`Error::UnsupportedFormat`] for bytes that are neither JPEG nor PNG.
/// - [`Error::Decode`] when a recognized stream is corrupt or uses a pixel
///   format that has no RGB mapping (CMYK or 16-bit gray JPEG).
pub fn decode(image: &EncodedImage) -> Result<PixelBuffer> {
    match image.kind() {
        ImageKind::Jpeg => decode_jpeg(image.as_bytes()),
        ImageKind::Png => decode_png(image.as_bytes()),
        ImageKind::Unknown => Err(Error::UnsupportedFormat),
    }
}

fn jpeg_error(reason: impl ToString) -> Error {
    Error::Decode {
        kind: ImageKind::Jpeg,
        reason: reason.to_string(),
    }
}

fn png_error(reason: impl ToString) -> Error {
    Error::Decode {
        kind: ImageKind::Png,
        reason: reason.to_string(),
    }
}

/// Decode a JPEG stream.
pub(crate) fn decode_jpeg(bytes: &[u8]) -> Result<PixelBuffer> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
    let pixels = decoder.decode().map_err(jpeg_error)?;
    let info = decoder
        .info()
        .ok_or_else(|| jpeg_error("missing frame header"))?;
    let width = info.width as u32;
    let height = info.height as u32;

    match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => PixelBuffer::from_gray(&pixels, width, height),
        jpeg_decoder::PixelFormat::RGB24 => PixelBuffer::new(pixels, width, height),
        jpeg_decoder::PixelFormat::L16 => Err(jpeg_error("16-bit grayscale JPEG not supported")),
        jpeg_decoder::PixelFormat::CMYK32 => Err(jpeg_error("CMYK JPEG not supported")),
    }
}

/// Decode a PNG stream. Palette and low bit depths are expanded, 16-bit
/// samples are stripped to 8 bits, and alpha is composited onto black.
fn decode_png(bytes: &[u8]) -> Result<PixelBuffer> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(png_error)?;

    let mut pixels = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut pixels).map_err(png_error)?;
    pixels.truncate(info.buffer_size());

    let (width, height) = (info.width, info.height);
    match info.color_type {
        png::ColorType::Grayscale => PixelBuffer::from_gray(&pixels, width, height),
        png::ColorType::GrayscaleAlpha => {
            let gray: Vec<u8> = pixels
                .chunks_exact(2)
                .map(|ga| blend_on_black(ga[0], ga[1]))
                .collect();
            PixelBuffer::from_gray(&gray, width, height)
        }
        png::ColorType::Rgb => PixelBuffer::new(pixels, width, height),
        png::ColorType::Rgba => {
            let rgb = pixels
                .chunks_exact(4)
                .flat_map(|px| {
                    [
                        blend_on_black(px[0], px[3]),
                        blend_on_black(px[1], px[3]),
                        blend_on_black(px[2], px[3]),
                    ]
                })
                .collect();
            PixelBuffer::new(rgb, width, height)
        }
        png::ColorType::Indexed => Err(png_error("palette was not expanded")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(data: &[u8], width: u32, height: u32, color: png::ColorType) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn test_unknown_format() {
        let image = EncodedImage::from_slice(b"not an image");
        assert!(matches!(decode(&image), Err(Error::UnsupportedFormat)));
    }

    #[test]
    fn test_corrupt_jpeg() {
        let image = EncodedImage::from_slice(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]);
        assert!(matches!(
            decode(&image),
            Err(Error::Decode {
                kind: ImageKind::Jpeg,
                ..
            })
        ));
    }

    #[test]
    fn test_corrupt_png() {
        let mut bytes = encode_png(&[1, 2, 3], 1, 1, png::ColorType::Rgb);
        bytes.truncate(20);
        let image = EncodedImage::new(bytes);
        assert!(matches!(
            decode(&image),
            Err(Error::Decode {
                kind: ImageKind::Png,
                ..
            })
        ));
    }

    #[test]
    fn test_png_rgb() {
        let data = [10, 20, 30, 40, 50, 60];
        let image = EncodedImage::new(encode_png(&data, 2, 1, png::ColorType::Rgb));
        let pixels = decode(&image).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (2, 1));
        assert_eq!(pixels.as_bytes(), &data);
    }

    #[test]
    fn test_png_rgba_blends_on_black() {
        let data = [200, 100, 50, 255, 200, 100, 50, 0];
        let image = EncodedImage::new(encode_png(&data, 2, 1, png::ColorType::Rgba));
        let pixels = decode(&image).unwrap();
        assert_eq!(pixels.as_bytes(), &[200, 100, 50, 0, 0, 0]);
    }

    #[test]
    fn test_png_gray_expands() {
        let image = EncodedImage::new(encode_png(&[0, 128, 255], 3, 1, png::ColorType::Grayscale));
        let pixels = decode(&image).unwrap();
        assert_eq!(pixels.as_bytes(), &[0, 0, 0, 128, 128, 128, 255, 255, 255]);
        assert!(pixels.is_grayscale());
    }

    #[test]
    fn test_png_gray_alpha() {
        let image = EncodedImage::new(encode_png(
            &[200, 255, 200, 0],
            2,
            1,
            png::ColorType::GrayscaleAlpha,
        ));
        let pixels = decode(&image).unwrap();
        assert_eq!(pixels.as_bytes(), &[200, 200, 200, 0, 0, 0]);
    }

    #[test]
    fn test_jpeg_from_own_encoder() {
        let data: Vec<u8> = (0..16 * 16 * 3).map(|i| (i % 251) as u8).collect();
        let jpeg = crate::jpeg::encode(&data, 16, 16, 90).unwrap();
        let pixels = decode(&EncodedImage::new(jpeg)).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (16, 16));
        assert_eq!(pixels.len(), data.len());
    }
}
