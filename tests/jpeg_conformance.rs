//! Baseline encoder conformance tests.
//!
//! Validates marker structure and decodability of the streams the search
//! evaluates, independently of the search itself.

use image::GenericImageView;
use perceptual_jpeg::jpeg::quantize::QuantizationTables;
use perceptual_jpeg::jpeg::{self, encode_blocks, BlockImage, JpegOptions, Subsampling};
use perceptual_jpeg::{ColorType, PixelBuffer};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

mod support;
use support::synthetic;

/// Segments seen before the scan, in stream order.
fn walk_markers(bytes: &[u8]) -> Vec<u8> {
    assert!(bytes.starts_with(&[0xFF, 0xD8]), "missing SOI");
    assert!(bytes.ends_with(&[0xFF, 0xD9]), "missing EOI");

    let mut markers = Vec::new();
    let mut offset = 2;
    while offset + 4 <= bytes.len() {
        assert_eq!(bytes[offset], 0xFF, "marker sync lost at {offset}");
        let marker = bytes[offset + 1];
        let len = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
        assert!(len >= 2, "invalid length for marker 0x{marker:02X}");
        assert!(
            offset + 2 + len <= bytes.len(),
            "segment overruns buffer for marker 0x{marker:02X}"
        );
        markers.push(marker);
        if marker == 0xDA {
            break;
        }
        offset += 2 + len;
    }
    markers
}

fn random_rgb(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rgb = vec![0u8; (width * height * 3) as usize];
    rng.fill(rgb.as_mut_slice());
    rgb
}

#[test]
fn test_marker_structure_color() {
    let pixels = synthetic::pixels(16, 12, random_rgb(16, 12, 6262));
    let bytes = jpeg::encode_with_tables(
        &pixels,
        &QuantizationTables::with_quality(85),
        &JpegOptions::default(),
    );
    assert_eq!(
        walk_markers(&bytes),
        vec![0xE0, 0xDB, 0xDB, 0xC0, 0xC4, 0xC4, 0xC4, 0xC4, 0xDA]
    );
}

#[test]
fn test_marker_structure_gray() {
    let pixels = synthetic::pixels(16, 12, synthetic::gradient_gray(16, 12));
    let options = JpegOptions {
        color_type: ColorType::Gray,
        ..JpegOptions::default()
    };
    let bytes = jpeg::encode_with_tables(&pixels, &QuantizationTables::default(), &options);
    assert_eq!(walk_markers(&bytes), vec![0xE0, 0xDB, 0xC0, 0xC4, 0xC4, 0xDA]);
}

/// Test different quality levels.
#[test]
fn test_quality_levels() {
    let pixels: Vec<u8> = (0..64 * 64 * 3).map(|i| (i % 256) as u8).collect();

    let sizes: Vec<(u8, usize)> = [10, 25, 50, 75, 90, 100]
        .iter()
        .map(|&q| (q, jpeg::encode(&pixels, 64, 64, q).unwrap().len()))
        .collect();

    // Higher quality should produce larger files
    for pair in sizes.windows(2) {
        assert!(
            pair[1].1 >= pair[0].1,
            "Quality {} produced {} bytes, but quality {} produced {} bytes",
            pair[1].0,
            pair[1].1,
            pair[0].0,
            pair[0].1
        );
    }
}

#[test]
fn test_error_handling() {
    let pixels = vec![0u8; 8 * 8 * 3];
    assert!(jpeg::encode(&pixels, 8, 8, 0).is_err());
    assert!(jpeg::encode(&pixels, 8, 8, 101).is_err());
    assert!(jpeg::encode(&pixels, 0, 8, 85).is_err());
    assert!(jpeg::encode(&[0, 0], 8, 8, 85).is_err());
}

#[test]
fn test_pattern_compression() {
    let solid = synthetic::solid_color(64, 64, [128, 128, 128]);
    let gradient = synthetic::gradient_rgb(64, 64);
    let noisy = synthetic::noise(64, 64, 42);

    let solid_len = jpeg::encode(&solid, 64, 64, 85).unwrap().len();
    let gradient_len = jpeg::encode(&gradient, 64, 64, 85).unwrap().len();
    let noisy_len = jpeg::encode(&noisy, 64, 64, 85).unwrap().len();

    assert!(solid_len < gradient_len);
    assert!(gradient_len < noisy_len);
}

/// 4:2:0 should produce a valid JPEG no larger than 4:4:4.
#[test]
fn test_subsampling_420() {
    let (width, height) = (32, 32);
    let pixels = synthetic::pixels(width, height, random_rgb(width, height, 4242));
    let tables = QuantizationTables::with_quality(75);

    let jpeg_444 = jpeg::encode_with_tables(&pixels, &tables, &JpegOptions::default());
    let jpeg_420 = jpeg::encode_with_tables(
        &pixels,
        &tables,
        &JpegOptions {
            subsampling: Subsampling::S420,
            ..JpegOptions::default()
        },
    );
    assert!(jpeg_420.len() <= jpeg_444.len());

    let decoded = image::load_from_memory(&jpeg_420).expect("decode 420");
    assert_eq!(decoded.dimensions(), (width, height));
}

/// Custom (non-standard) tables survive DQT and decode.
#[test]
fn test_custom_tables_decode() {
    let mut luma = [1u16; 64];
    luma[0] = 8;
    luma[63] = 255;
    let tables = QuantizationTables::from_steps(luma, [40; 64]);
    let pixels = synthetic::pixels(24, 24, synthetic::scene(24, 24));
    let bytes = jpeg::encode_with_tables(&pixels, &tables, &JpegOptions::default());
    let decoded = image::load_from_memory(&bytes).expect("decode custom tables");
    assert_eq!(decoded.dimensions(), (24, 24));
}

/// Near-lossless reconstruction at level 100.
#[test]
fn test_level_100_is_near_lossless() {
    let (w, h) = (16, 16);
    let samples = synthetic::gradient_rgb(w, h);
    let bytes = jpeg::encode(&samples, w, h, 100).unwrap();
    let decoded = image::load_from_memory(&bytes).expect("decode").to_rgb8();
    let max_err = decoded
        .as_raw()
        .iter()
        .zip(&samples)
        .map(|(&a, &b)| (a as i16 - b as i16).abs())
        .max()
        .unwrap();
    assert!(max_err <= 6, "max error {max_err}");
}

/// One transform reused across tables matches a fresh encode.
#[test]
fn test_block_reuse_matches_fresh_encode() {
    let pixels = synthetic::pixels(40, 24, synthetic::scene(40, 24));
    let options = JpegOptions::default();
    let blocks = BlockImage::new(&pixels, &options);
    for level in [20u8, 55, 90] {
        let tables = QuantizationTables::with_quality(level);
        assert_eq!(
            encode_blocks(&blocks, &tables, options.optimize_huffman),
            jpeg::encode_with_tables(&pixels, &tables, &options),
            "level {level}"
        );
    }
}

fn jpeg_case_strategy(
) -> impl Strategy<Value = (u32, u32, u8, ColorType, Subsampling, bool, Vec<u8>)> {
    (
        1u32..33,
        1u32..33,
        1u8..=100,
        prop_oneof![Just(ColorType::Rgb), Just(ColorType::Gray)],
        prop_oneof![Just(Subsampling::S444), Just(Subsampling::S420)],
        any::<bool>(),
    )
        .prop_flat_map(|(w, h, q, color_type, subsampling, optimize_huffman)| {
            proptest::collection::vec(any::<u8>(), (w * h * 3) as usize).prop_map(move |data| {
                (w, h, q, color_type, subsampling, optimize_huffman, data)
            })
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]
    #[test]
    fn prop_jpeg_decode_randomized_options(
        (w, h, quality, color_type, subsampling, optimize_huffman, data) in jpeg_case_strategy()
    ) {
        let pixels = PixelBuffer::new(data, w, h).unwrap();
        let options = JpegOptions { color_type, subsampling, optimize_huffman };
        let encoded = jpeg::encode_with_tables(
            &pixels,
            &QuantizationTables::with_quality(quality),
            &options,
        );
        prop_assert!(encoded.ends_with(&[0xFF, 0xD9]));

        let decoded = image::load_from_memory(&encoded).expect("decode");
        prop_assert_eq!(decoded.dimensions(), (w, h));
    }
}
