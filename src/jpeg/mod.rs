//! Baseline JPEG encoder.
//!
//! Splits encoding into two stages so a search can re-quantize cheaply:
//! - [`BlockImage::new`] converts to YCbCr and runs the forward DCT once.
//! - [`encode_blocks`] quantizes with a given table pair and writes a
//!   complete baseline (SOF0) stream with standard or optimized Huffman
//!   tables.

pub mod dct;
pub mod huffman;
pub mod quantize;

use crate::bits::BitWriterMsb;
use crate::color::{rgb_to_ycbcr, ColorType};
use crate::error::{Error, Result};
use crate::pixels::PixelBuffer;

use dct::dct_2d;
use huffman::{encode_block, HuffmanTable, HuffmanTables, SymbolCounts};
use quantize::{quantize_block, QuantizationTables};

/// JPEG markers.
const SOI: u16 = 0xFFD8; // Start of Image
const EOI: u16 = 0xFFD9; // End of Image
const APP0: u16 = 0xFFE0; // JFIF marker
const DQT: u16 = 0xFFDB; // Define Quantization Table
const SOF0: u16 = 0xFFC0; // Start of Frame (baseline DCT)
const DHT: u16 = 0xFFC4; // Define Huffman Table
const SOS: u16 = 0xFFDA; // Start of Scan

/// Chroma subsampling options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subsampling {
    /// 4:4:4, no subsampling.
    #[default]
    S444,
    /// 4:2:0, 2x2 chroma downsample.
    S420,
}

/// Frame layout and entropy coding options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegOptions {
    /// Component layout of the frame.
    pub color_type: ColorType,
    /// Subsampling scheme (ignored for grayscale).
    pub subsampling: Subsampling,
    /// If true, build image-optimized Huffman tables.
    pub optimize_huffman: bool,
}

impl Default for JpegOptions {
    fn default() -> Self {
        Self {
            color_type: ColorType::Rgb,
            subsampling: Subsampling::S444,
            optimize_huffman: true,
        }
    }
}

/// Encode RGB pixels with the Annex K tables scaled to `quality` (1-100).
///
/// This is a plain single-pass encode with standard Huffman tables; it does
/// not search.
pub fn encode(data: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    if quality == 0 || quality > 100 {
        return Err(Error::InvalidQuality(quality));
    }
    let pixels = PixelBuffer::from_slice(data, width, height)?;
    let options = JpegOptions {
        optimize_huffman: false,
        ..JpegOptions::default()
    };
    let blocks = BlockImage::new(&pixels, &options);
    Ok(encode_blocks(
        &blocks,
        &QuantizationTables::with_quality(quality),
        options.optimize_huffman,
    ))
}

/// Encode a pixel buffer with explicit quantization tables.
pub fn encode_with_tables(
    pixels: &PixelBuffer,
    tables: &QuantizationTables,
    options: &JpegOptions,
) -> Vec<u8> {
    let blocks = BlockImage::new(pixels, options);
    encode_blocks(&blocks, tables, options.optimize_huffman)
}

/// Forward-transformed image: DCT coefficients for every block in scan order.
///
/// Independent of the quantization tables, so one `BlockImage` serves every
/// candidate a search evaluates.
#[derive(Debug, Clone)]
pub struct BlockImage {
    width: u32,
    height: u32,
    color_type: ColorType,
    subsampling: Subsampling,
    /// Component index (0 = Y, 1 = Cb, 2 = Cr) of each block within an MCU.
    mcu_pattern: &'static [usize],
    blocks: Vec<[f32; 64]>,
}

impl BlockImage {
    /// Convert to YCbCr (or luma) and run the forward DCT over every block.
    pub fn new(pixels: &PixelBuffer, options: &JpegOptions) -> Self {
        let width = pixels.width() as usize;
        let height = pixels.height() as usize;
        let data = pixels.as_bytes();

        let subsampling = match options.color_type {
            ColorType::Gray => Subsampling::S444,
            ColorType::Rgb => options.subsampling,
        };

        let (mcu_pattern, blocks): (&'static [usize], Vec<[f32; 64]>) =
            match (options.color_type, subsampling) {
                (ColorType::Gray, _) => {
                    let mut blocks = Vec::with_capacity(block_count(width, height, 8));
                    for block_y in (0..padded(height, 8)).step_by(8) {
                        for block_x in (0..padded(width, 8)).step_by(8) {
                            let (y, _, _) = extract_block(data, width, height, block_x, block_y);
                            blocks.push(dct_2d(&y));
                        }
                    }
                    (&[0], blocks)
                }
                (ColorType::Rgb, Subsampling::S444) => {
                    let mut blocks = Vec::with_capacity(block_count(width, height, 8) * 3);
                    for block_y in (0..padded(height, 8)).step_by(8) {
                        for block_x in (0..padded(width, 8)).step_by(8) {
                            let (y, cb, cr) = extract_block(data, width, height, block_x, block_y);
                            blocks.push(dct_2d(&y));
                            blocks.push(dct_2d(&cb));
                            blocks.push(dct_2d(&cr));
                        }
                    }
                    (&[0, 1, 2], blocks)
                }
                (ColorType::Rgb, Subsampling::S420) => {
                    let mut blocks = Vec::with_capacity(block_count(width, height, 16) * 6);
                    for mcu_y in (0..padded(height, 16)).step_by(16) {
                        for mcu_x in (0..padded(width, 16)).step_by(16) {
                            let (ys, cb, cr) = extract_mcu_420(data, width, height, mcu_x, mcu_y);
                            for y in &ys {
                                blocks.push(dct_2d(y));
                            }
                            blocks.push(dct_2d(&cb));
                            blocks.push(dct_2d(&cr));
                        }
                    }
                    (&[0, 0, 0, 0, 1, 2], blocks)
                }
            };

        Self {
            width: pixels.width(),
            height: pixels.height(),
            color_type: options.color_type,
            subsampling,
            mcu_pattern,
            blocks,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_type(&self) -> ColorType {
        self.color_type
    }

    pub fn subsampling(&self) -> Subsampling {
        self.subsampling
    }

    /// Number of 8x8 blocks across all components.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Quantize every block; pairs each with its component index.
    fn quantize(&self, tables: &QuantizationTables) -> Vec<(usize, [i16; 64])> {
        self.blocks
            .iter()
            .zip(self.mcu_pattern.iter().cycle())
            .map(|(block, &component)| {
                let steps = if component == 0 {
                    &tables.luminance
                } else {
                    &tables.chrominance
                };
                (component, quantize_block(block, steps))
            })
            .collect()
    }
}

/// Quantize `image` with `tables` and serialize a complete JPEG stream.
///
/// Deterministic: identical inputs give byte-identical output.
pub fn encode_blocks(
    image: &BlockImage,
    tables: &QuantizationTables,
    optimize_huffman: bool,
) -> Vec<u8> {
    let quantized = image.quantize(tables);

    let huff_tables = if optimize_huffman {
        let mut counts = SymbolCounts::new();
        let mut prev_dc = [0i16; 3];
        for (component, block) in &quantized {
            prev_dc[*component] = counts.count_block(block, prev_dc[*component], *component == 0);
        }
        HuffmanTables::optimized(&counts)
    } else {
        HuffmanTables::new()
    };

    let mut output = Vec::with_capacity(quantized.len() * 16 + 640);
    write_soi(&mut output);
    write_app0(&mut output);
    write_dqt(&mut output, tables, image.color_type);
    write_sof0(&mut output, image);
    write_dht(&mut output, &huff_tables, image.color_type);
    write_sos(&mut output, image.color_type);

    let mut writer = BitWriterMsb::with_capacity(quantized.len() * 16);
    let mut prev_dc = [0i16; 3];
    for (component, block) in &quantized {
        prev_dc[*component] = encode_block(
            &mut writer,
            block,
            prev_dc[*component],
            *component == 0,
            &huff_tables,
        );
    }
    output.extend_from_slice(&writer.finish());

    write_eoi(&mut output);
    output
}

#[inline]
fn padded(len: usize, unit: usize) -> usize {
    len.div_ceil(unit) * unit
}

#[inline]
fn block_count(width: usize, height: usize, unit: usize) -> usize {
    width.div_ceil(unit) * height.div_ceil(unit)
}

/// Write SOI (Start of Image) marker.
fn write_soi(output: &mut Vec<u8>) {
    output.extend_from_slice(&SOI.to_be_bytes());
}

/// Write EOI (End of Image) marker.
fn write_eoi(output: &mut Vec<u8>) {
    output.extend_from_slice(&EOI.to_be_bytes());
}

/// Write APP0 (JFIF 1.01, no thumbnail, aspect ratio 1:1).
fn write_app0(output: &mut Vec<u8>) {
    output.extend_from_slice(&APP0.to_be_bytes());
    output.extend_from_slice(&16u16.to_be_bytes());
    output.extend_from_slice(b"JFIF\0");
    output.extend_from_slice(&[1, 1]); // version
    output.push(0); // units: aspect ratio only
    output.extend_from_slice(&1u16.to_be_bytes());
    output.extend_from_slice(&1u16.to_be_bytes());
    output.extend_from_slice(&[0, 0]); // thumbnail
}

/// Write DQT segments: table 0 (luma) and, for color frames, table 1 (chroma).
fn write_dqt(output: &mut Vec<u8>, tables: &QuantizationTables, color_type: ColorType) {
    write_dqt_table(output, 0, &tables.luminance_zigzag());
    if color_type == ColorType::Rgb {
        write_dqt_table(output, 1, &tables.chrominance_zigzag());
    }
}

fn write_dqt_table(output: &mut Vec<u8>, id: u8, table: &[u8; 64]) {
    output.extend_from_slice(&DQT.to_be_bytes());
    output.extend_from_slice(&67u16.to_be_bytes()); // 2 + 1 + 64
    output.push(id); // 8-bit precision
    output.extend_from_slice(table);
}

/// Write SOF0 (Start of Frame - baseline) marker.
fn write_sof0(output: &mut Vec<u8>, image: &BlockImage) {
    output.extend_from_slice(&SOF0.to_be_bytes());

    let num_components = image.color_type.num_components();
    let length = 8 + 3 * num_components as u16;
    output.extend_from_slice(&length.to_be_bytes());
    output.push(8); // precision
    output.extend_from_slice(&(image.height as u16).to_be_bytes());
    output.extend_from_slice(&(image.width as u16).to_be_bytes());
    output.push(num_components);

    match image.color_type {
        ColorType::Gray => {
            output.extend_from_slice(&[1, 0x11, 0]);
        }
        ColorType::Rgb => {
            let y_sampling = match image.subsampling {
                Subsampling::S444 => 0x11,
                Subsampling::S420 => 0x22,
            };
            output.extend_from_slice(&[1, y_sampling, 0]);
            output.extend_from_slice(&[2, 0x11, 1]);
            output.extend_from_slice(&[3, 0x11, 1]);
        }
    }
}

/// Write DHT segments for the tables the frame references.
fn write_dht(output: &mut Vec<u8>, tables: &HuffmanTables, color_type: ColorType) {
    write_huffman_table(output, 0x00, &tables.dc_luminance);
    write_huffman_table(output, 0x10, &tables.ac_luminance);
    if color_type == ColorType::Rgb {
        write_huffman_table(output, 0x01, &tables.dc_chrominance);
        write_huffman_table(output, 0x11, &tables.ac_chrominance);
    }
}

/// Write a single Huffman table.
fn write_huffman_table(output: &mut Vec<u8>, class_and_id: u8, table: &HuffmanTable) {
    output.extend_from_slice(&DHT.to_be_bytes());
    let length = 2 + 1 + 16 + table.vals.len();
    output.extend_from_slice(&(length as u16).to_be_bytes());
    output.push(class_and_id);
    output.extend_from_slice(&table.bits);
    output.extend_from_slice(&table.vals);
}

/// Write SOS (Start of Scan) for a single interleaved baseline scan.
fn write_sos(output: &mut Vec<u8>, color_type: ColorType) {
    output.extend_from_slice(&SOS.to_be_bytes());

    let num_components = color_type.num_components();
    let length = 6 + 2 * num_components as u16;
    output.extend_from_slice(&length.to_be_bytes());
    output.push(num_components);

    match color_type {
        ColorType::Gray => output.extend_from_slice(&[1, 0x00]),
        ColorType::Rgb => {
            output.extend_from_slice(&[1, 0x00]); // Y: DC 0, AC 0
            output.extend_from_slice(&[2, 0x11]); // Cb: DC 1, AC 1
            output.extend_from_slice(&[3, 0x11]); // Cr: DC 1, AC 1
        }
    }

    output.push(0); // Ss
    output.push(63); // Se
    output.push(0); // Ah/Al
}

/// Extract an 8x8 block starting at (block_x, block_y) and convert to
/// level-shifted YCbCr. Edge pixels are replicated past the image border.
fn extract_block(
    data: &[u8],
    width: usize,
    height: usize,
    block_x: usize,
    block_y: usize,
) -> ([f32; 64], [f32; 64], [f32; 64]) {
    let mut y_block = [0.0f32; 64];
    let mut cb_block = [0.0f32; 64];
    let mut cr_block = [0.0f32; 64];

    for dy in 0..8 {
        for dx in 0..8 {
            let x = (block_x + dx).min(width - 1);
            let y = (block_y + dy).min(height - 1);
            let p = (y * width + x) * 3;
            let (yc, cb, cr) = rgb_to_ycbcr(data[p], data[p + 1], data[p + 2]);
            let idx = dy * 8 + dx;
            y_block[idx] = yc as f32 - 128.0;
            cb_block[idx] = cb as f32 - 128.0;
            cr_block[idx] = cr as f32 - 128.0;
        }
    }

    (y_block, cb_block, cr_block)
}

/// Extract a 4:2:0 MCU (16x16 luma -> 4 blocks, 8x8 averaged chroma).
fn extract_mcu_420(
    data: &[u8],
    width: usize,
    height: usize,
    mcu_x: usize,
    mcu_y: usize,
) -> ([[f32; 64]; 4], [f32; 64], [f32; 64]) {
    let mut y_blocks = [[0.0f32; 64]; 4];
    let mut cb_block = [0.0f32; 64];
    let mut cr_block = [0.0f32; 64];

    for by in 0..2 {
        for bx in 0..2 {
            let block_idx = by * 2 + bx;
            for dy in 0..8 {
                for dx in 0..8 {
                    let x = (mcu_x + bx * 8 + dx).min(width - 1);
                    let y = (mcu_y + by * 8 + dy).min(height - 1);
                    let p = (y * width + x) * 3;
                    let (yc, cb, cr) = rgb_to_ycbcr(data[p], data[p + 1], data[p + 2]);
                    y_blocks[block_idx][dy * 8 + dx] = yc as f32 - 128.0;

                    let cidx = ((by * 8 + dy) / 2) * 8 + (bx * 8 + dx) / 2;
                    cb_block[cidx] += cb as f32;
                    cr_block[cidx] += cr as f32;
                }
            }
        }
    }

    for c in 0..64 {
        cb_block[c] = cb_block[c] * 0.25 - 128.0;
        cr_block[c] = cr_block[c] * 0.25 - 128.0;
    }

    (y_blocks, cb_block, cr_block)
}
