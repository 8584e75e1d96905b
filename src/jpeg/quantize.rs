//! JPEG quantization tables and functions.

/// Standard JPEG luminance quantization table (Annex K, natural order).
const STD_LUMINANCE_TABLE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104, 113,
    92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard JPEG chrominance quantization table (Annex K, natural order).
const STD_CHROMINANCE_TABLE: [u16; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, 18, 21, 26, 66, 99, 99, 99, 99, 24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
];

/// Zigzag scan order for 8x8 block.
pub const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Largest step an 8-bit DQT entry can hold.
pub const MAX_STEP: u16 = 255;

/// Luma and chroma quantization steps, natural (row-major) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizationTables {
    /// Luminance steps.
    pub luminance: [u16; 64],
    /// Chrominance steps.
    pub chrominance: [u16; 64],
}

impl QuantizationTables {
    /// Scale the Annex K tables with the libjpeg quality formula (1-100).
    pub fn with_quality(quality: u8) -> Self {
        let scale = scale_factor(quality);
        Self {
            luminance: scale_table(&STD_LUMINANCE_TABLE, scale),
            chrominance: scale_table(&STD_CHROMINANCE_TABLE, scale),
        }
    }

    /// Build tables from explicit steps, clamped to 1..=255.
    pub fn from_steps(luminance: [u16; 64], chrominance: [u16; 64]) -> Self {
        Self {
            luminance: luminance.map(|s| s.clamp(1, MAX_STEP)),
            chrominance: chrominance.map(|s| s.clamp(1, MAX_STEP)),
        }
    }

    /// Luminance table as written to DQT (zigzag order).
    pub fn luminance_zigzag(&self) -> [u8; 64] {
        to_zigzag_bytes(&self.luminance)
    }

    /// Chrominance table as written to DQT (zigzag order).
    pub fn chrominance_zigzag(&self) -> [u8; 64] {
        to_zigzag_bytes(&self.chrominance)
    }

    /// `[luminance, chrominance]`.
    pub fn as_matrix(&self) -> [[u16; 64]; 2] {
        [self.luminance, self.chrominance]
    }
}

impl Default for QuantizationTables {
    fn default() -> Self {
        Self::with_quality(75)
    }
}

/// libjpeg's percentage scale for a quality setting, clamped to 1-100.
pub fn scale_factor(quality: u8) -> u32 {
    let quality = quality.clamp(1, 100) as u32;
    if quality < 50 {
        5000 / quality
    } else {
        200 - 2 * quality
    }
}

fn scale_table(base: &[u16; 64], scale: u32) -> [u16; 64] {
    base.map(|v| ((v as u32 * scale + 50) / 100).clamp(1, MAX_STEP as u32) as u16)
}

fn to_zigzag_bytes(table: &[u16; 64]) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (i, &pos) in ZIGZAG.iter().enumerate() {
        out[i] = table[pos].min(MAX_STEP) as u8;
    }
    out
}

/// Divides each coefficient by the corresponding quantization step.
pub fn quantize_block(dct: &[f32; 64], steps: &[u16; 64]) -> [i16; 64] {
    let mut result = [0i16; 64];
    for i in 0..64 {
        result[i] = (dct[i] / steps[i] as f32).round() as i16;
    }
    result
}

pub fn zigzag_reorder(block: &[i16; 64]) -> [i16; 64] {
    let mut result = [0i16; 64];
    for i in 0..64 {
        result[i] = block[ZIGZAG[i]];
    }
    result
}

/// Luminance steps (table 0, natural order) from the DQT segments of a
/// JPEG stream. Segments after the first scan are ignored.
pub fn read_luminance_table(bytes: &[u8]) -> Option<[u16; 64]> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut table = None;
    let mut offset = 2;
    while offset + 1 < bytes.len() {
        if bytes[offset] != 0xFF {
            return table;
        }
        let marker = bytes[offset + 1];
        match marker {
            // Fill byte
            0xFF => {
                offset += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                offset += 2;
                continue;
            }
            0xDA | 0xD9 => break,
            _ => {}
        }

        let len = u16::from_be_bytes([*bytes.get(offset + 2)?, *bytes.get(offset + 3)?]) as usize;
        let segment = bytes.get(offset + 4..offset + 2 + len)?;
        if marker == 0xDB {
            let mut rest = segment;
            while let Some((&pq_tq, tail)) = rest.split_first() {
                let wide = pq_tq >> 4 != 0;
                let entry_len = if wide { 128 } else { 64 };
                let entries = tail.get(..entry_len)?;
                if pq_tq & 0x0F == 0 {
                    let mut natural = [0u16; 64];
                    for (i, &pos) in ZIGZAG.iter().enumerate() {
                        natural[pos] = if wide {
                            u16::from_be_bytes([entries[2 * i], entries[2 * i + 1]])
                        } else {
                            entries[i] as u16
                        };
                    }
                    table = Some(natural);
                }
                rest = &tail[entry_len..];
            }
        }
        offset += 2 + len;
    }
    table
}

/// Level whose scaled luminance table is closest to `luminance`.
///
/// Ties resolve to the lowest level, so an exact match to a libjpeg table
/// returns the coarsest level producing that table.
pub fn closest_level(luminance: &[u16; 64]) -> u8 {
    let mut best = (u32::MAX, 1u8);
    for level in 1..=100u8 {
        let steps = QuantizationTables::with_quality(level).luminance;
        let error: u32 = steps
            .iter()
            .zip(luminance)
            .map(|(&a, &b)| (a as i32 - b as i32).unsigned_abs())
            .sum();
        if error < best.0 {
            best = (error, level);
        }
    }
    best.1
}
