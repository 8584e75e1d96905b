//! JPEG Huffman encoding.
//!
//! Implements the entropy coding stage: standard Annex K tables, per-image
//! optimized tables built from symbol statistics, and block serialization.

use crate::bits::BitWriterMsb;
use crate::jpeg::quantize::zigzag_reorder;

/// Standard DC luminance Huffman table (number of codes per bit length).
const DC_LUM_BITS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];

/// Standard DC luminance Huffman values.
const DC_LUM_VALS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard DC chrominance Huffman table.
const DC_CHROM_BITS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];

/// Standard DC chrominance Huffman values.
const DC_CHROM_VALS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard AC luminance Huffman table.
const AC_LUM_BITS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125];

/// Standard AC luminance Huffman values.
const AC_LUM_VALS: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08, 0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// Standard AC chrominance Huffman table.
const AC_CHROM_BITS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 119];

/// Standard AC chrominance Huffman values.
const AC_CHROM_VALS: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34, 0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// Longest code a DHT segment can describe.
const MAX_CODE_LENGTH: usize = 16;

/// Huffman code: (code, length in bits).
#[derive(Debug, Clone, Copy, Default)]
struct HuffCode {
    code: u16,
    length: u8,
}

/// One DHT table: the header form (bits/vals) and the encoding lookup.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Number of codes of each length 1..=16.
    pub bits: [u8; 16],
    /// Symbols ordered by code length.
    pub vals: Vec<u8>,
    codes: [HuffCode; 256],
}

impl HuffmanTable {
    /// Build a canonical table. Returns `None` for a malformed specification.
    pub fn from_bits_vals(bits: [u8; 16], vals: Vec<u8>) -> Option<Self> {
        let total: usize = bits.iter().map(|&b| b as usize).sum();
        if total != vals.len() || total > 256 {
            return None;
        }

        let mut codes = [HuffCode::default(); 256];
        let mut code: u32 = 0;
        let mut val_idx = 0usize;
        for (length, &count) in bits.iter().enumerate() {
            for _ in 0..count {
                codes[vals[val_idx] as usize] = HuffCode {
                    code: code as u16,
                    length: (length + 1) as u8,
                };
                val_idx += 1;
                code += 1;
            }
            // Codes of this length must fit in length + 1 bits
            if code > (1 << (length + 1)) {
                return None;
            }
            code <<= 1;
        }

        Some(Self { bits, vals, codes })
    }

    /// Build an optimized table from symbol frequencies.
    ///
    /// Returns `None` when every count is zero.
    pub fn optimized(counts: &[u64]) -> Option<Self> {
        let (bits, vals) = build_bits_vals(counts)?;
        Self::from_bits_vals(bits, vals)
    }

    #[inline]
    fn code(&self, symbol: u8) -> HuffCode {
        self.codes[symbol as usize]
    }

    fn standard(bits: &[u8; 16], vals: &[u8]) -> Self {
        // Annex K tables are well-formed
        match Self::from_bits_vals(*bits, vals.to_vec()) {
            Some(table) => table,
            None => unreachable!("standard Huffman table rejected"),
        }
    }
}

/// The four tables used by a baseline scan.
#[derive(Debug, Clone)]
pub struct HuffmanTables {
    pub dc_luminance: HuffmanTable,
    pub ac_luminance: HuffmanTable,
    pub dc_chrominance: HuffmanTable,
    pub ac_chrominance: HuffmanTable,
}

impl HuffmanTables {
    /// Create Huffman tables from standard JPEG tables.
    pub fn new() -> Self {
        Self {
            dc_luminance: HuffmanTable::standard(&DC_LUM_BITS, &DC_LUM_VALS),
            ac_luminance: HuffmanTable::standard(&AC_LUM_BITS, &AC_LUM_VALS),
            dc_chrominance: HuffmanTable::standard(&DC_CHROM_BITS, &DC_CHROM_VALS),
            ac_chrominance: HuffmanTable::standard(&AC_CHROM_BITS, &AC_CHROM_VALS),
        }
    }

    /// Build optimized tables from gathered statistics.
    ///
    /// Any class without symbols keeps its standard table.
    pub fn optimized(counts: &SymbolCounts) -> Self {
        let standard = Self::new();
        Self {
            dc_luminance: HuffmanTable::optimized(&counts.dc_luminance)
                .unwrap_or(standard.dc_luminance),
            ac_luminance: HuffmanTable::optimized(&counts.ac_luminance)
                .unwrap_or(standard.ac_luminance),
            dc_chrominance: HuffmanTable::optimized(&counts.dc_chrominance)
                .unwrap_or(standard.dc_chrominance),
            ac_chrominance: HuffmanTable::optimized(&counts.ac_chrominance)
                .unwrap_or(standard.ac_chrominance),
        }
    }

    #[inline]
    fn dc(&self, is_luminance: bool) -> &HuffmanTable {
        if is_luminance {
            &self.dc_luminance
        } else {
            &self.dc_chrominance
        }
    }

    #[inline]
    fn ac(&self, is_luminance: bool) -> &HuffmanTable {
        if is_luminance {
            &self.ac_luminance
        } else {
            &self.ac_chrominance
        }
    }
}

impl Default for HuffmanTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Symbol frequencies for the four table classes.
#[derive(Debug, Clone)]
pub struct SymbolCounts {
    pub dc_luminance: [u64; 12],
    pub ac_luminance: [u64; 256],
    pub dc_chrominance: [u64; 12],
    pub ac_chrominance: [u64; 256],
}

impl SymbolCounts {
    pub fn new() -> Self {
        Self {
            dc_luminance: [0; 12],
            ac_luminance: [0; 256],
            dc_chrominance: [0; 12],
            ac_chrominance: [0; 256],
        }
    }

    /// Tally the symbols `encode_block` would emit for `block`.
    ///
    /// Returns the block's DC value for the next differential.
    pub fn count_block(&mut self, block: &[i16; 64], prev_dc: i16, is_luminance: bool) -> i16 {
        let (dc_counts, ac_counts) = if is_luminance {
            (&mut self.dc_luminance, &mut self.ac_luminance)
        } else {
            (&mut self.dc_chrominance, &mut self.ac_chrominance)
        };

        let zz = zigzag_reorder(block);
        let dc = zz[0];
        dc_counts[category(dc.wrapping_sub(prev_dc)) as usize] += 1;

        let mut zero_run = 0usize;
        for &ac in zz.iter().skip(1) {
            if ac == 0 {
                zero_run += 1;
                continue;
            }
            while zero_run >= 16 {
                ac_counts[0xF0] += 1;
                zero_run -= 16;
            }
            let rs = ((zero_run as u8) << 4) | category(ac);
            ac_counts[rs as usize] += 1;
            zero_run = 0;
        }
        if zero_run > 0 {
            ac_counts[0x00] += 1; // EOB
        }

        dc
    }
}

impl Default for SymbolCounts {
    fn default() -> Self {
        Self::new()
    }
}

/// Deepest tree the length-limiting pass accepts before rescaling counts.
const MAX_TREE_DEPTH: usize = 32;

/// Derive DHT bits/vals from frequencies (ITU T.81 Annex K.2).
///
/// A reserved pseudo-symbol keeps the all-ones codeword unused, and code
/// lengths are limited to 16 bits.
fn build_bits_vals(counts: &[u64]) -> Option<([u8; 16], Vec<u8>)> {
    if counts.iter().all(|&c| c == 0) {
        return None;
    }

    let n = counts.len();
    let mut freq: Vec<u64> = counts.to_vec();
    freq.push(1); // reserved pseudo-symbol

    let code_size = loop {
        let sizes = code_sizes(&freq);
        if sizes.iter().all(|&s| s <= MAX_TREE_DEPTH) {
            break sizes;
        }
        // Flatten the distribution and rebuild
        for f in freq.iter_mut().filter(|f| **f > 0) {
            *f = (*f + 1) / 2;
        }
    };

    let mut bits = [0usize; MAX_TREE_DEPTH + 1];
    for &size in code_size.iter().filter(|&&s| s > 0) {
        bits[size] += 1;
    }

    // Shorten codes longer than 16 bits
    for i in (MAX_CODE_LENGTH + 1..=MAX_TREE_DEPTH).rev() {
        while bits[i] > 0 {
            let mut j = i - 2;
            while bits[j] == 0 {
                j -= 1;
            }
            bits[i] -= 2;
            bits[i - 1] += 1;
            bits[j + 1] += 2;
            bits[j] -= 1;
        }
    }

    // Drop the reserved pseudo-symbol from the longest length
    let mut longest = MAX_CODE_LENGTH;
    while bits[longest] == 0 {
        longest -= 1;
    }
    bits[longest] -= 1;

    let mut out_bits = [0u8; 16];
    for (len, slot) in out_bits.iter_mut().enumerate() {
        *slot = bits[len + 1] as u8;
    }

    // Symbols sorted by unlimited code size, then value; the limited
    // lengths are handed out in this order.
    let mut symbols: Vec<usize> = (0..n).filter(|&s| code_size[s] > 0).collect();
    symbols.sort_by_key(|&s| (code_size[s], s));
    let vals = symbols.into_iter().map(|s| s as u8).collect();

    Some((out_bits, vals))
}

/// Unlimited Huffman code size per symbol (0 for absent symbols).
fn code_sizes(freq: &[u64]) -> Vec<usize> {
    let mut freq = freq.to_vec();
    let mut code_size = vec![0usize; freq.len()];
    let mut others: Vec<Option<usize>> = vec![None; freq.len()];

    loop {
        // c1: least frequent; c2: next least. Ties go to the higher index.
        let mut c1: Option<usize> = None;
        let mut c2: Option<usize> = None;
        for i in 0..freq.len() {
            if freq[i] == 0 {
                continue;
            }
            match c1 {
                Some(j) if freq[i] > freq[j] => {}
                _ => {
                    c2 = c1;
                    c1 = Some(i);
                    continue;
                }
            }
            match c2 {
                Some(j) if freq[i] > freq[j] => {}
                _ => c2 = Some(i),
            }
        }

        let (Some(mut v1), Some(mut v2)) = (c1, c2) else {
            break;
        };

        freq[v1] += freq[v2];
        freq[v2] = 0;

        code_size[v1] += 1;
        while let Some(next) = others[v1] {
            v1 = next;
            code_size[v1] += 1;
        }
        others[v1] = Some(v2);

        code_size[v2] += 1;
        while let Some(next) = others[v2] {
            v2 = next;
            code_size[v2] += 1;
        }
    }

    code_size
}

/// Get the category (number of bits needed) for a value.
#[inline]
pub(crate) fn category(value: i16) -> u8 {
    let abs_val = value.unsigned_abs();
    if abs_val == 0 {
        0
    } else {
        16 - abs_val.leading_zeros() as u8
    }
}

/// Encode a coefficient value (after category is known).
#[inline]
fn encode_value(value: i16) -> (u16, u8) {
    let cat = category(value);
    if cat == 0 {
        return (0, 0);
    }

    let bits = if value < 0 {
        // Negative values: one's complement
        (value as i32 - 1) as u16
    } else {
        value as u16
    };

    (bits & ((1u32 << cat) - 1) as u16, cat)
}

/// Encode a quantized 8x8 block (natural order).
///
/// Returns the new DC value (for differential encoding of next block).
pub fn encode_block(
    writer: &mut BitWriterMsb,
    block: &[i16; 64],
    prev_dc: i16,
    is_luminance: bool,
    tables: &HuffmanTables,
) -> i16 {
    let zigzag = zigzag_reorder(block);
    let dc_table = tables.dc(is_luminance);
    let ac_table = tables.ac(is_luminance);

    let dc = zigzag[0];
    let dc_diff = dc.wrapping_sub(prev_dc);
    let dc_cat = category(dc_diff);

    let dc_code = dc_table.code(dc_cat);
    writer.write_bits(dc_code.code as u32, dc_code.length);
    if dc_cat > 0 {
        let (val_bits, val_len) = encode_value(dc_diff);
        writer.write_bits(val_bits as u32, val_len);
    }

    let mut zero_run = 0;
    for &ac in zigzag.iter().skip(1) {
        if ac == 0 {
            zero_run += 1;
            continue;
        }

        while zero_run >= 16 {
            let zrl = ac_table.code(0xF0);
            writer.write_bits(zrl.code as u32, zrl.length);
            zero_run -= 16;
        }

        let ac_cat = category(ac);
        let ac_code = ac_table.code(((zero_run as u8) << 4) | ac_cat);
        writer.write_bits(ac_code.code as u32, ac_code.length);

        let (val_bits, val_len) = encode_value(ac);
        writer.write_bits(val_bits as u32, val_len);
        zero_run = 0;
    }

    if zero_run > 0 {
        let eob = ac_table.code(0x00);
        writer.write_bits(eob.code as u32, eob.length);
    }

    dc
}
