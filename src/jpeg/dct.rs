//! Forward Discrete Cosine Transform for 8x8 blocks.
//!
//! Separable float DCT-II: rows first, then columns.

use std::f32::consts::{FRAC_PI_2, PI};

/// cos_table[n][k] = cos((2*n + 1) * k * PI / 16)
const COS_TABLE: [[f32; 8]; 8] = precompute_cos_table();

const fn precompute_cos_table() -> [[f32; 8]; 8] {
    let mut table = [[0.0f32; 8]; 8];
    let mut n = 0;
    while n < 8 {
        let mut k = 0;
        while k < 8 {
            let angle = ((2 * n + 1) * k) as f32 * PI / 16.0;
            table[n][k] = const_cos(angle);
            k += 1;
        }
        n += 1;
    }
    table
}

/// Cosine usable in const context.
///
/// Reduces to [0, PI/2] so the Taylor series stays within f32 precision.
const fn const_cos(x: f32) -> f32 {
    let mut x = x;
    while x > PI {
        x -= 2.0 * PI;
    }
    if x < 0.0 {
        x = -x;
    }
    if x > FRAC_PI_2 {
        -taylor_cos(PI - x)
    } else {
        taylor_cos(x)
    }
}

const fn taylor_cos(x: f32) -> f32 {
    let x2 = x * x;
    let mut term = 1.0f32;
    let mut sum = 1.0f32;
    let mut i = 1;
    while i <= 6 {
        term = -term * x2 / ((2 * i - 1) * (2 * i)) as f32;
        sum += term;
        i += 1;
    }
    sum
}

/// alpha(0) = 1/sqrt(2), alpha(k) = 1 for k > 0
const ALPHA: [f32; 8] = [
    std::f32::consts::FRAC_1_SQRT_2,
    1.0,
    1.0,
    1.0,
    1.0,
    1.0,
    1.0,
    1.0,
];

/// Perform 2D DCT on an 8x8 block of level-shifted samples.
pub fn dct_2d(block: &[f32; 64]) -> [f32; 64] {
    let mut temp = [0.0f32; 64];
    let mut result = [0.0f32; 64];

    for row in 0..8 {
        let start = row * 8;
        dct_1d(&block[start..start + 8], &mut temp[start..start + 8]);
    }

    for col in 0..8 {
        let mut col_in = [0.0f32; 8];
        let mut col_out = [0.0f32; 8];
        for row in 0..8 {
            col_in[row] = temp[row * 8 + col];
        }
        dct_1d(&col_in, &mut col_out);
        for row in 0..8 {
            result[row * 8 + col] = col_out[row];
        }
    }

    result
}

fn dct_1d(input: &[f32], output: &mut [f32]) {
    debug_assert_eq!(input.len(), 8);
    debug_assert_eq!(output.len(), 8);

    for k in 0..8 {
        let mut sum = 0.0f32;
        for n in 0..8 {
            sum += input[n] * COS_TABLE[n][k];
        }
        output[k] = 0.5 * ALPHA[k] * sum;
    }
}
