//! Synthetic test images.
//!
//! Deterministic patterns covering the cases the optimizer treats
//! differently: flat regions, smooth gradients, hard edges and noise.

use perceptual_jpeg::PixelBuffer;

/// Wrap generated RGB samples.
pub fn pixels(width: u32, height: u32, samples: Vec<u8>) -> PixelBuffer {
    PixelBuffer::new(samples, width, height).expect("generator produced wrong length")
}

/// Generate a solid color image.
pub fn solid_color(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    rgb.repeat((width * height) as usize)
}

/// Generate an RGB gradient (red horizontal, green vertical, blue diagonal).
pub fn gradient_rgb(width: u32, height: u32) -> Vec<u8> {
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = ((x * 255) / width.max(1)) as u8;
            let g = ((y * 255) / height.max(1)) as u8;
            let b = (((x + y) * 127) / (width + height).max(1)) as u8;
            samples.extend_from_slice(&[r, g, b]);
        }
    }
    samples
}

/// Generate a neutral horizontal gradient.
pub fn gradient_gray(width: u32, height: u32) -> Vec<u8> {
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for _y in 0..height {
        for x in 0..width {
            let v = ((x * 255) / width.max(1)) as u8;
            samples.extend_from_slice(&[v, v, v]);
        }
    }
    samples
}

/// Generate a colored checkerboard pattern.
pub fn checkerboard(width: u32, height: u32, cell_size: u32, a: [u8; 3], b: [u8; 3]) -> Vec<u8> {
    let cell_size = cell_size.max(1);
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let color = if ((x / cell_size) + (y / cell_size)) % 2 == 0 {
                a
            } else {
                b
            };
            samples.extend_from_slice(&color);
        }
    }
    samples
}

/// Generate pseudo-random noise with an LCG seeded by `seed`.
pub fn noise(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..width * height * 3)
        .map(|_| {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            (state >> 16) as u8
        })
        .collect()
}

/// A photo-like scene: smooth sky, textured ground and a hard horizon.
pub fn scene(width: u32, height: u32) -> Vec<u8> {
    let grain = noise(width, height, 7);
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let i = ((y * width + x) * 3) as usize;
            let color = if y < height / 2 {
                let t = (y * 120 / height.max(1)) as u8;
                [90 + t / 2, 140 + t / 3, 230 - t]
            } else {
                let g = grain[i] / 8;
                [70 + g, 110 + g, 40 + g / 2]
            };
            samples.extend_from_slice(&color);
        }
    }
    samples
}

/// Dimensions around the 8x8 and 16x16 block boundaries.
pub const EDGE_CASE_DIMENSIONS: &[(u32, u32, &str)] = &[
    (1, 1, "minimum"),
    (2, 2, "tiny"),
    (7, 7, "under_block"),
    (8, 8, "single_block"),
    (9, 9, "just_over_block"),
    (15, 17, "odd_dimensions"),
    (1, 40, "tall_narrow"),
    (40, 1, "wide_short"),
];
