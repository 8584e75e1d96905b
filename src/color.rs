//! Color layouts and conversions used by the JPEG encoder.

/// Component layout of an encoded JPEG frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    /// Single luma component.
    Gray,
    /// Y, Cb and Cr components.
    Rgb,
}

impl ColorType {
    /// Number of components written to the frame header.
    #[inline]
    pub const fn num_components(self) -> u8 {
        match self {
            ColorType::Gray => 1,
            ColorType::Rgb => 3,
        }
    }
}

/// Convert RGB to YCbCr color space (used by JPEG).
///
/// Returns (Y, Cb, Cr) where each component is in range 0-255.
///
/// ITU-R BT.601 conversion coefficients scaled by 256:
/// - Y  = 0.299*R + 0.587*G + 0.114*B  -> (77*R + 150*G + 29*B + 128) >> 8
/// - Cb = -0.169*R - 0.331*G + 0.5*B + 128
/// - Cr = 0.5*R - 0.419*G - 0.081*B + 128
#[inline]
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as i32;
    let g = g as i32;
    let b = b as i32;

    let y = (77 * r + 150 * g + 29 * b + 128) >> 8;
    let cb = ((-43 * r - 85 * g + 128 * b + 128) >> 8) + 128;
    let cr = ((128 * r - 107 * g - 21 * b + 128) >> 8) + 128;

    (
        y.clamp(0, 255) as u8,
        cb.clamp(0, 255) as u8,
        cr.clamp(0, 255) as u8,
    )
}

/// Composite a straight-alpha sample onto black.
#[inline]
pub fn blend_on_black(value: u8, alpha: u8) -> u8 {
    ((value as u32 * alpha as u32 + 127) / 255) as u8
}
