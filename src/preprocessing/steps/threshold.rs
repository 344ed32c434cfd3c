use crate::error::OcrError;
use crate::pixel::buffer::check_channel_layout;
use crate::pixel::{PixelBuffer, CHANNELS};

/// Default cutoff, as a fraction of full brightness
pub const DEFAULT_LEVEL: f32 = 0.5;

/// Rec. 709 luma weights scaled by 10_000 so the comparison stays exact
const LUMA_R: u32 = 2126;
const LUMA_G: u32 = 7152;
const LUMA_B: u32 = 722;
const LUMA_SCALE: i64 = 10_000;

/// Perceived brightness, 0.2126 R + 0.7152 G + 0.0722 B
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    luminance_scaled(r, g, b) as f32 / LUMA_SCALE as f32
}

#[inline]
fn luminance_scaled(r: u8, g: u8, b: u8) -> i64 {
    (LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32) as i64
}

/// Binarize a pixel buffer in place
pub fn apply(buffer: &mut PixelBuffer, level: f32) -> Result<(), OcrError> {
    threshold(buffer.as_bytes_mut(), level)
}

/// Set R, G and B to 255 where luminance reaches `floor(level * 255)` and to 0
/// elsewhere. Alpha is left alone.
pub fn threshold(pixels: &mut [u8], level: f32) -> Result<(), OcrError> {
    check_channel_layout(pixels.len())?;

    let cutoff = (level * 255.0).floor() as i64 * LUMA_SCALE;
    for px in pixels.chunks_exact_mut(CHANNELS) {
        let value = if luminance_scaled(px[0], px[1], px[2]) >= cutoff {
            255
        } else {
            0
        };
        px[0] = value;
        px[1] = value;
        px[2] = value;
    }
    Ok(())
}
