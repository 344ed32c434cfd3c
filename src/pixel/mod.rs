//! In-memory pixel representations
//!
//! `PixelBuffer` is the interleaved RGBA layout handed in by the decoder and
//! handed back to display/recognition. `PackedPixel` is the 32-bit ARGB form
//! the blur works on internally.

pub mod buffer;
pub mod packed;

pub use buffer::PixelBuffer;
pub use packed::PackedPixel;

/// Bytes per pixel in the interleaved layout (R, G, B, A)
pub const CHANNELS: usize = 4;
