//! Image preprocessing ahead of OCR.
//!
//! Decoded images are binarized by luminance and/or smoothed with a separable
//! blur, then handed to a recognition engine. The filters live in
//! [`preprocessing`]; [`ocr`] chains them with decode, encode and recognition.

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod ocr;
pub mod pixel;
pub mod preprocessing;
pub mod server;

pub use error::OcrError;
pub use pixel::{PackedPixel, PixelBuffer};
pub use preprocessing::{Pipeline, Preset, Stage};
