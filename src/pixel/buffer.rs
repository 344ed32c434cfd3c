use super::CHANNELS;
use crate::error::OcrError;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Interleaved, row-major RGBA8 pixels with known dimensions.
///
/// The length invariant `width * height * 4 == data.len()` is checked on
/// construction, so filters can rely on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, OcrError> {
        check_dimensions(data.len(), width as usize, height as usize)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Buffer where every pixel has the same RGBA value
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            data: rgba.into_raw(),
            width,
            height,
        }
    }

    /// Decode an encoded image (PNG, JPEG, ...) into RGBA pixels
    pub fn decode(bytes: &[u8]) -> Result<Self, OcrError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| OcrError::ImageDecode(e.to_string()))?;
        Ok(Self::from_image(&image))
    }

    pub fn into_image(self) -> Result<DynamicImage, OcrError> {
        RgbaImage::from_raw(self.width, self.height, self.data)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| OcrError::Internal("pixel buffer does not match its dimensions".into()))
    }

    pub fn to_image(&self) -> Result<DynamicImage, OcrError> {
        self.clone().into_image()
    }

    /// Encode as PNG, the resource handed to display
    pub fn encode_png(&self) -> Result<Vec<u8>, OcrError> {
        let image = self.to_image()?;
        let mut out = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .map_err(|e| OcrError::ImageEncode(e.to_string()))?;
        Ok(out)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA value at (x, y), or `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[offset..offset + CHANNELS]);
        Some(px)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width && y < self.height {
            let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
            self.data[offset..offset + CHANNELS].copy_from_slice(&rgba);
        }
    }
}

/// Fail unless `len` holds whole RGBA pixels
pub fn check_channel_layout(len: usize) -> Result<(), OcrError> {
    if len % CHANNELS != 0 {
        return Err(OcrError::InvalidInput(format!(
            "buffer length {} is not a multiple of {}",
            len, CHANNELS
        )));
    }
    Ok(())
}

/// Fail unless `len` is exactly `width * height * 4`
pub fn check_dimensions(len: usize, width: usize, height: usize) -> Result<(), OcrError> {
    check_channel_layout(len)?;
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| {
            OcrError::InvalidInput(format!("dimensions {}x{} overflow", width, height))
        })?;
    if expected != len {
        return Err(OcrError::InvalidInput(format!(
            "buffer length {} does not match {}x{} RGBA ({} bytes)",
            len, width, height, expected
        )));
    }
    Ok(())
}
