use super::CHANNELS;

/// A pixel packed as `A << 24 | R << 16 | G << 8 | B`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedPixel(pub u32);

impl PackedPixel {
    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    #[inline]
    pub fn a(self) -> u8 {
        ((self.0 & 0xFF00_0000) >> 24) as u8
    }

    #[inline]
    pub fn r(self) -> u8 {
        ((self.0 & 0x00FF_0000) >> 16) as u8
    }

    #[inline]
    pub fn g(self) -> u8 {
        ((self.0 & 0x0000_FF00) >> 8) as u8
    }

    #[inline]
    pub fn b(self) -> u8 {
        (self.0 & 0x0000_00FF) as u8
    }

    /// Channels in buffer order (R, G, B, A)
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r(), self.g(), self.b(), self.a()]
    }
}

/// Pack the pixel at `index` of an interleaved RGBA buffer.
///
/// Panics if the pixel lies outside `pixels`; callers validate lengths first.
#[inline]
pub fn pack(pixels: &[u8], index: usize) -> PackedPixel {
    let offset = index * CHANNELS;
    PackedPixel::from_argb(
        pixels[offset + 3],
        pixels[offset],
        pixels[offset + 1],
        pixels[offset + 2],
    )
}

/// Pack every whole pixel of an interleaved RGBA buffer
pub fn pack_all(pixels: &[u8]) -> Vec<PackedPixel> {
    pixels
        .chunks_exact(CHANNELS)
        .map(|px| PackedPixel::from_argb(px[3], px[0], px[1], px[2]))
        .collect()
}

/// Write packed pixels back into an interleaved RGBA buffer.
///
/// Only the first `min(packed.len(), pixels.len() / 4)` pixels are written.
pub fn unpack_into(packed: &[PackedPixel], pixels: &mut [u8]) {
    for (dst, src) in pixels.chunks_exact_mut(CHANNELS).zip(packed) {
        dst.copy_from_slice(&src.to_rgba());
    }
}
