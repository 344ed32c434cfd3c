use crate::error::OcrError;
use crate::pixel::buffer::check_dimensions;
use crate::pixel::packed::{pack_all, unpack_into};
use crate::pixel::{PackedPixel, PixelBuffer};
use crate::preprocessing::kernel::{BlurKernel, KernelCache};

/// Default requested radius (kernel radius 3)
pub const DEFAULT_RADIUS: f32 = 1.0;

/// Blur a pixel buffer in place, taking the kernel from `cache`
pub fn apply(buffer: &mut PixelBuffer, radius: f32, cache: &KernelCache) -> Result<(), OcrError> {
    let kernel = cache.get(radius);
    let (width, height) = (buffer.width() as usize, buffer.height() as usize);
    blur(buffer.as_bytes_mut(), width, height, &kernel)
}

/// Separable blur over interleaved RGBA pixels: a horizontal pass into
/// per-channel planes, then a vertical pass back into packed pixels.
///
/// Taps falling outside the image are skipped and each output is divided by
/// the weight of the taps actually used, so borders are neither darkened nor
/// brightened.
pub fn blur(
    pixels: &mut [u8],
    width: usize,
    height: usize,
    kernel: &BlurKernel,
) -> Result<(), OcrError> {
    check_dimensions(pixels.len(), width, height)?;
    if width == 0 || height == 0 {
        return Ok(());
    }

    let mut packed = pack_all(pixels);
    let planes = horizontal_pass(&packed, width, height, kernel);
    vertical_pass(&planes, &mut packed, width, height, kernel);
    unpack_into(&packed, pixels);
    Ok(())
}

/// Intermediate channel planes produced by the horizontal pass
struct Planes {
    a: Vec<u8>,
    r: Vec<u8>,
    g: Vec<u8>,
    b: Vec<u8>,
}

#[derive(Default)]
struct Accumulator {
    a: u64,
    r: u64,
    g: u64,
    b: u64,
    weight: u64,
}

impl Accumulator {
    #[inline]
    fn add(&mut self, kernel: &BlurKernel, tap: usize, [a, r, g, b]: [u8; 4]) {
        self.a += kernel.weighted(tap, a) as u64;
        self.r += kernel.weighted(tap, r) as u64;
        self.g += kernel.weighted(tap, g) as u64;
        self.b += kernel.weighted(tap, b) as u64;
        self.weight += kernel.weights()[tap] as u64;
    }

    /// Truncating weighted mean per channel, in (A, R, G, B) order.
    /// The center tap is always in range, so `weight` is never zero.
    #[inline]
    fn mean(&self) -> [u8; 4] {
        [
            (self.a / self.weight) as u8,
            (self.r / self.weight) as u8,
            (self.g / self.weight) as u8,
            (self.b / self.weight) as u8,
        ]
    }
}

fn horizontal_pass(
    packed: &[PackedPixel],
    width: usize,
    height: usize,
    kernel: &BlurKernel,
) -> Planes {
    let count = width * height;
    let mut planes = Planes {
        a: vec![0; count],
        r: vec![0; count],
        g: vec![0; count],
        b: vec![0; count],
    };

    for y in 0..height {
        let row = &packed[y * width..(y + 1) * width];
        for x in 0..width {
            let (range, first_tap) = kernel.window(x, width);
            let mut acc = Accumulator::default();
            for (tap, px) in (first_tap..).zip(&row[range]) {
                acc.add(kernel, tap, [px.a(), px.r(), px.g(), px.b()]);
            }

            let [a, r, g, b] = acc.mean();
            let i = y * width + x;
            planes.a[i] = a;
            planes.r[i] = r;
            planes.g[i] = g;
            planes.b[i] = b;
        }
    }

    planes
}

fn vertical_pass(
    planes: &Planes,
    out: &mut [PackedPixel],
    width: usize,
    height: usize,
    kernel: &BlurKernel,
) {
    for y in 0..height {
        let (range, first_tap) = kernel.window(y, height);
        for x in 0..width {
            let mut acc = Accumulator::default();
            for (tap, sy) in (first_tap..).zip(range.clone()) {
                let i = sy * width + x;
                acc.add(
                    kernel,
                    tap,
                    [planes.a[i], planes.r[i], planes.g[i], planes.b[i]],
                );
            }

            let [a, r, g, b] = acc.mean();
            out[y * width + x] = PackedPixel::from_argb(a, r, g, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_image_is_fixed_point() {
        let cache = KernelCache::new();
        for radius in [0.0, 0.3, 1.0, 2.5, 100.0] {
            let mut buf = PixelBuffer::filled(9, 5, [200, 100, 50, 255]);
            let expected = buf.clone();
            apply(&mut buf, radius, &cache).unwrap();
            assert_eq!(buf, expected, "radius {}", radius);
        }
    }

    #[test]
    fn test_preserves_length() {
        let cache = KernelCache::new();
        for (w, h) in [(1, 1), (1, 7), (7, 1), (13, 4)] {
            let mut buf = PixelBuffer::filled(w, h, [0, 0, 0, 255]);
            buf.set_pixel(0, 0, [255, 10, 20, 30]);
            apply(&mut buf, 1.5, &cache).unwrap();
            assert_eq!(buf.as_bytes().len(), (w * h * 4) as usize);
        }
    }

    #[test]
    fn test_corner_normalized_by_in_bounds_weight() {
        let kernel = BlurKernel::build(1.0);
        let mut buf = PixelBuffer::filled(8, 8, [0, 0, 0, 255]);
        buf.set_pixel(0, 0, [255, 255, 255, 255]);

        let (w, h) = (buf.width() as usize, buf.height() as usize);
        blur(buf.as_bytes_mut(), w, h, &kernel).unwrap();

        // In-bounds taps at the corner weigh 9 + 4 + 1 + 0 = 14 of 19.
        // Horizontal: 255 * 9 / 14 = 163; vertical: 163 * 9 / 14 = 104.
        assert_eq!(kernel.window_weight(0, w), 14);
        assert_ne!(kernel.window_weight(0, w), kernel.total_weight());
        // Dividing by the full 19 would have given 56.
        assert_eq!(buf.pixel(0, 0), Some([104, 104, 104, 255]));
    }

    #[test]
    fn test_spreads_bright_pixel_symmetrically() {
        let cache = KernelCache::new();
        let mut buf = PixelBuffer::filled(9, 9, [0, 0, 0, 255]);
        buf.set_pixel(4, 4, [255, 255, 255, 255]);
        apply(&mut buf, 1.0, &cache).unwrap();

        let center = buf.pixel(4, 4).unwrap();
        let left = buf.pixel(3, 4).unwrap();
        let right = buf.pixel(5, 4).unwrap();
        let up = buf.pixel(4, 3).unwrap();
        assert!(center[0] > left[0]);
        assert!(left[0] > 0);
        assert_eq!(left, right);
        assert_eq!(left, up);
        // Zero-weight outer taps do not reach
        assert_eq!(buf.pixel(1, 4).unwrap()[0], 0);
    }

    #[test]
    fn test_alpha_blurred_like_other_channels() {
        let cache = KernelCache::new();
        let mut buf = PixelBuffer::filled(5, 1, [50, 50, 50, 0]);
        buf.set_pixel(2, 0, [50, 50, 50, 255]);
        apply(&mut buf, 1.0, &cache).unwrap();

        let center = buf.pixel(2, 0).unwrap();
        assert_eq!(center[0], 50);
        // 255 * 9 / 19 = 120
        assert_eq!(center[3], 120);
    }

    #[test]
    fn test_rejects_mismatched_dimensions() {
        let kernel = BlurKernel::build(1.0);
        let mut pixels = vec![7u8; 16];
        let err = blur(&mut pixels, 3, 2, &kernel).unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput(_)));
        assert!(pixels.iter().all(|&p| p == 7));
    }
}
