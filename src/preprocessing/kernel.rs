//! Blur kernel derivation and its single-slot cache

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

/// Requested radius is scaled by this before truncation
pub const RADIUS_SCALE: f32 = 3.5;
pub const MIN_RADIUS: usize = 1;
/// Bounds the kernel at 497 taps
pub const MAX_RADIUS: usize = 248;

/// Integer kernel radius for a requested blur radius
pub fn kernel_radius(requested: f32) -> usize {
    let scaled = (requested * RADIUS_SCALE).floor();
    // NaN and negatives fall through to the minimum
    if !(scaled >= MIN_RADIUS as f32) {
        MIN_RADIUS
    } else if scaled >= MAX_RADIUS as f32 {
        MAX_RADIUS
    } else {
        scaled as usize
    }
}

/// Symmetric integer weights with precomputed `weight * value` products.
///
/// The tap at distance `d` from the center weighs `(radius - d)^2`, so the
/// outermost taps weigh zero. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlurKernel {
    radius: usize,
    weights: Vec<u32>,
    mult: Vec<[u32; 256]>,
}

impl BlurKernel {
    pub fn build(requested: f32) -> Self {
        Self::with_radius(kernel_radius(requested))
    }

    fn with_radius(radius: usize) -> Self {
        let size = 2 * radius + 1;
        let mut weights = vec![0u32; size];

        for i in 0..radius {
            let d = (radius - 1 - i) as u32;
            let weight = d * d;
            weights[radius + 1 + i] = weight;
            weights[radius - 1 - i] = weight;
        }
        weights[radius] = (radius * radius) as u32;

        let mult = weights
            .iter()
            .map(|&w| {
                let mut row = [0u32; 256];
                for (v, product) in row.iter_mut().enumerate() {
                    *product = w * v as u32;
                }
                row
            })
            .collect();

        Self {
            radius,
            weights,
            mult,
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn size(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    /// `weight(tap) * value`, read from the multiplication table
    #[inline]
    pub fn weighted(&self, tap: usize, value: u8) -> u32 {
        self.mult[tap][value as usize]
    }

    /// Sum of all tap weights
    pub fn total_weight(&self) -> u64 {
        self.weights.iter().map(|&w| w as u64).sum()
    }

    /// Source positions covered by the window centered on `center` in a line
    /// of `len` samples, with out-of-range taps dropped. Returns the source
    /// range and the tap index of its first element.
    ///
    /// `center` must be below `len`.
    #[inline]
    pub fn window(&self, center: usize, len: usize) -> (RangeInclusive<usize>, usize) {
        let start = center.saturating_sub(self.radius);
        let end = (center + self.radius).min(len - 1);
        let first_tap = start + self.radius - center;
        (start..=end, first_tap)
    }

    /// Normalization divisor at `center`: the weights of in-range taps only
    pub fn window_weight(&self, center: usize, len: usize) -> u64 {
        let (range, first_tap) = self.window(center, len);
        let taps = range.end() - range.start() + 1;
        self.weights[first_tap..first_tap + taps]
            .iter()
            .map(|&w| w as u64)
            .sum()
    }
}

/// Caller-owned cache of the most recently built kernel.
///
/// Holds at most one kernel. Kernels are shared as `Arc`s and replaced
/// wholesale, so concurrent users never observe a half-built table.
#[derive(Debug, Default)]
pub struct KernelCache {
    slot: Mutex<Option<Arc<BlurKernel>>>,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kernel for `requested`, rebuilt only when its clamped radius differs
    /// from the cached one
    pub fn get(&self, requested: f32) -> Arc<BlurKernel> {
        let radius = kernel_radius(requested);
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(kernel) = slot.as_ref() {
            if kernel.radius() == radius {
                return Arc::clone(kernel);
            }
        }

        tracing::debug!(radius, "building blur kernel");
        let kernel = Arc::new(BlurKernel::with_radius(radius));
        *slot = Some(Arc::clone(&kernel));
        kernel
    }

    /// Radius of the cached kernel, if any
    pub fn cached_radius(&self) -> Option<usize> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|k| k.radius())
    }
}
