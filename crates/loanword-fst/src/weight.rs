// Tropical semiring weights and a min-ordered heap entry.

use std::cmp::Ordering;

/// Multiplicative identity: the cost of an arc that costs nothing.
pub const ONE: f64 = 0.0;

/// Additive identity: an impossible path.
pub const ZERO: f64 = f64::INFINITY;

/// Tolerance used when comparing or hashing weights.
pub const DELTA: f64 = 1.0 / 1024.0;

/// Extends a path by one weight.
#[inline]
pub fn times(a: f64, b: f64) -> f64 {
    a + b
}

/// Chooses between two alternatives.
#[inline]
pub fn plus(a: f64, b: f64) -> f64 {
    a.min(b)
}

#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= DELTA
}

/// Maps a finite weight onto an integer grid so that weights within
/// [`DELTA`] of each other usually share a key.
#[inline]
pub fn quantize(w: f64) -> i64 {
    (w / DELTA).round() as i64
}

/// Heap entry popped lowest priority first; equal priorities pop in
/// insertion order (`seq` ascending).
#[derive(Debug, Clone, Copy)]
pub(crate) struct MinEntry<T> {
    pub priority: f64,
    pub seq: u64,
    pub item: T,
}

impl<T> PartialEq for MinEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for MinEntry<T> {}

impl<T> PartialOrd for MinEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for MinEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
