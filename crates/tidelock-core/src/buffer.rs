//! Sliding-Window Signal Buffers
//!
//! Fixed-capacity FIFO buffers that drop the oldest sample when full.
//! The simulation keeps three of them at different cadences:
//!
//! | Buffer | Cadence | Capacity |
//! |--------|---------|----------|
//! | high-frequency angle samples | every 0.016 s of simulated time | 512 |
//! | tidal (deviation, period) pairs | once per zero crossing | 65536 |
//! | PLL phase error / VCO frequency | once per PLL update | 200 |
//!
//! ## Example
//!
//! ```rust
//! use tidelock_core::buffer::SignalBuffer;
//!
//! let mut buf = SignalBuffer::new(3);
//! buf.extend([1.0, 2.0, 3.0, 4.0]);
//! assert!(buf.is_full());
//! assert_eq!(buf.to_vec(), vec![2.0, 3.0, 4.0]);
//! ```

use std::collections::VecDeque;

/// Capacity of the high-frequency angle buffer (one FFT frame).
pub const HIGH_FREQ_CAPACITY: usize = 512;

/// Capacity of the per-zero-crossing tidal buffers.
pub const TIDAL_CAPACITY: usize = 65_536;

/// Fixed-capacity sliding window with drop-oldest eviction.
///
/// Push is O(1): the backing `VecDeque` is allocated once at full capacity.
#[derive(Debug, Clone)]
pub struct SignalBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> SignalBuffer<T> {
    /// Create an empty buffer. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest one if the buffer is full.
    ///
    /// Returns the evicted value, if any.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.data.len() == self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(value);
        evicted
    }

    /// Append every value from an iterator.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) {
        for v in values {
            self.push(v);
        }
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True once the buffer holds `capacity` samples.
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Maximum number of samples retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Iterate oldest-first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.data.iter()
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<&T> {
        self.data.back()
    }
}

impl<T: Clone> SignalBuffer<T> {
    /// Copy the contents out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    /// Copy the most recent `n` samples (or fewer), oldest first.
    pub fn latest(&self, n: usize) -> Vec<T> {
        let skip = self.data.len().saturating_sub(n);
        self.data.iter().skip(skip).cloned().collect()
    }
}

impl SignalBuffer<f64> {
    /// Largest absolute value, or `None` when empty.
    pub fn max_abs(&self) -> Option<f64> {
        self.data.iter().map(|v| v.abs()).reduce(f64::max)
    }
}

/// Two parallel series that are always the same length.
///
/// Both halves live in one buffer of tuples, so eviction and clearing are
/// lockstep by construction.
#[derive(Debug, Clone)]
pub struct PairedBuffer<A, B> {
    inner: SignalBuffer<(A, B)>,
}

impl<A: Clone, B: Clone> PairedBuffer<A, B> {
    /// Create an empty paired buffer.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: SignalBuffer::new(capacity),
        }
    }

    /// Append one sample to each series.
    pub fn push_pair(&mut self, a: A, b: B) {
        self.inner.push((a, b));
    }

    /// First series, oldest first.
    pub fn firsts(&self) -> Vec<A> {
        self.inner.iter().map(|(a, _)| a.clone()).collect()
    }

    /// Second series, oldest first.
    pub fn seconds(&self) -> Vec<B> {
        self.inner.iter().map(|(_, b)| b.clone()).collect()
    }

    /// Both series at once.
    pub fn to_arrays(&self) -> (Vec<A>, Vec<B>) {
        self.inner.iter().cloned().unzip()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if no pairs are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// True once `capacity` pairs are stored.
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Maximum number of pairs retained.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Empty both series together.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}
