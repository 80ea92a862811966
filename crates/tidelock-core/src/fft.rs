//! Radix-2 FFT
//!
//! Iterative Cooley-Tukey transform for power-of-two sizes. Twiddle factors
//! and the bit-reversal permutation are computed once per size, so a
//! [`Radix2Fft`] is meant to be built once and reused across frames.
//!
//! ```text
//! stage s (len = 2^s):
//!   for each block of len, k in 0..len/2:
//!     t      = W_N^(k·N/len) · x[i + k + len/2]
//!     x[i+k]         = u + t
//!     x[i+k+len/2]   = u - t
//! ```
//!
//! The forward transform is unnormalized. The inverse divides by N, so
//! `inverse(forward(x)) == x`.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{SimError, SimResult};

/// Window applied to a frame before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// `0.5 · (1 - cos(2π·i/N))`
    #[default]
    Hann,
    /// All ones
    Rectangular,
}

impl Window {
    /// Window coefficients for a frame of length `n`.
    pub fn coefficients(&self, n: usize) -> Vec<f64> {
        match self {
            Window::Hann => (0..n)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos()))
                .collect(),
            Window::Rectangular => vec![1.0; n],
        }
    }

    /// Multiply `frame` by the window in place.
    pub fn apply(&self, frame: &mut [f64]) {
        self.apply_over(frame, frame.len());
    }

    /// Multiply `frame` by the first `frame.len()` coefficients of a
    /// length-`span` window.
    pub fn apply_over(&self, frame: &mut [f64], span: usize) {
        if *self == Window::Rectangular {
            return;
        }
        let coeffs = self.coefficients(span.max(frame.len()));
        for (x, w) in frame.iter_mut().zip(coeffs) {
            *x *= w;
        }
    }
}

/// Precomputed radix-2 transform of a fixed size.
#[derive(Debug, Clone)]
pub struct Radix2Fft {
    size: usize,
    /// e^(-2πik/N) for k in 0..N/2
    twiddles: Vec<Complex64>,
    /// Bit-reversed index for each position
    bit_reversed: Vec<usize>,
}

impl Radix2Fft {
    /// Plan a transform. `size` must be a power of two and at least 2.
    pub fn new(size: usize) -> SimResult<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(SimError::InvalidFftSize(size));
        }

        let twiddles = (0..size / 2)
            .map(|k| Complex64::from_polar(1.0, -2.0 * PI * k as f64 / size as f64))
            .collect();

        let bits = size.trailing_zeros();
        let bit_reversed = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - bits))
            .collect();

        Ok(Self {
            size,
            twiddles,
            bit_reversed,
        })
    }

    /// Transform length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform in place. `buffer.len()` must equal [`size`](Self::size).
    pub fn forward(&self, buffer: &mut [Complex64]) {
        self.transform(buffer, false);
    }

    /// Inverse transform in place, scaled by 1/N.
    pub fn inverse(&self, buffer: &mut [Complex64]) {
        self.transform(buffer, true);
        let scale = 1.0 / self.size as f64;
        for x in buffer.iter_mut() {
            *x *= scale;
        }
    }

    fn transform(&self, buffer: &mut [Complex64], inverse: bool) {
        debug_assert_eq!(buffer.len(), self.size);
        let n = self.size.min(buffer.len());

        for i in 0..n {
            let j = self.bit_reversed[i];
            if i < j {
                buffer.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let w = self.twiddles[k * stride];
                    let w = if inverse { w.conj() } else { w };
                    let u = buffer[start + k];
                    let t = w * buffer[start + k + half];
                    buffer[start + k] = u + t;
                    buffer[start + k + half] = u - t;
                }
            }
            len <<= 1;
        }
    }
}

/// Rebuild a full length-`n` spectrum of a real signal from bins `0..=n/2`.
///
/// Missing bins are treated as zero. Bin `n - k` is the conjugate of bin `k`.
pub fn hermitian_completion(half: &[Complex64], n: usize) -> Vec<Complex64> {
    let mut full = vec![Complex64::new(0.0, 0.0); n];
    for (k, value) in half.iter().take(n / 2 + 1).enumerate() {
        full[k] = *value;
        if k != 0 && k != n - k {
            full[n - k] = value.conj();
        }
    }
    full
}
