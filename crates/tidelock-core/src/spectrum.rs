//! Spectral Estimator
//!
//! Windowed FFT analysis shared by the pendulum spectrum (uniform 0.016 s
//! samples) and the tidal spectrum (one sample per zero crossing).
//!
//! ## Pipeline
//!
//! ```text
//! signal ──► latest N samples ──► window ──► zero pad to N ──► FFT
//!                                                              │
//!            magnitude |X[k]|/N, phase atan2(im, re)  ◄─────────┘
//!            for k in 0..N/2
//! ```
//!
//! Fewer than [`MIN_SAMPLES`] samples is a normal state, reported as
//! [`Analysis::Pending`] rather than an error.
//!
//! Phases are not unwrapped.
//!
//! ## Tidal sample rate
//!
//! The tidal buffer is sampled once per zero crossing, so its rate is not
//! fixed. [`effective_sample_rate`] estimates it from the mean measured
//! period, skipping the first [`WARMUP_PERIODS`] entries.
//!
//! ## Example
//!
//! ```rust
//! use tidelock_core::fft::Window;
//! use tidelock_core::spectrum::{Analysis, SpectralEstimator};
//!
//! let fs = 62.5;
//! let signal: Vec<f64> = (0..512)
//!     .map(|i| (2.0 * std::f64::consts::PI * 1.0 * i as f64 / fs).sin())
//!     .collect();
//!
//! let estimator = SpectralEstimator::new(512, Window::Hann).unwrap();
//! match estimator.analyze(&signal, fs) {
//!     Analysis::Ready(result) => assert_eq!(result.nearest_bin(1.0), 8),
//!     Analysis::Pending { .. } => unreachable!(),
//! }
//! ```

use num_complex::Complex64;
use serde::Serialize;
use std::ops::Range;

use crate::error::SimResult;
use crate::fft::{Radix2Fft, Window};

/// Fewest samples an analysis will run on.
pub const MIN_SAMPLES: usize = 64;
/// Leading tidal periods ignored when estimating the sample rate.
pub const WARMUP_PERIODS: usize = 3;
/// Peaks below this fraction of the in-range maximum are ignored.
pub const PEAK_THRESHOLD_FRACTION: f64 = 0.05;

const NOISE_FLOOR: f64 = 1e-20;
const NORMALIZATION_FLOOR: f64 = 1e-10;

/// Closed frequency interval in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyRange {
    pub min_hz: f64,
    pub max_hz: f64,
}

impl FrequencyRange {
    pub fn new(min_hz: f64, max_hz: f64) -> Self {
        Self { min_hz, max_hz }
    }

    /// Range of `width_hz` around `center_hz`, with the lower edge raised
    /// to at least `floor_hz`.
    pub fn centered(center_hz: f64, width_hz: f64, floor_hz: f64) -> Self {
        Self {
            min_hz: (center_hz - width_hz / 2.0).max(floor_hz),
            max_hz: center_hz + width_hz / 2.0,
        }
    }

    /// Multiply both edges by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            min_hz: self.min_hz * factor,
            max_hz: self.max_hz * factor,
        }
    }

    pub fn contains(&self, hz: f64) -> bool {
        hz >= self.min_hz && hz <= self.max_hz
    }

    pub fn width_hz(&self) -> f64 {
        self.max_hz - self.min_hz
    }
}

/// Outcome of [`SpectralEstimator::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis {
    /// Not enough samples yet
    Pending { available: usize, required: usize },
    /// Spectrum computed
    Ready(SpectrumResult),
}

impl Analysis {
    pub fn is_ready(&self) -> bool {
        matches!(self, Analysis::Ready(_))
    }

    /// The spectrum, if one was computed.
    pub fn result(&self) -> Option<&SpectrumResult> {
        match self {
            Analysis::Ready(r) => Some(r),
            Analysis::Pending { .. } => None,
        }
    }
}

/// Single-sided spectrum of a real signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumResult {
    /// |X[k]| / N for k in 0..N/2
    pub magnitude: Vec<f64>,
    /// atan2(im, re) for k in 0..N/2
    pub phase: Vec<f64>,
    pub frequency_resolution_hz: f64,
    pub sample_rate_hz: f64,
    pub fft_size: usize,
    /// Real samples in the frame (the rest is zero padding)
    pub samples_used: usize,
}

impl SpectrumResult {
    /// Centre frequency of bin `k`.
    pub fn bin_frequency(&self, k: usize) -> f64 {
        k as f64 * self.frequency_resolution_hz
    }

    /// Bin closest to `hz`, clamped to the single-sided range.
    pub fn nearest_bin(&self, hz: f64) -> usize {
        let last = self.magnitude.len().saturating_sub(1);
        if hz.is_nan() || hz <= 0.0 || self.frequency_resolution_hz <= 0.0 {
            return 0;
        }
        ((hz / self.frequency_resolution_hz).round() as usize).min(last)
    }

    /// Bins covering `range`: `floor(min/Δf) .. min(N/2, ceil(max/Δf))`.
    pub fn bins_in_range(&self, range: &FrequencyRange) -> Range<usize> {
        let len = self.magnitude.len();
        if self.frequency_resolution_hz <= 0.0 {
            return 0..0;
        }
        let start = (range.min_hz.max(0.0) / self.frequency_resolution_hz).floor() as usize;
        let end = ((range.max_hz.max(0.0) / self.frequency_resolution_hz).ceil() as usize).min(len);
        start.min(end)..end
    }

    /// Largest magnitude in `range`, 0 when the range holds no bins.
    pub fn max_in_range(&self, range: &FrequencyRange) -> f64 {
        self.magnitude[self.bins_in_range(range)]
            .iter()
            .copied()
            .fold(0.0, f64::max)
    }

    /// `(frequency, magnitude / max_in_range)` pairs for display.
    pub fn normalized(&self, range: &FrequencyRange) -> Vec<(f64, f64)> {
        let max = self.max_in_range(range).max(NORMALIZATION_FLOOR);
        self.bins_in_range(range)
            .map(|k| (self.bin_frequency(k), self.magnitude[k] / max))
            .collect()
    }
}

/// A local maximum reported by [`find_peaks`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralPeak {
    pub bin: usize,
    pub frequency_hz: f64,
    pub magnitude: f64,
    pub phase_rad: f64,
}

/// How far the window stretches when the signal is shorter than the FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowSpan {
    /// The window covers only the samples used; padding follows it
    #[default]
    SamplesUsed,
    /// The window always covers the full FFT frame, so a short signal
    /// sees only its leading part
    FullFrame,
}

/// Fixed-size windowed FFT analyzer.
#[derive(Debug, Clone)]
pub struct SpectralEstimator {
    fft: Radix2Fft,
    window: Window,
    span: WindowSpan,
}

impl SpectralEstimator {
    /// `fft_size` must be a power of two.
    pub fn new(fft_size: usize, window: Window) -> SimResult<Self> {
        Ok(Self {
            fft: Radix2Fft::new(fft_size)?,
            window,
            span: WindowSpan::default(),
        })
    }

    pub fn with_window_span(mut self, span: WindowSpan) -> Self {
        self.span = span;
        self
    }

    pub fn window_span(&self) -> WindowSpan {
        self.span
    }

    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Analyze the most recent `fft_size` samples of `signal`.
    ///
    /// Shorter signals are zero padded after windowing. With
    /// [`WindowSpan::SamplesUsed`] the window covers only the real samples;
    /// with [`WindowSpan::FullFrame`] it covers all `fft_size` points.
    pub fn analyze(&self, signal: &[f64], sample_rate_hz: f64) -> Analysis {
        if signal.len() < MIN_SAMPLES {
            return Analysis::Pending {
                available: signal.len(),
                required: MIN_SAMPLES,
            };
        }

        let n = self.fft.size();
        let used = signal.len().min(n);
        let mut frame = signal[signal.len() - used..].to_vec();
        let span = match self.span {
            WindowSpan::SamplesUsed => used,
            WindowSpan::FullFrame => n,
        };
        self.window.apply_over(&mut frame, span);

        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        for (slot, &x) in buffer.iter_mut().zip(&frame) {
            slot.re = x;
        }
        self.fft.forward(&mut buffer);

        let scale = 1.0 / n as f64;
        let (magnitude, phase) = buffer[..n / 2]
            .iter()
            .map(|c| (c.norm() * scale, c.im.atan2(c.re)))
            .unzip();

        Analysis::Ready(SpectrumResult {
            magnitude,
            phase,
            frequency_resolution_hz: sample_rate_hz / n as f64,
            sample_rate_hz,
            fft_size: n,
            samples_used: used,
        })
    }
}

/// Sample rate implied by a series of zero-crossing periods.
///
/// Returns `1 / mean(periods[WARMUP_PERIODS..])`, or the mean of every
/// period when no more than [`WARMUP_PERIODS`] are present.
pub fn effective_sample_rate(periods: &[f64]) -> Option<f64> {
    let settled = if periods.len() > WARMUP_PERIODS {
        &periods[WARMUP_PERIODS..]
    } else {
        periods
    };
    if settled.is_empty() {
        return None;
    }
    let mean = settled.iter().sum::<f64>() / settled.len() as f64;
    (mean > 0.0 && mean.is_finite()).then(|| 1.0 / mean)
}

/// Signal-to-noise ratio at `target_hz` in dB.
///
/// Signal power sums |X|² over the nearest bin and its two neighbours.
/// Noise power is the mean |X|² over `±noise_window_bins` around it,
/// excluding the signal bins.
pub fn snr_db(result: &SpectrumResult, target_hz: f64, noise_window_bins: usize) -> f64 {
    let len = result.magnitude.len() as isize;
    let k = result.nearest_bin(target_hz) as isize;
    let w = noise_window_bins as isize;
    let power = |j: isize| result.magnitude[j as usize].powi(2);

    let signal: f64 = ((k - 1)..=(k + 1)).filter(|j| (0..len).contains(j)).map(power).sum();

    let noise_bins: Vec<f64> = ((k - w)..=(k + w))
        .filter(|j| (0..len).contains(j) && (j - k).abs() > 1)
        .map(power)
        .collect();
    let noise = if noise_bins.is_empty() {
        NOISE_FLOOR
    } else {
        (noise_bins.iter().sum::<f64>() / noise_bins.len() as f64).max(NOISE_FLOOR)
    };

    10.0 * (signal / noise).log10()
}

/// Local maxima in `range` above [`PEAK_THRESHOLD_FRACTION`] of the
/// in-range maximum, at least `min_separation_bins` apart.
///
/// When two candidates are too close the larger one wins. The result is
/// sorted by frequency.
pub fn find_peaks(result: &SpectrumResult, range: &FrequencyRange, min_separation_bins: usize) -> Vec<SpectralPeak> {
    let mag = &result.magnitude;
    let bins = result.bins_in_range(range);
    let threshold = PEAK_THRESHOLD_FRACTION * result.max_in_range(range);
    if threshold <= 0.0 {
        return Vec::new();
    }

    let mut candidates: Vec<usize> = bins
        .filter(|&k| {
            let m = mag[k];
            let left_ok = k == 0 || m >= mag[k - 1];
            let right_ok = k + 1 >= mag.len() || m > mag[k + 1];
            m >= threshold && left_ok && right_ok
        })
        .collect();
    candidates.sort_by(|&a, &b| mag[b].total_cmp(&mag[a]));

    let mut accepted: Vec<usize> = Vec::new();
    for k in candidates {
        if accepted.iter().all(|&p| p.abs_diff(k) >= min_separation_bins) {
            accepted.push(k);
        }
    }
    accepted.sort_unstable();

    accepted
        .into_iter()
        .map(|k| SpectralPeak {
            bin: k,
            frequency_hz: result.bin_frequency(k),
            magnitude: mag[k],
            phase_rad: result.phase[k],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn tone(freq: f64, fs: f64, n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    fn ready(analysis: Analysis) -> SpectrumResult {
        match analysis {
            Analysis::Ready(r) => r,
            Analysis::Pending { available, .. } => panic!("pending with {available} samples"),
        }
    }

    #[test]
    fn test_pending_below_minimum() {
        let est = SpectralEstimator::new(512, Window::Hann).unwrap();
        let analysis = est.analyze(&vec![0.1; MIN_SAMPLES - 1], 62.5);
        assert_eq!(
            analysis,
            Analysis::Pending {
                available: MIN_SAMPLES - 1,
                required: MIN_SAMPLES
            }
        );
        assert!(analysis.result().is_none());
        assert!(est.analyze(&vec![0.1; MIN_SAMPLES], 62.5).is_ready());
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(SpectralEstimator::new(500, Window::Hann).is_err());
    }

    #[test]
    fn test_pendulum_rate_sine_peak() {
        let fs = 62.5;
        let est = SpectralEstimator::new(512, Window::Hann).unwrap();
        let result = ready(est.analyze(&tone(1.0, fs, 512, 1.0), fs));

        assert_eq!(result.magnitude.len(), 256);
        assert!((result.frequency_resolution_hz - fs / 512.0).abs() < 1e-12);

        let argmax = (1..result.magnitude.len())
            .max_by(|&a, &b| result.magnitude[a].total_cmp(&result.magnitude[b]))
            .unwrap();
        let expected = result.nearest_bin(1.0);
        assert!(argmax.abs_diff(expected) <= 1, "peak at bin {argmax}, expected ~{expected}");
        assert!((result.bin_frequency(argmax) - 1.0).abs() <= result.frequency_resolution_hz);
    }

    #[test]
    fn test_uses_most_recent_samples() {
        let fs = 512.0;
        let est = SpectralEstimator::new(512, Window::Hann).unwrap();
        let recent = tone(20.0, fs, 512, 1.0);

        let mut long = vec![1e3; 88];
        long.extend_from_slice(&recent);

        let a = ready(est.analyze(&long, fs));
        let b = ready(est.analyze(&recent, fs));
        assert_eq!(a.samples_used, 512);
        for (x, y) in a.magnitude.iter().zip(&b.magnitude) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_padding() {
        let est = SpectralEstimator::new(1024, Window::Hann).unwrap();
        let result = ready(est.analyze(&tone(0.05, 1.0, 100, 1.0), 1.0));
        assert_eq!(result.samples_used, 100);
        assert_eq!(result.fft_size, 1024);
        assert_eq!(result.magnitude.len(), 512);
        assert!(result.magnitude.iter().all(|m| m.is_finite()));
    }

    #[test]
    fn test_window_span_on_partial_frame() {
        let n = 512;
        let signal = vec![1.0; 100];
        let used = SpectralEstimator::new(n, Window::Hann).unwrap();
        let full = SpectralEstimator::new(n, Window::Hann)
            .unwrap()
            .with_window_span(WindowSpan::FullFrame);
        assert_eq!(used.window_span(), WindowSpan::SamplesUsed);

        // A Hann window over its own length sums to half that length
        let dc_used = ready(used.analyze(&signal, 62.5)).magnitude[0];
        assert!((dc_used - 50.0 / n as f64).abs() < 1e-12);

        let expected: f64 = Window::Hann.coefficients(n)[..100].iter().sum::<f64>() / n as f64;
        let dc_full = ready(full.analyze(&signal, 62.5)).magnitude[0];
        assert!((dc_full - expected).abs() < 1e-12);
        assert!(dc_full < dc_used);

        // Once the buffer fills both spans agree
        let filled = tone(3.0, 62.5, n, 1.0);
        assert_eq!(used.analyze(&filled, 62.5), full.analyze(&filled, 62.5));
    }

    #[test]
    fn test_window_amplitude_scaling() {
        // Bin-centred tone: Hann gives A/4, rectangular A/2
        let fs = 512.0;
        let signal = tone(32.0, fs, 512, 1.0);
        let hann = ready(SpectralEstimator::new(512, Window::Hann).unwrap().analyze(&signal, fs));
        let rect = ready(SpectralEstimator::new(512, Window::Rectangular).unwrap().analyze(&signal, fs));
        assert!((hann.magnitude[32] - 0.25).abs() < 1e-9);
        assert!((hann.magnitude[31] - 0.125).abs() < 1e-9);
        assert!((rect.magnitude[32] - 0.5).abs() < 1e-9);
        assert!(rect.magnitude[31] < 1e-9);
    }

    #[test]
    fn test_effective_sample_rate_skips_warmup() {
        assert_eq!(effective_sample_rate(&[10.0, 10.0, 10.0, 1.0, 1.0, 1.0]), Some(1.0));
        assert_eq!(effective_sample_rate(&[2.0]), Some(0.5));
        assert_eq!(effective_sample_rate(&[4.0, 4.0, 4.0]), Some(0.25));
        assert_eq!(effective_sample_rate(&[]), None);
        assert_eq!(effective_sample_rate(&[0.0, 0.0]), None);
    }

    #[test]
    fn test_snr_tone_vs_noise() {
        let fs = 512.0;
        let mut rng = StdRng::seed_from_u64(5);
        let signal: Vec<f64> = tone(32.0, fs, 512, 1.0)
            .into_iter()
            .map(|x| x + rng.gen_range(-0.05..0.05))
            .collect();
        let result = ready(SpectralEstimator::new(512, Window::Hann).unwrap().analyze(&signal, fs));

        let at_tone = snr_db(&result, 32.0, 10);
        let off_tone = snr_db(&result, 100.0, 10);
        assert!(at_tone > 30.0, "tone SNR {at_tone:.1} dB");
        assert!(off_tone < 10.0, "noise-only SNR {off_tone:.1} dB");
    }

    #[test]
    fn test_snr_noise_floor() {
        // Clean tone: noise bins are ~0 and the floor keeps the ratio finite
        let fs = 512.0;
        let result = ready(SpectralEstimator::new(512, Window::Hann).unwrap().analyze(&tone(32.0, fs, 512, 1.0), fs));
        let snr = snr_db(&result, 32.0, 10);
        assert!(snr.is_finite());
        assert!(snr > 100.0);
    }

    #[test]
    fn test_find_peaks_threshold_and_separation() {
        let fs = 512.0;
        let signal: Vec<f64> = (0..512)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 20.0 * t).sin() + 0.5 * (2.0 * PI * 40.0 * t).sin() + 0.01 * (2.0 * PI * 60.0 * t).sin()
            })
            .collect();
        let result = ready(SpectralEstimator::new(512, Window::Hann).unwrap().analyze(&signal, fs));
        let range = FrequencyRange::new(0.0, 100.0);

        let peaks = find_peaks(&result, &range, 3);
        let bins: Vec<usize> = peaks.iter().map(|p| p.bin).collect();
        assert_eq!(bins, vec![20, 40], "60 Hz tone is below the 5% threshold");
        assert!((peaks[0].frequency_hz - 20.0).abs() < 1e-9);
        assert!(peaks[0].magnitude > peaks[1].magnitude);

        // Too close together: only the larger survives
        let peaks = find_peaks(&result, &range, 30);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].bin, 20);
    }

    #[test]
    fn test_find_peaks_empty_spectrum() {
        let result = ready(SpectralEstimator::new(128, Window::Hann).unwrap().analyze(&[0.0; 128], 10.0));
        assert!(find_peaks(&result, &FrequencyRange::new(0.0, 5.0), 1).is_empty());
    }

    #[test]
    fn test_ranges_and_bins() {
        let r = FrequencyRange::centered(1.5, 3.0, 0.0);
        assert_eq!((r.min_hz, r.max_hz), (0.0, 3.0));
        let r = FrequencyRange::centered(0.5, 3.0, 0.0);
        assert_eq!((r.min_hz, r.max_hz), (0.0, 2.0));
        let r = FrequencyRange::centered(22.344e-6, 20e-6, 1e-6);
        assert!((r.min_hz - 12.344e-6).abs() < 1e-15);
        assert!(r.scaled(1000.0).contains(22.344e-3));

        let result = ready(SpectralEstimator::new(512, Window::Hann).unwrap().analyze(&tone(1.0, 62.5, 512, 1.0), 62.5));
        assert_eq!(result.nearest_bin(1e9), 255);
        assert_eq!(result.nearest_bin(-1.0), 0);
        assert_eq!(result.bins_in_range(&FrequencyRange::new(0.0, 1e9)), 0..256);
        let bins = result.bins_in_range(&FrequencyRange::new(1.0, 2.0));
        assert_eq!(bins, 8..17);

        let norm = result.normalized(&FrequencyRange::new(0.0, 3.0));
        let top = norm.iter().map(|&(_, m)| m).fold(0.0, f64::max);
        assert!((top - 1.0).abs() < 1e-12);
    }
}
