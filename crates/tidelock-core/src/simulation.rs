//! Simulation Core
//!
//! Owns the pendulum, the PLL and every sample buffer, and advances them
//! together one rendering frame at a time.
//!
//! ```text
//!            ┌──────────── advance_frame() ─────────────┐
//!            │  repeat steps_per_frame():               │
//!            │    pendulum.step(base_dt) ──► buffers    │
//!            │    pll.update(reference_phase)           │
//!            └──────────────────────────────────────────┘
//!
//!  pendulum_spectrum() / tidal_spectrum()   on demand, never per step
//! ```
//!
//! ## Speed Ceiling
//!
//! A frame runs `clamp(round(speed), 1, max_steps_per_frame)` steps of a
//! constant `base_dt`. Speeds above the ceiling are therefore only
//! approximated: at the default ceiling of 100, a requested speed of 500
//! runs at 100. The time step is never enlarged to make up the difference.
//!
//! ## Concurrency
//!
//! `SimulationCore` has a single writer. Readers on another thread should
//! take a [`snapshot`](SimulationCore::snapshot) (copy-on-read) rather than
//! observe the state between steps.
//!
//! ## Example
//!
//! ```rust
//! use tidelock_core::simulation::SimulationCore;
//!
//! let mut sim = SimulationCore::default();
//! sim.set_simulation_speed(50.0).unwrap();
//! for _ in 0..20 {
//!     sim.advance_frame().unwrap();
//! }
//! assert!((sim.pendulum_state().sim_time - 20.0 * 50.0 * 0.016).abs() < 1e-9);
//! ```

use serde::Serialize;

use crate::buffer::{PairedBuffer, SignalBuffer, HIGH_FREQ_CAPACITY, TIDAL_CAPACITY};
use crate::config::{AnalysisConfig, DriverConfig, TidelockConfig};
use crate::error::{ensure_at_least, ensure_finite, ensure_positive, SimResult};
use crate::fft::Window;
use crate::pendulum::{
    PendulumConfig, PendulumIntegrator, PendulumState, SampleSink, ZeroCrossingEvent, SAMPLE_INTERVAL_S,
};
use crate::pll::{LockEvent, PhaseLockedLoop, PllSnapshot};
use crate::spectrum::{
    effective_sample_rate, find_peaks, snr_db, Analysis, FrequencyRange, SpectralEstimator, SpectralPeak,
    WindowSpan, MIN_SAMPLES,
};
use crate::tidal::{TidalModel, SIMULATION_TIME_SCALE};

/// Speed changes larger than this invalidate the tidal buffers.
pub const SPEED_CHANGE_THRESHOLD: f64 = 0.01;

/// Lower edge of the tidal display range, in real Hz.
pub const TIDAL_RANGE_FLOOR_HZ: f64 = 1e-6;

/// What one call to [`SimulationCore::advance_frame`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameReport {
    /// Integrator steps taken (0 while paused)
    pub steps: u32,
    /// Zero crossings seen during the frame
    pub crossings: u32,
    /// Lock acquisitions during the frame
    pub lock_acquisitions: u32,
    /// Lock losses during the frame
    pub lock_losses: u32,
    /// Simulated time of the first acquisition during the frame
    pub first_acquired_at_s: Option<f64>,
    /// Last lock transition during the frame
    pub lock_event: Option<LockEvent>,
}

/// What one call to [`SimulationCore::step_once`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub crossing: Option<ZeroCrossingEvent>,
    pub lock_event: Option<LockEvent>,
}

/// A labelled frequency to draw on a spectrum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumMarker {
    pub label: String,
    /// In the same units as the spectrum bins
    pub frequency_hz: f64,
}

/// Spectrum plus everything needed to display it.
///
/// Every frequency in the view (range, peaks, markers, bins) is in the
/// analysis frame. For the tidal spectrum that frame is sped up by
/// `frequency_scale`; divide by it to get real Hz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumView {
    pub analysis: Analysis,
    pub range: FrequencyRange,
    pub peaks: Vec<SpectralPeak>,
    /// SNR at the reference frequency, once the analysis is ready
    pub snr_db: Option<f64>,
    pub markers: Vec<SpectrumMarker>,
    pub frequency_scale: f64,
}

/// Consistent copy of the simulation state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub pendulum: PendulumState,
    pub config: PendulumConfig,
    pub driver: DriverConfig,
    pub pll: PllSnapshot,
    pub natural_frequency_hz: f64,
    pub amplitude_deg: f64,
    pub reference_phase_rad: f64,
    pub high_freq_samples: usize,
    pub tidal_samples: usize,
    pub paused: bool,
    pub diverged: bool,
}

/// Pendulum, PLL and buffers advanced as one unit.
#[derive(Debug, Clone)]
pub struct SimulationCore {
    pendulum_config: PendulumConfig,
    pendulum: PendulumIntegrator,
    pll: PhaseLockedLoop,
    high_freq: SignalBuffer<f64>,
    tidal: PairedBuffer<f64, f64>,
    driver: DriverConfig,
    analysis: AnalysisConfig,
    paused: bool,
}

impl Default for SimulationCore {
    fn default() -> Self {
        Self::from_parts(&TidelockConfig::default())
    }
}

impl SimulationCore {
    /// Build a simulation from a validated configuration.
    pub fn new(config: &TidelockConfig) -> SimResult<Self> {
        config.validate()?;
        let core = Self::from_parts(config);
        core.warn_if_over_ceiling();
        Ok(core)
    }

    fn from_parts(config: &TidelockConfig) -> Self {
        let natural = config.pendulum.natural_frequency_hz();
        let vco = config.pll.initial_vco_freq_hz.unwrap_or(natural);
        Self {
            pendulum_config: config.pendulum,
            pendulum: PendulumIntegrator::new(&config.pendulum),
            pll: PhaseLockedLoop::new(vco, config.pll),
            high_freq: SignalBuffer::new(HIGH_FREQ_CAPACITY),
            tidal: PairedBuffer::new(TIDAL_CAPACITY),
            driver: config.driver,
            analysis: config.analysis,
            paused: false,
        }
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Integrator steps per frame at the current speed.
    pub fn steps_per_frame(&self) -> u32 {
        let requested = self.driver.simulation_speed.round().max(1.0);
        let ceiling = self.driver.max_steps_per_frame.max(1);
        if requested >= ceiling as f64 {
            ceiling
        } else {
            requested as u32
        }
    }

    /// Run one frame. Does nothing while paused.
    ///
    /// Stops at the first error; a divergence leaves the simulation
    /// diverged until [`reset`](Self::reset).
    pub fn advance_frame(&mut self) -> SimResult<FrameReport> {
        let mut report = FrameReport::default();
        if self.paused {
            return Ok(report);
        }

        for _ in 0..self.steps_per_frame() {
            let outcome = self.step_once()?;
            report.steps += 1;
            if outcome.crossing.is_some() {
                report.crossings += 1;
            }
            match outcome.lock_event {
                Some(LockEvent::Acquired) => {
                    report.lock_acquisitions += 1;
                    report
                        .first_acquired_at_s
                        .get_or_insert(self.pendulum.state().sim_time);
                }
                Some(LockEvent::Lost) => report.lock_losses += 1,
                None => {}
            }
            if outcome.lock_event.is_some() {
                report.lock_event = outcome.lock_event;
            }
        }
        Ok(report)
    }

    /// One integrator step followed by one PLL update, regardless of pause.
    pub fn step_once(&mut self) -> SimResult<StepOutcome> {
        let mut sink = SampleSink {
            angles: &mut self.high_freq,
            tidal: &mut self.tidal,
        };
        let crossing = self
            .pendulum
            .step(&self.pendulum_config, self.driver.base_dt_s, &mut sink)?;

        let lock_event = self.pll.update(self.pendulum.reference_phase());
        match lock_event {
            Some(LockEvent::Acquired) => tracing::info!(
                sim_time = self.pendulum.state().sim_time,
                vco_hz = self.pll.vco_frequency(),
                natural_hz = self.natural_frequency_hz(),
                "PLL locked"
            ),
            Some(LockEvent::Lost) => tracing::info!(
                sim_time = self.pendulum.state().sim_time,
                phase_error_rad = self.pll.phase_error(),
                "PLL lost lock"
            ),
            None => {}
        }

        Ok(StepOutcome { crossing, lock_event })
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Flip the pause flag and return the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    /// Change the rod length and retune the VCO to the new natural frequency.
    pub fn set_length_cm(&mut self, length_cm: f64) -> SimResult<()> {
        ensure_positive("length_cm", length_cm)?;
        self.pendulum_config.length_cm = length_cm;
        let natural = self.natural_frequency_hz();
        self.pll.set_vco_frequency(natural);
        tracing::debug!(length_cm, natural_hz = natural, "length changed, VCO retuned");
        Ok(())
    }

    pub fn set_mass_kg(&mut self, mass_kg: f64) -> SimResult<()> {
        ensure_positive("mass_kg", mass_kg)?;
        self.pendulum_config.mass_kg = mass_kg;
        tracing::debug!(mass_kg, "mass changed");
        Ok(())
    }

    pub fn set_q_factor(&mut self, q_factor: f64) -> SimResult<()> {
        ensure_at_least("q_factor", q_factor, 1.0, "must be >= 1")?;
        self.pendulum_config.q_factor = q_factor;
        tracing::debug!(q_factor, "Q changed");
        Ok(())
    }

    /// Energy added at each zero crossing; 0 disables the impulse.
    pub fn set_energy_impulse_j(&mut self, joules: f64) -> SimResult<()> {
        ensure_at_least("energy_impulse_j", joules, 0.0, "must be >= 0")?;
        self.pendulum_config.energy_impulse_j = joules;
        tracing::debug!(joules, "energy impulse changed");
        Ok(())
    }

    /// M2 modulation frequency in real Hz.
    pub fn set_lunar_freq_hz(&mut self, hz: f64) -> SimResult<()> {
        ensure_at_least("lunar_freq_hz", hz, 0.0, "must be >= 0")?;
        self.pendulum_config.lunar_freq_hz = hz;
        tracing::debug!(hz, "lunar frequency changed");
        Ok(())
    }

    /// Proportional loop gain. Any finite value is accepted.
    pub fn set_loop_gain(&mut self, gain: f64) -> SimResult<()> {
        ensure_finite("loop_gain", gain)?;
        self.pll.set_loop_gain(gain);
        tracing::debug!(gain, "loop gain changed");
        Ok(())
    }

    /// Force the VCO frequency; the loop clamps it on its next update.
    pub fn set_vco_frequency(&mut self, hz: f64) -> SimResult<()> {
        ensure_finite("vco_freq_hz", hz)?;
        self.pll.set_vco_frequency(hz);
        tracing::debug!(hz, "VCO frequency forced");
        Ok(())
    }

    /// Requested steps per frame.
    ///
    /// A change larger than [`SPEED_CHANGE_THRESHOLD`] clears the tidal
    /// buffers and forgets the last crossing, since periods measured before
    /// and after the change are not comparable.
    pub fn set_simulation_speed(&mut self, speed: f64) -> SimResult<()> {
        ensure_at_least("simulation_speed", speed, 1.0, "must be >= 1")?;
        let changed = (speed - self.driver.simulation_speed).abs() > SPEED_CHANGE_THRESHOLD;
        self.driver.simulation_speed = speed;

        if changed {
            self.tidal.clear();
            self.pendulum.forget_last_crossing();
            tracing::debug!(speed, "simulation speed changed, tidal buffers cleared");
            self.warn_if_over_ceiling();
        }
        Ok(())
    }

    fn warn_if_over_ceiling(&self) {
        let ceiling = self.driver.max_steps_per_frame;
        if self.driver.simulation_speed.round() > ceiling as f64 {
            tracing::warn!(
                requested = self.driver.simulation_speed,
                steps_per_frame = ceiling,
                "simulation speed above the per-frame step ceiling; running at the ceiling"
            );
        }
    }

    /// Replace the display settings used by the spectrum queries.
    pub fn set_analysis_config(&mut self, analysis: AnalysisConfig) -> SimResult<()> {
        analysis.validate()?;
        self.analysis = analysis;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Reseed the pendulum, re-centre the VCO on the natural frequency and
    /// empty every buffer. Parameters are kept.
    pub fn reset(&mut self) {
        self.pendulum.reset(&self.pendulum_config);
        self.pll.reset(Some(self.natural_frequency_hz()));
        self.clear();
        tracing::debug!("simulation reset");
    }

    /// Empty every sample buffer without touching the dynamics.
    pub fn clear(&mut self) {
        self.high_freq.clear();
        self.tidal.clear();
        self.pll.clear_history();
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    pub fn natural_frequency_hz(&self) -> f64 {
        self.pendulum_config.natural_frequency_hz()
    }

    /// Largest |angle| in the high-frequency buffer, in degrees.
    /// Reads 0.01 before any sample is taken.
    pub fn current_amplitude_deg(&self) -> f64 {
        self.high_freq.max_abs().map_or(0.01, f64::to_degrees)
    }

    pub fn pll(&self) -> &PhaseLockedLoop {
        &self.pll
    }

    pub fn pll_snapshot(&self) -> PllSnapshot {
        self.pll.snapshot()
    }

    pub fn pendulum_state(&self) -> &PendulumState {
        self.pendulum.state()
    }

    pub fn pendulum_config(&self) -> &PendulumConfig {
        &self.pendulum_config
    }

    pub fn driver_config(&self) -> &DriverConfig {
        &self.driver
    }

    pub fn analysis_config(&self) -> &AnalysisConfig {
        &self.analysis
    }

    pub fn is_diverged(&self) -> bool {
        self.pendulum.is_diverged()
    }

    /// Phase currently fed to the PLL.
    pub fn reference_phase(&self) -> f64 {
        self.pendulum.reference_phase()
    }

    pub fn high_freq_samples(&self) -> Vec<f64> {
        self.high_freq.to_vec()
    }

    pub fn tidal_deviations(&self) -> Vec<f64> {
        self.tidal.firsts()
    }

    pub fn tidal_periods(&self) -> Vec<f64> {
        self.tidal.seconds()
    }

    pub fn tidal_sample_count(&self) -> usize {
        self.tidal.len()
    }

    pub fn pll_phase_error_history(&self) -> Vec<f64> {
        self.pll.phase_error_history().to_vec()
    }

    pub fn pll_frequency_history(&self) -> Vec<f64> {
        self.pll.frequency_history().to_vec()
    }

    // ------------------------------------------------------------------
    // Spectra
    // ------------------------------------------------------------------

    /// Configured pendulum view, in Hz.
    pub fn default_pendulum_range(&self) -> FrequencyRange {
        FrequencyRange::centered(self.analysis.pendulum_center_hz, self.analysis.pendulum_width_hz, 0.0)
    }

    /// Configured tidal view, in real Hz.
    pub fn default_tidal_range(&self) -> FrequencyRange {
        FrequencyRange::centered(
            self.analysis.tidal_center_hz,
            self.analysis.tidal_width_hz,
            TIDAL_RANGE_FLOOR_HZ,
        )
    }

    /// Spectrum of the high-frequency angle samples (62.5 Hz).
    ///
    /// The Hann window always spans the full FFT frame, so while the
    /// buffer is still filling only its leading part weights the samples.
    /// SNR is measured at the natural frequency; markers show the natural
    /// frequency and the VCO.
    pub fn pendulum_spectrum(&self, range: FrequencyRange) -> SimResult<SpectrumView> {
        let estimator = SpectralEstimator::new(self.analysis.pendulum_fft_size, Window::Hann)?
            .with_window_span(WindowSpan::FullFrame);
        let analysis = estimator.analyze(&self.high_freq.to_vec(), 1.0 / SAMPLE_INTERVAL_S);
        let markers = vec![
            SpectrumMarker {
                label: "f0".to_string(),
                frequency_hz: self.natural_frequency_hz(),
            },
            SpectrumMarker {
                label: "VCO".to_string(),
                frequency_hz: self.pll.vco_frequency(),
            },
        ];
        Ok(self.view(analysis, range, self.natural_frequency_hz(), markers, 1.0))
    }

    /// Spectrum of the per-crossing period deviations.
    ///
    /// `range` is in real Hz. The analysis runs in simulated time, so bins,
    /// peaks and markers come back multiplied by the time scale. The sample
    /// rate is the effective rate implied by the measured periods.
    pub fn tidal_spectrum(&self, range: FrequencyRange) -> SimResult<SpectrumView> {
        let estimator = SpectralEstimator::new(self.analysis.tidal_fft_size, Window::Hann)?;
        let (deviations, periods) = self.tidal.to_arrays();

        let analysis = match effective_sample_rate(&periods) {
            Some(fs) => estimator.analyze(&deviations, fs),
            None => Analysis::Pending {
                available: deviations.len(),
                required: MIN_SAMPLES,
            },
        };

        let scaled = range.scaled(SIMULATION_TIME_SCALE);
        let model = TidalModel::new(self.pendulum_config.lunar_freq_hz);
        let markers = model
            .constituents()
            .iter()
            .map(|c| SpectrumMarker {
                label: c.name.to_string(),
                frequency_hz: c.scaled_frequency_hz(),
            })
            .filter(|m| scaled.contains(m.frequency_hz))
            .collect();
        let target = model.lunar_freq_hz() * SIMULATION_TIME_SCALE;

        Ok(self.view(analysis, scaled, target, markers, SIMULATION_TIME_SCALE))
    }

    fn view(
        &self,
        analysis: Analysis,
        range: FrequencyRange,
        snr_target_hz: f64,
        markers: Vec<SpectrumMarker>,
        frequency_scale: f64,
    ) -> SpectrumView {
        let (peaks, snr) = match analysis.result() {
            Some(result) => (
                find_peaks(result, &range, self.analysis.peak_min_separation_bins),
                Some(snr_db(result, snr_target_hz, self.analysis.snr_window_bins)),
            ),
            None => (Vec::new(), None),
        };
        SpectrumView {
            analysis,
            range,
            peaks,
            snr_db: snr,
            markers,
            frequency_scale,
        }
    }

    /// Copy of the full state, safe to hand to another thread.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            pendulum: *self.pendulum.state(),
            config: self.pendulum_config,
            driver: self.driver,
            pll: self.pll.snapshot(),
            natural_frequency_hz: self.natural_frequency_hz(),
            amplitude_deg: self.current_amplitude_deg(),
            reference_phase_rad: self.pendulum.reference_phase(),
            high_freq_samples: self.high_freq.len(),
            tidal_samples: self.tidal.len(),
            paused: self.paused,
            diverged: self.pendulum.is_diverged(),
        }
    }
}
