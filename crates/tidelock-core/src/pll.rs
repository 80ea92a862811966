//! Phase Locked Loop (PLL)
//!
//! Tracks the pendulum's phase with a numerically integrated VCO. The loop
//! runs once per integrator step with a fixed time step of [`PLL_DT`].
//!
//! ```text
//!  input phase ──►(+)──► wrap[-π,π] ──► PI filter ──► VCO ──┬──► vco phase
//!                  ▲ -                                     │
//!                  └───────────────────────────────────────┘
//!
//! Phase Detector: e   = wrap(φ_in - φ_vco)
//! Loop Filter:    u   = Kp·e + clamp(∫ Ki·e·dt, ±2)
//! VCO:            f  += 0.5·u·dt          clamped to [0.1, 3.0] Hz
//!                 φ  += 2π·f·dt / 10      wrapped to [0, 2π)
//! Lock Detector:  |e| < 0.3 → count += 1, else count -= 2 (floor 0)
//!                 locked at count >= 30, unlocked when count reaches 0
//! ```
//!
//! The `/ 10` in the VCO phase advance slows the VCO to a visualization
//! rate; [`VISUALIZATION_RATE_DIVISOR`] is shared with the pendulum so the
//! reference phase lives in the same frame.
//!
//! Out-of-range gains are accepted. A negative loop gain simply produces a
//! loop that never converges.
//!
//! ## Example
//!
//! ```rust
//! use tidelock_core::pll::{PhaseLockedLoop, PllConfig, PLL_DT};
//! use std::f64::consts::PI;
//!
//! let mut pll = PhaseLockedLoop::new(0.5, PllConfig::default());
//!
//! // Reference advancing exactly like a 0.5 Hz VCO
//! let mut phase = 0.0;
//! for _ in 0..100 {
//!     phase = (phase + 2.0 * PI * 0.5 * PLL_DT / 10.0) % (2.0 * PI);
//!     pll.update(phase);
//! }
//! assert!(pll.is_locked());
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::buffer::SignalBuffer;
use crate::pendulum::VISUALIZATION_RATE_DIVISOR;

/// Loop time step in seconds.
pub const PLL_DT: f64 = 0.016;
/// VCO sensitivity in Hz per unit of filtered error.
pub const VCO_GAIN: f64 = 0.5;
/// Anti-windup bound on the integrator.
pub const INTEGRATOR_LIMIT: f64 = 2.0;
/// Lowest VCO frequency in Hz.
pub const VCO_MIN_HZ: f64 = 0.1;
/// Highest VCO frequency in Hz.
pub const VCO_MAX_HZ: f64 = 3.0;
/// |phase error| below which a step counts toward lock.
pub const LOCK_THRESHOLD_RAD: f64 = 0.3;
/// Counter value at which lock is declared.
pub const LOCK_COUNT_THRESHOLD: u32 = 30;
/// Length of the phase-error and frequency histories.
pub const HISTORY_LEN: usize = 200;

const TWO_PI: f64 = 2.0 * PI;

/// PLL loop filter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PllConfig {
    /// Proportional gain Kp.
    pub loop_gain: f64,
    /// Integral gain Ki.
    pub integral_gain: f64,
    /// Starting VCO frequency in Hz; `None` starts at the pendulum's
    /// natural frequency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_vco_freq_hz: Option<f64>,
}

impl Default for PllConfig {
    fn default() -> Self {
        Self {
            loop_gain: 1.0,
            integral_gain: 0.1,
            initial_vco_freq_hz: None,
        }
    }
}

/// Lock transition reported by [`PhaseLockedLoop::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockEvent {
    /// Counter reached the lock threshold
    Acquired,
    /// Counter drained back to zero
    Lost,
}

/// Read-only view of the loop state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PllSnapshot {
    pub vco_freq_hz: f64,
    pub vco_phase_rad: f64,
    pub phase_error_rad: f64,
    pub filtered_output: f64,
    pub integrator_state: f64,
    pub lock_counter: u32,
    pub is_locked: bool,
    /// lock_counter / threshold, clamped to [0, 1]. The raw counter keeps
    /// growing while locked, so an unclamped ratio would exceed 1; read
    /// `lock_counter` for the raw value.
    pub lock_quality: f64,
}

/// Phase Locked Loop with PI loop filter and hysteretic lock detector.
#[derive(Debug, Clone)]
pub struct PhaseLockedLoop {
    config: PllConfig,
    /// VCO frequency (Hz)
    vco_freq: f64,
    /// VCO phase (radians, [0, 2π))
    vco_phase: f64,
    /// Phase error from the last update (radians, [-π, π])
    phase_error: f64,
    /// Loop filter output
    filtered_output: f64,
    /// Integrator state
    integrator: f64,
    lock_counter: u32,
    locked: bool,
    /// Elapsed loop time
    time: f64,
    phase_error_history: SignalBuffer<f64>,
    freq_history: SignalBuffer<f64>,
}

impl PhaseLockedLoop {
    /// Create a loop with the VCO at `initial_freq_hz`.
    pub fn new(initial_freq_hz: f64, config: PllConfig) -> Self {
        Self {
            config,
            vco_freq: initial_freq_hz,
            vco_phase: 0.0,
            phase_error: 0.0,
            filtered_output: 0.0,
            integrator: 0.0,
            lock_counter: 0,
            locked: false,
            time: 0.0,
            phase_error_history: SignalBuffer::new(HISTORY_LEN),
            freq_history: SignalBuffer::new(HISTORY_LEN),
        }
    }

    /// Run one loop iteration against `input_phase` (radians, [0, 2π)).
    ///
    /// Returns the lock transition caused by this update, if any.
    pub fn update(&mut self, input_phase: f64) -> Option<LockEvent> {
        let error = self.phase_detector(input_phase);
        let control = self.loop_filter(error);
        self.update_vco(control);
        let event = self.update_lock_status();

        self.phase_error_history.push(self.phase_error);
        self.freq_history.push(self.vco_freq);
        self.time += PLL_DT;

        event
    }

    fn phase_detector(&mut self, input_phase: f64) -> f64 {
        self.phase_error = wrap_phase_error(input_phase - self.vco_phase);
        self.phase_error
    }

    fn loop_filter(&mut self, error: f64) -> f64 {
        let proportional = self.config.loop_gain * error;
        self.integrator = (self.integrator + self.config.integral_gain * error * PLL_DT)
            .clamp(-INTEGRATOR_LIMIT, INTEGRATOR_LIMIT);
        self.filtered_output = proportional + self.integrator;
        self.filtered_output
    }

    fn update_vco(&mut self, control: f64) {
        self.vco_freq = (self.vco_freq + VCO_GAIN * control * PLL_DT).clamp(VCO_MIN_HZ, VCO_MAX_HZ);
        let omega = TWO_PI * self.vco_freq * PLL_DT / VISUALIZATION_RATE_DIVISOR;
        self.vco_phase = wrap_phase(self.vco_phase + omega);
    }

    fn update_lock_status(&mut self) -> Option<LockEvent> {
        let was_locked = self.locked;
        if self.phase_error.abs() < LOCK_THRESHOLD_RAD {
            self.lock_counter = self.lock_counter.saturating_add(1);
            if self.lock_counter >= LOCK_COUNT_THRESHOLD {
                self.locked = true;
            }
        } else {
            self.lock_counter = self.lock_counter.saturating_sub(2);
            if self.lock_counter == 0 {
                self.locked = false;
            }
        }

        match (was_locked, self.locked) {
            (false, true) => Some(LockEvent::Acquired),
            (true, false) => Some(LockEvent::Lost),
            _ => None,
        }
    }

    /// Restore the initial state. Keeps the loop gains and, when
    /// `initial_freq_hz` is `None`, the current VCO frequency.
    pub fn reset(&mut self, initial_freq_hz: Option<f64>) {
        if let Some(f) = initial_freq_hz {
            self.vco_freq = f;
        }
        self.vco_phase = 0.0;
        self.phase_error = 0.0;
        self.filtered_output = 0.0;
        self.integrator = 0.0;
        self.lock_counter = 0;
        self.locked = false;
        self.time = 0.0;
        self.clear_history();
    }

    /// Drop the phase-error and frequency histories, keeping loop state.
    pub fn clear_history(&mut self) {
        self.phase_error_history.clear();
        self.freq_history.clear();
    }

    /// Set the proportional gain.
    pub fn set_loop_gain(&mut self, gain: f64) {
        self.config.loop_gain = gain;
    }

    /// Force the VCO frequency (not clamped until the next update).
    pub fn set_vco_frequency(&mut self, freq_hz: f64) {
        self.vco_freq = freq_hz;
    }

    /// Current configuration.
    pub fn config(&self) -> &PllConfig {
        &self.config
    }

    /// VCO frequency in Hz.
    pub fn vco_frequency(&self) -> f64 {
        self.vco_freq
    }

    /// VCO phase in [0, 2π).
    pub fn vco_phase(&self) -> f64 {
        self.vco_phase
    }

    /// Last phase error in [-π, π].
    pub fn phase_error(&self) -> f64 {
        self.phase_error
    }

    /// Integrator state.
    pub fn integrator_state(&self) -> f64 {
        self.integrator
    }

    /// Whether lock is currently declared.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Raw lock counter.
    pub fn lock_counter(&self) -> u32 {
        self.lock_counter
    }

    /// Elapsed loop time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Last [`HISTORY_LEN`] phase errors, oldest first.
    pub fn phase_error_history(&self) -> &SignalBuffer<f64> {
        &self.phase_error_history
    }

    /// Last [`HISTORY_LEN`] VCO frequencies, oldest first.
    pub fn frequency_history(&self) -> &SignalBuffer<f64> {
        &self.freq_history
    }

    /// Copy of the loop state. `lock_quality` saturates at 1 once the
    /// counter passes [`LOCK_COUNT_THRESHOLD`].
    pub fn snapshot(&self) -> PllSnapshot {
        PllSnapshot {
            vco_freq_hz: self.vco_freq,
            vco_phase_rad: self.vco_phase,
            phase_error_rad: self.phase_error,
            filtered_output: self.filtered_output,
            integrator_state: self.integrator,
            lock_counter: self.lock_counter,
            is_locked: self.locked,
            lock_quality: (self.lock_counter as f64 / LOCK_COUNT_THRESHOLD as f64).min(1.0),
        }
    }
}

/// Wrap a phase difference to [-π, π] by repeated ±2π correction.
pub fn wrap_phase_error(mut x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    if x.abs() > 64.0 * TWO_PI {
        x %= TWO_PI;
    }
    while x > PI {
        x -= TWO_PI;
    }
    while x < -PI {
        x += TWO_PI;
    }
    x
}

/// Wrap a phase to [0, 2π).
pub fn wrap_phase(mut x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    if x.abs() > 64.0 * TWO_PI {
        x %= TWO_PI;
    }
    while x < 0.0 {
        x += TWO_PI;
    }
    while x >= TWO_PI {
        x -= TWO_PI;
    }
    x
}
