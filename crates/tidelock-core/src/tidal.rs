//! Tidal Constituents
//!
//! The pendulum's natural frequency is modulated by a sum of sinusoids at
//! the principal tidal frequencies. Real tidal periods are half a day or a
//! day, so every constituent is sped up by [`SIMULATION_TIME_SCALE`] to make
//! the modulation visible within minutes of simulated time.
//!
//! ```text
//! ω₀' = ω₀ · (1 + 0.02·sin(2π·f_M2·s·t) + 0.015·sin(2π·f_S2·s·t) + 0.01·sin(2π·f_K1·s·t))
//! ```
//!
//! O1 is carried as a display marker only; it does not modulate the pendulum.

use std::f64::consts::PI;

/// Speed-up applied to every tidal frequency.
pub const SIMULATION_TIME_SCALE: f64 = 1000.0;

/// Principal lunar semidiurnal (M2) frequency in Hz (~12.42 h).
pub const M2_FREQ_HZ: f64 = 22.344e-6;
/// Principal solar semidiurnal (S2) frequency in Hz (12.00 h).
pub const S2_FREQ_HZ: f64 = 23.148e-6;
/// Lunisolar diurnal (K1) frequency in Hz (~23.93 h).
pub const K1_FREQ_HZ: f64 = 11.607e-6;
/// Principal lunar diurnal (O1) frequency in Hz (~25.82 h).
pub const O1_FREQ_HZ: f64 = 10.758e-6;

const M2_AMPLITUDE: f64 = 0.02;
const S2_AMPLITUDE: f64 = 0.015;
const K1_AMPLITUDE: f64 = 0.01;

/// A named tidal constituent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TidalConstituent {
    /// Conventional Darwin symbol (M2, S2, K1, O1)
    pub name: &'static str,
    /// Real (unscaled) frequency in Hz
    pub frequency_hz: f64,
    /// Relative modulation depth applied to ω₀ (0 for marker-only entries)
    pub relative_amplitude: f64,
}

impl TidalConstituent {
    /// Period in hours.
    pub fn period_hours(&self) -> f64 {
        1.0 / (self.frequency_hz * 3600.0)
    }

    /// Frequency after the simulation time scale is applied.
    pub fn scaled_frequency_hz(&self) -> f64 {
        self.frequency_hz * SIMULATION_TIME_SCALE
    }
}

/// Tidal forcing model with a user-adjustable M2 frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TidalModel {
    lunar_freq_hz: f64,
}

impl Default for TidalModel {
    fn default() -> Self {
        Self::new(M2_FREQ_HZ)
    }
}

impl TidalModel {
    /// Create a model with the given M2 frequency (real Hz).
    pub fn new(lunar_freq_hz: f64) -> Self {
        Self { lunar_freq_hz }
    }

    /// Current M2 frequency (real Hz).
    pub fn lunar_freq_hz(&self) -> f64 {
        self.lunar_freq_hz
    }

    /// Change the M2 frequency.
    pub fn set_lunar_freq_hz(&mut self, hz: f64) {
        self.lunar_freq_hz = hz;
    }

    /// Relative modulation of ω₀ at simulated time `t` seconds.
    pub fn modulation(&self, t: f64) -> f64 {
        self.forcing_terms()
            .iter()
            .map(|c| c.relative_amplitude * (2.0 * PI * c.scaled_frequency_hz() * t).sin())
            .sum()
    }

    /// Largest possible |modulation|.
    pub fn peak_modulation(&self) -> f64 {
        M2_AMPLITUDE + S2_AMPLITUDE + K1_AMPLITUDE
    }

    /// The three constituents that modulate the pendulum.
    pub fn forcing_terms(&self) -> [TidalConstituent; 3] {
        [
            TidalConstituent {
                name: "M2",
                frequency_hz: self.lunar_freq_hz,
                relative_amplitude: M2_AMPLITUDE,
            },
            TidalConstituent {
                name: "S2",
                frequency_hz: S2_FREQ_HZ,
                relative_amplitude: S2_AMPLITUDE,
            },
            TidalConstituent {
                name: "K1",
                frequency_hz: K1_FREQ_HZ,
                relative_amplitude: K1_AMPLITUDE,
            },
        ]
    }

    /// All constituents shown as spectrum markers, including O1.
    pub fn constituents(&self) -> [TidalConstituent; 4] {
        let [m2, s2, k1] = self.forcing_terms();
        [
            k1,
            TidalConstituent {
                name: "O1",
                frequency_hz: O1_FREQ_HZ,
                relative_amplitude: 0.0,
            },
            m2,
            s2,
        ]
    }
}
