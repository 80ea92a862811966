//! Damped, Tidally Modulated Pendulum
//!
//! Integrates the nonlinear pendulum equation with viscous damping and a
//! slowly varying natural frequency:
//!
//! ```text
//! θ'' = -ω₀'² · sin(θ) - 2ζω₀ · θ'
//!
//! ω₀  = √(g / L)                 natural angular frequency
//! ζ   = 1 / (2Q)                 damping ratio, fixed by Q at the *unmodulated* ω₀
//! ω₀' = ω₀ · (1 + m(t))          tidal modulation, see [`crate::tidal`]
//! ```
//!
//! Integration is explicit (forward) Euler: velocity first, then angle.
//!
//! ## Zero Crossings
//!
//! Every sign change of the angle is a sampling event for the tidal analysis:
//! the time since the previous crossing is recorded together with its
//! deviation from the natural period, and an electromagnetic "kick" adds a
//! fixed amount of kinetic energy in the direction of motion. The kick keeps
//! the pendulum self-excited in the same way a clock escapement does.
//!
//! ```text
//!   θ
//!   │   ╭─╮         ╭─╮
//!   │  ╱   ╲       ╱   ╲
//! ──┼─●─────●─────●─────●───  t      ● = crossing: record period, inject E
//!   │        ╲   ╱       ╲
//!   │         ╰─╯
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tidelock_core::buffer::{PairedBuffer, SignalBuffer};
//! use tidelock_core::pendulum::{PendulumConfig, PendulumIntegrator, SampleSink};
//!
//! let config = PendulumConfig::default();
//! let mut pendulum = PendulumIntegrator::new(&config);
//! let mut angles = SignalBuffer::new(512);
//! let mut tidal = PairedBuffer::new(1024);
//!
//! let mut crossings = 0;
//! for _ in 0..1000 {
//!     let mut sink = SampleSink { angles: &mut angles, tidal: &mut tidal };
//!     if pendulum.step(&config, 0.016, &mut sink).unwrap().is_some() {
//!         crossings += 1;
//!     }
//! }
//! assert_eq!(crossings, tidal.len());
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::buffer::{PairedBuffer, SignalBuffer};
use crate::error::{ensure_at_least, ensure_positive, SimError, SimResult};
use crate::pll::{wrap_phase, wrap_phase_error};
use crate::tidal::{TidalModel, M2_FREQ_HZ};

/// Gravitational acceleration in m/s².
pub const GRAVITY: f64 = 9.81;

/// Simulated-time interval between high-frequency angle samples (62.5 Hz).
pub const SAMPLE_INTERVAL_S: f64 = 0.016;

/// Angle the pendulum is released from after a reset.
pub const SEED_ANGLE_DEG: f64 = 0.01;

/// Phase-rate divisor shared with the VCO (see [`crate::pll`]).
///
/// The VCO advances at one tenth of its nominal rate; the pendulum phase
/// handed to the loop is expressed in the same slowed frame.
pub const VISUALIZATION_RATE_DIVISOR: f64 = 10.0;

/// Floor on the seed velocity when an impulse is configured.
const MIN_SEED_VELOCITY: f64 = 0.001;

/// Tolerance on the sample-boundary computation, in sample periods.
const SAMPLE_INDEX_EPSILON: f64 = 1e-9;

/// Physical parameters of the pendulum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendulumConfig {
    /// Rod length in centimetres
    pub length_cm: f64,
    /// Bob mass in kilograms
    pub mass_kg: f64,
    /// Quality factor (>= 1)
    pub q_factor: f64,
    /// Energy injected at every zero crossing, in joules (0 disables)
    pub energy_impulse_j: f64,
    /// M2 modulation frequency in real (unscaled) Hz
    pub lunar_freq_hz: f64,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            length_cm: 150.0,
            mass_kg: 1.0,
            q_factor: 1000.0,
            energy_impulse_j: 0.001,
            lunar_freq_hz: M2_FREQ_HZ,
        }
    }
}

impl PendulumConfig {
    /// Check every field against its physical range.
    pub fn validate(&self) -> SimResult<()> {
        ensure_positive("length_cm", self.length_cm)?;
        ensure_positive("mass_kg", self.mass_kg)?;
        ensure_at_least("q_factor", self.q_factor, 1.0, "must be >= 1")?;
        ensure_at_least("energy_impulse_j", self.energy_impulse_j, 0.0, "must be >= 0")?;
        ensure_at_least("lunar_freq_hz", self.lunar_freq_hz, 0.0, "must be >= 0")?;
        Ok(())
    }

    /// Length in metres.
    pub fn length_m(&self) -> f64 {
        self.length_cm / 100.0
    }

    /// ω₀ = √(g/L) in rad/s.
    pub fn natural_angular_frequency(&self) -> f64 {
        (GRAVITY / self.length_m()).sqrt()
    }

    /// f₀ = √(g/L) / 2π in Hz.
    pub fn natural_frequency_hz(&self) -> f64 {
        natural_frequency_hz(self.length_cm)
    }

    /// T₀ = 1/f₀ in seconds.
    pub fn natural_period_s(&self) -> f64 {
        1.0 / self.natural_frequency_hz()
    }

    /// I = m·L² in kg·m².
    pub fn moment_of_inertia(&self) -> f64 {
        let l = self.length_m();
        self.mass_kg * l * l
    }

    /// Viscous damping coefficient 2ζω₀ with ζ = 1/(2Q).
    pub fn damping_coefficient(&self) -> f64 {
        let zeta = 1.0 / (2.0 * self.q_factor);
        2.0 * zeta * self.natural_angular_frequency()
    }
}

/// Small-angle natural frequency of a pendulum of the given length.
pub fn natural_frequency_hz(length_cm: f64) -> f64 {
    (GRAVITY / (length_cm / 100.0)).sqrt() / (2.0 * PI)
}

/// Dynamic state of the pendulum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendulumState {
    /// Angle from vertical in radians (not wrapped)
    pub angle: f64,
    /// Angular velocity in rad/s
    pub angular_velocity: f64,
    /// Simulated time in seconds
    pub sim_time: f64,
    /// Time of the previous zero crossing, if one has been seen
    pub last_zero_crossing_time: Option<f64>,
}

/// Emitted by [`PendulumIntegrator::step`] when the angle changes sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZeroCrossingEvent {
    /// Simulated time of the crossing
    pub time: f64,
    /// Time since the previous crossing (natural period on the first one)
    pub period: f64,
    /// (period - T₀) / T₀
    pub deviation: f64,
    /// Whether an energy impulse was injected
    pub impulse_applied: bool,
}

/// Destination buffers for the samples produced during a step.
pub struct SampleSink<'a> {
    /// High-frequency angle samples
    pub angles: &'a mut SignalBuffer<f64>,
    /// (deviation, period) per zero crossing
    pub tidal: &'a mut PairedBuffer<f64, f64>,
}

/// Forward-Euler pendulum integrator.
#[derive(Debug, Clone)]
pub struct PendulumIntegrator {
    state: PendulumState,
    /// Index of the last high-frequency sample boundary taken
    last_sample_index: u64,
    /// atan2 phase from the previous step, for unwrapping
    raw_phase: f64,
    /// Accumulated oscillation phase
    unwrapped_phase: f64,
    diverged: bool,
}

impl PendulumIntegrator {
    /// Create an integrator seeded from `config`.
    pub fn new(config: &PendulumConfig) -> Self {
        let mut integrator = Self {
            state: PendulumState {
                angle: 0.0,
                angular_velocity: 0.0,
                sim_time: 0.0,
                last_zero_crossing_time: None,
            },
            last_sample_index: 0,
            raw_phase: 0.0,
            unwrapped_phase: 0.0,
            diverged: false,
        };
        integrator.reset(config);
        integrator
    }

    /// Reseed at a tiny nonzero angle.
    ///
    /// With an impulse configured the pendulum starts with the velocity one
    /// impulse would give it (at least 0.001 rad/s); otherwise it gets a
    /// small push derived from the seed angle's potential energy.
    pub fn reset(&mut self, config: &PendulumConfig) {
        let angle = SEED_ANGLE_DEG.to_radians();
        let inertia = config.moment_of_inertia();

        let velocity = if config.energy_impulse_j > 0.0 {
            (2.0 * config.energy_impulse_j / inertia)
                .sqrt()
                .max(MIN_SEED_VELOCITY)
        } else {
            let length_m = config.length_m();
            let height = length_m * (1.0 - angle.cos());
            0.1 * (2.0 * GRAVITY * height).sqrt() / length_m
        };

        self.state = PendulumState {
            angle,
            angular_velocity: velocity,
            sim_time: 0.0,
            last_zero_crossing_time: None,
        };
        self.last_sample_index = 0;
        self.raw_phase = raw_phase(angle, velocity, config.natural_angular_frequency());
        self.unwrapped_phase = self.raw_phase;
        self.diverged = false;
    }

    /// Advance by `dt` seconds of simulated time.
    ///
    /// Returns the zero crossing that occurred during this step, if any.
    /// Once the state becomes non-finite every call returns
    /// [`SimError::Diverged`] until [`reset`](Self::reset).
    pub fn step(
        &mut self,
        config: &PendulumConfig,
        dt: f64,
        sink: &mut SampleSink<'_>,
    ) -> SimResult<Option<ZeroCrossingEvent>> {
        if self.diverged {
            return Err(SimError::Diverged {
                sim_time: self.state.sim_time,
            });
        }
        ensure_positive("dt", dt)?;

        let omega0 = config.natural_angular_frequency();
        // Damping is a property of the unmodulated pendulum
        let damping = config.damping_coefficient();
        let modulation = TidalModel::new(config.lunar_freq_hz).modulation(self.state.sim_time);
        let omega = omega0 * (1.0 + modulation);

        let acceleration =
            -omega * omega * self.state.angle.sin() - damping * self.state.angular_velocity;
        self.state.angular_velocity += acceleration * dt;

        let old_angle = self.state.angle;
        self.state.angle += self.state.angular_velocity * dt;

        // A diverging step must not reach the buffers
        if !self.state.angle.is_finite() || !self.state.angular_velocity.is_finite() {
            self.diverged = true;
            tracing::warn!(
                sim_time = self.state.sim_time,
                q_factor = config.q_factor,
                length_cm = config.length_cm,
                "pendulum state diverged"
            );
            return Err(SimError::Diverged {
                sim_time: self.state.sim_time,
            });
        }

        let old_sign = sign(old_angle);
        let new_sign = sign(self.state.angle);
        let event = if old_sign != 0 && new_sign != 0 && old_sign != new_sign {
            Some(self.record_crossing(config, sink))
        } else {
            None
        };

        self.state.sim_time += dt;
        self.sample_angle(sink);
        self.track_phase(omega0);

        Ok(event)
    }

    fn record_crossing(&mut self, config: &PendulumConfig, sink: &mut SampleSink<'_>) -> ZeroCrossingEvent {
        let now = self.state.sim_time;
        let natural_period = config.natural_period_s();
        let period = match self.state.last_zero_crossing_time {
            Some(previous) => now - previous,
            None => natural_period,
        };
        self.state.last_zero_crossing_time = Some(now);

        let deviation = (period - natural_period) / natural_period;
        sink.tidal.push_pair(deviation, period);

        let impulse_applied = config.energy_impulse_j > 0.0;
        if impulse_applied {
            self.apply_impulse(config);
        }

        tracing::trace!(time = now, period, deviation, "zero crossing");

        ZeroCrossingEvent {
            time: now,
            period,
            deviation,
            impulse_applied,
        }
    }

    /// Add `energy_impulse_j` of kinetic energy, keeping the direction of motion.
    pub fn apply_impulse(&mut self, config: &PendulumConfig) {
        let inertia = config.moment_of_inertia();
        let v = self.state.angular_velocity;
        let kinetic = 0.5 * inertia * v * v;
        let speed = (2.0 * (kinetic + config.energy_impulse_j) / inertia).sqrt();
        self.state.angular_velocity = v.signum() * speed;
    }

    /// Take an angle sample each time simulated time crosses a multiple
    /// of [`SAMPLE_INTERVAL_S`].
    fn sample_angle(&mut self, sink: &mut SampleSink<'_>) {
        let index = (self.state.sim_time / SAMPLE_INTERVAL_S + SAMPLE_INDEX_EPSILON).floor() as u64;
        if index > self.last_sample_index {
            self.last_sample_index = index;
            sink.angles.push(self.state.angle);
        }
    }

    fn track_phase(&mut self, omega0: f64) {
        let raw = raw_phase(self.state.angle, self.state.angular_velocity, omega0);
        self.unwrapped_phase += wrap_phase_error(raw - self.raw_phase);
        self.raw_phase = raw;
    }

    /// Forget the previous crossing so the next period is re-estimated.
    pub fn forget_last_crossing(&mut self) {
        self.state.last_zero_crossing_time = None;
    }

    /// Current state.
    pub fn state(&self) -> &PendulumState {
        &self.state
    }

    /// Whether the integrator has latched a divergence.
    pub fn is_diverged(&self) -> bool {
        self.diverged
    }

    /// Oscillation phase in [0, 2π).
    pub fn oscillation_phase(&self) -> f64 {
        wrap_phase(self.unwrapped_phase)
    }

    /// Accumulated oscillation phase in radians.
    pub fn unwrapped_phase(&self) -> f64 {
        self.unwrapped_phase
    }

    /// Phase fed to the PLL: the oscillation phase in the VCO's slowed frame.
    pub fn reference_phase(&self) -> f64 {
        wrap_phase(self.unwrapped_phase / VISUALIZATION_RATE_DIVISOR)
    }

    /// ½·I·θ'² in joules.
    pub fn kinetic_energy(&self, config: &PendulumConfig) -> f64 {
        let v = self.state.angular_velocity;
        0.5 * config.moment_of_inertia() * v * v
    }

    /// m·g·L·(1 - cos θ) in joules.
    pub fn potential_energy(&self, config: &PendulumConfig) -> f64 {
        config.mass_kg * GRAVITY * config.length_m() * (1.0 - self.state.angle.cos())
    }
}

/// Phase of the (θ, θ'/ω₀) phasor. Increases with time for θ = A·cos(ω₀t).
fn raw_phase(angle: f64, velocity: f64, omega0: f64) -> f64 {
    (-velocity / omega0).atan2(angle)
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buffers {
        angles: SignalBuffer<f64>,
        tidal: PairedBuffer<f64, f64>,
    }

    impl Buffers {
        fn new() -> Self {
            Self {
                angles: SignalBuffer::new(512),
                tidal: PairedBuffer::new(4096),
            }
        }
    }

    fn run(
        pendulum: &mut PendulumIntegrator,
        config: &PendulumConfig,
        buffers: &mut Buffers,
        steps: usize,
        dt: f64,
    ) -> Vec<ZeroCrossingEvent> {
        let mut events = Vec::new();
        for _ in 0..steps {
            let mut sink = SampleSink {
                angles: &mut buffers.angles,
                tidal: &mut buffers.tidal,
            };
            if let Some(e) = pendulum.step(config, dt, &mut sink).unwrap() {
                events.push(e);
            }
        }
        events
    }

    #[test]
    fn test_natural_frequency_formula() {
        for &l in &[10.0_f64, 50.0, 100.0, 150.0, 200.0, 1000.0] {
            let expected = (9.81 / (l / 100.0)).sqrt() / (2.0 * PI);
            assert!((natural_frequency_hz(l) - expected).abs() < 1e-12);
        }
        assert!((natural_frequency_hz(150.0) - 0.4070).abs() < 1e-3);
    }

    #[test]
    fn test_natural_frequency_decreasing_in_length() {
        let mut prev = f64::INFINITY;
        for i in 1..200 {
            let f = natural_frequency_hz(i as f64 * 5.0);
            assert!(f < prev, "f0 must decrease with length");
            prev = f;
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(PendulumConfig::default().validate().is_ok());
        let bad = [
            PendulumConfig { length_cm: 0.0, ..Default::default() },
            PendulumConfig { mass_kg: -1.0, ..Default::default() },
            PendulumConfig { q_factor: 0.5, ..Default::default() },
            PendulumConfig { energy_impulse_j: -1e-3, ..Default::default() },
            PendulumConfig { lunar_freq_hz: f64::NAN, ..Default::default() },
        ];
        for config in &bad {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn test_damping_uses_unmodulated_omega() {
        let config = PendulumConfig { q_factor: 50.0, ..Default::default() };
        let expected = config.natural_angular_frequency() / 50.0;
        assert!((config.damping_coefficient() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_impulse_adds_exact_energy() {
        let config = PendulumConfig {
            energy_impulse_j: 0.002,
            mass_kg: 2.5,
            ..Default::default()
        };
        let mut pendulum = PendulumIntegrator::new(&config);

        for &v in &[-0.3, 0.05, -1e-4, 0.8] {
            pendulum.state.angular_velocity = v;
            let before = pendulum.kinetic_energy(&config);
            pendulum.apply_impulse(&config);
            let after = pendulum.kinetic_energy(&config);
            assert!(
                (after - before - 0.002).abs() < 1e-12,
                "energy gain {} != 0.002",
                after - before
            );
            assert_eq!(pendulum.state.angular_velocity.signum(), v.signum(), "direction preserved");
        }
    }

    #[test]
    fn test_reset_seed() {
        let config = PendulumConfig::default();
        let pendulum = PendulumIntegrator::new(&config);
        let state = pendulum.state();
        assert!((state.angle - 0.01_f64.to_radians()).abs() < 1e-15);
        let expected_v = (2.0 * 0.001 / config.moment_of_inertia()).sqrt();
        assert!((state.angular_velocity - expected_v).abs() < 1e-12);
        assert_eq!(state.sim_time, 0.0);
        assert!(state.last_zero_crossing_time.is_none());

        let tiny = PendulumConfig { energy_impulse_j: 1e-12, ..Default::default() };
        assert_eq!(PendulumIntegrator::new(&tiny).state().angular_velocity, 0.001);

        let free = PendulumConfig { energy_impulse_j: 0.0, ..Default::default() };
        let v = PendulumIntegrator::new(&free).state().angular_velocity;
        assert!(v > 0.0 && v < 1e-4);
    }

    #[test]
    fn test_zero_crossings_recorded() {
        let config = PendulumConfig::default();
        let mut pendulum = PendulumIntegrator::new(&config);
        let mut buffers = Buffers::new();

        let events = run(&mut pendulum, &config, &mut buffers, 2000, 0.016);
        assert!(events.len() > 10, "expected many crossings, got {}", events.len());
        assert_eq!(buffers.tidal.len(), events.len());

        // First crossing falls back to the natural period
        let t0 = config.natural_period_s();
        assert!((events[0].period - t0).abs() < 1e-12);
        assert!(events[0].deviation.abs() < 1e-12);

        // Later crossings are half an oscillation apart
        for e in &events[2..] {
            assert!((e.period - t0 / 2.0).abs() < 0.1 * t0, "period {} vs T0/2 {}", e.period, t0 / 2.0);
            assert!(e.impulse_applied);
        }
        let (deviations, periods) = buffers.tidal.to_arrays();
        assert_eq!(periods[3], events[3].period);
        assert_eq!(deviations[3], events[3].deviation);
    }

    #[test]
    fn test_impulse_sustains_amplitude() {
        let driven = PendulumConfig::default();
        let free = PendulumConfig { energy_impulse_j: 0.0, ..Default::default() };

        let mut a = PendulumIntegrator::new(&driven);
        let mut b = PendulumIntegrator::new(&free);
        let mut ba = Buffers::new();
        let mut bb = Buffers::new();
        run(&mut a, &driven, &mut ba, 3000, 0.016);
        run(&mut b, &free, &mut bb, 3000, 0.016);

        let amp_driven = ba.angles.max_abs().unwrap();
        let amp_free = bb.angles.max_abs().unwrap();
        assert!(amp_driven > 0.05, "driven amplitude {amp_driven}");
        assert!(amp_free < 1e-3, "free amplitude {amp_free}");
    }

    #[test]
    fn test_sampling_invariant_to_step_size() {
        let config = PendulumConfig::default();

        let mut coarse = PendulumIntegrator::new(&config);
        let mut bc = Buffers::new();
        run(&mut coarse, &config, &mut bc, 100, 0.016);

        let mut fine = PendulumIntegrator::new(&config);
        let mut bf = Buffers::new();
        run(&mut fine, &config, &mut bf, 400, 0.004);

        assert_eq!(bc.angles.len(), 100);
        assert_eq!(bf.angles.len(), 100);
    }

    #[test]
    fn test_reference_phase_rate() {
        let config = PendulumConfig { energy_impulse_j: 0.0, ..Default::default() };
        let mut pendulum = PendulumIntegrator::new(&config);
        let mut buffers = Buffers::new();
        let start = pendulum.unwrapped_phase();
        run(&mut pendulum, &config, &mut buffers, 1000, 0.016);

        let t = pendulum.state().sim_time;
        let rate_hz = (pendulum.unwrapped_phase() - start) / (2.0 * PI * t);
        let f0 = config.natural_frequency_hz();
        assert!((rate_hz - f0).abs() < 0.06 * f0, "phase rate {rate_hz} vs f0 {f0}");

        let reference = pendulum.reference_phase();
        assert!((0.0..2.0 * PI).contains(&reference));
        let expected = wrap_phase(pendulum.unwrapped_phase() / VISUALIZATION_RATE_DIVISOR);
        assert_eq!(reference, expected);
    }

    #[test]
    fn test_divergence_latches() {
        let config = PendulumConfig::default();
        let mut pendulum = PendulumIntegrator::new(&config);
        let mut buffers = Buffers::new();

        let mut diverged = false;
        for _ in 0..50 {
            let mut sink = SampleSink {
                angles: &mut buffers.angles,
                tidal: &mut buffers.tidal,
            };
            if let Err(e) = pendulum.step(&config, 1e150, &mut sink) {
                assert!(e.is_divergence());
                diverged = true;
                break;
            }
        }
        assert!(diverged);
        assert!(pendulum.is_diverged());
        assert!(buffers.angles.iter().all(|a| a.is_finite()));

        let mut sink = SampleSink {
            angles: &mut buffers.angles,
            tidal: &mut buffers.tidal,
        };
        assert!(pendulum.step(&config, 0.016, &mut sink).is_err());

        pendulum.reset(&config);
        assert!(!pendulum.is_diverged());
        assert!(pendulum.step(&config, 0.016, &mut sink).is_ok());
    }

    #[test]
    fn test_diverging_step_leaves_buffers_untouched() {
        let config = PendulumConfig::default();
        let mut pendulum = PendulumIntegrator::new(&config);
        let mut buffers = Buffers::new();

        let mut diverged = false;
        for _ in 0..50 {
            let before = (buffers.tidal.to_arrays(), buffers.angles.to_vec());
            let mut sink = SampleSink {
                angles: &mut buffers.angles,
                tidal: &mut buffers.tidal,
            };
            if pendulum.step(&config, 1e150, &mut sink).is_err() {
                assert_eq!(buffers.tidal.to_arrays(), before.0);
                assert_eq!(buffers.angles.to_vec(), before.1);
                diverged = true;
                break;
            }
        }
        assert!(diverged);

        // The finite first step crossed zero and was recorded
        assert_eq!(buffers.tidal.len(), 1);
        let (deviations, periods) = buffers.tidal.to_arrays();
        assert!(deviations[0].is_finite() && periods[0].is_finite());
    }

    #[test]
    fn test_rejects_bad_dt() {
        let config = PendulumConfig::default();
        let mut pendulum = PendulumIntegrator::new(&config);
        let mut buffers = Buffers::new();
        let mut sink = SampleSink {
            angles: &mut buffers.angles,
            tidal: &mut buffers.tidal,
        };
        assert!(pendulum.step(&config, 0.0, &mut sink).is_err());
        assert!(pendulum.step(&config, f64::NAN, &mut sink).is_err());
        assert_eq!(pendulum.state().sim_time, 0.0);
    }

    #[test]
    fn test_forget_last_crossing() {
        let config = PendulumConfig::default();
        let mut pendulum = PendulumIntegrator::new(&config);
        let mut buffers = Buffers::new();
        run(&mut pendulum, &config, &mut buffers, 500, 0.016);
        assert!(pendulum.state().last_zero_crossing_time.is_some());
        pendulum.forget_last_crossing();
        assert!(pendulum.state().last_zero_crossing_time.is_none());
    }
}
