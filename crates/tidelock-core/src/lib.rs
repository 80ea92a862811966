//! # Tidelock Core
//!
//! Simulation and signal-processing core for a self-excited pendulum whose
//! natural frequency is modulated by tidal constituents, tracked by a
//! phase-locked loop and analyzed with windowed FFTs.
//!
//! ## Overview
//!
//! - **Pendulum**: forward-Euler integration of a damped, tidally modulated
//!   pendulum with an energy kick at every zero crossing
//! - **PLL**: phase detector, PI loop filter, clamped VCO and a hysteretic
//!   lock detector
//! - **Buffers**: fixed-capacity sliding windows at three cadences
//! - **Spectra**: Hann-windowed radix-2 FFT, SNR and peak extraction over
//!   display sub-ranges
//! - **Simulation**: frame-driven driver tying it all together
//!
//! ## Signal Flow
//!
//! ```text
//! Pendulum ──► angle samples (62.5 Hz) ───────────────► pendulum spectrum
//!    │   └───► (deviation, period) per crossing ──────► tidal spectrum
//!    └──► reference phase ──► PLL ──► VCO frequency / lock status
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tidelock_core::prelude::*;
//!
//! let mut sim = SimulationCore::new(&TidelockConfig::default())?;
//! for _ in 0..200 {
//!     sim.advance_frame()?;
//! }
//! println!("VCO at {:.3} Hz, locked: {}", sim.pll_snapshot().vco_freq_hz, sim.pll_snapshot().is_locked);
//! # Ok::<(), tidelock_core::SimError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod fft;
pub mod format;
pub mod observe;
pub mod pendulum;
pub mod pll;
pub mod simulation;
pub mod spectrum;
pub mod tidal;

pub use config::{AnalysisConfig, DriverConfig, TidelockConfig};
pub use error::{SimError, SimResult};
pub use pendulum::{PendulumConfig, PendulumIntegrator, PendulumState, ZeroCrossingEvent};
pub use pll::{LockEvent, PhaseLockedLoop, PllConfig, PllSnapshot};
pub use simulation::{FrameReport, SimulationCore, SimulationSnapshot, SpectrumView};
pub use spectrum::{Analysis, FrequencyRange, SpectralEstimator, SpectrumResult, WindowSpan};

/// Common imports.
pub mod prelude {
    pub use crate::config::TidelockConfig;
    pub use crate::error::{SimError, SimResult};
    pub use crate::observe::{init_logging, LogConfig};
    pub use crate::pll::LockEvent;
    pub use crate::simulation::{SimulationCore, SpectrumView};
    pub use crate::spectrum::{Analysis, FrequencyRange};
}
