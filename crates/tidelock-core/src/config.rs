//! # Configuration System
//!
//! YAML configuration for the simulation: pendulum physics, loop gains,
//! frame driver and spectrum display ranges, plus logging.
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `TIDELOCK_CONFIG` environment variable
//! 2. `./tidelock.yaml` (current directory)
//! 3. `~/.config/tidelock/config.yaml` (user config)
//! 4. `/etc/tidelock/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! pendulum:
//!   length_cm: 150.0
//!   q_factor: 1000.0
//!   energy_impulse_j: 0.001
//!
//! pll:
//!   loop_gain: 1.0
//!
//! driver:
//!   simulation_speed: 10.0
//!
//! logging:
//!   level: debug
//! ```
//!
//! Every section and field is optional; missing values take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ensure_at_least, ensure_finite, ensure_positive, SimError, SimResult};
use crate::observe::LogConfig;
use crate::pendulum::{PendulumConfig, SAMPLE_INTERVAL_S};
use crate::pll::PllConfig;
use crate::tidal::M2_FREQ_HZ;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TIDELOCK_CONFIG";

/// Frame driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Requested integrator steps per frame (>= 1)
    pub simulation_speed: f64,
    /// Integrator time step in seconds
    pub base_dt_s: f64,
    /// Ceiling on integrator steps per frame
    pub max_steps_per_frame: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            simulation_speed: 1.0,
            base_dt_s: SAMPLE_INTERVAL_S,
            max_steps_per_frame: 100,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> SimResult<()> {
        ensure_at_least("simulation_speed", self.simulation_speed, 1.0, "must be >= 1")?;
        ensure_positive("base_dt_s", self.base_dt_s)?;
        ensure_at_least("max_steps_per_frame", self.max_steps_per_frame as f64, 1.0, "must be >= 1")?;
        Ok(())
    }
}

/// Spectrum display settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Centre of the pendulum spectrum view in Hz
    pub pendulum_center_hz: f64,
    /// Width of the pendulum spectrum view in Hz
    pub pendulum_width_hz: f64,
    /// Centre of the tidal spectrum view in real (unscaled) Hz
    pub tidal_center_hz: f64,
    /// Width of the tidal spectrum view in real Hz
    pub tidal_width_hz: f64,
    pub pendulum_fft_size: usize,
    pub tidal_fft_size: usize,
    /// Noise window half-width for SNR estimates
    pub snr_window_bins: usize,
    /// Minimum spacing between reported peaks
    pub peak_min_separation_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pendulum_center_hz: 1.5,
            pendulum_width_hz: 3.0,
            tidal_center_hz: M2_FREQ_HZ,
            tidal_width_hz: 20e-6,
            pendulum_fft_size: 512,
            tidal_fft_size: 1024,
            snr_window_bins: 10,
            peak_min_separation_bins: 3,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> SimResult<()> {
        ensure_finite("pendulum_center_hz", self.pendulum_center_hz)?;
        ensure_positive("pendulum_width_hz", self.pendulum_width_hz)?;
        ensure_finite("tidal_center_hz", self.tidal_center_hz)?;
        ensure_positive("tidal_width_hz", self.tidal_width_hz)?;
        for size in [self.pendulum_fft_size, self.tidal_fft_size] {
            if size < 2 || !size.is_power_of_two() {
                return Err(SimError::InvalidFftSize(size));
            }
        }
        Ok(())
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidelockConfig {
    pub pendulum: PendulumConfig,
    pub pll: PllConfig,
    pub driver: DriverConfig,
    pub analysis: AnalysisConfig,
    pub logging: LogConfig,
}

impl TidelockConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the default config if no file is found.
    pub fn load() -> SimResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from(&path);
            }
            tracing::warn!(path = %path.display(), "{} points to a missing file", CONFIG_ENV_VAR);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        tracing::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> SimResult<()> {
        let content = serde_yaml::to_string(self).map_err(|e| SimError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SimError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Candidate files after the environment variable, in search order.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./tidelock.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "tidelock") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/tidelock/config.yaml"));
        paths
    }

    /// Apply the same range checks the simulation setters enforce.
    pub fn validate(&self) -> SimResult<()> {
        self.check().map_err(|e| SimError::Config(e.to_string()))
    }

    fn check(&self) -> SimResult<()> {
        self.pendulum.validate()?;
        ensure_finite("loop_gain", self.pll.loop_gain)?;
        ensure_finite("integral_gain", self.pll.integral_gain)?;
        if let Some(f) = self.pll.initial_vco_freq_hz {
            ensure_positive("initial_vco_freq_hz", f)?;
        }
        self.driver.validate()?;
        self.analysis.validate()
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            driver: DriverConfig {
                simulation_speed: 10.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let body = serde_yaml::to_string(&config).unwrap_or_default();
        format!(
            "# tidelock configuration\n\
             # Search order: ${CONFIG_ENV_VAR}, ./tidelock.yaml, user config dir, /etc/tidelock/config.yaml\n\
             {body}"
        )
    }
}
