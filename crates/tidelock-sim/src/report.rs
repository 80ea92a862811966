//! End-of-run report, printable as text or JSON.

use serde::Serialize;
use std::fmt;

use tidelock_core::format::{format_energy, format_frequency, format_q_factor};
use tidelock_core::prelude::*;
use tidelock_core::simulation::FrameReport;

/// Counters accumulated while frames run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub frames: u64,
    pub steps: u64,
    pub crossings: u64,
    pub lock_acquisitions: u32,
    pub lock_losses: u32,
    pub first_lock_time_s: Option<f64>,
}

impl RunStats {
    pub fn record(&mut self, frame: &FrameReport) {
        self.frames += 1;
        self.steps += frame.steps as u64;
        self.crossings += frame.crossings as u64;
        self.lock_acquisitions += frame.lock_acquisitions;
        self.lock_losses += frame.lock_losses;
        if let Some(t) = frame.first_acquired_at_s {
            self.first_lock_time_s.get_or_insert(t);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PeakSummary {
    /// Real (unscaled) frequency
    pub frequency_hz: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpectrumSummary {
    pub ready: bool,
    pub samples: usize,
    pub sample_rate_hz: Option<f64>,
    pub snr_db: Option<f64>,
    pub peaks: Vec<PeakSummary>,
    pub markers: Vec<String>,
}

impl SpectrumSummary {
    fn from_view(view: &SpectrumView) -> Self {
        let scale = view.frequency_scale;
        let (samples, sample_rate_hz) = match &view.analysis {
            Analysis::Ready(r) => (r.samples_used, Some(r.sample_rate_hz)),
            Analysis::Pending { available, .. } => (*available, None),
        };
        Self {
            ready: view.analysis.is_ready(),
            samples,
            sample_rate_hz,
            snr_db: view.snr_db,
            peaks: view
                .peaks
                .iter()
                .map(|p| PeakSummary {
                    frequency_hz: p.frequency_hz / scale,
                    magnitude: p.magnitude,
                })
                .collect(),
            markers: view.markers.iter().map(|m| m.label.clone()).collect(),
        }
    }
}

/// Final state of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub stats: RunStats,
    pub sim_time_s: f64,
    pub length_cm: f64,
    pub mass_kg: f64,
    pub q_factor: f64,
    pub energy_impulse_j: f64,
    pub lunar_freq_hz: f64,
    pub natural_frequency_hz: f64,
    pub vco_frequency_hz: f64,
    pub phase_error_deg: f64,
    pub locked: bool,
    pub lock_quality: f64,
    pub amplitude_deg: f64,
    pub tidal_samples: usize,
    pub pendulum_spectrum: SpectrumSummary,
    pub tidal_spectrum: SpectrumSummary,
}

impl Report {
    pub fn collect(sim: &SimulationCore, stats: RunStats) -> SimResult<Self> {
        let snapshot = sim.snapshot();
        let pendulum = sim.pendulum_spectrum(sim.default_pendulum_range())?;
        let tidal = sim.tidal_spectrum(sim.default_tidal_range())?;

        Ok(Self {
            stats,
            sim_time_s: snapshot.pendulum.sim_time,
            length_cm: snapshot.config.length_cm,
            mass_kg: snapshot.config.mass_kg,
            q_factor: snapshot.config.q_factor,
            energy_impulse_j: snapshot.config.energy_impulse_j,
            lunar_freq_hz: snapshot.config.lunar_freq_hz,
            natural_frequency_hz: snapshot.natural_frequency_hz,
            vco_frequency_hz: snapshot.pll.vco_freq_hz,
            phase_error_deg: snapshot.pll.phase_error_rad.to_degrees(),
            locked: snapshot.pll.is_locked,
            lock_quality: snapshot.pll.lock_quality,
            amplitude_deg: snapshot.amplitude_deg,
            tidal_samples: snapshot.tidal_samples,
            pendulum_spectrum: SpectrumSummary::from_view(&pendulum),
            tidal_spectrum: SpectrumSummary::from_view(&tidal),
        })
    }
}

fn write_spectrum(f: &mut fmt::Formatter<'_>, name: &str, s: &SpectrumSummary) -> fmt::Result {
    if !s.ready {
        return writeln!(f, "{name} spectrum: waiting for data ({} samples)", s.samples);
    }
    write!(f, "{name} spectrum: {} samples", s.samples)?;
    if let Some(snr) = s.snr_db {
        write!(f, ", SNR {snr:.1} dB")?;
    }
    writeln!(f)?;
    for peak in &s.peaks {
        writeln!(f, "  peak {} ({:.3e})", format_frequency(peak.frequency_hz), peak.magnitude)?;
    }
    if !s.markers.is_empty() {
        writeln!(f, "  in view: {}", s.markers.join(", "))?;
    }
    Ok(())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Natural Freq: {:.3} Hz", self.natural_frequency_hz)?;
        writeln!(f, "VCO Freq: {:.3} Hz", self.vco_frequency_hz)?;
        writeln!(f, "Phase Error: {:.2}°", self.phase_error_deg)?;
        writeln!(
            f,
            "Lock Status: {} (quality {:.0}%)",
            if self.locked { "LOCKED" } else { "ACQUIRING" },
            self.lock_quality * 100.0
        )?;
        writeln!(f, "Q Factor: {}", format_q_factor(self.q_factor))?;
        writeln!(f, "Length: {} cm | Mass: {:.1} kg", self.length_cm, self.mass_kg)?;
        writeln!(f, "Amplitude: {:.2}°", self.amplitude_deg)?;
        if self.energy_impulse_j > 0.0 {
            writeln!(f, "Energy Impulse: {}", format_energy(self.energy_impulse_j))?;
        }
        writeln!(f, "Lunar Freq: {}", format_frequency(self.lunar_freq_hz))?;
        writeln!(
            f,
            "Run: {} frames, {} steps, {:.1} s simulated, {} crossings",
            self.stats.frames, self.stats.steps, self.sim_time_s, self.stats.crossings
        )?;
        match self.stats.first_lock_time_s {
            Some(t) => writeln!(
                f,
                "Lock: first at {t:.2} s, {} acquired / {} lost",
                self.stats.lock_acquisitions, self.stats.lock_losses
            )?,
            None => writeln!(f, "Lock: never acquired")?,
        }
        writeln!(f, "Tidal samples: {}", self.tidal_samples)?;
        write_spectrum(f, "Pendulum", &self.pendulum_spectrum)?;
        write_spectrum(f, "Tidal", &self.tidal_spectrum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(frames: u64) -> Report {
        let mut sim = SimulationCore::default();
        sim.set_simulation_speed(100.0).unwrap();
        let mut stats = RunStats::default();
        for _ in 0..frames {
            let frame = sim.advance_frame().unwrap();
            stats.record(&frame);
        }
        Report::collect(&sim, stats).unwrap()
    }

    #[test]
    fn test_stats_track_lock() {
        let report = run(10);
        assert_eq!(report.stats.frames, 10);
        assert_eq!(report.stats.steps, 1000);
        assert!(report.stats.lock_acquisitions >= 1);
        assert!(report.stats.first_lock_time_s.is_some());
        assert_eq!(report.stats.crossings as usize, report.tidal_samples);
    }

    #[test]
    fn test_stats_keep_transitions_within_one_frame() {
        let mut stats = RunStats::default();
        stats.record(&FrameReport {
            steps: 100,
            lock_acquisitions: 1,
            lock_losses: 1,
            first_acquired_at_s: Some(0.48),
            lock_event: Some(LockEvent::Lost),
            ..Default::default()
        });
        stats.record(&FrameReport {
            steps: 100,
            lock_acquisitions: 1,
            first_acquired_at_s: Some(2.1),
            lock_event: Some(LockEvent::Acquired),
            ..Default::default()
        });
        assert_eq!(stats.lock_acquisitions, 2);
        assert_eq!(stats.lock_losses, 1);
        assert_eq!(stats.first_lock_time_s, Some(0.48));
        assert_eq!(stats.steps, 200);
    }

    #[test]
    fn test_text_report() {
        let text = run(10).to_string();
        assert!(text.contains("Natural Freq: 0.407 Hz"), "{text}");
        assert!(text.contains("Energy Impulse: 1.0 mJ"));
        assert!(text.contains("Tidal spectrum: waiting for data"));
        assert!(text.contains("Pendulum spectrum: 512 samples"));
    }

    #[test]
    fn test_json_report() {
        let report = run(60);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["stats"]["frames"], 60);
        assert_eq!(value["tidal_spectrum"]["ready"], true);
        let markers = value["tidal_spectrum"]["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 2);

        // Tidal peaks are reported in real Hz
        for peak in value["tidal_spectrum"]["peaks"].as_array().unwrap() {
            let hz = peak["frequency_hz"].as_f64().unwrap();
            assert!(hz < 1e-4, "{hz} Hz is not a real tidal frequency");
        }
    }
}
