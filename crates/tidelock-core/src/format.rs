//! Human-readable units for reports.

/// Energy with an SI prefix: nJ, µJ, mJ (one decimal) or J (two decimals).
pub fn format_energy(joules: f64) -> String {
    if joules < 1e-6 {
        format!("{:.1} nJ", joules * 1e9)
    } else if joules < 1e-3 {
        format!("{:.1} µJ", joules * 1e6)
    } else if joules < 1.0 {
        format!("{:.1} mJ", joules * 1e3)
    } else {
        format!("{:.2} J", joules)
    }
}

/// Frequency as µHz below 1 mHz, mHz below 1 Hz, Hz otherwise.
pub fn format_frequency(hz: f64) -> String {
    if hz < 1e-3 {
        format!("{:.1} µHz", hz * 1e6)
    } else if hz < 1.0 {
        format!("{:.2} mHz", hz * 1e3)
    } else {
        format!("{:.3} Hz", hz)
    }
}

/// Period in hours below 48 h, days otherwise.
pub fn format_period_hours(hours: f64) -> String {
    if hours < 48.0 {
        format!("{:.2} h", hours)
    } else {
        format!("{:.1} d", hours / 24.0)
    }
}

/// Quality factor in exponent notation, e.g. `1.0e3`.
pub fn format_q_factor(q: f64) -> String {
    format!("{:.1e}", q)
}
