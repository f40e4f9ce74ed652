//! Phase timing and count parsing for the pipeline and CLI.

use std::time::{Duration, Instant};

use log::Level;

/// Logs how long a pipeline phase took when dropped.
///
/// The phase name is built by the caller, so a run can label its phases
/// with the test being run (`"conservation: sampling"`).
pub struct Timed {
    phase: String,
    level: Level,
    start: Instant,
}

impl Timed {
    pub fn new(level: Level, phase: impl Into<String>) -> Self {
        let phase = phase.into();
        log::trace!("{} started", phase);
        Self {
            phase,
            level,
            start: Instant::now(),
        }
    }

    pub fn info(phase: impl Into<String>) -> Self {
        Self::new(Level::Info, phase)
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        log::log!(self.level, "{} took {:.3?}", self.phase, self.elapsed());
    }
}

/// Parse counts like `5000`, `20k` or `1.5m`.
pub fn parse_count(s: &str) -> Result<usize, String> {
    let s = s.trim().to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('m') {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix('k') {
        (n, 1_000)
    } else {
        (s.as_str(), 1)
    };

    let n = num_str
        .parse::<f64>()
        .map_err(|e| format!("Invalid number '{}': {}", s, e))?;
    if !n.is_finite() || n < 0.0 {
        return Err(format!("Invalid count '{}'", s));
    }
    Ok((n * multiplier as f64).round() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("5000"), Ok(5000));
        assert_eq!(parse_count("20k"), Ok(20_000));
        assert_eq!(parse_count("1.5M"), Ok(1_500_000));
        assert!(parse_count("lots").is_err());
        assert!(parse_count("-3").is_err());
    }

    #[test]
    fn test_timed_phase_name_from_caller() {
        let t = Timed::new(Level::Debug, format!("{}: sampling", "taxon"));
        assert_eq!(t.phase(), "taxon: sampling");
        let first = t.elapsed();
        assert!(t.elapsed() >= first);
    }
}
