use std::fmt;
use std::time::Duration;

/// Wall-clock duration of every epoch of one run, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpochTimings {
    samples: Vec<Duration>,
}

impl EpochTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, elapsed: Duration) {
        self.samples.push(elapsed);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }

    /// Mean epoch time in milliseconds, `None` when no epoch ran.
    pub fn mean_ms(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(Duration::as_secs_f64).sum();
        Some(total / self.samples.len() as f64 * 1e3)
    }
}

impl From<Vec<Duration>> for EpochTimings {
    fn from(samples: Vec<Duration>) -> Self {
        Self { samples }
    }
}

impl fmt::Display for EpochTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mean_ms() {
            Some(mean) => write!(f, "Time: (ms) {mean:.3}"),
            None => write!(f, "Time: (ms) n/a (no epochs run)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_known_samples() {
        let timings = EpochTimings::from(vec![
            Duration::from_secs_f64(0.01),
            Duration::from_secs_f64(0.02),
            Duration::from_secs_f64(0.03),
        ]);
        assert_eq!(timings.len(), 3);
        approx::assert_relative_eq!(timings.mean_ms().unwrap(), 20.0, epsilon = 1e-9);
        assert_eq!(timings.to_string(), "Time: (ms) 20.000");
    }

    #[test]
    fn empty_run_has_no_mean() {
        let timings = EpochTimings::new();
        assert!(timings.is_empty());
        assert_eq!(timings.mean_ms(), None);
        assert_eq!(timings.to_string(), "Time: (ms) n/a (no epochs run)");
    }

    #[test]
    fn push_keeps_order() {
        let mut timings = EpochTimings::new();
        timings.push(Duration::from_millis(3));
        timings.push(Duration::from_millis(1));
        assert_eq!(
            timings.samples(),
            &[Duration::from_millis(3), Duration::from_millis(1)]
        );
        assert_eq!(timings.to_string(), "Time: (ms) 2.000");
    }
}
