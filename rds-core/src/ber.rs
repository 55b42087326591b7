//! Block error rate over a sliding window of recent frames.
//!
//! The first [`GRACE_GROUPS`] successful frames after a connect or station
//! reset are not recorded, so the figure does not spike while the tuner is
//! still settling. While grace is pending the published rate is 0.

use std::collections::VecDeque;

pub const WINDOW_SIZE: usize = 40;
pub const GRACE_GROUPS: u8 = 10;

#[derive(Debug, Clone)]
pub struct BerEstimator {
    window: VecDeque<bool>,
    grace: u8,
}

impl BerEstimator {
    pub fn new() -> Self {
        BerEstimator {
            window: VecDeque::with_capacity(WINDOW_SIZE),
            grace: GRACE_GROUPS,
        }
    }

    /// Record one frame outcome (`error = true` for corrupted frames).
    pub fn record(&mut self, error: bool) {
        if self.grace > 0 {
            if !error {
                self.grace -= 1;
            }
            return;
        }
        if self.window.len() == WINDOW_SIZE {
            self.window.pop_front();
        }
        self.window.push_back(error);
    }

    /// Error rate in percent (0.0 ..= 100.0).
    pub fn percent(&self) -> f32 {
        if self.grace > 0 || self.window.is_empty() {
            return 0.0;
        }
        let errors = self.window.iter().filter(|&&e| e).count();
        100.0 * errors as f32 / self.window.len() as f32
    }

    pub fn in_grace(&self) -> bool {
        self.grace > 0
    }
}

impl Default for BerEstimator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grace_reports_zero() {
        let mut ber = BerEstimator::new();
        for _ in 0..5 {
            ber.record(true);
            ber.record(false);
        }
        assert!(ber.in_grace());
        assert_eq!(ber.percent(), 0.0);
    }

    #[test]
    fn test_grace_consumed_by_successes_only() {
        let mut ber = BerEstimator::new();
        for _ in 0..10 {
            ber.record(false);
        }
        assert!(!ber.in_grace());
        // Window still empty right after grace
        assert_eq!(ber.percent(), 0.0);

        ber.record(true);
        assert_eq!(ber.percent(), 100.0);
        ber.record(false);
        assert_eq!(ber.percent(), 50.0);
    }

    #[test]
    fn test_window_capped() {
        let mut ber = BerEstimator::new();
        for _ in 0..10 {
            ber.record(false);
        }
        for _ in 0..100 {
            ber.record(true);
        }
        assert_eq!(ber.window.len(), WINDOW_SIZE);
        assert_eq!(ber.percent(), 100.0);

        // 40 clean frames flush the window
        for _ in 0..WINDOW_SIZE {
            ber.record(false);
        }
        assert_eq!(ber.percent(), 0.0);
    }

    #[test]
    fn test_bounds() {
        let mut ber = BerEstimator::new();
        for i in 0..200 {
            ber.record(i % 3 == 0);
            let p = ber.percent();
            assert!((0.0..=100.0).contains(&p));
        }
    }
}
