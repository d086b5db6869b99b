//! # Floating-Point Tolerance
//!
//! Absolute-epsilon comparisons for log-likelihood values. The tolerance is
//! an explicit value carried by the driver options and handed to every
//! comparison, never process-wide state.

/// Default epsilon for likelihood comparisons
pub const DEFAULT_EPSILON: f64 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    epsilon: f64,
}

impl Tolerance {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// `|x| > epsilon`
    #[inline]
    pub fn non_zero(&self, x: f64) -> bool {
        x.abs() > self.epsilon
    }

    /// `a < b` by more than epsilon
    #[inline]
    pub fn less(&self, a: f64, b: f64) -> bool {
        a + self.epsilon < b
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}
