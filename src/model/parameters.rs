//! # Model Parameters
//!
//! ## Role
//! Error rates and loss bound of the k-Dollo flip model, plus the pointwise
//! log-likelihood of one observed entry given one solution state.
//!
//! ### Emission table
//! ```text
//!                 present      absent
//!   observed 1    log(1-a)     log(a)
//!   observed 0    log(b)       log(1-b)
//!   MISSING       0            0
//! ```
//! `a` is the false-positive rate and `b` the false-negative rate. The four
//! logarithms are computed once here; `log(1-x)` goes through `ln_1p` so
//! rates close to zero keep full precision.

use crate::data::matrix::Entry;
use crate::data::solution::is_present;
use crate::error::{KdpfcError, Result};

/// Largest supported loss bound; states `0..=k+1` must fit in a `u8`
pub const MAX_LOSSES: u8 = u8::MAX - 1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelParams {
    /// False-positive rate
    alpha: f64,
    /// False-negative rate
    beta: f64,
    /// Maximum number of losses per character
    k: u8,
    log_alpha: f64,
    log_1m_alpha: f64,
    log_beta: f64,
    log_1m_beta: f64,
}

impl ModelParams {
    /// Both rates must lie strictly inside (0, 1)
    pub fn new(alpha: f64, beta: f64, k: u8) -> Result<Self> {
        for (name, rate) in [("alpha", alpha), ("beta", beta)] {
            if !(rate > 0.0 && rate < 1.0) {
                return Err(KdpfcError::config(format!(
                    "{} must lie strictly between 0 and 1, got {}",
                    name, rate
                )));
            }
        }
        if k > MAX_LOSSES {
            return Err(KdpfcError::config(format!(
                "loss bound k must be at most {}, got {}",
                MAX_LOSSES, k
            )));
        }
        Ok(Self {
            alpha,
            beta,
            k,
            log_alpha: alpha.ln(),
            log_1m_alpha: (-alpha).ln_1p(),
            log_beta: beta.ln(),
            log_1m_beta: (-beta).ln_1p(),
        })
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Loss bound
    #[inline]
    pub fn k(&self) -> u8 {
        self.k
    }

    /// Highest valid solution state, `k + 1`
    #[inline]
    pub fn max_state(&self) -> u8 {
        self.k + 1
    }

    /// `log(1 - alpha)`: an observed 1 that is truly present
    #[inline]
    pub fn log_true_positive(&self) -> f64 {
        self.log_1m_alpha
    }

    /// `log(1 - beta)`: an observed 0 that is truly absent
    #[inline]
    pub fn log_true_negative(&self) -> f64 {
        self.log_1m_beta
    }

    /// `log P(d | present)` or `log P(d | absent)`
    #[inline]
    pub fn log_prob(&self, d: Entry, present: bool) -> f64 {
        match (d, present) {
            (Entry::One, true) => self.log_1m_alpha,
            (Entry::One, false) => self.log_alpha,
            (Entry::Zero, true) => self.log_beta,
            (Entry::Zero, false) => self.log_1m_beta,
            (Entry::Missing, _) => 0.0,
        }
    }

    /// `weight * log P(d | state)`
    #[inline]
    pub fn log_likelihood(&self, d: Entry, state: u8, weight: u64) -> f64 {
        if d.is_missing() {
            return 0.0;
        }
        weight as f64 * self.log_prob(d, is_present(state))
    }
}
