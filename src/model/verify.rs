//! # Verification Routines
//!
//! Checks the driver applies after each optimisation step: the sub-solver's
//! matrix must be a valid k-Dollo matrix, and block maximisation steps must
//! not lower the likelihood. Each check returns `Err(Verification)` with a
//! diagnostic; [`VerificationMode`] decides whether the driver logs it or
//! propagates it.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::data::solution::SolutionMatrix;
use crate::error::{KdpfcError, Result};
use crate::utils::tolerance::Tolerance;

/// How verification failures are handled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerificationMode {
    /// Checks are skipped
    Off,
    /// Failures are logged and the run continues
    #[default]
    Warn,
    /// Failures abort the run
    Strict,
}

impl VerificationMode {
    /// Route the outcome of a check according to the mode
    pub fn apply(self, check: impl FnOnce() -> Result<()>) -> Result<()> {
        match self {
            VerificationMode::Off => Ok(()),
            VerificationMode::Warn => {
                if let Err(e) = check() {
                    warn!("{}", e);
                }
                Ok(())
            }
            VerificationMode::Strict => check(),
        }
    }
}

impl FromStr for VerificationMode {
    type Err = KdpfcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(VerificationMode::Off),
            "warn" => Ok(VerificationMode::Warn),
            "strict" => Ok(VerificationMode::Strict),
            other => Err(KdpfcError::config(format!(
                "unknown verification mode '{}' (expected off, warn or strict)",
                other
            ))),
        }
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationMode::Off => "off",
            VerificationMode::Warn => "warn",
            VerificationMode::Strict => "strict",
        };
        f.write_str(name)
    }
}

/// Fails with every violation listed when `e` is not a k-Dollo matrix
pub fn check_k_dollo(e: &SolutionMatrix, k: u8) -> Result<()> {
    let violations = e.identify_violations(k);
    if violations.is_empty() {
        return Ok(());
    }
    let details: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
    Err(KdpfcError::verification(format!(
        "solution is not a {}-Dollo matrix: {}",
        k,
        details.join("; ")
    )))
}

/// Fails when `current` is lower than `previous` by more than the tolerance
pub fn check_non_decreasing(
    stage: &str,
    previous: f64,
    current: f64,
    tolerance: &Tolerance,
) -> Result<()> {
    if tolerance.less(current, previous) {
        return Err(KdpfcError::verification(format!(
            "{} decreased the log-likelihood from {:.6} to {:.6}",
            stage, previous, current
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("off".parse::<VerificationMode>().unwrap(), VerificationMode::Off);
        assert_eq!("WARN".parse::<VerificationMode>().unwrap(), VerificationMode::Warn);
        assert_eq!(
            "strict".parse::<VerificationMode>().unwrap(),
            VerificationMode::Strict
        );
        assert!(matches!(
            "loud".parse::<VerificationMode>(),
            Err(KdpfcError::Config { .. })
        ));
        assert_eq!(VerificationMode::default(), VerificationMode::Warn);
    }

    #[test]
    fn test_check_k_dollo() {
        let valid = SolutionMatrix::from_rows(vec![vec![1, 1], vec![1, 0], vec![0, 0]]).unwrap();
        assert!(check_k_dollo(&valid, 0).is_ok());

        let conflict =
            SolutionMatrix::from_rows(vec![vec![1, 1], vec![1, 0], vec![0, 1]]).unwrap();
        let err = check_k_dollo(&conflict, 1).unwrap_err();
        match err {
            KdpfcError::Verification { message } => assert!(message.contains("rows 0, 1, 2")),
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_check_non_decreasing() {
        let tol = Tolerance::default();
        assert!(check_non_decreasing("E-step", -10.0, -9.0, &tol).is_ok());
        // Within tolerance
        assert!(check_non_decreasing("E-step", -10.0, -10.00005, &tol).is_ok());
        assert!(check_non_decreasing("Z-step", -10.0, -10.1, &tol).is_err());
    }

    #[test]
    fn test_apply_routes_by_mode() {
        let failing = || Err(KdpfcError::verification("bad"));
        assert!(VerificationMode::Off.apply(failing).is_ok());
        assert!(VerificationMode::Warn.apply(failing).is_ok());
        assert!(VerificationMode::Strict.apply(failing).is_err());
        assert!(VerificationMode::Strict.apply(|| Ok(())).is_ok());
    }
}
