//! Privacy budget split.
//!
//! The total budget ε is divided into three parts that compose sequentially:
//!
//! | Part | Fraction | Spent by |
//! |------|----------|----------|
//! | `e1` | `e1_r` | initial partitioning |
//! | `e2` | `e2_r` | partition refinement |
//! | `e3` | `1 - e1_r - e2_r` | community summary release |

use crate::error::{Error, Result};

/// A validated total budget and its three-way split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrivacyBudget {
    epsilon: f64,
    e1_ratio: f64,
    e2_ratio: f64,
}

impl PrivacyBudget {
    /// Split `epsilon` by the fractions `e1_ratio` and `e2_ratio`.
    ///
    /// The third fraction is the remainder and must be strictly positive:
    /// community summaries are never released without noise.
    pub fn split(epsilon: f64, e1_ratio: f64, e2_ratio: f64) -> Result<Self> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(Error::InvalidBudget(format!(
                "total epsilon must be finite and > 0, got {epsilon}"
            )));
        }
        for (name, r) in [("e1_ratio", e1_ratio), ("e2_ratio", e2_ratio)] {
            if !r.is_finite() || !(0.0..=1.0).contains(&r) {
                return Err(Error::InvalidBudget(format!(
                    "{name} must lie in [0, 1], got {r}"
                )));
            }
        }
        let e3_ratio = 1.0 - e1_ratio - e2_ratio;
        if e3_ratio < -1e-12 {
            return Err(Error::InvalidBudget(format!(
                "fractions sum to {} > 1",
                e1_ratio + e2_ratio
            )));
        }
        if e3_ratio <= 1e-12 {
            return Err(Error::InvalidBudget(
                "no budget left for the summary release (e1_ratio + e2_ratio = 1)".into(),
            ));
        }
        Ok(Self {
            epsilon,
            e1_ratio,
            e2_ratio,
        })
    }

    /// Total budget ε.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Fraction funding initial partitioning.
    pub fn e1_ratio(&self) -> f64 {
        self.e1_ratio
    }

    /// Fraction funding refinement.
    pub fn e2_ratio(&self) -> f64 {
        self.e2_ratio
    }

    /// Fraction funding the summary release.
    pub fn e3_ratio(&self) -> f64 {
        1.0 - self.e1_ratio - self.e2_ratio
    }

    /// Budget for initial partitioning.
    pub fn e1(&self) -> f64 {
        self.e1_ratio * self.epsilon
    }

    /// Budget for refinement.
    pub fn e2(&self) -> f64 {
        self.e2_ratio * self.epsilon
    }

    /// Budget for the summary release.
    pub fn e3(&self) -> f64 {
        self.e3_ratio() * self.epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sums_to_total() {
        let b = PrivacyBudget::split(2.0, 0.3, 0.2).unwrap();
        assert!((b.e1() - 0.6).abs() < 1e-12);
        assert!((b.e2() - 0.4).abs() < 1e-12);
        assert!((b.e3() - 1.0).abs() < 1e-12);
        assert!((b.e1() + b.e2() + b.e3() - b.epsilon()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_fractions_allowed() {
        let b = PrivacyBudget::split(1.0, 0.0, 0.0).unwrap();
        assert_eq!(b.e1(), 0.0);
        assert_eq!(b.e2(), 0.0);
        assert!((b.e3() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_fractions_over_one() {
        assert!(matches!(
            PrivacyBudget::split(1.0, 0.7, 0.5),
            Err(Error::InvalidBudget(_))
        ));
    }

    #[test]
    fn test_rejects_exhausted_summary_budget() {
        assert!(PrivacyBudget::split(1.0, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_rejects_bad_total() {
        assert!(PrivacyBudget::split(0.0, 0.3, 0.3).is_err());
        assert!(PrivacyBudget::split(-1.0, 0.3, 0.3).is_err());
        assert!(PrivacyBudget::split(f64::NAN, 0.3, 0.3).is_err());
        assert!(PrivacyBudget::split(1.0, -0.1, 0.3).is_err());
    }
}
