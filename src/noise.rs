//! Noise mechanisms and consistency post-processing.
//!
//! ## Laplace Mechanism
//!
//! A count query with L1 sensitivity Δ released under budget ε gets
//! independent Laplace(0, Δ/ε) noise on every coordinate:
//!
//! ```text
//! Δ = 1  one pairwise edge count (an edge touches one cell)
//! Δ = 2  a degree sequence (an edge touches two entries)
//! ```
//!
//! ## Consistency Projection
//!
//! Noisy counts are real-valued and may be negative. [`project`] turns them
//! into non-negative integers with the "norm-sub" rule: round, then find the
//! smallest uniform shift δ such that `Σ max(xᵢ - δ, 0)` best matches the
//! rounded total, subtract it and clamp at zero. Large noisy counts keep
//! their relative order, the released total is preserved as far as
//! possible, and no mass is invented. The projection reads only the noisy
//! vector, so it is post-processing and costs no budget.
//!
//! ## Exponential Mechanism
//!
//! [`exponential_mechanism`] picks one candidate with probability
//! proportional to `exp(ε·u / 2Δ)`. The refiner uses it to privatize each
//! node move.

use rand::Rng;
use rand_distr::{Distribution, Exp};

use crate::error::{Error, Result};

/// Laplace(0, scale) noise source.
#[derive(Debug, Clone, Copy)]
pub struct Laplace {
    scale: f64,
    exp: Option<Exp<f64>>,
}

impl Laplace {
    /// Laplace noise with the given scale. A scale of zero adds no noise.
    pub fn new(scale: f64) -> Result<Self> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(Error::InvalidParameter {
                name: "scale",
                message: format!("Laplace scale must be finite and >= 0, got {scale}"),
            });
        }
        let exp = if scale > 0.0 {
            // Laplace(b) = Exp(1/b) - Exp(1/b)
            Some(Exp::new(1.0 / scale).map_err(|e| Error::InvalidParameter {
                name: "scale",
                message: e.to_string(),
            })?)
        } else {
            None
        };
        Ok(Self { scale, exp })
    }

    /// Scale calibrated to `sensitivity / epsilon`.
    pub fn calibrated(sensitivity: f64, epsilon: f64) -> Result<Self> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: format!("must be finite and > 0, got {epsilon}"),
            });
        }
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "sensitivity",
                message: format!("must be finite and > 0, got {sensitivity}"),
            });
        }
        Self::new(sensitivity / epsilon)
    }

    /// The scale parameter b.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// One Laplace(0, b) draw.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match &self.exp {
            Some(exp) => exp.sample(rng) - exp.sample(rng),
            None => 0.0,
        }
    }

    /// Add one independent draw to every coordinate.
    pub fn add_noise<R: Rng + ?Sized>(&self, values: &[f64], rng: &mut R) -> Vec<f64> {
        values.iter().map(|&v| v + self.sample(rng)).collect()
    }
}

/// Feasible set for [`project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    /// Inclusive upper bound on every coordinate, if any.
    pub upper: Option<u64>,
}

impl Bounds {
    /// Non-negativity only.
    pub fn non_negative() -> Self {
        Self { upper: None }
    }

    /// Every coordinate in `[0, upper]`.
    pub fn at_most(upper: u64) -> Self {
        Self { upper: Some(upper) }
    }
}

/// Map a noisy real vector to the closest feasible integer vector.
///
/// Total over `f64`: NaN becomes 0 and infinities saturate. Feasible
/// integer input is returned unchanged.
pub fn project(noisy: &[f64], bounds: Bounds) -> Vec<u64> {
    let rounded: Vec<i64> = noisy.iter().map(|&x| round_saturating(x)).collect();
    let target: i128 = rounded.iter().map(|&x| x as i128).sum();
    let min = rounded.iter().copied().min().unwrap_or(0);

    let shift = if min < 0 {
        norm_sub_shift(&rounded, target, -(min as i128))
    } else {
        0
    };

    rounded
        .iter()
        .map(|&x| {
            let v = (x as i128 - shift).max(0);
            let v = u64::try_from(v).unwrap_or(u64::MAX);
            match bounds.upper {
                Some(upper) => v.min(upper),
                None => v,
            }
        })
        .collect()
}

fn round_saturating(x: f64) -> i64 {
    if x.is_nan() {
        0
    } else {
        // `as` saturates at the i64 range
        x.round() as i64
    }
}

fn clipped_sum(values: &[i64], shift: i128) -> i128 {
    values.iter().map(|&x| (x as i128 - shift).max(0)).sum()
}

/// Smallest δ in `[0, max_shift]` minimizing `|clipped_sum(δ) - target|`.
///
/// `clipped_sum` is non-increasing in δ and `clipped_sum(0) >= target`, so
/// the optimum sits next to the first δ where the sum drops to the target.
fn norm_sub_shift(values: &[i64], target: i128, max_shift: i128) -> i128 {
    if clipped_sum(values, max_shift) > target {
        return max_shift;
    }
    let (mut lo, mut hi) = (0i128, max_shift);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if clipped_sum(values, mid) <= target {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    if lo == 0 {
        return 0;
    }
    let below = (clipped_sum(values, lo - 1) - target).abs();
    let at = (clipped_sum(values, lo) - target).abs();
    if below <= at {
        lo - 1
    } else {
        lo
    }
}

/// Select an index with probability ∝ `exp(ε·uᵢ / 2Δ)`.
///
/// Returns `None` only for an empty candidate list. `epsilon == 0` gives a
/// uniform choice; NaN utilities are never selected unless every utility is
/// NaN.
pub fn exponential_mechanism<R: Rng + ?Sized>(
    utilities: &[f64],
    epsilon: f64,
    sensitivity: f64,
    rng: &mut R,
) -> Option<usize> {
    if utilities.is_empty() {
        return None;
    }
    let beta = if epsilon > 0.0 && sensitivity > 0.0 {
        epsilon / (2.0 * sensitivity)
    } else {
        0.0
    };
    let max_u = utilities
        .iter()
        .copied()
        .filter(|u| !u.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);

    let weights: Vec<f64> = utilities
        .iter()
        .map(|&u| {
            if u.is_nan() || max_u == f64::NEG_INFINITY {
                0.0
            } else if beta == 0.0 {
                1.0
            } else {
                (beta * (u - max_u)).exp()
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Some(rng.random_range(0..utilities.len()));
    }

    let choice = rng.random::<f64>() * total;
    let mut accum = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        accum += w;
        last_positive = i;
        if choice < accum {
            return Some(i);
        }
    }
    Some(last_positive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_zero_scale_is_identity() {
        let lap = Laplace::new(0.0).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(lap.add_noise(&[1.0, 2.0, 3.0], &mut rng), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_calibrated_scale() {
        let lap = Laplace::calibrated(2.0, 0.5).unwrap();
        assert!((lap.scale() - 4.0).abs() < 1e-12);
        assert!(Laplace::calibrated(1.0, 0.0).is_err());
        assert!(Laplace::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_laplace_moments() {
        let lap = Laplace::new(2.0).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let n = 50_000;
        let draws: Vec<f64> = (0..n).map(|_| lap.sample(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let mean_abs = draws.iter().map(|x| x.abs()).sum::<f64>() / n as f64;
        // E[X] = 0, E|X| = b
        assert!(mean.abs() < 0.1, "mean {mean}");
        assert!((mean_abs - 2.0).abs() < 0.1, "mean |x| {mean_abs}");
    }

    #[test]
    fn test_project_rounds_feasible_input() {
        assert_eq!(project(&[0.4, 1.6, 2.5], Bounds::non_negative()), vec![0, 2, 3]);
    }

    #[test]
    fn test_project_norm_sub_preserves_total() {
        // total = 6; shifting by 1 gives 4 + 1 + 1 + 0 = 6
        let out = project(&[5.0, 2.0, 2.0, -3.0], Bounds::non_negative());
        assert_eq!(out, vec![4, 1, 1, 0]);
        assert_eq!(out.iter().sum::<u64>(), 6);
    }

    #[test]
    fn test_project_negative_total_zeroes_out() {
        assert_eq!(project(&[-4.0, 1.0, -2.0], Bounds::non_negative()), vec![0, 0, 0]);
    }

    #[test]
    fn test_project_upper_bound() {
        assert_eq!(project(&[7.2, 1.0, 3.0], Bounds::at_most(3)), vec![3, 1, 3]);
    }

    #[test]
    fn test_project_total_on_non_finite() {
        let out = project(
            &[f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.0],
            Bounds::non_negative(),
        );
        assert_eq!(out.len(), 4);
        assert_eq!(project(&[], Bounds::non_negative()), Vec::<u64>::new());
    }

    #[test]
    fn test_exponential_mechanism_prefers_high_utility() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut hits = [0usize; 3];
        for _ in 0..2_000 {
            let i = exponential_mechanism(&[0.0, 10.0, 0.0], 2.0, 1.0, &mut rng).unwrap();
            hits[i] += 1;
        }
        assert!(hits[1] > 1_900, "{hits:?}");
    }

    #[test]
    fn test_exponential_mechanism_zero_budget_is_uniform() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let mut hits = [0usize; 2];
        for _ in 0..4_000 {
            hits[exponential_mechanism(&[0.0, 100.0], 0.0, 1.0, &mut rng).unwrap()] += 1;
        }
        assert!(hits[0] > 1_700 && hits[1] > 1_700, "{hits:?}");
    }

    #[test]
    fn test_exponential_mechanism_edge_cases() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        assert_eq!(exponential_mechanism(&[], 1.0, 1.0, &mut rng), None);
        assert_eq!(exponential_mechanism(&[f64::NAN, 1.0], 1.0, 1.0, &mut rng), Some(1));
        assert!(exponential_mechanism(&[f64::NAN, f64::NAN], 1.0, 1.0, &mut rng).is_some());
    }

    proptest! {
        #[test]
        fn prop_project_non_negative_and_bounded(
            values in prop::collection::vec(-1e6f64..1e6, 0..40),
            upper in 0u64..50,
        ) {
            let out = project(&values, Bounds::at_most(upper));
            prop_assert_eq!(out.len(), values.len());
            prop_assert!(out.iter().all(|&v| v <= upper));
        }

        #[test]
        fn prop_project_idempotent(values in prop::collection::vec(-1e4f64..1e4, 0..40)) {
            let once = project(&values, Bounds::non_negative());
            let as_f64: Vec<f64> = once.iter().map(|&v| v as f64).collect();
            prop_assert_eq!(project(&as_f64, Bounds::non_negative()), once);
        }

        #[test]
        fn prop_project_never_exceeds_positive_mass(
            values in prop::collection::vec(-100f64..100.0, 1..40),
        ) {
            let out = project(&values, Bounds::non_negative());
            let positive: f64 = values.iter().map(|v| v.round().max(0.0)).sum();
            prop_assert!(out.iter().sum::<u64>() as f64 <= positive);
        }
    }
}
