//! Small numerical helpers shared by the samplers, optimizers, and tests.
//!
//! Every randomized helper takes its generator explicitly so results are
//! reproducible from a seed; the crate keeps no global random state.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use special::Error as _;
use std::f64::consts::SQRT_2;

/// Draw a single standard-normal deviate.
pub fn randn<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

/// Uniformly random permutation of `0..n`.
pub fn randperm<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);
    perm
}

/// Cumulative distribution function of the standard normal.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + (x / SQRT_2).error())
}

/// Sign of `x` as a step direction: -1, 0, or 1.
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn randn_moments() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0xF00D);
        let n = 100_000;
        let draws: Vec<f64> = (0..n).map(|_| randn(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>()
            / n as f64;
        assert::close(mean, 0.0, 0.02);
        assert::close(var, 1.0, 0.02);
    }

    #[test]
    fn randperm_is_a_permutation() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let mut perm = randperm(100, &mut rng);
        perm.sort_unstable();
        let expected: Vec<usize> = (0..100).collect();
        assert_eq!(perm, expected);
    }

    #[test]
    fn norm_cdf_reference_values() {
        assert::close(norm_cdf(0.0), 0.5, 1E-12);
        assert::close(norm_cdf(-1.0), 0.158_655_253_931_457_05, 1E-10);
        assert::close(norm_cdf(1.96), 0.975_002_104_851_780_1, 1E-10);
        // symmetry
        for x in [0.1, 0.5, 1.3, 2.7] {
            assert::close(norm_cdf(x) + norm_cdf(-x), 1.0, 1E-12);
        }
    }

    #[test]
    fn sign_of() {
        assert_eq!(sign(3.2), 1.0);
        assert_eq!(sign(-0.004), -1.0);
        assert_eq!(sign(0.0), 0.0);
    }
}
