use crate::gp::GaussianProcess;
use nalgebra::DVector;

// don't reevaluate within this fraction of the current bracket
const INT: f64 = 0.1;
// extrapolate at most this multiple of the current step
const EXT: f64 = 3.0;
// evaluations per line search
const MAX: usize = 20;
// maximum allowed slope ratio between successive searches
const RATIO: f64 = 10.0;
// Wolfe-Powell constants: SIG bounds the slope ratio, RHO the required
// decrease fraction; 0 < RHO < SIG < 1
const SIG: f64 = 0.1;
const RHO: f64 = SIG / 2.0;

/// Polack-Ribiere conjugate-gradient ascent on the marginal
/// log-likelihood.
///
/// Each outer iteration runs a line search along the current conjugate
/// direction in three phases: cubic extrapolation until the Wolfe-Powell
/// conditions bracket a minimizer of the negated likelihood, quadratic
/// (falling back to cubic) interpolation inside the bracket until an
/// acceptable point is found, and a Polack-Ribiere update of the search
/// direction, reverting to steepest descent when the new slope turns
/// non-negative. Non-finite evaluations during extrapolation bisect the
/// step instead of aborting.
///
/// The budget counts likelihood/gradient evaluations, not iterations. The
/// run ends when the budget is spent or two line searches fail in a row;
/// either way the best point seen is restored into the kernel.
#[derive(Debug, Clone, Default)]
pub struct ConjugateGradient;

impl ConjugateGradient {
    /// Optimizer with the default line-search constants.
    pub fn new() -> Self {
        Self
    }

    /// Spend at most `n` evaluations maximizing the likelihood. Returns
    /// the best log-likelihood seen.
    pub fn maximize(&self, gp: &mut GaussianProcess, n: usize) -> f64 {
        let dim = gp.param_dim();

        // negated likelihood and gradient; degenerate factorizations
        // surface as NaN and take the bisection path below
        let nll = |gp: &mut GaussianProcess| -> (f64, DVector<f64>) {
            let f = gp.log_likelihood().map_or(f64::NAN, |v| -v);
            let df = gp.log_likelihood_gradient().map_or_else(
                |_| DVector::from_element(dim, f64::NAN),
                |g| -g,
            );
            (f, df)
        };

        let mut x = gp.loghyper();
        let (mut f0, mut df0) = nll(gp);

        let mut ls_failed = false;
        let mut s = -&df0;
        let mut d0 = -s.dot(&s);
        let mut x3 = 1.0 / (1.0 - d0);

        let mut i = 0;
        while i < n {
            // best values of this line search
            let mut x0 = x.clone();
            let mut f_best = f0;
            let mut df_best = df0.clone();
            let mut m = MAX.min(n - i);

            let mut x2;
            let mut f2;
            let mut d2;
            let mut f3;
            let mut d3;
            let mut df3;

            // extrapolate until the minimum is bracketed
            loop {
                x2 = 0.0;
                f2 = f0;
                d2 = d0;
                f3 = f0;
                df3 = df0.clone();

                let mut success = false;
                while !success && m > 0 {
                    m -= 1;
                    i += 1;
                    gp.set_loghyper((&x + &s * x3).as_slice())
                        .expect("parameter count is fixed");
                    let (f, df) = nll(gp);
                    f3 = f;
                    df3 = df;
                    if f3.is_finite() && !df3.iter().any(|g| g.is_nan()) {
                        success = true;
                    } else {
                        // bisect towards the last good point and retry
                        x3 = (x2 + x3) / 2.0;
                    }
                }
                if f3 < f_best {
                    x0 = &x + &s * x3;
                    f_best = f3;
                    df_best.copy_from(&df3);
                }
                d3 = df3.dot(&s);

                // bracketed, or out of budget for this search?
                if d3 > SIG * d0 || f3 > f0 + x3 * RHO * d0 || m == 0 {
                    break;
                }

                let x1 = x2;
                let f1 = f2;
                let d1 = d2;
                x2 = x3;
                f2 = f3;
                d2 = d3;
                // cubic extrapolation
                let a = 6.0 * (f1 - f2) + 3.0 * (d2 + d1) * (x2 - x1);
                let b = 3.0 * (f2 - f1) - (2.0 * d1 + d2) * (x2 - x1);
                x3 = x1
                    - d1 * (x2 - x1) * (x2 - x1)
                        / (b + (b * b - a * d1 * (x2 - x1)).sqrt());
                if !x3.is_finite() || x3 < 0.0 || x3 > x2 * EXT {
                    x3 = x2 * EXT;
                } else if x3 < x2 + INT * (x2 - x1) {
                    x3 = x2 + INT * (x2 - x1);
                }
            }

            // interpolate inside the bracket until acceptable
            let mut x4 = 0.0;
            let mut f4 = 0.0;
            let mut d4 = 0.0;
            while (d3.abs() > -SIG * d0 || f3 > f0 + x3 * RHO * d0) && m > 0 {
                if d3 > 0.0 || f3 > f0 + x3 * RHO * d0 {
                    x4 = x3;
                    f4 = f3;
                    d4 = d3;
                } else {
                    x2 = x3;
                    f2 = f3;
                    d2 = d3;
                }
                if f4 > f0 {
                    // quadratic interpolation
                    x3 = x2
                        - (0.5 * d2 * (x4 - x2) * (x4 - x2))
                            / (f4 - f2 - d2 * (x4 - x2));
                } else {
                    // cubic interpolation
                    let a = 6.0 * (f2 - f4) / (x4 - x2) + 3.0 * (d4 + d2);
                    let b = 3.0 * (f4 - f2) - (2.0 * d2 + d4) * (x4 - x2);
                    x3 = x2
                        + ((b * b - a * d2 * (x4 - x2) * (x4 - x2)).sqrt()
                            - b)
                            / a;
                }
                if !x3.is_finite() {
                    x3 = (x2 + x4) / 2.0;
                }
                x3 = x3.min(x4 - INT * (x4 - x2)).max(x2 + INT * (x4 - x2));

                gp.set_loghyper((&x + &s * x3).as_slice())
                    .expect("parameter count is fixed");
                let (f, df) = nll(gp);
                f3 = f;
                df3 = df;
                if f3 < f_best {
                    x0 = &x + &s * x3;
                    f_best = f3;
                    df_best.copy_from(&df3);
                }
                m -= 1;
                i += 1;
                d3 = df3.dot(&s);
            }

            if d3.abs() < -SIG * d0 && f3 < f0 + x3 * RHO * d0 {
                // line search succeeded
                x += &s * x3;
                f0 = f3;
                log::debug!("cg line search accepted: nll {}", f0);
                // Polack-Ribiere direction
                let beta = (df3.dot(&df3) - df0.dot(&df3)) / df0.dot(&df0);
                s = s * beta - &df3;
                df0 = df3;
                d3 = d0;
                d0 = df0.dot(&s);
                if d0 > 0.0 {
                    // slope must be negative, else restart steepest
                    s = -&df0;
                    d0 = -s.dot(&s);
                }
                x3 *= RATIO.min(d3 / (d0 - f64::MIN_POSITIVE));
                ls_failed = false;
            } else {
                // restore the best point of the failed search
                x = x0;
                f0 = f_best;
                df0 = df_best;
                log::debug!("cg line search failed: nll {}", f0);
                if ls_failed || i >= n {
                    // a second failure in a row ends the run
                    break;
                }
                s = -&df0;
                d0 = -s.dot(&s);
                x3 = 1.0 / (1.0 - d0);
                ls_failed = true;
            }
        }

        gp.set_loghyper(x.as_slice())
            .expect("parameter count is fixed");
        -f0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn improves_the_likelihood() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut gp = GaussianProcess::new(1, "CovSum(CovSEiso, CovNoise)")
            .unwrap();
        gp.set_loghyper(&[-1.0, -1.0, -1.0]).unwrap();
        for i in 0..30 {
            let x = f64::from(i) * 0.2;
            gp.add_pattern(&[x], x.sin()).unwrap();
        }
        let initial = gp.log_likelihood().unwrap();

        let best = ConjugateGradient::new().maximize(&mut gp, 40);
        assert!(best >= initial);
        assert::close(gp.log_likelihood().unwrap(), best, 1E-9);
    }

    #[test]
    fn recovers_known_hyperparameters() {
        let input_dim = 2;
        let mut rng = Xoshiro256Plus::seed_from_u64(0xFACE);
        let truth = [0.0, 0.0, 0.01_f64.ln()];

        let mut gp =
            GaussianProcess::new(input_dim, "CovSum(CovSEiso, CovNoise)")
                .unwrap();
        gp.set_loghyper(&truth).unwrap();

        let n = 200;
        let x = DMatrix::from_fn(n, input_dim, |_, _| {
            rng.gen::<f64>() * 2.0 - 1.0
        });
        let y = gp.covf().draw_random_sample(&mut rng, &x).unwrap();
        gp.add_patterns(&x, &y).unwrap();

        gp.set_loghyper(&[-1.0, -1.0, -1.0]).unwrap();
        ConjugateGradient::new().maximize(&mut gp, 50);

        let recovered = gp.loghyper();
        assert!(
            (recovered[0] - truth[0]).abs() < 0.8,
            "length scale off: {}",
            recovered[0]
        );
        assert!(
            (recovered[1] - truth[1]).abs() < 0.8,
            "signal variance off: {}",
            recovered[1]
        );
    }

    #[test]
    fn survives_non_finite_evaluations() {
        // a near-singular setup: two close points, noiseless kernel, so
        // aggressive extrapolation can step into degenerate territory
        let mut gp = GaussianProcess::new(1, "CovSEiso").unwrap();
        gp.add_pattern(&[0.0], 0.1).unwrap();
        gp.add_pattern(&[1.0E-4], 0.1).unwrap();
        gp.add_pattern(&[1.0], -0.2).unwrap();

        // must terminate and leave finite hyperparameters behind
        ConjugateGradient::new().maximize(&mut gp, 30);
        assert!(gp.loghyper().iter().all(|v| v.is_finite()));
    }
}
