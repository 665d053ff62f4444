use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::fmt;

/// White noise covariance function
///
/// ```math
///     k(x, x') = σₙ²·δ(x, x')
/// ```
///
/// `δ` fires on *object identity*, not value equality: the noise term
/// belongs to an observation, so only the covariance of a training point
/// with itself carries it. Two distinct vectors with equal coordinates are
/// different observations and get zero.
///
/// # Log-hyperparameters
/// * `ln σₙ` - noise standard deviation
#[derive(Clone, Debug)]
pub struct CovNoise {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    s2: f64,
}

impl CovNoise {
    /// Create a new noise kernel with unit noise variance.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(1),
            loghyper_changed: true,
            s2: 1.0,
        }
    }
}

impl fmt::Display for CovNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovNoise")
    }
}

impl Kernel for CovNoise {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        1
    }

    fn loghyper(&self) -> DVector<f64> {
        self.loghyper.clone()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        check_param_len(p, 1)?;
        self.loghyper.copy_from_slice(p);
        self.s2 = (2.0 * p[0]).exp();
        self.loghyper_changed = true;
        Ok(())
    }

    fn loghyper_changed(&self) -> bool {
        self.loghyper_changed
    }

    fn clear_loghyper_changed(&mut self) {
        self.loghyper_changed = false;
    }

    fn get(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> f64 {
        if std::ptr::eq(x1, x2) {
            self.s2
        } else {
            0.0
        }
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        grad[0] = if std::ptr::eq(x1, x2) { 2.0 * self.s2 } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn identity_not_equality() {
        let mut k = CovNoise::new(2);
        k.set_loghyper(&[-1.0]).unwrap();
        let s2 = (-2.0_f64).exp();

        let x = dvector![0.5, -0.25];
        // a genuinely distinct vector with the same coordinates
        let y = x.clone();

        assert::close(k.get(&x, &x), s2, 1E-12);
        assert::close(k.get(&x, &y), 0.0, 1E-12);
        assert::close(k.get(&x, &dvector![1.0, 1.0]), 0.0, 1E-12);
    }

    #[test]
    fn gradient() {
        let mut k = CovNoise::new(2);
        k.set_loghyper(&[0.3]).unwrap();

        let x = dvector![0.1, 0.2];
        let y = dvector![0.1, 0.2];
        let mut g = DVector::zeros(1);

        k.grad(&x, &x, &mut g);
        assert::close(g[0], 2.0 * 0.6_f64.exp(), 1E-12);

        k.grad(&x, &y, &mut g);
        assert::close(g[0], 0.0, 1E-12);

        // finite-difference check on the diagonal branch
        crate::test::assert_grad_close(&mut k, &x, &x);
    }

    #[test]
    fn round_trips_through_factory() {
        let k = CovNoise::new(3);
        let parsed = crate::kernel::factory::create(3, &k.to_string()).unwrap();
        assert_eq!(parsed.param_dim(), 1);
        assert_eq!(parsed.to_string(), "CovNoise");
    }
}
