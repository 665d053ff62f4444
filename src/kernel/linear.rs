use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::fmt;

/// Linear covariance function with a single bias term
///
/// ```math
///     k(x, x') = (1 + xᵗx') / t²
/// ```
///
/// # Log-hyperparameters
/// * `ln t` - scale of the linear trend
#[derive(Clone, Debug)]
pub struct CovLinearOne {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    it2: f64,
}

impl CovLinearOne {
    /// Create a new linear kernel with unit scale.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(1),
            loghyper_changed: true,
            it2: 1.0,
        }
    }
}

impl fmt::Display for CovLinearOne {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovLinearone")
    }
}

impl Kernel for CovLinearOne {
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
        self.it2 = (-2.0 * p[0]).exp();
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
        self.it2 * (1.0 + x1.dot(x2))
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        grad[0] = -2.0 * self.it2 * (1.0 + x1.dot(x2));
    }
}

/// Linear covariance function with automatic relevance determination
///
/// ```math
///     k(x, x') = xᵗ Λ⁻¹ x',   Λ = diag(ℓ₁², …, ℓ_d²)
/// ```
///
/// # Log-hyperparameters
/// * `ln ℓ₁ … ln ℓ_d` - per-dimension scales
#[derive(Clone, Debug)]
pub struct CovLinearArd {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: DVector<f64>,
}

impl CovLinearArd {
    /// Create a new ARD linear kernel with unit scales.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(input_dim),
            loghyper_changed: true,
            ell: DVector::from_element(input_dim, 1.0),
        }
    }
}

impl fmt::Display for CovLinearArd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovLinearard")
    }
}

impl Kernel for CovLinearArd {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        self.input_dim
    }

    fn loghyper(&self) -> DVector<f64> {
        self.loghyper.clone()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        check_param_len(p, self.input_dim)?;
        self.loghyper.copy_from_slice(p);
        for i in 0..self.input_dim {
            self.ell[i] = p[i].exp();
        }
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
        x1.component_div(&self.ell).dot(&x2.component_div(&self.ell))
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        for i in 0..self.input_dim {
            grad[i] = -2.0 * x1[i] * x2[i] / (self.ell[i] * self.ell[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn linear_one_known_values() {
        let mut k = CovLinearOne::new(2);
        let x1 = dvector![1.0, 2.0];
        let x2 = dvector![3.0, -1.0];
        assert::close(k.get(&x1, &x2), 2.0, 1E-12);

        k.set_loghyper(&[2.0_f64.ln()]).unwrap();
        assert::close(k.get(&x1, &x2), 0.5, 1E-12);
    }

    #[test]
    fn linear_one_gradient() {
        let mut k = CovLinearOne::new(3);
        k.set_loghyper(&[0.4]).unwrap();
        let x1 = dvector![0.3, -0.8, 1.0];
        let x2 = dvector![0.9, 0.2, -0.5];
        crate::test::assert_grad_close(&mut k, &x1, &x2);
    }

    #[test]
    fn linear_ard_known_values() {
        let mut k = CovLinearArd::new(2);
        let x1 = dvector![1.0, 2.0];
        let x2 = dvector![3.0, -1.0];
        assert::close(k.get(&x1, &x2), 1.0, 1E-12);

        // doubling a scale quarters that dimension's contribution
        k.set_loghyper(&[2.0_f64.ln(), 0.0]).unwrap();
        assert::close(k.get(&x1, &x2), 3.0 / 4.0 - 2.0, 1E-12);
    }

    #[test]
    fn linear_ard_gradient() {
        let mut k = CovLinearArd::new(3);
        k.set_loghyper(&[0.1, -0.3, 0.7]).unwrap();
        let x1 = dvector![0.5, 1.2, -0.4];
        let x2 = dvector![-0.6, 0.8, 0.9];
        crate::test::assert_grad_close(&mut k, &x1, &x2);
    }
}
