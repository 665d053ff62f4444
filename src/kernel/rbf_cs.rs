use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::fmt;

/// Compactly supported squared exponential covariance function
///
/// ```math
///     k(x, x') = q(r) σ² exp(-‖x - x'‖² / (2ℓ²)),
///     q(r) = max(0, 1 - r/ϑ)³,   r = ‖x - x'‖
/// ```
///
/// The polynomial taper `q` drives the covariance to exactly zero beyond
/// the support radius `ϑ`, so distant pairs contribute nothing to the
/// kernel matrix. The radius is a runtime setting, not a hyperparameter:
/// it shapes sparsity, not the fit, and stays fixed during optimization.
///
/// # Log-hyperparameters
/// * `ln ℓ` - characteristic length scale
/// * `ln σ` - signal standard deviation
#[derive(Clone, Debug)]
pub struct CovRBFCS {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: f64,
    sf2: f64,
    threshold: f64,
}

impl CovRBFCS {
    /// Create a new compactly supported kernel with unit length scale,
    /// unit signal variance, and support radius 0.8.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(2),
            loghyper_changed: true,
            ell: 1.0,
            sf2: 1.0,
            threshold: 0.8,
        }
    }

    /// Support radius beyond which the covariance is exactly zero.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Change the support radius.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
        self.loghyper_changed = true;
    }

    fn taper(&self, r: f64) -> f64 {
        (1.0 - r / self.threshold).powi(3).max(0.0)
    }
}

impl fmt::Display for CovRBFCS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovRBFCS")
    }
}

impl Kernel for CovRBFCS {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        2
    }

    fn loghyper(&self) -> DVector<f64> {
        self.loghyper.clone()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        check_param_len(p, 2)?;
        self.loghyper.copy_from_slice(p);
        self.ell = p[0].exp();
        self.sf2 = (2.0 * p[1]).exp();
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
        let diff = x1 - x2;
        let q = self.taper(diff.norm());
        let z = (diff / self.ell).norm_squared();
        q * self.sf2 * (-0.5 * z).exp()
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let diff = x1 - x2;
        let q = self.taper(diff.norm());
        let z = (diff / self.ell).norm_squared();
        let k = q * self.sf2 * (-0.5 * z).exp();
        grad[0] = k * z;
        grad[1] = 2.0 * k;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn zero_beyond_support() {
        let k = CovRBFCS::new(1);
        assert::close(k.get(&dvector![0.0], &dvector![0.79]), 0.0, 1E-4);
        assert_eq!(k.get(&dvector![0.0], &dvector![0.9]), 0.0);
        assert_eq!(k.get(&dvector![0.0], &dvector![5.0]), 0.0);
        assert!(k.get(&dvector![0.0], &dvector![0.2]) > 0.0);
    }

    #[test]
    fn wider_threshold_widens_support() {
        let mut k = CovRBFCS::new(1);
        k.set_threshold(2.0);
        assert::close(k.threshold(), 2.0, 1E-12);
        assert!(k.get(&dvector![0.0], &dvector![1.5]) > 0.0);
        assert_eq!(k.get(&dvector![0.0], &dvector![2.5]), 0.0);
    }

    #[test]
    fn tapers_the_squared_exponential() {
        use crate::kernel::CovSEiso;

        let cs = CovRBFCS::new(2);
        let se = CovSEiso::new(2);
        let x1 = dvector![0.1, 0.0];
        let x2 = dvector![0.3, 0.1];
        let r: f64 = (&x1 - &x2).norm();
        let q = (1.0_f64 - r / 0.8_f64).powi(3);
        assert::close(cs.get(&x1, &x2), q * se.get(&x1, &x2), 1E-12);
    }

    #[test]
    fn gradient() {
        let mut k = CovRBFCS::new(2);
        k.set_loghyper(&[-0.3, 0.2]).unwrap();
        // inside the support radius
        let x1 = dvector![0.10, -0.15];
        let x2 = dvector![0.35, 0.20];
        crate::test::assert_grad_close(&mut k, &x1, &x2);
        // outside: value and gradient both vanish
        let far = dvector![3.0, 3.0];
        let mut g = DVector::zeros(2);
        k.grad(&x1, &far, &mut g);
        assert_eq!(g[0], 0.0);
        assert_eq!(g[1], 0.0);
    }
}
