use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::fmt;

/// Isotropic Matérn covariance function with ν = 3/2
///
/// ```math
///     k(x, x') = σ² (1 + z) exp(-z),   z = √3 ‖x - x'‖ / ℓ
/// ```
///
/// # Log-hyperparameters
/// * `ln ℓ` - characteristic length scale
/// * `ln σ` - signal standard deviation
#[derive(Clone, Debug)]
pub struct CovMatern3Iso {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: f64,
    sf2: f64,
}

impl CovMatern3Iso {
    /// Create a new Matérn-3/2 kernel with unit length scale and unit
    /// signal variance.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(2),
            loghyper_changed: true,
            ell: 1.0,
            sf2: 1.0,
        }
    }

    fn z(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> f64 {
        (x1 - x2).norm() * 3.0_f64.sqrt() / self.ell
    }
}

impl fmt::Display for CovMatern3Iso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovMatern3iso")
    }
}

impl Kernel for CovMatern3Iso {
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
        let z = self.z(x1, x2);
        self.sf2 * (-z).exp() * (1.0 + z)
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let z = self.z(x1, x2);
        let k = self.sf2 * (-z).exp();
        grad[0] = k * z * z;
        grad[1] = 2.0 * k * (1.0 + z);
    }
}

/// Isotropic Matérn covariance function with ν = 5/2
///
/// ```math
///     k(x, x') = σ² (1 + z + z²/3) exp(-z),   z = √5 ‖x - x'‖ / ℓ
/// ```
///
/// # Log-hyperparameters
/// * `ln ℓ` - characteristic length scale
/// * `ln σ` - signal standard deviation
#[derive(Clone, Debug)]
pub struct CovMatern5Iso {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: f64,
    sf2: f64,
}

impl CovMatern5Iso {
    /// Create a new Matérn-5/2 kernel with unit length scale and unit
    /// signal variance.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(2),
            loghyper_changed: true,
            ell: 1.0,
            sf2: 1.0,
        }
    }

    fn z(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> f64 {
        (x1 - x2).norm() * 5.0_f64.sqrt() / self.ell
    }
}

impl fmt::Display for CovMatern5Iso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovMatern5iso")
    }
}

impl Kernel for CovMatern5Iso {
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
        let z = self.z(x1, x2);
        self.sf2 * (-z).exp() * (1.0 + z + z * z / 3.0)
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let z = self.z(x1, x2);
        let k = self.sf2 * (-z).exp();
        let z2 = z * z;
        grad[0] = k * (z2 + z2 * z) / 3.0;
        grad[1] = 2.0 * k * (1.0 + z + z2 / 3.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn matern3_known_values() {
        let k = CovMatern3Iso::new(1);
        assert::close(k.get(&dvector![1.5], &dvector![1.5]), 1.0, 1E-12);
        let z = 3.0_f64.sqrt();
        assert::close(
            k.get(&dvector![0.0], &dvector![1.0]),
            (1.0 + z) * (-z).exp(),
            1E-12,
        );
    }

    #[test]
    fn matern5_known_values() {
        let k = CovMatern5Iso::new(1);
        assert::close(k.get(&dvector![0.2], &dvector![0.2]), 1.0, 1E-12);
        let z = 5.0_f64.sqrt();
        assert::close(
            k.get(&dvector![0.0], &dvector![1.0]),
            (1.0 + z + z * z / 3.0) * (-z).exp(),
            1E-12,
        );
    }

    #[test]
    fn matern3_gradient() {
        let mut k = CovMatern3Iso::new(2);
        k.set_loghyper(&[0.3, -0.6]).unwrap();
        let x1 = dvector![0.4, -0.9];
        let x2 = dvector![-0.7, 0.3];
        crate::test::assert_grad_close(&mut k, &x1, &x2);
    }

    #[test]
    fn matern5_gradient() {
        let mut k = CovMatern5Iso::new(2);
        k.set_loghyper(&[-0.2, 0.5]).unwrap();
        let x1 = dvector![1.1, 0.2];
        let x2 = dvector![0.3, -0.8];
        crate::test::assert_grad_close(&mut k, &x1, &x2);
    }
}
