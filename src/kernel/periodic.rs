use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::f64::consts::PI;
use std::fmt;

/// Periodic covariance function
///
/// ```math
///     k(x, x') = σ² exp(-2 sin²(π ‖x - x'‖ / T) / ℓ²)
/// ```
///
/// # Log-hyperparameters
/// * `ln ℓ` - length scale within one period
/// * `ln σ` - signal standard deviation
/// * `ln T` - period
#[derive(Clone, Debug)]
pub struct CovPeriodic {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: f64,
    sf2: f64,
    t: f64,
}

impl CovPeriodic {
    /// Create a new periodic kernel with unit length scale, unit signal
    /// variance, and unit period.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(3),
            loghyper_changed: true,
            ell: 1.0,
            sf2: 1.0,
            t: 1.0,
        }
    }
}

impl fmt::Display for CovPeriodic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovPeriodic")
    }
}

impl Kernel for CovPeriodic {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        3
    }

    fn loghyper(&self) -> DVector<f64> {
        self.loghyper.clone()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        check_param_len(p, 3)?;
        self.loghyper.copy_from_slice(p);
        self.ell = p[0].exp();
        self.sf2 = (2.0 * p[1]).exp();
        self.t = p[2].exp();
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
        let u = PI * (x1 - x2).norm() / self.t;
        let s = u.sin() / self.ell;
        self.sf2 * (-2.0 * s * s).exp()
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let u = PI * (x1 - x2).norm() / self.t;
        let s = u.sin() / self.ell;
        let k = self.sf2 * (-2.0 * s * s).exp();
        grad[0] = 4.0 * k * s * s;
        grad[1] = 2.0 * k;
        grad[2] = 4.0 * k * s * u.cos() * u / self.ell;
    }
}

/// Periodic Matérn-3/2 covariance function
///
/// ```math
///     k(x, x') = σ² (1 + s) exp(-s),
///     s = √3 |sin(π ‖x - x'‖ / T)| / ℓ
/// ```
///
/// A periodic warp of the Matérn-3/2 kernel: rougher sample paths than
/// [`CovPeriodic`] with the same periodic structure.
///
/// # Log-hyperparameters
/// * `ln ℓ` - length scale within one period
/// * `ln σ` - signal standard deviation
/// * `ln T` - period
#[derive(Clone, Debug)]
pub struct CovPeriodicMatern3Iso {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: f64,
    sf2: f64,
    t: f64,
}

impl CovPeriodicMatern3Iso {
    /// Create a new periodic Matérn kernel with unit length scale, unit
    /// signal variance, and unit period.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(3),
            loghyper_changed: true,
            ell: 1.0,
            sf2: 1.0,
            t: 1.0,
        }
    }
}

impl fmt::Display for CovPeriodicMatern3Iso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovPeriodicMatern3iso")
    }
}

impl Kernel for CovPeriodicMatern3Iso {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        3
    }

    fn loghyper(&self) -> DVector<f64> {
        self.loghyper.clone()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        check_param_len(p, 3)?;
        self.loghyper.copy_from_slice(p);
        self.ell = p[0].exp();
        self.sf2 = (2.0 * p[1]).exp();
        self.t = p[2].exp();
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
        let u = PI * (x1 - x2).norm() / self.t;
        let s = 3.0_f64.sqrt() * (u.sin() / self.ell).abs();
        self.sf2 * (1.0 + s) * (-s).exp()
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let sqrt3 = 3.0_f64.sqrt();
        let u = PI * (x1 - x2).norm() / self.t;
        let sin_u = u.sin();
        let s = sqrt3 * (sin_u / self.ell).abs();
        let e = (-s).exp();
        let sgn = if sin_u >= 0.0 { 1.0 } else { -1.0 };
        grad[0] = self.sf2 * s * s * e;
        grad[1] = 2.0 * self.sf2 * (1.0 + s) * e;
        grad[2] = self.sf2 * e * s * sqrt3 * u * u.cos() * sgn / self.ell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn periodic_repeats_at_the_period() {
        let mut k = CovPeriodic::new(1);
        k.set_loghyper(&[0.0, 0.0, 0.5_f64.ln()]).unwrap();
        let a = k.get(&dvector![0.0], &dvector![0.2]);
        let b = k.get(&dvector![0.0], &dvector![0.7]);
        assert::close(a, b, 1E-10);
        assert::close(k.get(&dvector![0.0], &dvector![0.5]), 1.0, 1E-10);
    }

    #[test]
    fn periodic_gradient() {
        let mut k = CovPeriodic::new(2);
        k.set_loghyper(&[0.2, -0.4, 0.3]).unwrap();
        let x1 = dvector![0.35, -0.6];
        let x2 = dvector![-0.2, 0.45];
        crate::test::assert_grad_close(&mut k, &x1, &x2);
    }

    #[test]
    fn periodic_matern_repeats_at_the_period() {
        let mut k = CovPeriodicMatern3Iso::new(1);
        k.set_loghyper(&[0.0, 0.0, 0.5_f64.ln()]).unwrap();
        let a = k.get(&dvector![0.0], &dvector![0.1]);
        let b = k.get(&dvector![0.0], &dvector![0.6]);
        assert::close(a, b, 1E-10);
    }

    #[test]
    fn periodic_matern_gradient() {
        let mut k = CovPeriodicMatern3Iso::new(2);
        k.set_loghyper(&[0.3, 0.1, 0.4]).unwrap();
        let x1 = dvector![0.25, -0.7];
        let x2 = dvector![-0.45, 0.3];
        crate::test::assert_grad_close(&mut k, &x1, &x2);
    }
}
