use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::fmt;

/// Isotropic squared exponential covariance function
///
/// ```math
///     k(x, x') = σ² exp(-‖x - x'‖² / (2ℓ²))
/// ```
///
/// # Log-hyperparameters
/// * `ln ℓ` - characteristic length scale
/// * `ln σ` - signal standard deviation
#[derive(Clone, Debug)]
pub struct CovSEiso {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: f64,
    sf2: f64,
}

impl CovSEiso {
    /// Create a new squared exponential kernel with unit length scale and
    /// unit signal variance.
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
        ((x1 - x2) / self.ell).norm_squared()
    }
}

impl fmt::Display for CovSEiso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovSEiso")
    }
}

impl Kernel for CovSEiso {
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
        self.sf2 * (-0.5 * self.z(x1, x2)).exp()
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let z = self.z(x1, x2);
        let k = self.sf2 * (-0.5 * z).exp();
        grad[0] = k * z;
        grad[1] = 2.0 * k;
    }
}
