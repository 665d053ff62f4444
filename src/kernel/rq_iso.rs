use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::fmt;

/// Isotropic rational quadratic covariance function
///
/// ```math
///     k(x, x') = σ² (1 + z / (2α))^{-α},   z = ‖x - x'‖² / ℓ²
/// ```
///
/// Equivalent to a scale mixture of squared exponentials; `α → ∞` recovers
/// the squared exponential.
///
/// # Log-hyperparameters
/// * `ln ℓ` - characteristic length scale
/// * `ln σ` - signal standard deviation
/// * `ln α` - shape of the length-scale mixture
#[derive(Clone, Debug)]
pub struct CovRQIso {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: f64,
    sf2: f64,
    alpha: f64,
}

impl CovRQIso {
    /// Create a new rational quadratic kernel with all linear-scale
    /// parameters at one.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(3),
            loghyper_changed: true,
            ell: 1.0,
            sf2: 1.0,
            alpha: 1.0,
        }
    }
}

impl fmt::Display for CovRQIso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovRQiso")
    }
}

impl Kernel for CovRQIso {
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
        self.alpha = p[2].exp();
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
        let z = ((x1 - x2) / self.ell).norm_squared();
        self.sf2 * (1.0 + 0.5 * z / self.alpha).powf(-self.alpha)
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let z = ((x1 - x2) / self.ell).norm_squared();
        let c = 1.0 + 0.5 * z / self.alpha;
        let k = self.sf2 * c.powf(-self.alpha);
        grad[0] = self.sf2 * z * c.powf(-self.alpha - 1.0);
        grad[1] = 2.0 * k;
        grad[2] = k * (0.5 * z / c - self.alpha * c.ln());
    }
}
