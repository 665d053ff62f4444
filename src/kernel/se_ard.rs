use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::fmt;

/// Squared exponential covariance function with automatic relevance
/// determination
///
/// ```math
///     k(x, x') = σ² exp(-½ (x - x')ᵗ Λ⁻¹ (x - x'))
/// ```
///
/// with `Λ = diag(ℓ₁², …, ℓ_d²)` holding one characteristic length scale
/// per input dimension.
///
/// # Log-hyperparameters
/// * `ln ℓ₁ … ln ℓ_d` - per-dimension length scales
/// * `ln σ` - signal standard deviation
#[derive(Clone, Debug)]
pub struct CovSEard {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    ell: DVector<f64>,
    sf2: f64,
}

impl CovSEard {
    /// Create a new ARD kernel with unit length scales and unit signal
    /// variance.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            loghyper: DVector::zeros(input_dim + 1),
            loghyper_changed: true,
            ell: DVector::from_element(input_dim, 1.0),
            sf2: 1.0,
        }
    }
}

impl fmt::Display for CovSEard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovSEard")
    }
}

impl Kernel for CovSEard {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        self.input_dim + 1
    }

    fn loghyper(&self) -> DVector<f64> {
        self.loghyper.clone()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        check_param_len(p, self.input_dim + 1)?;
        self.loghyper.copy_from_slice(p);
        for i in 0..self.input_dim {
            self.ell[i] = p[i].exp();
        }
        self.sf2 = (2.0 * p[self.input_dim]).exp();
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
        let z = (x1 - x2).component_div(&self.ell).norm_squared();
        self.sf2 * (-0.5 * z).exp()
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let z = (x1 - x2).component_div(&self.ell).map(|v| v * v);
        let k = self.sf2 * (-0.5 * z.sum()).exp();
        for i in 0..self.input_dim {
            grad[i] = z[i] * k;
        }
        grad[self.input_dim] = 2.0 * k;
    }
}
