use super::{Kernel, KernelError};
use nalgebra::{dvector, DVector};
use std::fmt;

/// Covariance function restricted to a single input dimension
///
/// Projects both input vectors onto one coordinate before delegating to the
/// nested kernel, so structure along different axes can be modelled with
/// different kernels and combined through [`CovSum`](super::CovSum) or
/// [`CovProd`](super::CovProd). The nested kernel consumes one-dimensional
/// inputs; its hyperparameters are exposed unchanged.
#[derive(Debug)]
pub struct InputDimFilter {
    input_dim: usize,
    filter: usize,
    nested: Box<dyn Kernel>,
}

impl InputDimFilter {
    /// Restrict `nested` to coordinate `filter` of `input_dim`-dimensional
    /// inputs. Fails if `filter` is out of range.
    pub fn new(
        input_dim: usize,
        filter: usize,
        nested: Box<dyn Kernel>,
    ) -> Result<Self, KernelError> {
        if filter >= input_dim {
            return Err(KernelError::InvalidFilterDimension {
                filter,
                input_dim,
            });
        }
        Ok(Self {
            input_dim,
            filter,
            nested,
        })
    }

    fn project(&self, x: &DVector<f64>) -> DVector<f64> {
        dvector![x[self.filter]]
    }
}

impl fmt::Display for InputDimFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputDimFilter({}/{})", self.filter, self.nested)
    }
}

impl Kernel for InputDimFilter {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        self.nested.param_dim()
    }

    fn loghyper(&self) -> DVector<f64> {
        self.nested.loghyper()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        self.nested.set_loghyper(p)
    }

    fn loghyper_changed(&self) -> bool {
        self.nested.loghyper_changed()
    }

    fn clear_loghyper_changed(&mut self) {
        self.nested.clear_loghyper_changed();
    }

    fn get(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> f64 {
        let a = self.project(x1);
        if std::ptr::eq(x1, x2) {
            // keep object identity visible to identity-based kernels
            self.nested.get(&a, &a)
        } else {
            self.nested.get(&a, &self.project(x2))
        }
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let a = self.project(x1);
        if std::ptr::eq(x1, x2) {
            self.nested.grad(&a, &a, grad);
        } else {
            self.nested.grad(&a, &self.project(x2), grad);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{factory, CovNoise, CovSEiso};

    #[test]
    fn projects_to_one_dimension() {
        let mut k =
            InputDimFilter::new(3, 1, Box::new(CovSEiso::new(1))).unwrap();
        k.set_loghyper(&[0.0, 0.0]).unwrap();

        // only coordinate 1 matters
        let x1 = dvector![9.0, 0.5, -4.0];
        let x2 = dvector![-2.0, 0.5, 7.0];
        assert::close(k.get(&x1, &x2), 1.0, 1E-12);

        let x3 = dvector![9.0, 1.5, -4.0];
        assert::close(k.get(&x1, &x3), (-0.5_f64).exp(), 1E-12);
    }

    #[test]
    fn rejects_out_of_range_dimension() {
        let err = InputDimFilter::new(2, 2, Box::new(CovSEiso::new(1)))
            .unwrap_err();
        assert_eq!(
            err,
            KernelError::InvalidFilterDimension {
                filter: 2,
                input_dim: 2
            }
        );
    }

    #[test]
    fn preserves_object_identity_for_noise() {
        let k =
            InputDimFilter::new(2, 0, Box::new(CovNoise::new(1))).unwrap();
        let x = dvector![0.3, 0.4];
        let y = dvector![0.3, 0.4];
        assert::close(k.get(&x, &x), 1.0, 1E-12);
        assert::close(k.get(&x, &y), 0.0, 1E-12);
    }

    #[test]
    fn gradient_and_round_trip() {
        let mut k =
            InputDimFilter::new(3, 2, Box::new(CovSEiso::new(1))).unwrap();
        k.set_loghyper(&[0.4, -0.1]).unwrap();

        let x1 = dvector![0.0, 1.0, 0.3];
        let x2 = dvector![5.0, -2.0, 0.9];
        crate::test::assert_grad_close(&mut k, &x1, &x2);

        assert_eq!(k.to_string(), "InputDimFilter(2/CovSEiso)");
        let parsed = factory::create(3, &k.to_string()).unwrap();
        assert_eq!(parsed.to_string(), k.to_string());
        assert_eq!(parsed.param_dim(), 2);
    }
}
