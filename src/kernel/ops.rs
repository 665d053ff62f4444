use super::{check_param_len, Kernel, KernelError};
use nalgebra::DVector;
use std::fmt;

/// Covariance function representing the sum of two others
///
/// The hyperparameter vector is the concatenation of the children's
/// vectors, first child first.
#[derive(Debug)]
pub struct CovSum {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    first: Box<dyn Kernel>,
    second: Box<dyn Kernel>,
    param_dim_first: usize,
    param_dim_second: usize,
}

impl CovSum {
    /// Combine two kernels into their sum.
    pub fn new(
        input_dim: usize,
        first: Box<dyn Kernel>,
        second: Box<dyn Kernel>,
    ) -> Self {
        let param_dim_first = first.param_dim();
        let param_dim_second = second.param_dim();
        let mut loghyper = DVector::zeros(param_dim_first + param_dim_second);
        loghyper
            .rows_mut(0, param_dim_first)
            .copy_from(&first.loghyper());
        loghyper
            .rows_mut(param_dim_first, param_dim_second)
            .copy_from(&second.loghyper());
        Self {
            input_dim,
            loghyper,
            loghyper_changed: true,
            first,
            second,
            param_dim_first,
            param_dim_second,
        }
    }
}

impl fmt::Display for CovSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovSum({}, {})", self.first, self.second)
    }
}

impl Kernel for CovSum {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        self.param_dim_first + self.param_dim_second
    }

    fn loghyper(&self) -> DVector<f64> {
        self.loghyper.clone()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        check_param_len(p, self.param_dim())?;
        let (head, tail) = p.split_at(self.param_dim_first);
        self.first.set_loghyper(head)?;
        self.second.set_loghyper(tail)?;
        self.loghyper.copy_from_slice(p);
        self.loghyper_changed = true;
        Ok(())
    }

    fn loghyper_changed(&self) -> bool {
        self.loghyper_changed
            || self.first.loghyper_changed()
            || self.second.loghyper_changed()
    }

    fn clear_loghyper_changed(&mut self) {
        self.loghyper_changed = false;
        self.first.clear_loghyper_changed();
        self.second.clear_loghyper_changed();
    }

    fn get(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> f64 {
        self.first.get(x1, x2) + self.second.get(x1, x2)
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let mut grad_first = DVector::zeros(self.param_dim_first);
        let mut grad_second = DVector::zeros(self.param_dim_second);
        self.first.grad(x1, x2, &mut grad_first);
        self.second.grad(x1, x2, &mut grad_second);
        grad.rows_mut(0, self.param_dim_first).copy_from(&grad_first);
        grad.rows_mut(self.param_dim_first, self.param_dim_second)
            .copy_from(&grad_second);
    }
}

/// Covariance function representing the product of two others
///
/// The gradient of each child's block carries the other child's value
/// (product rule).
#[derive(Debug)]
pub struct CovProd {
    input_dim: usize,
    loghyper: DVector<f64>,
    loghyper_changed: bool,
    first: Box<dyn Kernel>,
    second: Box<dyn Kernel>,
    param_dim_first: usize,
    param_dim_second: usize,
}

impl CovProd {
    /// Combine two kernels into their product.
    pub fn new(
        input_dim: usize,
        first: Box<dyn Kernel>,
        second: Box<dyn Kernel>,
    ) -> Self {
        let param_dim_first = first.param_dim();
        let param_dim_second = second.param_dim();
        let mut loghyper = DVector::zeros(param_dim_first + param_dim_second);
        loghyper
            .rows_mut(0, param_dim_first)
            .copy_from(&first.loghyper());
        loghyper
            .rows_mut(param_dim_first, param_dim_second)
            .copy_from(&second.loghyper());
        Self {
            input_dim,
            loghyper,
            loghyper_changed: true,
            first,
            second,
            param_dim_first,
            param_dim_second,
        }
    }
}

impl fmt::Display for CovProd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CovProd({}, {})", self.first, self.second)
    }
}

impl Kernel for CovProd {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn param_dim(&self) -> usize {
        self.param_dim_first + self.param_dim_second
    }

    fn loghyper(&self) -> DVector<f64> {
        self.loghyper.clone()
    }

    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError> {
        check_param_len(p, self.param_dim())?;
        let (head, tail) = p.split_at(self.param_dim_first);
        self.first.set_loghyper(head)?;
        self.second.set_loghyper(tail)?;
        self.loghyper.copy_from_slice(p);
        self.loghyper_changed = true;
        Ok(())
    }

    fn loghyper_changed(&self) -> bool {
        self.loghyper_changed
            || self.first.loghyper_changed()
            || self.second.loghyper_changed()
    }

    fn clear_loghyper_changed(&mut self) {
        self.loghyper_changed = false;
        self.first.clear_loghyper_changed();
        self.second.clear_loghyper_changed();
    }

    fn get(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> f64 {
        self.first.get(x1, x2) * self.second.get(x1, x2)
    }

    fn grad(
        &self,
        x1: &DVector<f64>,
        x2: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) {
        let mut grad_first = DVector::zeros(self.param_dim_first);
        let mut grad_second = DVector::zeros(self.param_dim_second);
        self.first.grad(x1, x2, &mut grad_first);
        self.second.grad(x1, x2, &mut grad_second);
        grad.rows_mut(0, self.param_dim_first)
            .copy_from(&(grad_first * self.second.get(x1, x2)));
        grad.rows_mut(self.param_dim_first, self.param_dim_second)
            .copy_from(&(grad_second * self.first.get(x1, x2)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{factory, CovNoise, CovSEiso};
    use nalgebra::dvector;

    #[test]
    fn sum_adds_values_and_concatenates_gradients() {
        let mut k = CovSum::new(
            2,
            Box::new(CovSEiso::new(2)),
            Box::new(CovNoise::new(2)),
        );
        k.set_loghyper(&[0.0, 0.0, -1.0]).unwrap();
        assert_eq!(k.param_dim(), 3);

        let x = dvector![0.3, -0.5];
        let y = dvector![1.0, 0.4];

        // off the diagonal the noise term vanishes
        let se = CovSEiso::new(2);
        assert::close(k.get(&x, &y), se.get(&x, &y), 1E-12);
        // on the diagonal (same object) it contributes exp(-2)
        assert::close(
            k.get(&x, &x),
            1.0 + (-2.0_f64).exp(),
            1E-12,
        );

        crate::test::assert_grad_close(&mut k, &x, &y);
        crate::test::assert_grad_close(&mut k, &x, &x);
    }

    #[test]
    fn product_applies_the_product_rule() {
        use crate::kernel::CovLinearOne;

        // unequal parameter blocks: 2 for the SE part, 1 for the linear part
        let mut k = CovProd::new(
            2,
            Box::new(CovSEiso::new(2)),
            Box::new(CovLinearOne::new(2)),
        );
        k.set_loghyper(&[0.3, -0.2, 0.5]).unwrap();

        let x = dvector![0.4, -0.9];
        let y = dvector![-0.3, 0.7];

        let se = {
            let mut se = CovSEiso::new(2);
            se.set_loghyper(&[0.3, -0.2]).unwrap();
            se
        };
        let lin = {
            let mut lin = CovLinearOne::new(2);
            lin.set_loghyper(&[0.5]).unwrap();
            lin
        };
        assert::close(k.get(&x, &y), se.get(&x, &y) * lin.get(&x, &y), 1E-12);

        crate::test::assert_grad_close(&mut k, &x, &y);
    }

    #[test]
    fn nested_compounds_round_trip() {
        let k = CovSum::new(
            3,
            Box::new(CovProd::new(
                3,
                Box::new(CovSEiso::new(3)),
                Box::new(CovNoise::new(3)),
            )),
            Box::new(CovNoise::new(3)),
        );
        assert_eq!(k.to_string(), "CovSum(CovProd(CovSEiso, CovNoise), CovNoise)");

        let parsed = factory::create(3, &k.to_string()).unwrap();
        assert_eq!(parsed.param_dim(), k.param_dim());
        assert_eq!(parsed.to_string(), k.to_string());
    }

    #[test]
    fn compound_forwards_hyperparameter_split() {
        let mut k = CovSum::new(
            1,
            Box::new(CovSEiso::new(1)),
            Box::new(CovNoise::new(1)),
        );
        k.set_loghyper(&[0.25, -0.5, -2.0]).unwrap();
        assert_eq!(k.loghyper().as_slice(), &[0.25, -0.5, -2.0]);

        // the noise block landed on the second child
        let x = dvector![0.0];
        assert::close(k.get(&x, &x), (-1.0_f64).exp() + (-4.0_f64).exp(), 1E-12);

        // wrong lengths are rejected wholesale
        assert!(k.set_loghyper(&[0.0, 0.0]).is_err());
        assert!(k.set_loghyper(&[0.0, 0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn dirty_flag_covers_the_whole_tree() {
        let mut k = CovSum::new(
            1,
            Box::new(CovSEiso::new(1)),
            Box::new(CovNoise::new(1)),
        );
        assert!(k.loghyper_changed());
        k.clear_loghyper_changed();
        assert!(!k.loghyper_changed());
        k.set_loghyper(&[0.0, 0.0, 0.0]).unwrap();
        assert!(k.loghyper_changed());
    }
}
