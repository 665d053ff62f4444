//! Shared test utilities.

use crate::kernel::Kernel;
use nalgebra::DVector;

/// Assert that the analytic gradient of `k` at its current hyperparameters
/// matches a centered finite difference of `get` within 1e-5 relative or
/// 1e-6 absolute tolerance.
pub fn assert_grad_close(
    k: &mut dyn Kernel,
    x1: &DVector<f64>,
    x2: &DVector<f64>,
) {
    const STEP: f64 = 1E-5;

    let theta = k.loghyper();
    let mut analytic = DVector::zeros(k.param_dim());
    k.grad(x1, x2, &mut analytic);

    for i in 0..k.param_dim() {
        let mut th = theta.clone();
        th[i] = theta[i] - STEP;
        k.set_loghyper(th.as_slice()).unwrap();
        let lo = k.get(x1, x2);
        th[i] = theta[i] + STEP;
        k.set_loghyper(th.as_slice()).unwrap();
        let hi = k.get(x1, x2);

        let fd = (hi - lo) / (2.0 * STEP);
        let tol = 1E-6_f64.max(1E-5 * analytic[i].abs().max(fd.abs()));
        assert!(
            (fd - analytic[i]).abs() <= tol,
            "{}: d/dtheta[{}] analytic {} vs finite difference {}",
            k,
            i,
            analytic[i],
            fd
        );
    }

    k.set_loghyper(theta.as_slice()).unwrap();
}
