use crate::gp::GaussianProcess;
use crate::utils::sign;
use nalgebra::DVector;

/// Resilient-propagation ascent on the marginal log-likelihood.
///
/// Each hyperparameter keeps its own step size. When the gradient sign of
/// a coordinate agrees with the previous iteration the step accelerates by
/// `eta_plus`; on a sign flip it shrinks by `eta_minus` and that
/// coordinate sits the iteration out. Steps move against the gradient of
/// the *negated* likelihood, i.e. uphill.
///
/// A global stepsize factor starts at one, scales every step, and halves
/// whenever an iteration fails to improve the best likelihood seen so far;
/// the run stops early when the factor sinks below
/// [`with_stepsize_floor`](RProp::with_stepsize_floor) or the gradient
/// norm falls below [`with_eps_stop`](RProp::with_eps_stop). The kernel is
/// left at the best point seen, not necessarily the final iterate.
#[derive(Debug, Clone)]
pub struct RProp {
    delta0: f64,
    delta_min: f64,
    delta_max: f64,
    eta_minus: f64,
    eta_plus: f64,
    eps_stop: f64,
    stepsize_floor: f64,
}

impl Default for RProp {
    fn default() -> Self {
        Self {
            delta0: 0.1,
            delta_min: 1E-6,
            delta_max: 50.0,
            eta_minus: 0.5,
            eta_plus: 1.2,
            eps_stop: 0.0,
            stepsize_floor: 1E-3,
        }
    }
}

impl RProp {
    /// Optimizer with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial, minimum, and maximum per-coordinate step sizes.
    pub fn with_step_sizes(
        mut self,
        delta0: f64,
        delta_min: f64,
        delta_max: f64,
    ) -> Self {
        self.delta0 = delta0;
        self.delta_min = delta_min;
        self.delta_max = delta_max;
        self
    }

    /// Deceleration and acceleration factors.
    pub fn with_eta(mut self, eta_minus: f64, eta_plus: f64) -> Self {
        self.eta_minus = eta_minus;
        self.eta_plus = eta_plus;
        self
    }

    /// Stop once the gradient norm falls below this tolerance.
    pub fn with_eps_stop(mut self, eps_stop: f64) -> Self {
        self.eps_stop = eps_stop;
        self
    }

    /// Stop once the halving stepsize factor falls below this floor.
    pub fn with_stepsize_floor(mut self, stepsize_floor: f64) -> Self {
        self.stepsize_floor = stepsize_floor;
        self
    }

    /// Run at most `max_iter` iterations, mutating the engine's
    /// hyperparameters. Returns the best log-likelihood seen.
    pub fn maximize(
        &self,
        gp: &mut GaussianProcess,
        max_iter: usize,
    ) -> f64 {
        let dim = gp.param_dim();
        let mut delta = DVector::from_element(dim, self.delta0);
        let mut grad_old: DVector<f64> = DVector::zeros(dim);
        let mut params = gp.loghyper();
        let mut best_params = params.clone();
        let mut best = gp.log_likelihood().unwrap_or(f64::NEG_INFINITY);
        let mut stepsize = 1.0;

        for iter in 0..max_iter {
            let mut grad = match gp.log_likelihood_gradient() {
                Ok(g) => -g,
                Err(_) => break,
            };
            let agreement = grad_old.component_mul(&grad);
            for j in 0..dim {
                if agreement[j] > 0.0 {
                    delta[j] = (delta[j] * self.eta_plus).min(self.delta_max);
                } else if agreement[j] < 0.0 {
                    delta[j] =
                        (delta[j] * self.eta_minus).max(self.delta_min);
                    grad[j] = 0.0;
                }
                params[j] -= sign(grad[j]) * delta[j] * stepsize;
            }
            grad_old = grad;
            if grad_old.norm() < self.eps_stop {
                break;
            }
            gp.set_loghyper(params.as_slice())
                .expect("parameter count is fixed");
            let lik = gp.log_likelihood().unwrap_or(f64::NEG_INFINITY);
            log::debug!("rprop iteration {}: nll {}", iter, -lik);
            if lik > best {
                best = lik;
                best_params.copy_from(&params);
            } else {
                stepsize *= 0.5;
                if stepsize < self.stepsize_floor {
                    break;
                }
            }
        }

        gp.set_loghyper(best_params.as_slice())
            .expect("parameter count is fixed");
        best
    }
}
