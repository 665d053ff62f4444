//! Gaussian process regression with composable covariance functions.
//!
//! A Gaussian process models an unknown function as a distribution over
//! functions, fully determined by a covariance function (kernel). This crate
//! provides
//!
//! - a [`Kernel`](kernel::Kernel) trait with atomic variants (squared
//!   exponential, Matérn, rational quadratic, linear, periodic, white noise)
//!   and compound variants ([`CovSum`](kernel::CovSum),
//!   [`CovProd`](kernel::CovProd), [`InputDimFilter`](kernel::InputDimFilter))
//!   that nest arbitrarily,
//! - a textual [factory](kernel::factory) so kernels round-trip through
//!   expressions like `"CovSum(CovSEiso, CovNoise)"`,
//! - a [`GaussianProcess`](gp::GaussianProcess) engine that maintains the
//!   Cholesky factor of the training covariance incrementally and exposes
//!   predictive mean, predictive variance, the marginal log-likelihood, and
//!   its gradient with respect to the log-hyperparameters,
//! - two hyperparameter optimizers, [`RProp`](optimize::RProp) and
//!   [`ConjugateGradient`](optimize::ConjugateGradient), that maximize the
//!   marginal likelihood.
//!
//! All hyperparameters live in log-space so optimization is unconstrained.
//!
//! ```
//! use gpr::prelude::*;
//!
//! # fn main() -> Result<(), gpr::gp::Error> {
//! let mut gp = GaussianProcess::new(1, "CovSum(CovSEiso, CovNoise)")?;
//! gp.set_loghyper(&[0.0, 0.0, -2.3])?;
//!
//! for i in 0..20 {
//!     let x = f64::from(i) * 0.1;
//!     gp.add_pattern(&[x], x.sin())?;
//! }
//!
//! let mean = gp.f(&[0.55])?;
//! let var = gp.var(&[0.55])?;
//! assert!((mean - 0.55_f64.sin()).abs() < 0.1);
//! assert!(var > 0.0);
//! # Ok(())
//! # }
//! ```

pub mod consts;
pub mod gp;
pub mod kernel;
pub mod optimize;
pub mod prelude;
pub mod sample_set;
pub mod utils;

#[cfg(test)]
mod test;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
