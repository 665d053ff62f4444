//! Covariance functions.
//!
//! A covariance function (kernel) maps a pair of input vectors to a prior
//! covariance between the latent function values at those inputs. Atomic
//! kernels combine into arbitrarily nested trees through [`CovSum`],
//! [`CovProd`], and [`InputDimFilter`]; the [`factory`] module builds such
//! trees from textual expressions like `"CovSum(CovSEiso, CovNoise)"`.
//!
//! All hyperparameters are stored in log-space so gradient-based
//! optimization stays unconstrained. A linear-scale quantity `v` with
//! log-hyperparameter `θ` is `exp(θ)` for length scales and standard
//! deviations and `exp(2θ)` for variances; derived linear-scale values are
//! refreshed only inside [`Kernel::set_loghyper`].

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector};
use rand::RngCore;
use std::cmp::Ordering;
use std::fmt;

pub mod factory;

mod filter;
mod linear;
mod matern;
mod noise;
mod ops;
mod periodic;
mod rbf_cs;
mod rq_iso;
mod se_ard;
mod se_iso;

pub use self::filter::InputDimFilter;
pub use self::linear::{CovLinearArd, CovLinearOne};
pub use self::matern::{CovMatern3Iso, CovMatern5Iso};
pub use self::noise::CovNoise;
pub use self::ops::{CovProd, CovSum};
pub use self::periodic::{CovPeriodic, CovPeriodicMatern3Iso};
pub use self::rbf_cs::CovRBFCS;
pub use self::rq_iso::CovRQIso;
pub use self::se_ard::CovSEard;
pub use self::se_iso::CovSEiso;

/// Covariance function over pairs of input vectors.
///
/// The `Display` implementation is the canonical expression of the kernel
/// and re-parses through [`factory::create`] to an equivalent kernel.
pub trait Kernel: fmt::Debug + fmt::Display {
    /// Length of the input vectors the kernel consumes.
    fn input_dim(&self) -> usize;

    /// Number of log-hyperparameters.
    fn param_dim(&self) -> usize;

    /// Copy of the current log-hyperparameter vector.
    fn loghyper(&self) -> DVector<f64>;

    /// Overwrite the log-hyperparameters, refresh derived linear-scale
    /// values, and raise the dirty flag.
    ///
    /// Fails if `p` is not exactly [`param_dim`](Kernel::param_dim) long;
    /// the kernel is left unchanged in that case.
    fn set_loghyper(&mut self, p: &[f64]) -> Result<(), KernelError>;

    /// Whether the hyperparameters changed since the last
    /// [`clear_loghyper_changed`](Kernel::clear_loghyper_changed).
    ///
    /// The flag starts raised so a consumer always refreshes dependent
    /// caches on first use.
    fn loghyper_changed(&self) -> bool;

    /// Acknowledge the current hyperparameters after refreshing dependent
    /// caches.
    fn clear_loghyper_changed(&mut self);

    /// Kernel value `k(x1, x2)`.
    fn get(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> f64;

    /// Partial derivatives of [`get`](Kernel::get) with respect to each
    /// log-hyperparameter, written into `grad` (length
    /// [`param_dim`](Kernel::param_dim)).
    fn grad(&self, x1: &DVector<f64>, x2: &DVector<f64>, grad: &mut DVector<f64>);

    /// Draw one sample of the process at the given inputs, one row of `x`
    /// per point.
    ///
    /// Builds the lower triangle of the training covariance matrix,
    /// Cholesky-factors it, and applies the factor to a vector of
    /// independent standard-normal deviates from `rng`. Diagonal entries
    /// are evaluated against the same row object, so identity-based noise
    /// kernels contribute their variance to the diagonal.
    fn draw_random_sample(
        &self,
        rng: &mut dyn RngCore,
        x: &DMatrix<f64>,
    ) -> Result<DVector<f64>, KernelError> {
        let n = x.nrows();
        let rows: Vec<DVector<f64>> =
            (0..n).map(|i| x.row(i).transpose()).collect();

        let mut k = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..i {
                k[(i, j)] = self.get(&rows[i], &rows[j]);
            }
            let xi = &rows[i];
            k[(i, i)] = self.get(xi, xi);
        }

        let chol = Cholesky::new(k).ok_or(KernelError::NotPositiveDefinite)?;
        let mut z = DVector::zeros(n);
        for zi in z.iter_mut() {
            *zi = crate::utils::randn(&mut *rng);
        }
        Ok(chol.l() * z)
    }
}

/// Errors from configuring a covariance function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Too few hyperparameters supplied
    MissingParameters(usize),
    /// Too many hyperparameters supplied
    ExtraneousParameters(usize),
    /// A filtered input dimension beyond the input dimensionality
    InvalidFilterDimension {
        /// Index requested
        filter: usize,
        /// Dimensionality of the input vectors
        input_dim: usize,
    },
    /// The covariance matrix of the requested sample is not positive
    /// definite
    NotPositiveDefinite,
}

impl std::error::Error for KernelError {}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameters(n) => {
                write!(f, "missing {} hyperparameters", n)
            }
            Self::ExtraneousParameters(n) => {
                write!(f, "{} extraneous hyperparameters", n)
            }
            Self::InvalidFilterDimension { filter, input_dim } => write!(
                f,
                "filtered dimension {} is out of range for {}-dimensional inputs",
                filter, input_dim
            ),
            Self::NotPositiveDefinite => {
                write!(f, "covariance matrix is not positive definite")
            }
        }
    }
}

/// Check a hyperparameter slice against the expected length.
pub(crate) fn check_param_len(
    p: &[f64],
    expected: usize,
) -> Result<(), KernelError> {
    match p.len().cmp(&expected) {
        Ordering::Less => {
            Err(KernelError::MissingParameters(expected - p.len()))
        }
        Ordering::Greater => {
            Err(KernelError::ExtraneousParameters(p.len() - expected))
        }
        Ordering::Equal => Ok(()),
    }
}
