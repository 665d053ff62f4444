//! Gaussian process regression engine.

use crate::consts::HALF_LN_2PI;
use crate::kernel::factory::{self, ParseError};
use crate::kernel::{Kernel, KernelError};
use crate::sample_set::{OutOfRange, SampleSet};
use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Errors from the regression engine.
#[derive(Debug)]
pub enum Error {
    /// An input or parameter vector of the wrong length
    DimensionMismatch {
        /// Length required by the engine
        expected: usize,
        /// Length supplied by the caller
        given: usize,
    },
    /// The training covariance matrix is not positive definite
    NotPositiveDefinite,
    /// Sample index past the end of the training set
    OutOfRange(OutOfRange),
    /// Invalid kernel configuration
    Kernel(KernelError),
    /// Malformed kernel expression
    Parse(ParseError),
    /// Malformed model file
    ModelFormat {
        /// One-based line number, 0 when the file ended prematurely
        line: usize,
        /// What went wrong
        reason: String,
    },
    /// Underlying I/O failure
    Io(std::io::Error),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { expected, given } => write!(
                f,
                "expected a vector of length {}, got {}",
                expected, given
            ),
            Self::NotPositiveDefinite => write!(
                f,
                "training covariance matrix is not positive definite"
            ),
            Self::OutOfRange(e) => write!(f, "{}", e),
            Self::Kernel(e) => write!(f, "{}", e),
            Self::Parse(e) => write!(f, "{}", e),
            Self::ModelFormat { line, reason } => {
                write!(f, "malformed model file (line {}): {}", line, reason)
            }
            Self::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl From<KernelError> for Error {
    fn from(e: KernelError) -> Self {
        Self::Kernel(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<OutOfRange> for Error {
    fn from(e: OutOfRange) -> Self {
        Self::OutOfRange(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Gaussian process regression.
///
/// The engine owns a covariance function and a [`SampleSet`] and keeps two
/// caches: the lower-triangular Cholesky factor `L` of the training
/// covariance matrix and the solve vector `α = K⁻¹y`. Both refresh lazily.
/// Changing hyperparameters raises the kernel's dirty flag and forces a
/// full O(n³) refactorization on next use; appending a single pattern with
/// clean hyperparameters extends the factor by one row in O(n²); changing
/// a target invalidates only `α`.
///
/// A non-positive-definite training covariance surfaces as
/// [`Error::NotPositiveDefinite`]. The engine never regularizes on its
/// own; adding a [`CovNoise`](crate::kernel::CovNoise) term (or jitter in
/// the caller's targets) is the caller's decision.
#[derive(Debug)]
pub struct GaussianProcess {
    cf: Box<dyn Kernel>,
    sampleset: SampleSet,
    l: DMatrix<f64>,
    alpha: DVector<f64>,
    alpha_needs_update: bool,
}

impl GaussianProcess {
    /// Create an engine for `input_dim`-dimensional inputs from a kernel
    /// expression, e.g. `"CovSum(CovSEiso, CovNoise)"`.
    pub fn new(input_dim: usize, covf_def: &str) -> Result<Self, Error> {
        let cf = factory::create(input_dim, covf_def)?;
        Ok(Self::with_kernel(cf))
    }

    /// Wrap an already-built kernel.
    pub fn with_kernel(cf: Box<dyn Kernel>) -> Self {
        let input_dim = cf.input_dim();
        Self {
            cf,
            sampleset: SampleSet::new(input_dim),
            l: DMatrix::zeros(0, 0),
            alpha: DVector::zeros(0),
            alpha_needs_update: true,
        }
    }

    /// Append one training pattern.
    ///
    /// With clean hyperparameters the factor is extended incrementally in
    /// O(n²); otherwise the pending full refactorization runs first.
    pub fn add_pattern(&mut self, x: &[f64], y: f64) -> Result<(), Error> {
        self.check_dim(x.len())?;
        self.add_pattern_vec(DVector::from_column_slice(x), y)
    }

    /// Append a batch of patterns, one row of `x` per pattern.
    pub fn add_patterns(
        &mut self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
    ) -> Result<(), Error> {
        self.check_dim(x.ncols())?;
        if x.nrows() != y.len() {
            return Err(Error::DimensionMismatch {
                expected: x.nrows(),
                given: y.len(),
            });
        }
        for i in 0..x.nrows() {
            self.add_pattern_vec(x.row(i).transpose(), y[i])?;
        }
        Ok(())
    }

    fn add_pattern_vec(
        &mut self,
        x: DVector<f64>,
        y: f64,
    ) -> Result<(), Error> {
        let n = self.sampleset.size();
        self.sampleset.add(x, y);
        // the solve vector is stale from here on, even if the factor
        // update below fails and leaves the engine in an error state
        self.alpha_needs_update = true;
        if n == 0 {
            self.grow(1);
            let kappa = {
                let x0 = self.sampleset.x(0);
                self.cf.get(x0, x0)
            };
            if !(kappa > 0.0) {
                return Err(Error::NotPositiveDefinite);
            }
            self.l[(0, 0)] = kappa.sqrt();
            // a 1×1 factorization is already complete
            self.cf.clear_loghyper_changed();
            Ok(())
        } else if self.cf.loghyper_changed() {
            self.compute()
        } else {
            self.extend_factor(n)
        }
    }

    /// One-point extension of the factor: solve L·k = k*, append k as the
    /// new row, and close with √(κ - kᵗk) on the diagonal.
    fn extend_factor(&mut self, n: usize) -> Result<(), Error> {
        let mut k = DVector::zeros(n);
        for i in 0..n {
            k[i] = self.cf.get(self.sampleset.x(i), self.sampleset.x(n));
        }
        let kappa = {
            let xn = self.sampleset.x(n);
            self.cf.get(xn, xn)
        };
        self.grow(n + 1);
        if !self
            .l
            .view((0, 0), (n, n))
            .solve_lower_triangular_mut(&mut k)
        {
            return Err(Error::NotPositiveDefinite);
        }
        let diag2 = kappa - k.dot(&k);
        if !(diag2 > 0.0) {
            return Err(Error::NotPositiveDefinite);
        }
        for j in 0..n {
            self.l[(n, j)] = k[j];
        }
        self.l[(n, n)] = diag2.sqrt();
        Ok(())
    }

    /// Refactorize the training covariance if hyperparameters changed.
    /// Cheap to call speculatively: a clean kernel makes this a no-op.
    pub fn compute(&mut self) -> Result<(), Error> {
        if !self.cf.loghyper_changed() {
            return Ok(());
        }
        let n = self.sampleset.size();
        if n == 0 {
            self.cf.clear_loghyper_changed();
            self.alpha_needs_update = true;
            return Ok(());
        }
        self.grow(n);
        log::trace!("factorizing the {}x{} training covariance", n, n);
        let mut k = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                k[(i, j)] =
                    self.cf.get(self.sampleset.x(i), self.sampleset.x(j));
            }
        }
        let chol = Cholesky::new(k).ok_or(Error::NotPositiveDefinite)?;
        self.l.view_mut((0, 0), (n, n)).copy_from(chol.l_dirty());
        // the flag clears only on success so a failed factorization retries
        self.cf.clear_loghyper_changed();
        self.alpha_needs_update = true;
        Ok(())
    }

    fn update_alpha(&mut self) -> Result<(), Error> {
        if !self.alpha_needs_update {
            return Ok(());
        }
        let n = self.sampleset.size();
        let mut a = DVector::from_column_slice(self.sampleset.targets());
        {
            let lv = self.l.view((0, 0), (n, n));
            if !lv.solve_lower_triangular_mut(&mut a)
                || !lv.tr_solve_lower_triangular_mut(&mut a)
            {
                return Err(Error::NotPositiveDefinite);
            }
        }
        self.alpha = a;
        self.alpha_needs_update = false;
        Ok(())
    }

    fn k_star(&self, x: &DVector<f64>) -> DVector<f64> {
        let n = self.sampleset.size();
        DVector::from_iterator(
            n,
            (0..n).map(|i| self.cf.get(x, self.sampleset.x(i))),
        )
    }

    fn mean_at(&mut self, x: &DVector<f64>) -> Result<f64, Error> {
        if self.sampleset.is_empty() {
            return Ok(0.0);
        }
        self.compute()?;
        self.update_alpha()?;
        Ok(self.k_star(x).dot(&self.alpha))
    }

    fn var_at(&mut self, x: &DVector<f64>) -> Result<f64, Error> {
        if self.sampleset.is_empty() {
            return Ok(0.0);
        }
        self.compute()?;
        self.update_alpha()?;
        let n = self.sampleset.size();
        let mut v = self.k_star(x);
        if !self
            .l
            .view((0, 0), (n, n))
            .solve_lower_triangular_mut(&mut v)
        {
            return Err(Error::NotPositiveDefinite);
        }
        Ok(self.cf.get(x, x) - v.dot(&v))
    }

    /// Predictive mean at `x`. Returns 0 for an empty training set.
    pub fn f(&mut self, x: &[f64]) -> Result<f64, Error> {
        self.check_dim(x.len())?;
        self.mean_at(&DVector::from_column_slice(x))
    }

    /// Predictive variance at `x`. Returns 0 for an empty training set.
    ///
    /// Exact arithmetic keeps this non-negative; in floating point it can
    /// dip slightly below zero near duplicated or numerically degenerate
    /// training points. The value is reported as computed, not clamped.
    pub fn var(&mut self, x: &[f64]) -> Result<f64, Error> {
        self.check_dim(x.len())?;
        self.var_at(&DVector::from_column_slice(x))
    }

    /// Predictive means for a batch of query points, one row of `x` each.
    pub fn predict(&mut self, x: &DMatrix<f64>) -> Result<DVector<f64>, Error> {
        self.check_dim(x.ncols())?;
        let mut means = DVector::zeros(x.nrows());
        for i in 0..x.nrows() {
            means[i] = self.mean_at(&x.row(i).transpose())?;
        }
        Ok(means)
    }

    /// Predictive means and variances for a batch of query points.
    pub fn predict_with_variance(
        &mut self,
        x: &DMatrix<f64>,
    ) -> Result<(DVector<f64>, DVector<f64>), Error> {
        self.check_dim(x.ncols())?;
        let mut means = DVector::zeros(x.nrows());
        let mut vars = DVector::zeros(x.nrows());
        for i in 0..x.nrows() {
            let xi = x.row(i).transpose();
            means[i] = self.mean_at(&xi)?;
            vars[i] = self.var_at(&xi)?;
        }
        Ok((means, vars))
    }

    /// Marginal log-likelihood of the targets under the current
    /// hyperparameters:
    /// `-½ yᵗα - Σᵢ ln L_ii - (n/2) ln 2π`.
    pub fn log_likelihood(&mut self) -> Result<f64, Error> {
        self.compute()?;
        self.update_alpha()?;
        let n = self.sampleset.size();
        let y = DVector::from_column_slice(self.sampleset.targets());
        let det: f64 = (0..n).map(|i| self.l[(i, i)].ln()).sum();
        Ok(-0.5 * y.dot(&self.alpha) - det - n as f64 * HALF_LN_2PI)
    }

    /// Gradient of [`log_likelihood`](GaussianProcess::log_likelihood)
    /// with respect to each log-hyperparameter:
    /// `½ tr((ααᵗ - K⁻¹) ∂K/∂θ)`.
    pub fn log_likelihood_gradient(&mut self) -> Result<DVector<f64>, Error> {
        self.compute()?;
        self.update_alpha()?;
        let n = self.sampleset.size();
        let dim = self.cf.param_dim();

        let mut w = DMatrix::identity(n, n);
        {
            let lv = self.l.view((0, 0), (n, n));
            if !lv.solve_lower_triangular_mut(&mut w)
                || !lv.tr_solve_lower_triangular_mut(&mut w)
            {
                return Err(Error::NotPositiveDefinite);
            }
        }
        let w = &self.alpha * self.alpha.transpose() - w;

        let mut grad = DVector::zeros(dim);
        let mut g = DVector::zeros(dim);
        for i in 0..n {
            for j in 0..=i {
                self.cf
                    .grad(self.sampleset.x(i), self.sampleset.x(j), &mut g);
                // diagonal terms are not doubled by symmetry
                let weight =
                    if i == j { 0.5 * w[(i, j)] } else { w[(i, j)] };
                grad.axpy(weight, &g, 1.0);
            }
        }
        Ok(grad)
    }

    /// Overwrite the target of pattern `i`. Only the solve vector becomes
    /// stale; the factor is untouched since inputs did not change.
    pub fn set_y(&mut self, i: usize, y: f64) -> Result<(), Error> {
        self.sampleset.set_y(i, y)?;
        self.alpha_needs_update = true;
        Ok(())
    }

    /// The covariance function.
    pub fn covf(&self) -> &dyn Kernel {
        self.cf.as_ref()
    }

    /// The covariance function, mutably. Hyperparameter changes through
    /// this handle are picked up by the next prediction or likelihood call.
    pub fn covf_mut(&mut self) -> &mut dyn Kernel {
        self.cf.as_mut()
    }

    /// Current log-hyperparameters of the covariance function.
    pub fn loghyper(&self) -> DVector<f64> {
        self.cf.loghyper()
    }

    /// Set the covariance function's log-hyperparameters.
    pub fn set_loghyper(&mut self, p: &[f64]) -> Result<(), Error> {
        self.cf.set_loghyper(p)?;
        Ok(())
    }

    /// Dimensionality of the input vectors.
    pub fn input_dim(&self) -> usize {
        self.sampleset.input_dim()
    }

    /// Number of log-hyperparameters of the covariance function.
    pub fn param_dim(&self) -> usize {
        self.cf.param_dim()
    }

    /// Number of training patterns.
    pub fn n_samples(&self) -> usize {
        self.sampleset.size()
    }

    /// The training data.
    pub fn sampleset(&self) -> &SampleSet {
        &self.sampleset
    }

    /// Drop all training patterns, keeping the kernel and its
    /// hyperparameters.
    pub fn clear_sampleset(&mut self) {
        self.sampleset.clear();
        self.alpha_needs_update = true;
    }

    fn check_dim(&self, given: usize) -> Result<(), Error> {
        let expected = self.input_dim();
        if given != expected {
            Err(Error::DimensionMismatch { expected, given })
        } else {
            Ok(())
        }
    }

    fn grow(&mut self, needed: usize) {
        if needed <= self.l.nrows() {
            return;
        }
        let cap = needed.max(2 * self.l.nrows()).max(16);
        let old = std::mem::replace(&mut self.l, DMatrix::zeros(0, 0));
        self.l = old.resize(cap, cap, 0.0);
    }

    /// Write the model as plain text: input dimensionality, kernel
    /// expression, log-hyperparameters, then one `target x…` line per
    /// pattern. `#` starts a comment.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "# gpr {} model file", env!("CARGO_PKG_VERSION"))?;
        writeln!(out)?;
        writeln!(out, "# input dimensionality")?;
        writeln!(out, "{}", self.input_dim())?;
        writeln!(out)?;
        writeln!(out, "# covariance function")?;
        writeln!(out, "{}", self.cf)?;
        writeln!(out)?;
        writeln!(out, "# log-hyperparameter")?;
        let p = self.cf.loghyper();
        let line: Vec<String> = p.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", line.join(" "))?;
        writeln!(out)?;
        writeln!(out, "# data (target value in first column)")?;
        for i in 0..self.sampleset.size() {
            write!(out, "{}", self.sampleset.y(i))?;
            let x = self.sampleset.x(i);
            for j in 0..x.len() {
                write!(out, " {}", x[j])?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Load a model written by [`write`](GaussianProcess::write).
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    /// Load a model from any buffered reader.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut stage = 0usize;
        let mut input_dim = 0usize;
        let mut gp: Option<GaussianProcess> = None;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let s = line.trim();
            if s.is_empty() || s.starts_with('#') {
                continue;
            }
            let lineno = idx + 1;
            match stage {
                0 => {
                    input_dim =
                        s.parse().map_err(|_| Error::ModelFormat {
                            line: lineno,
                            reason: format!(
                                "invalid input dimensionality '{}'",
                                s
                            ),
                        })?;
                }
                1 => {
                    gp = Some(GaussianProcess::new(input_dim, s)?);
                }
                2 => {
                    let params: Vec<f64> = s
                        .split_whitespace()
                        .map(str::parse)
                        .collect::<Result<_, _>>()
                        .map_err(|_| Error::ModelFormat {
                            line: lineno,
                            reason: "invalid log-hyperparameter value"
                                .to_string(),
                        })?;
                    // length mismatch is fatal through the kernel check
                    gp.as_mut()
                        .map(|gp| gp.set_loghyper(&params))
                        .transpose()?;
                }
                _ => {
                    let values: Vec<f64> = s
                        .split_whitespace()
                        .map(str::parse)
                        .collect::<Result<_, _>>()
                        .map_err(|_| Error::ModelFormat {
                            line: lineno,
                            reason: "invalid pattern value".to_string(),
                        })?;
                    if values.len() != input_dim + 1 {
                        return Err(Error::ModelFormat {
                            line: lineno,
                            reason: format!(
                                "expected {} values per pattern, got {}",
                                input_dim + 1,
                                values.len()
                            ),
                        });
                    }
                    if let Some(gp) = gp.as_mut() {
                        gp.add_pattern(&values[1..], values[0])?;
                    }
                }
            }
            stage += 1;
        }
        match gp {
            Some(gp) if stage >= 3 => Ok(gp),
            _ => Err(Error::ModelFormat {
                line: 0,
                reason: "file ended before the model was complete"
                    .to_string(),
            }),
        }
    }
}

impl Clone for GaussianProcess {
    /// Deep copy: the kernel is reconstructed from its canonical
    /// expression and hyperparameters; the factor rebuilds lazily.
    fn clone(&self) -> Self {
        let mut cf = factory::create(self.input_dim(), &self.cf.to_string())
            .expect("canonical kernel expression re-parses");
        cf.set_loghyper(self.cf.loghyper().as_slice())
            .expect("hyperparameter count is preserved by the round trip");
        Self {
            cf,
            sampleset: self.sampleset.clone(),
            l: DMatrix::zeros(0, 0),
            alpha: DVector::zeros(0),
            alpha_needs_update: true,
        }
    }
}
