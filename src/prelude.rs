//! Convenience re-exports of the types most programs need.

pub use crate::gp::GaussianProcess;
pub use crate::kernel::factory;
pub use crate::kernel::{
    CovLinearArd, CovLinearOne, CovMatern3Iso, CovMatern5Iso, CovNoise,
    CovPeriodic, CovPeriodicMatern3Iso, CovProd, CovRBFCS, CovRQIso, CovSEard,
    CovSEiso, CovSum, InputDimFilter, Kernel, KernelError,
};
pub use crate::optimize::{ConjugateGradient, RProp};
pub use crate::sample_set::SampleSet;
