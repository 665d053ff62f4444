//! Training data container.

use nalgebra::DVector;
use std::fmt;

/// Ordered, append-only collection of training patterns.
///
/// Patterns keep the index they were inserted at: appending never
/// invalidates earlier indices, and there is no removal short of
/// [`clear`](SampleSet::clear). Targets may be overwritten in place;
/// inputs may not.
#[derive(Clone, Debug)]
pub struct SampleSet {
    input_dim: usize,
    inputs: Vec<DVector<f64>>,
    targets: Vec<f64>,
}

impl SampleSet {
    /// Create an empty sample set for inputs of the given dimensionality.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            inputs: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Append an input-target pair. Amortized O(1).
    pub fn add(&mut self, x: DVector<f64>, y: f64) {
        debug_assert_eq!(x.len(), self.input_dim);
        self.inputs.push(x);
        self.targets.push(y);
    }

    /// Input vector at index `k`. Panics if `k >= size()`.
    pub fn x(&self, k: usize) -> &DVector<f64> {
        &self.inputs[k]
    }

    /// Target value at index `k`. Panics if `k >= size()`.
    pub fn y(&self, k: usize) -> f64 {
        self.targets[k]
    }

    /// Overwrite the target at index `i`, leaving the input untouched.
    pub fn set_y(&mut self, i: usize, y: f64) -> Result<(), OutOfRange> {
        if i >= self.targets.len() {
            return Err(OutOfRange {
                index: i,
                size: self.targets.len(),
            });
        }
        self.targets[i] = y;
        Ok(())
    }

    /// All targets in insertion order.
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Number of patterns.
    pub fn size(&self) -> usize {
        self.targets.len()
    }

    /// Whether the sample set holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Drop all patterns.
    pub fn clear(&mut self) {
        self.inputs.clear();
        self.targets.clear();
    }

    /// Dimensionality of the input vectors.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
}

/// Index past the end of the sample set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    /// Index requested
    pub index: usize,
    /// Number of patterns at the time of the request
    pub size: usize,
}

impl std::error::Error for OutOfRange {}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sample index {} is out of range for {} patterns",
            self.index, self.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn add_and_access() {
        let mut ss = SampleSet::new(2);
        assert!(ss.is_empty());

        ss.add(dvector![1.0, 2.0], 0.5);
        ss.add(dvector![3.0, 4.0], -0.5);
        assert_eq!(ss.size(), 2);
        assert_eq!(ss.x(0), &dvector![1.0, 2.0]);
        assert_eq!(ss.x(1), &dvector![3.0, 4.0]);
        assert::close(ss.y(0), 0.5, 1E-12);
        assert::close(ss.y(1), -0.5, 1E-12);

        // appending leaves earlier indices intact
        for i in 0..100 {
            ss.add(dvector![i as f64, 0.0], i as f64);
        }
        assert_eq!(ss.x(0), &dvector![1.0, 2.0]);
        assert::close(ss.y(1), -0.5, 1E-12);
    }

    #[test]
    fn set_y_in_range() {
        let mut ss = SampleSet::new(1);
        ss.add(dvector![0.0], 1.0);
        ss.set_y(0, 2.0).unwrap();
        assert::close(ss.y(0), 2.0, 1E-12);
    }

    #[test]
    fn set_y_out_of_range_leaves_targets_unchanged() {
        let mut ss = SampleSet::new(1);
        ss.add(dvector![0.0], 1.0);
        ss.add(dvector![1.0], 2.0);

        let err = ss.set_y(2, 9.0).unwrap_err();
        assert_eq!(err, OutOfRange { index: 2, size: 2 });
        assert_eq!(ss.targets(), &[1.0, 2.0]);
    }

    #[test]
    #[should_panic]
    fn x_out_of_range_panics() {
        let ss = SampleSet::new(1);
        let _ = ss.x(0);
    }

    #[test]
    fn clear_empties() {
        let mut ss = SampleSet::new(1);
        ss.add(dvector![0.0], 1.0);
        ss.clear();
        assert!(ss.is_empty());
        assert_eq!(ss.size(), 0);
    }
}
