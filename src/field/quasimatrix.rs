//! Column collection of functions on one interval
use super::SpectralFunction;
use crate::error::{PdeError, Result};
use crate::Real;
use ndarray::Array1;
use std::ops::Index;

/// Horizontally concatenated functions, e.g. the snapshots of one
/// solution variable at successive times
#[derive(Debug, Clone)]
pub struct Quasimatrix {
    columns: Vec<SpectralFunction>,
}

impl Quasimatrix {
    /// Stack columns sharing one domain
    ///
    /// # Errors
    /// [`PdeError::Config`] if the domains differ.
    pub fn new(columns: Vec<SpectralFunction>) -> Result<Self> {
        if let Some(first) = columns.first() {
            if columns.iter().any(|c| c.domain() != first.domain()) {
                return Err(PdeError::Config(
                    "columns of a quasimatrix must share one domain".into(),
                ));
            }
        }
        Ok(Quasimatrix { columns })
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// All columns
    pub fn columns(&self) -> &[SpectralFunction] {
        &self.columns
    }

    /// Evaluate every column at x
    pub fn eval(&self, x: Real) -> Array1<Real> {
        self.columns.iter().map(|c| c.eval(x)).collect()
    }

    /// Last column
    pub fn last(&self) -> Option<&SpectralFunction> {
        self.columns.last()
    }
}

impl Index<usize> for Quasimatrix {
    type Output = SpectralFunction;

    fn index(&self, j: usize) -> &SpectralFunction {
        &self.columns[j]
    }
}
