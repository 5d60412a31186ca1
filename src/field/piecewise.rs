//! Functions on adjacent intervals
use super::{SpectralFunction, MIN_LENGTH};
use crate::error::{PdeError, Result};
use crate::Real;

/// Ordered list of functions whose domains tile an interval
#[derive(Debug, Clone)]
pub struct Piecewise {
    pieces: Vec<SpectralFunction>,
}

impl Piecewise {
    /// Collect pieces; their domains must be adjacent and ascending.
    ///
    /// # Errors
    /// [`PdeError::Config`] for an empty list or a gap between pieces.
    pub fn new(pieces: Vec<SpectralFunction>) -> Result<Self> {
        if pieces.is_empty() {
            return Err(PdeError::Config("piecewise function without pieces".into()));
        }
        for pair in pieces.windows(2) {
            let (left, right) = (pair[0].domain(), pair[1].domain());
            if (left[1] - right[0]).abs() > 1e-14 * (1. + left[1].abs()) {
                return Err(PdeError::Config(format!(
                    "pieces on {:?} and {:?} are not adjacent",
                    left, right
                )));
            }
        }
        Ok(Piecewise { pieces })
    }

    /// Number of pieces
    pub fn num_pieces(&self) -> usize {
        self.pieces.len()
    }

    /// Pieces in ascending order
    pub fn pieces(&self) -> &[SpectralFunction] {
        &self.pieces
    }

    /// Whole interval
    pub fn domain(&self) -> [Real; 2] {
        let first = self.pieces[0].domain();
        let last = self.pieces[self.pieces.len() - 1].domain();
        [first[0], last[1]]
    }

    /// Breakpoints, including the end points
    pub fn breakpoints(&self) -> Vec<Real> {
        let mut ends: Vec<Real> = self.pieces.iter().map(|p| p.domain()[0]).collect();
        ends.push(self.domain()[1]);
        ends
    }

    /// Evaluate at x. At an interior breakpoint the right piece is used.
    pub fn eval(&self, x: Real) -> Real {
        let piece = self
            .pieces
            .iter()
            .find(|p| x < p.domain()[1])
            .unwrap_or(&self.pieces[self.pieces.len() - 1]);
        piece.eval(x)
    }

    /// Merge neighbouring pieces wherever a single function on their
    /// joint domain resolves both to `tol` within `max_len` points.
    pub fn merge(&self, tol: Real, max_len: usize) -> Self {
        let mut merged: Vec<SpectralFunction> = Vec::with_capacity(self.pieces.len());
        for piece in &self.pieces {
            let joined = match merged.last() {
                Some(prev) => {
                    let domain = [prev.domain()[0], piece.domain()[1]];
                    let (prev_ref, split) = (prev, prev.domain()[1]);
                    let f = |x: Real| {
                        if x < split {
                            prev_ref.eval(x)
                        } else {
                            piece.eval(x)
                        }
                    };
                    let max_len = max_len.max(MIN_LENGTH);
                    SpectralFunction::adaptive(f, domain, tol, max_len).ok()
                }
                None => None,
            };
            match joined {
                Some(f) => {
                    merged.pop();
                    merged.push(f);
                }
                None => merged.push(piece.clone()),
            }
        }
        Piecewise { pieces: merged }
    }

    /// The single piece, if there is exactly one
    pub fn into_single(mut self) -> Option<SpectralFunction> {
        match self.pieces.len() {
            1 => self.pieces.pop(),
            _ => None,
        }
    }
}

impl From<SpectralFunction> for Piecewise {
    fn from(f: SpectralFunction) -> Self {
        Piecewise { pieces: vec![f] }
    }
}
