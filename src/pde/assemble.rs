//! # Discretization of the DAE
//!
//! For a grid of `n` points and `SYSSIZE` variables the unknown is the
//! stacked vector of grid values, of length `N = SYSSIZE * n`. The
//! system reads
//! .. math::
//!
//!  [ 0 ]        [ B u - q(t) ]
//!  [ P ] u_t =  [ P F(t, u)  ]
//!
//! where `B` holds the constraint rows and `P` is block diagonal, its
//! block `k` resamples variable `k` to `n - d_k` first kind points
//! (`d_k` is the highest derivative of the variable). Blocks of
//! variables without time derivative are zeroed in the mass matrix.
use super::bc::BoundaryConstraintSet;
use super::grid::Grid;
use crate::error::{PdeError, Result};
use crate::Real;
use log::debug;
use ndarray::prelude::*;
use std::ops::Range;
use std::rc::Rc;

/// Custom mass matrix multiplier, evaluated at the grid length
pub type MassFn = Box<dyn Fn(usize) -> Array2<Real>>;

/// Matrices of the DAE at one grid length
pub struct Discretization {
    /// Grid length
    pub n: usize,
    /// Grid
    pub grid: Rc<Grid>,
    /// Constraint rows
    pub b: Array2<Real>,
    /// Block diagonal resampling to the reduced grids
    pub projection: Array2<Real>,
    /// Mass matrix
    pub mass: Array2<Real>,
    /// Rows of the residual holding the constraints
    pub row_indices: Range<usize>,
}

/// Properties of the system which do not depend on the grid
pub struct AssemblyContext {
    /// Interval
    pub domain: [Real; 2],
    /// Number of variables
    pub sys_size: usize,
    /// Highest derivative per variable
    pub diff_order: Vec<usize>,
    /// Time derivative present per variable
    pub pde_flag: Vec<bool>,
    /// Custom mass multiplier
    pub mass: Option<MassFn>,
}

/// Builds [`Discretization`]s, keeps the last one
pub struct DaeAssembler {
    ctx: AssemblyContext,
    bcs: BoundaryConstraintSet,
    cache: Option<Rc<Discretization>>,
}

impl DaeAssembler {
    /// Return assembler
    pub fn new(ctx: AssemblyContext, bcs: BoundaryConstraintSet) -> Self {
        DaeAssembler {
            ctx,
            bcs,
            cache: None,
        }
    }

    /// Grid independent properties
    pub fn context(&self) -> &AssemblyContext {
        &self.ctx
    }

    /// Constraint rows
    pub fn constraints(&self) -> &BoundaryConstraintSet {
        &self.bcs
    }

    /// Discretization at grid length `n`, rebuilt only if `n` changed
    ///
    /// # Errors
    /// [`PdeError::Config`] if a variable has less than one collocation
    /// point left, or the custom mass matrix has the wrong size.
    pub fn discretize(&mut self, n: usize) -> Result<Rc<Discretization>> {
        if let Some(disc) = &self.cache {
            if disc.n == n {
                return Ok(Rc::clone(disc));
            }
        }
        debug!("Assemble DAE on {} points", n);
        let disc = Rc::new(self.assemble(n)?);
        self.cache = Some(Rc::clone(&disc));
        Ok(disc)
    }

    fn assemble(&self, n: usize) -> Result<Discretization> {
        let ctx = &self.ctx;
        if let Some((k, d)) = ctx.diff_order.iter().enumerate().find(|(_, &d)| d + 1 > n) {
            return Err(PdeError::Config(format!(
                "variable {} of order {} needs more than {} points",
                k, d, n
            )));
        }
        let sys_size = ctx.sys_size;
        let size = sys_size * n;
        let grid = Rc::new(Grid::new(n, ctx.domain));
        let b = self.bcs.matrix(&grid, sys_size);
        let nb = b.nrows();

        let mut projection = Array2::<Real>::zeros((size - nb, size));
        let mut flags = Array1::<Real>::zeros(size - nb);
        let mut row = 0;
        for (k, (&d, &flag)) in ctx.diff_order.iter().zip(ctx.pde_flag.iter()).enumerate() {
            let m = n - d;
            projection
                .slice_mut(s![row..row + m, k * n..(k + 1) * n])
                .assign(&grid.projection(m));
            if flag {
                flags.slice_mut(s![row..row + m]).fill(1.);
            }
            row += m;
        }

        let mut mass = Array2::<Real>::zeros((size, size));
        mass.slice_mut(s![nb.., ..])
            .assign(&(&projection * &flags.insert_axis(Axis(1))));
        if let Some(custom) = &ctx.mass {
            let factor = custom(n);
            if factor.dim() != (size, size) {
                return Err(PdeError::Config(format!(
                    "mass matrix has shape {:?}, expected ({}, {})",
                    factor.dim(),
                    size,
                    size
                )));
            }
            mass = factor.dot(&mass);
        }
        Ok(Discretization {
            n,
            grid,
            b,
            projection,
            mass,
            row_indices: 0..nb,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pde::bc::{BcContext, BoundaryConditions};

    fn assembler(order: Vec<usize>, flag: Vec<bool>, bc: BoundaryConditions) -> DaeAssembler {
        let sys_size = order.len();
        let grid = Rc::new(Grid::new(9, [-1., 1.]));
        let y0 = Array1::zeros(9 * sys_size);
        let bcs = BoundaryConstraintSet::build(
            bc,
            &BcContext {
                grid,
                sys_size,
                diff_order: &order,
                t0: 0.,
                y0: &y0,
            },
        )
        .unwrap();
        let ctx = AssemblyContext {
            domain: [-1., 1.],
            sys_size,
            diff_order: order,
            pde_flag: flag,
            mass: None,
        };
        DaeAssembler::new(ctx, bcs)
    }

    #[test]
    fn test_shapes_and_cache() {
        let mut asm = assembler(vec![2, 0], vec![true, false], BoundaryConditions::periodic());
        let disc = asm.discretize(9).unwrap();
        assert_eq!(disc.b.dim(), (2, 18));
        assert_eq!(disc.projection.dim(), (16, 18));
        assert_eq!(disc.mass.dim(), (18, 18));
        assert_eq!(disc.row_indices, 0..2);
        // algebraic variable has no mass
        assert_eq!(disc.mass.slice(s![9.., 9..]).sum(), 0.);
        assert!((disc.mass.slice(s![2..9, ..9]).sum() - 7.).abs() < 1e-12);
        let again = asm.discretize(9).unwrap();
        assert!(Rc::ptr_eq(&disc, &again));
        let finer = asm.discretize(17).unwrap();
        assert_eq!(finer.mass.dim(), (34, 34));
    }

    #[test]
    fn test_too_few_points() {
        let mut asm = assembler(vec![2], vec![true], BoundaryConditions::periodic());
        assert!(matches!(asm.discretize(2), Err(PdeError::Config(_))));
    }
}
