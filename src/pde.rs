//! # Time dependent PDE systems in one space dimension
//!
//! [`pde15s`] advances `u_t = F(t, x, u, u_x, u_xx, ...)` for a system
//! of variables on an interval. The method of lines is set up on
//! Chebyshev points of the second kind:
//!
//! - Boundary conditions become algebraic rows `B u = q(t)`, or
//!   rows evaluated by nonlinear functionals of the solution.
//! - The PDE is enforced on first kind points, one set per
//!   variable with as many points removed as the variable's highest
//!   derivative; a barycentric resampling matrix `P` maps there.
//! - The resulting system `M u' = f(t, u)` with `M = [0; P]` is
//!   advanced by a stiff BDF integrator.
//!
//! The grid length grows on demand: whenever a solution at an output
//! time is not resolved, the chunk is stopped, the grid is doubled and
//! integration restarts from the last resolved time.
//!
//! User functions are given as [`UserFn`], boundary conditions as
//! [`BoundaryConditions`].
pub mod assemble;
pub mod bc;
pub mod driver;
pub mod grid;
pub mod handle;
pub mod options;
pub use bc::{BcSpec, BcValue, BoundaryConditions};
pub use driver::{pde15s, PdeSolution, Snapshots};
pub use grid::Grid;
pub use handle::{Arg, Fields, Operator, Role, UserFn, Var};
pub use options::PdeOptions;
