#![warn(missing_docs)]
//! # chebpde: adaptive spectral solvers for PDEs
//!
//! This library represents functions by Chebyshev, Fourier and
//! ultraspherical expansions and solves differential equations
//! on top of them.
//!
//! Two solvers are provided:
//! - [`pde15s`]: method of lines for time dependent PDE systems
//!   in one space dimension. The spatial grid grows adaptively,
//!   boundary conditions of any form are turned into algebraic
//!   rows of a differential-algebraic system, which is advanced
//!   by a stiff BDF integrator.
//! - [`helmholtz`] / [`helmholtz_neumann`]: spectral Helmholtz solver
//!   in the unit ball. The problem is decoupled into one generalized
//!   Sylvester equation per azimuthal Fourier mode.
//!
//! Supported bases:
//! - Chebyshev (values at second kind points, coefficients)
//! - Fourier (complex, centered wavenumbers)
//! - Ultraspherical (coefficient space operators)
//!
//! ```
//! use chebpde::SpectralFunction;
//! let f = SpectralFunction::from_fn(|x| x.exp(), [-1., 1.], 17);
//! assert!((f.sum() - (1f64.exp() - (-1f64).exp())).abs() < 1e-10);
//! ```
pub mod ball;
pub mod bases;
pub mod error;
pub mod field;
pub mod integrate;
pub mod pde;
pub mod solver;

pub use ball::{
    helmholtz, helmholtz_neumann, poisson, BallFunction, BallHelmholtz, BoundaryData, BoundaryKind,
    Rhs,
};
pub use error::{IntegrateError, PdeError, Result};
pub use field::{Piecewise, Quasimatrix, SpectralFunction};
pub use integrate::{Bdf, BdfOptions, Control, DaeSystem, Integrator, Status};
pub use pde::{
    pde15s, Arg, BcSpec, BcValue, BoundaryConditions, Fields, Operator, PdeOptions, PdeSolution,
    Snapshots, UserFn, Var,
};

/// Real type
pub type Real = f64;

/// Complex type
pub type Complex = num_complex::Complex<f64>;
