//! # Collection of linear algebra solvers
//!
//! - [`Sylvester`]: generalized Sylvester equations
//!   `A X B^T + C X D^T = F`, solved by diagonalization with
//!   a dense Kronecker fallback.
//! - [`utils`]: Kronecker products, conversions and small helpers.
pub mod sylvester;
pub mod utils;
pub use sylvester::Sylvester;
