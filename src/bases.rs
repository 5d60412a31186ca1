//! # Bases
//! Collection of basis functions which implement transforms between
//! values and coefficients, differentiation and other coefficient
//! space operators.
//!
//! Implemented:
//! - Chebyshev (second kind points, real coefficients)
//! - Fourier (equispaced points, complex centered coefficients)
//! - Ultraspherical (sparse operators mapping Chebyshev coefficients
//!   to C^(λ) coefficients)
//!
//! [`padding`] contains helpers to change the length of coefficient
//! arrays along an axis.
pub mod chebyshev;
pub mod fourier;
pub mod padding;
pub mod ultraspherical;
pub use chebyshev::Chebyshev;
pub use fourier::Fourier;
pub use padding::Parity;
