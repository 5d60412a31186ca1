//! Collection of usefull algebra methods
use crate::Complex;
use ndarray::prelude::*;
use ndarray::{Data, LinalgScalar};

/// Return the diagonal of a two-dimensional array.
/// Parameter offset defines which diagonal is returned
pub fn diag<T: LinalgScalar>(a: &Array2<T>, offset: i8) -> Array1<T> {
    assert!(
        a.is_square(),
        "Array for method diag() must be square, but has shape {:?}",
        a.shape()
    );
    let n: usize = a.shape()[0];
    let m = offset.unsigned_abs() as usize;
    if m > n {
        panic!(
            "Size of Array must be larger than offset, got {} and {}.",
            n, offset
        );
    }
    let mut diag: Array1<T> = Array1::zeros(n - m);
    if offset >= 0 {
        for (i, d) in &mut diag.iter_mut().enumerate() {
            *d = a[[i, i + m]];
        }
    } else {
        for (i, d) in &mut diag.iter_mut().enumerate() {
            *d = a[[i + m, i]];
        }
    }
    diag
}

/// Kronecker product `a x b`
///
/// ```
/// use chebpde::solver::utils::kron;
/// use ndarray::array;
/// let k = kron(&array![[1., 2.]], &array![[1.], [3.]]);
/// assert_eq!(k, array![[1., 2.], [3., 6.]]);
/// ```
pub fn kron<T, S1, S2>(a: &ArrayBase<S1, Ix2>, b: &ArrayBase<S2, Ix2>) -> Array2<T>
where
    T: LinalgScalar,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
{
    let (ra, ca) = a.dim();
    let (rb, cb) = b.dim();
    let mut out = Array2::<T>::zeros((ra * rb, ca * cb));
    for ((i, j), &aij) in a.indexed_iter() {
        out.slice_mut(s![i * rb..(i + 1) * rb, j * cb..(j + 1) * cb])
            .assign(&b.mapv(|v| aij * v));
    }
    out
}

/// Real to complex array
pub fn to_complex<S, D>(a: &ArrayBase<S, D>) -> Array<Complex, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    a.mapv(|v| Complex::new(v, 0.))
}

/// Largest absolute value of a complex array, zero if empty
pub fn max_abs<S, D>(a: &ArrayBase<S, D>) -> f64
where
    S: Data<Elem = Complex>,
    D: Dimension,
{
    a.iter().fold(0., |acc, v| acc.max(v.norm()))
}

/// Column-major vectorization of a matrix
pub fn vec_col_major<T: Copy, S: Data<Elem = T>>(a: &ArrayBase<S, Ix2>) -> Array1<T> {
    a.t().iter().copied().collect()
}

/// Inverse of [`vec_col_major`]
pub fn unvec_col_major<T: Copy>(v: &Array1<T>, rows: usize, cols: usize) -> Array2<T> {
    Array2::from_shape_fn((rows, cols), |(i, j)| v[i + rows * j])
}
