//! # Padding
//! Change the length of coefficient arrays along an axis.
//!
//! Chebyshev coefficients are truncated or padded at the high end,
//! centered Fourier coefficients symmetrically around wavenumber zero.
use ndarray::prelude::*;
use ndarray::{Data, Dimension, RemoveAxis};
use num_traits::Zero;

/// Parity of a discretization size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// Even number of coefficients
    Even,
    /// Odd number of coefficients
    Odd,
}

/// Smallest length `>= len` with the given parity
pub fn pad_len(len: usize, parity: Parity) -> usize {
    let is_even = len % 2 == 0;
    match (parity, is_even) {
        (Parity::Even, true) | (Parity::Odd, false) => len,
        _ => len + 1,
    }
}

/// Truncate or zero pad Chebyshev coefficients along `axis`
pub fn resize_chebyshev<A, S, D>(input: &ArrayBase<S, D>, axis: usize, new_len: usize) -> Array<A, D>
where
    A: Clone + Zero,
    S: Data<Elem = A>,
    D: Dimension,
{
    let mut shape = input.raw_dim();
    shape[axis] = new_len;
    let mut output = Array::<A, D>::zeros(shape);
    let keep = new_len.min(input.shape()[axis]);
    output
        .slice_axis_mut(Axis(axis), (..keep).into())
        .assign(&input.slice_axis(Axis(axis), (..keep).into()));
    output
}

/// Truncate or zero pad centered Fourier coefficients along `axis`
///
/// Wavenumbers outside of the new range are dropped.
pub fn resize_fourier<A, S, D>(input: &ArrayBase<S, D>, axis: usize, new_len: usize) -> Array<A, D>
where
    A: Clone + Zero,
    S: Data<Elem = A>,
    D: Dimension + RemoveAxis,
{
    let old_len = input.shape()[axis];
    let mut shape = input.raw_dim();
    shape[axis] = new_len;
    let mut output = Array::<A, D>::zeros(shape);
    let (h_old, h_new) = ((old_len / 2) as i64, (new_len / 2) as i64);
    for i in 0..old_len {
        let k = i as i64 - h_old;
        let target = k + h_new;
        if target < 0 || target >= new_len as i64 {
            continue;
        }
        output
            .index_axis_mut(Axis(axis), target as usize)
            .assign(&input.index_axis(Axis(axis), i));
    }
    output
}
