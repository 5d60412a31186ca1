//! # Chebyshev
//! Transform of ndarrays from values at Chebyshev points of the second
//! kind to Chebyshev coefficients and vice versa.
//!
//! Points are sorted ascending, `x_j = -cos(pi j / (n-1))`, so that
//! the first entry belongs to the left boundary.
//!
//! Besides the transforms this module holds the coefficient space
//! recurrences (derivative, indefinite integral, Clenshaw evaluation)
//! and the barycentric formulas used on the value side.
use crate::Real;
use ndarray::prelude::*;
use ndarray::{Data, Dimension, RemoveAxis};
use ndrustfft::{nddct1, DctHandler};
use std::f64::consts::PI;

/// # Chebyshev polynomials of the first kind
pub struct Chebyshev {
    /// Number of points and coefficients
    pub n: usize,
    /// Grid points on [-1, 1], ascending
    pub x: Array1<Real>,
    /// `None` if n < 2, the transforms are the identity then
    dct_handler: Option<DctHandler<Real>>,
    correct_dct: Array1<Real>,
}

impl Chebyshev {
    /// Creates a new Basis.
    ///
    /// # Arguments
    /// * `n` - Number of points (at least one)
    ///
    /// # Examples
    /// ```
    /// use chebpde::bases::Chebyshev;
    /// let cheby = Chebyshev::new(10);
    /// assert_eq!(cheby.x[0], -1.);
    /// ```
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Chebyshev basis needs at least one point");
        Chebyshev {
            n,
            x: nodes_2nd_kind(n),
            dct_handler: if n > 1 { Some(DctHandler::new(n)) } else { None },
            correct_dct: alternating_ones(n),
        }
    }

    fn check_array<S, D>(&self, data: &ArrayBase<S, D>, axis: usize)
    where
        S: Data<Elem = Real>,
        D: Dimension,
    {
        assert!(
            self.n == data.shape()[axis],
            "Size mismatch in chebyshev transform, got {} expected {}",
            data.shape()[axis],
            self.n
        );
    }

    /// Transform: values --> coefficients
    ///
    /// # Example
    /// ```
    /// use chebpde::bases::Chebyshev;
    /// let mut cheby = Chebyshev::new(5);
    /// let values = cheby.x.mapv(|x| 2. * x * x - 1.);
    /// let coeffs = cheby.forward(&values);
    /// assert!((coeffs[2] - 1.).abs() < 1e-12);
    /// ```
    pub fn forward<S: Data<Elem = Real>>(&mut self, values: &ArrayBase<S, Ix1>) -> Array1<Real> {
        self.forward_axis(values, 0)
    }

    /// Transform values --> coefficients along `axis` of an
    /// n-dimensional array
    pub fn forward_axis<S, D>(&mut self, input: &ArrayBase<S, D>, axis: usize) -> Array<Real, D>
    where
        S: Data<Elem = Real>,
        D: Dimension + RemoveAxis,
    {
        self.check_array(input, axis);
        let mut buffer = input.to_owned();
        let mut output = input.to_owned();
        let n = self.n;
        let handler = match self.dct_handler.as_mut() {
            Some(handler) => handler,
            None => return output,
        };
        // discrete cosine transform (type 1)
        nddct1(&mut buffer.view_mut(), &mut output.view_mut(), handler, axis);
        // Correct DCT-I to find chebyshev coefficients
        let corrector = self.correct_dct.mapv(|c| c / (n - 1) as Real);
        for mut v in output.lanes_mut(Axis(axis)) {
            v *= &corrector;
            v[0] /= 2.;
            v[n - 1] /= 2.;
        }
        output
    }

    /// Transform: coefficients --> values
    ///
    /// The inverse of [`Chebyshev::forward`]
    pub fn backward<S: Data<Elem = Real>>(&mut self, coeffs: &ArrayBase<S, Ix1>) -> Array1<Real> {
        self.check_array(coeffs, 0);
        let mut buffer = coeffs.to_owned();
        let mut output = coeffs.to_owned();
        let n = self.n;
        let handler = match self.dct_handler.as_mut() {
            Some(handler) => handler,
            None => return output,
        };
        // correction step
        buffer *= &self.correct_dct.mapv(|c| c / 2.);
        buffer[0] *= 2.;
        buffer[n - 1] *= 2.;
        nddct1(&mut buffer.view_mut(), &mut output.view_mut(), handler, 0);
        output
    }

    /// Spectral differentiation matrix on [-1, 1], acting on values
    ///
    /// Off-diagonal entries follow the barycentric formula, the
    /// diagonal is the negative row sum.
    pub fn diff_matrix(&self) -> Array2<Real> {
        let n = self.n;
        let w = bary_weights_2nd(n);
        let mut d = Array2::<Real>::zeros((n, n));
        for i in 0..n {
            let mut row_sum = 0.;
            for j in 0..n {
                if i != j {
                    let v = w[j] / w[i] / (self.x[i] - self.x[j]);
                    d[[i, j]] = v;
                    row_sum += v;
                }
            }
            d[[i, i]] = -row_sum;
        }
        d
    }
}

/// Chebyshev nodes of the second kind, includes -1 and 1
pub fn nodes_2nd_kind(n: usize) -> Array1<Real> {
    if n == 1 {
        return Array1::zeros(1);
    }
    let m: Real = (n - 1) as Real;
    let mut grid = Array1::zeros(n);
    for (k, x) in grid.iter_mut().enumerate() {
        let arg = PI * (m - 2. * k as Real) / (2. * m);
        *x = -arg.sin();
    }
    grid
}

/// Chebyshev nodes of the first kind, excludes -1 and 1
pub fn nodes_1st_kind(n: usize) -> Array1<Real> {
    let m = n as Real;
    let mut grid = Array1::zeros(n);
    for (k, x) in grid.iter_mut().enumerate() {
        let arg = PI * (m - 2. * k as Real - 1.) / (2. * m);
        *x = -arg.sin();
    }
    grid
}

/// Barycentric weights of the second kind points (up to scaling)
pub fn bary_weights_2nd(n: usize) -> Array1<Real> {
    let mut w = alternating_ones(n);
    if n > 1 {
        w[0] /= 2.;
        w[n - 1] /= 2.;
    }
    w
}

/// Array of ones with alternating signs. Converts between
/// the coefficients of ascending and descending point order.
fn alternating_ones(n: usize) -> Array1<Real> {
    Array1::from_shape_fn(n, |i| if i % 2 == 0 { 1. } else { -1. })
}

/// Barycentric interpolation matrix from second kind points
/// `x_from` (with weights `w`) to arbitrary points `x_to`.
///
/// A target point that coincides with a source point gets a unit row.
pub fn interp_matrix(x_from: &Array1<Real>, w: &Array1<Real>, x_to: &Array1<Real>) -> Array2<Real> {
    let mut p = Array2::<Real>::zeros((x_to.len(), x_from.len()));
    for (i, &xi) in x_to.iter().enumerate() {
        if let Some(j) = x_from.iter().position(|&xj| xj == xi) {
            p[[i, j]] = 1.;
            continue;
        }
        let mut denom = 0.;
        for (j, &xj) in x_from.iter().enumerate() {
            let v = w[j] / (xi - xj);
            p[[i, j]] = v;
            denom += v;
        }
        p.row_mut(i).mapv_inplace(|v| v / denom);
    }
    p
}

/// Barycentric evaluation of the interpolant through `(x, values)`.
pub fn bary_eval<S: Data<Elem = Real>>(
    x: &Array1<Real>,
    w: &Array1<Real>,
    values: &ArrayBase<S, Ix1>,
    at: Real,
) -> Real {
    let (mut num, mut denom) = (0., 0.);
    for ((&xj, &wj), &fj) in x.iter().zip(w.iter()).zip(values.iter()) {
        let diff = at - xj;
        if diff == 0. {
            return fj;
        }
        num += wj / diff * fj;
        denom += wj / diff;
    }
    num / denom
}

/// Coefficients of the derivative of a Chebyshev series.
///
/// The output has the same length as the input, the last entry is zero.
pub fn diff_coeffs<S: Data<Elem = Real>>(c: &ArrayBase<S, Ix1>) -> Array1<Real> {
    let n = c.len();
    let mut out = Array1::<Real>::zeros(n + 1);
    for k in (1..n).rev() {
        out[k - 1] = out[k + 1] + 2. * k as Real * c[k];
    }
    out[0] /= 2.;
    out.slice_move(s![..n])
}

/// Coefficients of the indefinite integral of a Chebyshev series,
/// vanishing at the left end. The output is one longer than the input.
pub fn cumsum_coeffs<S: Data<Elem = Real>>(c: &ArrayBase<S, Ix1>) -> Array1<Real> {
    let n = c.len();
    let get = |k: usize| if k < n { c[k] } else { 0. };
    let mut b = Array1::<Real>::zeros(n + 1);
    b[1] = get(0) - get(2) / 2.;
    for k in 2..=n {
        b[k] = (get(k - 1) - get(k + 1)) / (2. * k as Real);
    }
    // fix constant such that the integral vanishes at -1
    let mut at_left = 0.;
    for (k, v) in b.iter().enumerate().skip(1) {
        at_left += if k % 2 == 0 { *v } else { -*v };
    }
    b[0] = -at_left;
    b
}

/// Definite integral over [-1, 1] of a Chebyshev series
pub fn integrate_coeffs<S: Data<Elem = Real>>(c: &ArrayBase<S, Ix1>) -> Real {
    c.iter()
        .enumerate()
        .step_by(2)
        .map(|(k, v)| 2. * v / (1. - (k * k) as Real))
        .sum()
}

/// Clenshaw-Curtis quadrature weights of the second kind points on [-1, 1]
pub fn quadrature_weights(n: usize) -> Array1<Real> {
    if n == 1 {
        return array![2.];
    }
    let m = n - 1;
    let mf = m as Real;
    let mut w = Array1::<Real>::zeros(n);
    let end = if m % 2 == 0 {
        1. / (mf * mf - 1.)
    } else {
        1. / (mf * mf)
    };
    w[0] = end;
    w[m] = end;
    for (i, wi) in w.iter_mut().enumerate().take(m).skip(1) {
        let theta = PI * i as Real / mf;
        let mut v = 1.;
        for k in 1..=(m - 1) / 2 {
            let kf = k as Real;
            v -= 2. * (2. * kf * theta).cos() / (4. * kf * kf - 1.);
        }
        if m % 2 == 0 {
            v -= (mf * theta).cos() / (mf * mf - 1.);
        }
        *wi = 2. * v / mf;
    }
    w
}

/// Evaluate a Chebyshev series at `x` in [-1, 1] (Clenshaw)
pub fn clenshaw<S: Data<Elem = Real>>(c: &ArrayBase<S, Ix1>, x: Real) -> Real {
    let (mut b1, mut b2) = (0., 0.);
    for k in (1..c.len()).rev() {
        let b0 = c[k] + 2. * x * b1 - b2;
        b2 = b1;
        b1 = b0;
    }
    match c.len() {
        0 => 0.,
        _ => c[0] + x * b1 - b2,
    }
}

/// Values of T_0(x), ..., T_(n-1)(x)
pub fn polynomials(n: usize, x: Real) -> Array1<Real> {
    let mut t = Array1::<Real>::zeros(n);
    for k in 0..n {
        t[k] = match k {
            0 => 1.,
            1 => x,
            _ => 2. * x * t[k - 1] - t[k - 2],
        };
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq<S, D>(result: &ArrayBase<S, D>, expected: &ArrayBase<S, D>)
    where
        S: ndarray::Data<Elem = f64>,
        D: Dimension,
    {
        let dif = 1e-10;
        for (a, b) in expected.iter().zip(result.iter()) {
            if (a - b).abs() > dif {
                panic!("Large difference of values, got {} expected {}.", b, a)
            }
        }
    }

    #[test]
    fn test_nodes_are_ascending() {
        let x = nodes_2nd_kind(7);
        approx_eq(&x.slice(s![..1]), &array![-1.].view());
        approx_eq(&x.slice(s![6..]), &array![1.].view());
        assert!(x.windows(2).into_iter().all(|w| w[0] < w[1]));
        let y = nodes_1st_kind(6);
        assert!(y[0] > -1. && y[5] < 1.);
    }

    #[test]
    fn test_forward_monomials() {
        let mut cheby = Chebyshev::new(6);
        // x^3 = 3/4 T_1 + 1/4 T_3
        let values = cheby.x.mapv(|x| x.powi(3));
        let coeffs = cheby.forward(&values);
        approx_eq(&coeffs, &array![0., 0.75, 0., 0.25, 0., 0.]);
        // 1 + x
        let values = cheby.x.mapv(|x| 1. + x);
        approx_eq(&cheby.forward(&values), &array![1., 1., 0., 0., 0., 0.]);
    }

    #[test]
    fn test_backward_inverts_forward() {
        for n in [2, 3, 8, 17] {
            let mut cheby = Chebyshev::new(n);
            let values = cheby.x.mapv(|x| (2. * x).sin() + x.exp());
            let coeffs = cheby.forward(&values);
            let back = cheby.backward(&coeffs);
            approx_eq(&back, &values);
        }
    }

    #[test]
    fn test_forward_axis() {
        let mut cheby = Chebyshev::new(4);
        // columns carry x^2 and x^3
        let values = Array2::from_shape_fn((4, 2), |(i, j)| cheby.x[i].powi(2 + j as i32));
        let coeffs = cheby.forward_axis(&values, 0);
        approx_eq(&coeffs.column(0).to_owned(), &array![0.5, 0., 0.5, 0.]);
        approx_eq(&coeffs.column(1).to_owned(), &array![0., 0.75, 0., 0.25]);
    }

    #[test]
    fn test_diff_coeffs() {
        // d/dx (T_0 + T_2) = 4 T_1
        approx_eq(&diff_coeffs(&array![1., 0., 1.]), &array![0., 4., 0.]);
        // d/dx T_3 = 3 T_0 + 6 T_2
        approx_eq(
            &diff_coeffs(&array![0., 0., 0., 1.]),
            &array![3., 0., 6., 0.],
        );
    }

    #[test]
    fn test_cumsum_coeffs() {
        // int_{-1}^x 1 = x + 1
        approx_eq(&cumsum_coeffs(&array![1.]), &array![1., 1.]);
        // int_{-1}^x t = (x^2 - 1)/2 = (T_2 - T_0)/4
        approx_eq(&cumsum_coeffs(&array![0., 1.]), &array![-0.25, 0., 0.25]);
    }

    #[test]
    fn test_diff_matrix() {
        let cheby = Chebyshev::new(9);
        let values = cheby.x.mapv(|x| x.powi(4));
        let expected = cheby.x.mapv(|x| 4. * x.powi(3));
        let dif = 1e-9;
        for (a, b) in cheby.diff_matrix().dot(&values).iter().zip(expected.iter()) {
            assert!((a - b).abs() < dif, "got {} expected {}", a, b);
        }
    }

    #[test]
    fn test_interp_and_clenshaw() {
        let mut cheby = Chebyshev::new(12);
        let values = cheby.x.mapv(|x| (3. * x).cos());
        let w = bary_weights_2nd(12);
        let target = nodes_1st_kind(5);
        let p = interp_matrix(&cheby.x, &w, &target);
        let dif = 1e-6;
        for (a, x) in p.dot(&values).iter().zip(target.iter()) {
            assert!((a - (3. * x).cos()).abs() < dif);
        }
        let coeffs = cheby.forward(&values);
        let at = 0.3;
        assert!((clenshaw(&coeffs, at) - bary_eval(&cheby.x, &w, &values, at)).abs() < 1e-12);
        assert!((integrate_coeffs(&coeffs) - 2. * 3f64.sin() / 3.).abs() < 1e-6);
    }

    #[test]
    fn test_quadrature_weights() {
        for n in [1, 2, 5, 8] {
            assert!((quadrature_weights(n).sum() - 2.).abs() < 1e-12);
        }
        // exact for x^4 on 5 points
        let x = nodes_2nd_kind(5);
        let w = quadrature_weights(5);
        assert!((w.dot(&x.mapv(|v| v.powi(4))) - 0.4).abs() < 1e-12);
        let mut cheby = Chebyshev::new(16);
        let values = cheby.x.mapv(|x| x.exp());
        let by_coeffs = integrate_coeffs(&cheby.forward(&values));
        assert!((quadrature_weights(16).dot(&values) - by_coeffs).abs() < 1e-12);
    }
}
