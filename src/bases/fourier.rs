//! # Fourier
//! Complex-to-complex transform between equispaced values on
//! `[-pi, pi)` and Fourier coefficients.
//!
//! Coefficients are stored centered: index `i` belongs to the
//! wavenumber `k = i - n/2`, so that for even `n` the range is
//! `-n/2..n/2-1` and for odd `n` it is `-(n-1)/2..(n-1)/2`.
//! Wavenumbers and signs match a grid starting at `-pi`, hence the
//! alternating sign that shifts the fft output.
use crate::{Complex, Real};
use ndarray::prelude::*;
use ndarray::{Data, Dimension, RemoveAxis};
use ndrustfft::{ndfft, ndifft, FftHandler};
use std::f64::consts::PI;

/// # Fourier basis on a periodic grid
pub struct Fourier {
    /// Number of points and coefficients
    pub n: usize,
    /// Grid points `-pi + 2 pi j / n`
    pub x: Array1<Real>,
    fft_handler: FftHandler<Real>,
}

impl Fourier {
    /// Creates a new Basis.
    ///
    /// # Examples
    /// ```
    /// use chebpde::bases::Fourier;
    /// let fo = Fourier::new(8);
    /// assert_eq!(fo.wavenumbers()[0], -4);
    /// ```
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Fourier basis needs at least one point");
        Fourier {
            n,
            x: Array1::from_shape_fn(n, |j| -PI + 2. * PI * j as Real / n as Real),
            fft_handler: FftHandler::new(n),
        }
    }

    /// Centered wavenumbers
    pub fn wavenumbers(&self) -> Vec<i64> {
        wavenumbers(self.n)
    }

    fn check_array<T, S, D>(&self, data: &ArrayBase<S, D>, axis: usize)
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        assert!(
            self.n == data.shape()[axis],
            "Size mismatch in fft, got {} expected {}",
            data.shape()[axis],
            self.n
        );
    }

    /// Transform: values --> centered coefficients
    pub fn forward<S: Data<Elem = Complex>>(&mut self, values: &ArrayBase<S, Ix1>) -> Array1<Complex> {
        self.forward_axis(values, 0)
    }

    /// Transform: centered coefficients --> values
    pub fn backward<S: Data<Elem = Complex>>(&mut self, coeffs: &ArrayBase<S, Ix1>) -> Array1<Complex> {
        self.backward_axis(coeffs, 0)
    }

    /// Transform values --> coefficients along `axis`
    pub fn forward_axis<S, D>(&mut self, input: &ArrayBase<S, D>, axis: usize) -> Array<Complex, D>
    where
        S: Data<Elem = Complex>,
        D: Dimension + RemoveAxis,
    {
        self.check_array(input, axis);
        let mut buffer = input.to_owned();
        let mut output = input.to_owned();
        ndfft(&mut buffer.view_mut(), &mut output.view_mut(), &mut self.fft_handler, axis);
        // fft ordering --> centered, shifted to a grid starting at -pi
        let (n, scale) = (self.n, 1. / self.n as Real);
        for mut lane in output.lanes_mut(Axis(axis)) {
            let raw = lane.to_owned();
            for (i, v) in lane.iter_mut().enumerate() {
                let k = i as i64 - (n / 2) as i64;
                *v = raw[wrap(k, n)] * sign(k) * scale;
            }
        }
        output
    }

    /// Transform centered coefficients --> values along `axis`
    pub fn backward_axis<S, D>(&mut self, input: &ArrayBase<S, D>, axis: usize) -> Array<Complex, D>
    where
        S: Data<Elem = Complex>,
        D: Dimension + RemoveAxis,
    {
        self.check_array(input, axis);
        let n = self.n;
        let mut buffer = input.to_owned();
        for (mut lane, centered) in buffer.lanes_mut(Axis(axis)).into_iter().zip(input.lanes(Axis(axis))) {
            for (i, c) in centered.iter().enumerate() {
                let k = i as i64 - (n / 2) as i64;
                lane[wrap(k, n)] = c * sign(k);
            }
        }
        let mut output = input.to_owned();
        ndifft(&mut buffer.view_mut(), &mut output.view_mut(), &mut self.fft_handler, axis);
        // ndifft normalizes by 1/n, coefficients are already scaled
        output.mapv_inplace(|v| v * n as Real);
        output
    }

    /// Differentiation matrix of order `order` in coefficient space,
    /// diagonal with entries `(ik)^order`
    pub fn diff_matrix(&self, order: usize) -> Array2<Complex> {
        let mut d = Array2::<Complex>::zeros((self.n, self.n));
        for (i, k) in self.wavenumbers().into_iter().enumerate() {
            d[[i, i]] = Complex::new(0., k as Real).powu(order as u32);
        }
        d
    }

    /// Multiplication by `sin^2(x)` in coefficient space
    pub fn mult_sin2(&self) -> Array2<Complex> {
        let mut m = Array2::<Complex>::zeros((self.n, self.n));
        for i in 0..self.n {
            m[[i, i]] = Complex::new(0.5, 0.);
            if i + 2 < self.n {
                m[[i + 2, i]] = Complex::new(-0.25, 0.);
            }
            if i >= 2 {
                m[[i - 2, i]] = Complex::new(-0.25, 0.);
            }
        }
        m
    }

    /// Multiplication by `cos(x) sin(x)` in coefficient space
    pub fn mult_cossin(&self) -> Array2<Complex> {
        let mut m = Array2::<Complex>::zeros((self.n, self.n));
        for i in 0..self.n {
            if i + 2 < self.n {
                m[[i + 2, i]] = Complex::new(0., -0.25);
            }
            if i >= 2 {
                m[[i - 2, i]] = Complex::new(0., 0.25);
            }
        }
        m
    }
}

/// Centered wavenumbers of a Fourier basis of size n
pub fn wavenumbers(n: usize) -> Vec<i64> {
    let h = (n / 2) as i64;
    (0..n as i64).map(|i| i - h).collect()
}

/// Position of wavenumber `k` in fft ordering
fn wrap(k: i64, n: usize) -> usize {
    k.rem_euclid(n as i64) as usize
}

fn sign(k: i64) -> Real {
    if k.rem_euclid(2) == 0 {
        1.
    } else {
        -1.
    }
}

/// Change the number of centered coefficients to `new_n` by
/// folding wavenumbers onto the new range.
///
/// The result equals sampling the underlying trigonometric
/// polynomial on `new_n` points; growing zero pads.
pub fn alias_coeffs<S: Data<Elem = Complex>>(c: &ArrayBase<S, Ix1>, new_n: usize) -> Array1<Complex> {
    let (n, h_new) = (c.len(), (new_n / 2) as i64);
    let mut out = Array1::<Complex>::zeros(new_n);
    for (i, v) in c.iter().enumerate() {
        let k = i as i64 - (n / 2) as i64;
        let target = (k + h_new).rem_euclid(new_n as i64) as usize;
        out[target] += v;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_complex<S, D>(result: &ArrayBase<S, D>, expected: &ArrayBase<S, D>)
    where
        S: ndarray::Data<Elem = Complex>,
        D: Dimension,
    {
        let dif = 1e-10;
        for (a, b) in expected.iter().zip(result.iter()) {
            if (a - b).norm() > dif {
                panic!("Large difference of values, got {} expected {}.", b, a)
            }
        }
    }

    #[test]
    fn test_wavenumbers() {
        assert_eq!(wavenumbers(4), vec![-2, -1, 0, 1]);
        assert_eq!(wavenumbers(5), vec![-2, -1, 0, 1, 2]);
    }

    #[test]
    fn test_forward_single_mode() {
        let mut fo = Fourier::new(6);
        // exp(2ix) sits at k = 2, index 5
        let values = fo.x.mapv(|x| Complex::new(0., 2. * x).exp());
        let coeffs = fo.forward(&values);
        let mut expected = Array1::<Complex>::zeros(6);
        expected[5] = Complex::new(1., 0.);
        approx_eq_complex(&coeffs, &expected);
        approx_eq_complex(&fo.backward(&coeffs), &values);
    }

    #[test]
    fn test_transform_along_axis() {
        let mut fo = Fourier::new(5);
        // rows carry cos(x) and sin(2x)
        let values = Array2::from_shape_fn((2, 5), |(r, j)| {
            let x = fo.x[j];
            Complex::new(if r == 0 { x.cos() } else { (2. * x).sin() }, 0.)
        });
        let coeffs = fo.forward_axis(&values, 1);
        for (k, c) in [(1, 0.5), (3, 0.5)] {
            assert!((coeffs[[0, k]] - Complex::new(c, 0.)).norm() < 1e-12);
        }
        assert!((coeffs[[1, 4]] - Complex::new(0., -0.5)).norm() < 1e-12);
        assert!((coeffs[[1, 0]] - Complex::new(0., 0.5)).norm() < 1e-12);
        approx_eq_complex(&fo.backward_axis(&coeffs, 1), &values);
    }

    #[test]
    fn test_mult_sin2() {
        let mut fo = Fourier::new(9);
        // sin^2(x) * 1 = 1/2 - cos(2x)/2
        let mut one = Array1::<Complex>::zeros(9);
        one[4] = Complex::new(1., 0.);
        let prod = fo.mult_sin2().dot(&one);
        let values = fo.backward(&prod);
        let expected = fo.x.mapv(|x| Complex::new(x.sin().powi(2), 0.));
        approx_eq_complex(&values, &expected);
        // cos(x)sin(x) * 1
        let prod = fo.mult_cossin().dot(&one);
        let expected = fo.x.mapv(|x| Complex::new(x.sin() * x.cos(), 0.));
        approx_eq_complex(&fo.backward(&prod), &expected);
    }

    #[test]
    fn test_alias_coeffs() {
        let c = array![
            Complex::new(1., 0.),
            Complex::new(2., 0.),
            Complex::new(3., 0.),
            Complex::new(4., 0.),
            Complex::new(5., 0.)
        ];
        // k = -2..2 onto n = 3 (k = -1..1): -2 -> 1, 2 -> -1
        let out = alias_coeffs(&c, 3);
        approx_eq_complex(
            &out,
            &array![
                Complex::new(7., 0.),
                Complex::new(3., 0.),
                Complex::new(5., 0.)
            ],
        );
        let padded = alias_coeffs(&c, 8);
        assert_eq!(padded[2], c[0]);
        assert_eq!(padded[6], c[4]);
    }
}
