//! # Variable step BDF2 for stiff DAEs
//!
//! Second order backward differentiation with step size control.
//! The first steps are implicit Euler steps with step doubling,
//! which provide the error estimate and the three history points
//! BDF2 needs. Every step solves
//!
//! `G(y) = M (y - psi) - h beta f(t, y) = 0`
//!
//! with a simplified Newton iteration. The finite difference
//! Jacobian is reused between steps and refreshed once Newton fails.
use super::{Control, DaeSystem, Integrator, Status, MAX_TIMESTEP};
use crate::error::{IntegrateError, Result};
use crate::Real;
use ndarray::prelude::*;
use ndarray::OwnedRepr;
use ndarray_linalg::solve::{Factorize, LUFactorized, Solve};
use std::collections::VecDeque;

/// Newton iterations stop once the weighted update is below this
const NEWTON_TOL: Real = 1e-2;
/// Safety factor of the step size controller
const SAFETY: Real = 0.9;
/// Bounds of the step size ratio between two steps
const MIN_FACTOR: Real = 0.2;
const MAX_FACTOR: Real = 2.0;

/// Parameters of [`Bdf`]
#[derive(Debug, Clone)]
pub struct BdfOptions {
    /// Absolute tolerance
    pub abs_tol: Real,
    /// Relative tolerance
    pub rel_tol: Real,
    /// First step size, defaults to a thousandth of the time span
    pub initial_step: Option<Real>,
    /// Largest step size, defaults to a tenth of the time span
    pub max_step: Option<Real>,
    /// Maximum number of steps
    pub max_steps: usize,
    /// Newton iterations per step
    pub max_newton: usize,
}

impl Default for BdfOptions {
    fn default() -> Self {
        BdfOptions {
            abs_tol: 1e-6,
            rel_tol: 1e-3,
            initial_step: None,
            max_step: None,
            max_steps: MAX_TIMESTEP,
            max_newton: 6,
        }
    }
}

/// Variable step BDF2 integrator
#[derive(Debug, Clone, Default)]
pub struct Bdf {
    /// Parameters
    pub opts: BdfOptions,
}

impl Bdf {
    /// Return integrator
    pub fn new(opts: BdfOptions) -> Self {
        Bdf { opts }
    }
}

enum StepOutcome {
    Accepted {
        points: Vec<(Real, Array1<Real>)>,
        factor: Real,
    },
    Rejected {
        factor: Real,
    },
}

struct Stepper<'a, S: DaeSystem> {
    system: &'a mut S,
    opts: &'a BdfOptions,
    mass: Array2<Real>,
    jac: Array2<Real>,
    jac_current: bool,
    lu: Option<(Real, LUFactorized<OwnedRepr<Real>>)>,
}

impl<'a, S: DaeSystem> Stepper<'a, S> {
    fn rhs(&mut self, t: Real, y: &Array1<Real>) -> Result<Array1<Real>> {
        let f = self.system.rhs(t, y)?;
        if f.len() != y.len() {
            return Err(IntegrateError::DimensionMismatch {
                rows: f.len(),
                cols: self.mass.ncols(),
                state: y.len(),
            }
            .into());
        }
        if f.iter().any(|v| !v.is_finite()) {
            return Err(IntegrateError::NonFinite(t).into());
        }
        Ok(f)
    }

    /// Finite difference Jacobian of f at (t, y)
    fn update_jacobian(&mut self, t: Real, y: &Array1<Real>) -> Result<()> {
        let f0 = self.rhs(t, y)?;
        let n = y.len();
        let mut jac = Array2::<Real>::zeros((n, n));
        let mut yp = y.clone();
        for j in 0..n {
            let delta = Real::EPSILON.sqrt() * y[j].abs().max(1.);
            yp[j] = y[j] + delta;
            let fp = self.rhs(t, &yp)?;
            jac.column_mut(j).assign(&((&fp - &f0) / delta));
            yp[j] = y[j];
        }
        self.jac = jac;
        self.jac_current = true;
        self.lu = None;
        Ok(())
    }

    /// LU factors of `M - hb J`, reused if hb did not change
    fn factorized(&mut self, hb: Real, t: Real) -> Result<LUFactorized<OwnedRepr<Real>>> {
        if let Some((cached, lu)) = self.lu.take() {
            if cached == hb {
                return Ok(lu);
            }
        }
        let iter_mat = &self.mass - &(&self.jac * hb);
        iter_mat
            .factorize()
            .map_err(|_| IntegrateError::Singular(t).into())
    }

    fn wnorm(&self, v: &Array1<Real>, y: &Array1<Real>) -> Real {
        let n = v.len().max(1) as Real;
        let sum: Real = v
            .iter()
            .zip(y.iter())
            .map(|(vi, yi)| {
                let w = self.opts.abs_tol + self.opts.rel_tol * yi.abs();
                (vi / w).powi(2)
            })
            .sum();
        (sum / n).sqrt()
    }

    /// Solve `M (y - psi) = hb f(t, y)`, `None` if Newton fails
    fn newton(
        &mut self,
        t: Real,
        psi: &Array1<Real>,
        hb: Real,
        guess: Array1<Real>,
    ) -> Result<Option<Array1<Real>>> {
        let lu = self.factorized(hb, t)?;
        let mut y = guess;
        let mut prev_norm = Real::INFINITY;
        let mut converged = false;
        for _ in 0..self.opts.max_newton {
            let f = self.rhs(t, &y)?;
            let g = self.mass.dot(&(&y - psi)) - &f * hb;
            let delta = lu.solve(&(-g))?;
            y += &delta;
            let norm = self.wnorm(&delta, &y);
            if !norm.is_finite() || norm > 2. * prev_norm {
                break;
            }
            if norm <= NEWTON_TOL {
                converged = true;
                break;
            }
            prev_norm = norm;
        }
        self.lu = Some((hb, lu));
        Ok(if converged { Some(y) } else { None })
    }

    fn newton_failure(&mut self, t: Real, y: &Array1<Real>) -> Result<StepOutcome> {
        if self.jac_current {
            return Ok(StepOutcome::Rejected { factor: 0.25 });
        }
        self.update_jacobian(t, y)?;
        Ok(StepOutcome::Rejected { factor: 1. })
    }

    /// Implicit Euler with step doubling
    fn startup_step(&mut self, t: Real, y: &Array1<Real>, h: Real) -> Result<StepOutcome> {
        let full = self.newton(t + h, y, h, y.clone())?;
        let half = self.newton(t + h / 2., y, h / 2., y.clone())?;
        let (full, half) = match (full, half) {
            (Some(full), Some(half)) => (full, half),
            _ => return self.newton_failure(t, y),
        };
        let two = match self.newton(t + h, &half, h / 2., half.clone())? {
            Some(two) => two,
            None => return self.newton_failure(t, y),
        };
        let err = self.wnorm(&(&two - &full), &two);
        let factor = SAFETY * err.powf(-0.5);
        if err <= 1. {
            Ok(StepOutcome::Accepted {
                points: vec![(t + h / 2., half), (t + h, two)],
                factor: factor.max(MIN_FACTOR).min(MAX_FACTOR),
            })
        } else {
            Ok(StepOutcome::Rejected {
                factor: factor.max(MIN_FACTOR).min(SAFETY),
            })
        }
    }

    /// BDF2 step from the last three history points
    fn bdf2_step(&mut self, hist: &VecDeque<(Real, Array1<Real>)>, h: Real) -> Result<StepOutcome> {
        let len = hist.len();
        let (t0, y0) = (&hist[len - 3].0, &hist[len - 3].1);
        let (t1, y1) = (&hist[len - 2].0, &hist[len - 2].1);
        let (t2, y2) = (&hist[len - 1].0, &hist[len - 1].1);
        let (t0, t1, t2) = (*t0, *t1, *t2);
        let w = h / (t2 - t1);
        let a1 = (1. + w).powi(2) / (1. + 2. * w);
        let a2 = w * w / (1. + 2. * w);
        let beta = (1. + w) / (1. + 2. * w);
        let psi = y2 * a1 - y1 * a2;
        let tn = t2 + h;
        // quadratic predictor through the history
        let l0 = (tn - t1) * (tn - t2) / ((t0 - t1) * (t0 - t2));
        let l1 = (tn - t0) * (tn - t2) / ((t1 - t0) * (t1 - t2));
        let l2 = (tn - t0) * (tn - t1) / ((t2 - t0) * (t2 - t1));
        let yp = y0 * l0 + y1 * l1 + y2 * l2;
        let yc = match self.newton(tn, &psi, h * beta, yp.clone())? {
            Some(yc) => yc,
            None => return self.newton_failure(t2, y2),
        };
        let err = h / (tn - t0) * self.wnorm(&(&yc - &yp), &yc);
        let factor = SAFETY * err.powf(-1. / 3.);
        if err <= 1. {
            Ok(StepOutcome::Accepted {
                points: vec![(tn, yc)],
                factor: factor.max(MIN_FACTOR).min(MAX_FACTOR),
            })
        } else {
            Ok(StepOutcome::Rejected {
                factor: factor.max(MIN_FACTOR).min(SAFETY),
            })
        }
    }
}

impl Integrator for Bdf {
    /// Integrate through `tspan` (strictly increasing).
    ///
    /// Steps land exactly on the output times.
    ///
    /// # Errors
    /// [`IntegrateError`] wrapped in [`crate::PdeError::Integrate`]
    fn integrate<S: DaeSystem>(
        &self,
        system: &mut S,
        tspan: &[Real],
        y0: &Array1<Real>,
    ) -> Result<Status> {
        let mass = system.mass().clone();
        let n = y0.len();
        if mass.nrows() != n || mass.ncols() != n {
            return Err(IntegrateError::DimensionMismatch {
                rows: mass.nrows(),
                cols: mass.ncols(),
                state: n,
            }
            .into());
        }
        if tspan.len() < 2 {
            return Ok(Status::Completed);
        }
        let (t_start, t_end) = (tspan[0], tspan[tspan.len() - 1]);
        let span = t_end - t_start;
        let mut st = Stepper {
            system,
            opts: &self.opts,
            mass,
            jac: Array2::zeros((n, n)),
            jac_current: false,
            lu: None,
        };
        st.update_jacobian(t_start, y0)?;

        let h_max = self.opts.max_step.unwrap_or(span / 10.);
        let mut h = self.opts.initial_step.unwrap_or(span * 1e-3).min(h_max);
        let mut history: VecDeque<(Real, Array1<Real>)> = VecDeque::with_capacity(4);
        history.push_back((t_start, y0.clone()));
        let mut steps = 0;

        for &t_out in &tspan[1..] {
            loop {
                let (t, y) = {
                    let last = &history[history.len() - 1];
                    (last.0, last.1.clone())
                };
                let remaining = t_out - t;
                if remaining <= 16. * Real::EPSILON * t_out.abs().max(span) {
                    break;
                }
                steps += 1;
                if steps > self.opts.max_steps {
                    return Err(IntegrateError::TooManySteps(self.opts.max_steps).into());
                }
                if h < 16. * Real::EPSILON * t.abs().max(span) {
                    return Err(IntegrateError::StepSizeTooSmall { t, h }.into());
                }
                let mut h_try = h.min(h_max);
                if 1.1 * h_try >= remaining {
                    h_try = remaining;
                }
                let outcome = if history.len() < 3 {
                    st.startup_step(t, &y, h_try)?
                } else {
                    st.bdf2_step(&history, h_try)?
                };
                match outcome {
                    StepOutcome::Accepted { points, factor } => {
                        for point in points {
                            history.push_back(point);
                        }
                        while history.len() > 3 {
                            history.pop_front();
                        }
                        // land exactly on the output time
                        if h_try == remaining {
                            let last = history.len() - 1;
                            history[last].0 = t_out;
                        }
                        st.jac_current = false;
                        h = h_try * factor;
                    }
                    StepOutcome::Rejected { factor } => {
                        h = h_try * factor;
                    }
                }
            }
            let y = &history[history.len() - 1].1;
            if st.system.output(t_out, y)? == Control::Stop {
                return Ok(Status::Stopped { t: t_out });
            }
        }
        Ok(Status::Completed)
    }
}
