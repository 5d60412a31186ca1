//! # User functions of pde15s
//!
//! PDE right hand sides and nonlinear boundary functionals are given as
//! [`UserFn`]. Typed variants state explicitly which independent
//! variables they take. The [`UserFn::declared`] form mirrors a call
//! signature given by parameter names; its independent variables are
//! counted as `params - SYSSIZE` and bound according to the role of the
//! function. Every variant is normalized to one canonical call
//! `(t, x, u) -> R`.
//!
//! The legacy convention passed differential operators as extra
//! arguments, `(u, t, x, diff)`. It is only accepted through
//! [`UserFn::legacy`].
use super::grid::Grid;
use crate::error::{PdeError, Result};
use crate::Real;
use log::warn;
use ndarray::prelude::*;
use std::cell::RefCell;
use std::ops::Index;
use std::rc::Rc;

/// Records the highest derivative requested per variable
#[derive(Debug, Default)]
pub struct OrderProbe {
    orders: RefCell<Vec<usize>>,
}

impl OrderProbe {
    /// Probe for `sys_size` variables
    pub fn new(sys_size: usize) -> Self {
        OrderProbe {
            orders: RefCell::new(vec![0; sys_size]),
        }
    }

    fn record(&self, index: usize, order: usize) {
        let mut orders = self.orders.borrow_mut();
        if orders[index] < order {
            orders[index] = order;
        }
    }

    /// Highest derivative seen per variable
    pub fn orders(&self) -> Vec<usize> {
        self.orders.borrow().clone()
    }
}

/// One dependent variable at the current discretization
#[derive(Clone)]
pub struct Var {
    index: usize,
    values: Array1<Real>,
    grid: Rc<Grid>,
    probe: Option<Rc<OrderProbe>>,
}

impl Var {
    /// Values at the grid points
    pub fn values(&self) -> &Array1<Real> {
        &self.values
    }

    /// Position of the variable in the system
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for an empty grid
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Derivative of order `k` at the grid points
    pub fn diff(&self, k: usize) -> Array1<Real> {
        if let Some(probe) = &self.probe {
            probe.record(self.index, k);
        }
        self.grid.diff(&self.values, k)
    }

    /// Value at the left end
    pub fn left(&self) -> Real {
        self.values[0]
    }

    /// Value at the right end
    pub fn right(&self) -> Real {
        self.values[self.values.len() - 1]
    }

    /// Derivative of order `k` at the left end
    pub fn diff_left(&self, k: usize) -> Real {
        self.diff(k)[0]
    }

    /// Derivative of order `k` at the right end
    pub fn diff_right(&self, k: usize) -> Real {
        let d = self.diff(k);
        d[d.len() - 1]
    }

    /// Evaluate the interpolant at x
    pub fn eval(&self, x: Real) -> Real {
        self.grid.eval(&self.values, x)
    }

    /// Definite integral over the domain
    pub fn sum(&self) -> Real {
        self.grid.integrate(&self.values)
    }

    /// Indefinite integral vanishing at the left end
    pub fn cumsum(&self) -> Array1<Real> {
        self.grid.cumsum(&self.values)
    }
}

/// The `SYSSIZE` dependent variables of a system
#[derive(Clone)]
pub struct Fields {
    vars: Vec<Var>,
    grid: Rc<Grid>,
}

impl Fields {
    /// Split the stacked state `[u_0; u_1; ...]` into variables
    pub fn from_state(y: &Array1<Real>, sys_size: usize, grid: Rc<Grid>) -> Self {
        Self::build(y, sys_size, grid, None)
    }

    /// Like [`Fields::from_state`], recording derivative orders in `probe`
    pub fn probe(y: &Array1<Real>, sys_size: usize, grid: Rc<Grid>, probe: Rc<OrderProbe>) -> Self {
        Self::build(y, sys_size, grid, Some(probe))
    }

    fn build(
        y: &Array1<Real>,
        sys_size: usize,
        grid: Rc<Grid>,
        probe: Option<Rc<OrderProbe>>,
    ) -> Self {
        let n = grid.n;
        let vars = (0..sys_size)
            .map(|k| Var {
                index: k,
                values: y.slice(s![k * n..(k + 1) * n]).to_owned(),
                grid: Rc::clone(&grid),
                probe: probe.clone(),
            })
            .collect();
        Fields { vars, grid }
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True for a system without variables
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// All variables
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// Grid points
    pub fn x(&self) -> &Array1<Real> {
        &self.grid.x
    }
}

impl Index<usize> for Fields {
    type Output = Var;

    fn index(&self, k: usize) -> &Var {
        &self.vars[k]
    }
}

/// Operators passed to functions of the legacy convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Derivative, `diff(u, k)`
    Diff,
    /// Definite integral, broadcast to the grid
    Sum,
    /// Indefinite integral
    Cumsum,
}

impl Operator {
    /// Operator of a legacy parameter name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "diff" | "D" => Some(Operator::Diff),
            "sum" | "int" => Some(Operator::Sum),
            "cumsum" => Some(Operator::Cumsum),
            _ => None,
        }
    }

    /// Apply to a variable, `order` is used by [`Operator::Diff`] only
    pub fn apply(&self, u: &Var, order: usize) -> Array1<Real> {
        match self {
            Operator::Diff => u.diff(order),
            Operator::Sum => Array1::from_elem(u.len(), u.sum()),
            Operator::Cumsum => u.cumsum(),
        }
    }
}

/// Argument of a [`UserFn::declared`] function
#[derive(Clone, Copy)]
pub enum Arg<'a> {
    /// Time
    Time(Real),
    /// Grid points
    Space(&'a Array1<Real>),
    /// Dependent variable
    Var(&'a Var),
    /// Legacy operator
    Operator(Operator),
}

impl<'a> Arg<'a> {
    /// Time, if this is a time argument
    pub fn time(&self) -> Option<Real> {
        match self {
            Arg::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Grid points, if this is a space argument
    pub fn space(&self) -> Option<&'a Array1<Real>> {
        match self {
            Arg::Space(x) => Some(x),
            _ => None,
        }
    }

    /// Variable, if this is a variable argument
    pub fn var(&self) -> Option<&'a Var> {
        match self {
            Arg::Var(u) => Some(u),
            _ => None,
        }
    }

    /// Operator, if this is an operator argument
    pub fn operator(&self) -> Option<Operator> {
        match self {
            Arg::Operator(op) => Some(*op),
            _ => None,
        }
    }
}

/// Where a user function is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Right hand side of the PDE
    Interior,
    /// Left boundary functional
    Left,
    /// Right boundary functional
    Right,
    /// Interior point functional
    Middle,
}

type VarsFn<R> = Box<dyn Fn(&Fields) -> R>;
type SpaceFn<R> = Box<dyn Fn(&Array1<Real>, &Fields) -> R>;
type TimeFn<R> = Box<dyn Fn(Real, &Fields) -> R>;
type TimeSpaceFn<R> = Box<dyn Fn(Real, &Array1<Real>, &Fields) -> R>;
type DeclaredFn<R> = Box<dyn Fn(&[Arg]) -> R>;

/// User supplied function of the dependent variables
pub enum UserFn<R> {
    /// `f(u)`
    Vars(VarsFn<R>),
    /// `f(x, u)`
    Space(SpaceFn<R>),
    /// `f(t, u)`
    Time(TimeFn<R>),
    /// `f(t, x, u)`
    TimeSpace(TimeSpaceFn<R>),
    /// Function of named parameters, called with one [`Arg`] per name
    Declared {
        /// Parameter names in call order
        params: Vec<String>,
        /// Legacy convention, `(u.., t, x, operators..)`
        legacy: bool,
        /// The function
        f: DeclaredFn<R>,
    },
}

impl<R> UserFn<R> {
    /// `f(u)`
    pub fn new<F: Fn(&Fields) -> R + 'static>(f: F) -> Self {
        UserFn::Vars(Box::new(f))
    }

    /// `f(x, u)`
    pub fn with_x<F: Fn(&Array1<Real>, &Fields) -> R + 'static>(f: F) -> Self {
        UserFn::Space(Box::new(f))
    }

    /// `f(t, u)`
    pub fn with_t<F: Fn(Real, &Fields) -> R + 'static>(f: F) -> Self {
        UserFn::Time(Box::new(f))
    }

    /// `f(t, x, u)`
    pub fn with_tx<F: Fn(Real, &Array1<Real>, &Fields) -> R + 'static>(f: F) -> Self {
        UserFn::TimeSpace(Box::new(f))
    }

    /// Function of named parameters, independent variables first
    ///
    /// ```
    /// use chebpde::{Arg, UserFn};
    /// // f(t, u) = u - t
    /// let bc = UserFn::declared(&["t", "u"], |a: &[Arg]| {
    ///     let t = a[0].time().unwrap_or(0.);
    ///     a[1].var().map_or(vec![], |u| vec![u.left() - t])
    /// });
    /// # let _ = bc;
    /// ```
    pub fn declared<F: Fn(&[Arg]) -> R + 'static>(params: &[&str], f: F) -> Self {
        UserFn::Declared {
            params: params.iter().map(|p| p.to_string()).collect(),
            legacy: false,
            f: Box::new(f),
        }
    }

    /// Function of the legacy convention: variables first, then
    /// independent variables, then operators named `diff`, `D`,
    /// `sum`, `cumsum` or `int`.
    pub fn legacy<F: Fn(&[Arg]) -> R + 'static>(params: &[&str], f: F) -> Self {
        UserFn::Declared {
            params: params.iter().map(|p| p.to_string()).collect(),
            legacy: true,
            f: Box::new(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Time,
    Space,
    Var(usize),
    Op(Operator),
}

/// User function with the canonical call `(t, x, u)`
pub struct NormalizedFn<R> {
    inner: UserFn<R>,
    slots: Vec<Slot>,
}

impl<R> NormalizedFn<R> {
    /// Evaluate at time `t`, grid `x` and variables `u`
    pub fn call(&self, t: Real, x: &Array1<Real>, u: &Fields) -> R {
        match &self.inner {
            UserFn::Vars(f) => f(u),
            UserFn::Space(f) => f(x, u),
            UserFn::Time(f) => f(t, u),
            UserFn::TimeSpace(f) => f(t, x, u),
            UserFn::Declared { f, .. } => {
                let args: Vec<Arg> = self
                    .slots
                    .iter()
                    .map(|slot| match *slot {
                        Slot::Time => Arg::Time(t),
                        Slot::Space => Arg::Space(x),
                        Slot::Var(k) => Arg::Var(&u[k]),
                        Slot::Op(op) => Arg::Operator(op),
                    })
                    .collect();
                f(&args)
            }
        }
    }
}

/// Bring a user function into the canonical form
///
/// # Errors
/// [`PdeError::Parse`] if the number of independent variables is not
/// 0, 1 or 2, or if a non legacy function declares an operator name.
pub fn normalize<R>(user: UserFn<R>, role: Role, sys_size: usize) -> Result<NormalizedFn<R>> {
    let slots = match &user {
        UserFn::Declared { params, legacy, .. } => bind_slots(params, *legacy, role, sys_size)?,
        _ => vec![],
    };
    Ok(NormalizedFn { inner: user, slots })
}

fn bind_slots(params: &[String], legacy: bool, role: Role, sys_size: usize) -> Result<Vec<Slot>> {
    let ops: Vec<Operator> = params
        .iter()
        .filter_map(|p| Operator::from_name(p))
        .collect();
    if !legacy && !ops.is_empty() {
        return Err(PdeError::Parse(format!(
            "parameters {:?} name legacy operators, use UserFn::legacy for this convention",
            params
        )));
    }
    let independent = params.len() as isize - sys_size as isize - ops.len() as isize;
    let indep: Vec<Slot> = match independent {
        0 => vec![],
        1 => match role {
            Role::Interior => vec![Slot::Space],
            Role::Left | Role::Right => vec![Slot::Time],
            Role::Middle => {
                warn!("Ambiguous independent variable of a middle condition, assuming time");
                vec![Slot::Time]
            }
        },
        2 => vec![Slot::Time, Slot::Space],
        _ => {
            return Err(PdeError::Parse(format!(
                "{} parameters for a system of {} variables, expected 0, 1 or 2 independent variables",
                params.len(),
                sys_size
            )))
        }
    };
    let vars = (0..sys_size).map(Slot::Var);
    if legacy {
        warn!("The operator argument convention is deprecated, pass (t, x, u) instead");
        Ok(vars
            .chain(indep)
            .chain(ops.into_iter().map(Slot::Op))
            .collect())
    } else {
        Ok(indep.into_iter().chain(vars).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(values: Array1<f64>, sys_size: usize) -> Fields {
        let n = values.len() / sys_size;
        Fields::from_state(&values, sys_size, Rc::new(Grid::new(n, [-1., 1.])))
    }

    #[test]
    fn test_var_calculus() {
        let grid = Rc::new(Grid::new(9, [0., 1.]));
        let y = grid.x.mapv(|x| x * x);
        let u = Fields::from_state(&y, 1, Rc::clone(&grid));
        assert!((u[0].diff_right(1) - 2.).abs() < 1e-10);
        assert!((u[0].sum() - 1. / 3.).abs() < 1e-12);
        assert!((u[0].eval(0.5) - 0.25).abs() < 1e-12);
        assert_eq!(u[0].left(), 0.);
    }

    #[test]
    fn test_probe_records_orders() {
        let grid = Rc::new(Grid::new(9, [-1., 1.]));
        let probe = Rc::new(OrderProbe::new(2));
        let u = Fields::probe(&Array1::ones(18), 2, grid, Rc::clone(&probe));
        let _ = &u[0].diff(2) + &u[1].diff(1) + &u[0].diff(1);
        assert_eq!(probe.orders(), vec![2, 1]);
    }

    #[test]
    fn test_declared_binding() {
        let u = fields(Array1::ones(18), 2);
        let x = u.x().clone();
        // (t, u, v) at the left boundary: one independent variable is time
        let f = UserFn::declared(&["t", "u", "v"], |a: &[Arg]| {
            a[0].time().unwrap_or(f64::NAN) + a[2].var().map_or(0., |v| v.left())
        });
        let f = normalize(f, Role::Left, 2).unwrap();
        assert_eq!(f.call(3., &x, &u), 4.);
        // interior: the same signature binds space
        let g = UserFn::declared(&["x", "u", "v"], |a: &[Arg]| a[0].space().map_or(0., |x| x[0]));
        let g = normalize(g, Role::Interior, 2).unwrap();
        assert_eq!(g.call(3., &x, &u), -1.);
    }

    #[test]
    fn test_legacy_reorders() {
        let x = Grid::new(9, [-1., 1.]).x;
        let u = fields(x.mapv(|x| x * x), 1);
        let f = UserFn::legacy(&["u", "t", "x", "diff"], |a: &[Arg]| {
            let (u, t) = (a[0].var(), a[1].time());
            match (u, t, a[3].operator()) {
                (Some(u), Some(t), Some(op)) => op.apply(u, 2)[0] + t,
                _ => f64::NAN,
            }
        });
        let f = normalize(f, Role::Interior, 1).unwrap();
        // second derivative of the interpolant of x^2
        assert!((f.call(1., &x, &u) - 3.).abs() < 1e-8);
    }

    #[test]
    fn test_parse_errors() {
        let f = UserFn::declared(&["t", "x", "y", "u"], |_: &[Arg]| 0.);
        assert!(matches!(normalize(f, Role::Interior, 1), Err(PdeError::Parse(_))));
        let f = UserFn::declared(&["u", "diff"], |_: &[Arg]| 0.);
        assert!(matches!(normalize(f, Role::Interior, 1), Err(PdeError::Parse(_))));
        let f = UserFn::declared(&["u", "v"], |_: &[Arg]| 0.);
        assert!(matches!(normalize(f, Role::Interior, 3), Err(PdeError::Parse(_))));
    }
}
