//! # Boundary conditions of pde15s
//!
//! A boundary condition on the left or right end is one of
//! - a tag, `"dirichlet"`, `"neumann"` or `"periodic"`, with zero data
//! - a tag with a value, constant, per variable or time dependent
//! - a nonlinear functional `f(t, u)` of the solution, whose entries
//!   must vanish
//!
//! Interior conditions (`middle`) accept functionals only.
//!
//! Tags constrain every variable which carries a derivative. Linear
//! conditions turn into row generators acting on the stacked grid
//! values `[u_0; u_1; ...]`. They are resolution independent: the rows
//! are generated anew for every grid length. Functionals reserve
//! placeholder rows which are overwritten during residual evaluation.
use super::grid::Grid;
use super::handle::{normalize, Fields, NormalizedFn, Role, UserFn};
use crate::error::{PdeError, Result};
use crate::Real;
use enum_dispatch::enum_dispatch;
use ndarray::prelude::*;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

/// Data of a tagged boundary condition
#[derive(Clone)]
pub enum BcValue {
    /// Same value for every constrained variable
    Const(Real),
    /// One value per variable of the system
    PerVariable(Vec<Real>),
    /// Time dependent value
    Time(Rc<dyn Fn(Real) -> Real>),
    /// Unparsed value, must hold a number
    Raw(String),
}

impl fmt::Debug for BcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BcValue::Const(v) => write!(f, "Const({})", v),
            BcValue::PerVariable(v) => write!(f, "PerVariable({:?})", v),
            BcValue::Time(_) => write!(f, "Time(..)"),
            BcValue::Raw(s) => write!(f, "Raw({:?})", s),
        }
    }
}

/// Boundary condition at one location
pub enum BcSpec {
    /// Tag with zero data
    Tag(String),
    /// Tag with data
    TagValue(String, BcValue),
    /// Nonlinear functional, its entries are driven to zero
    Functional(UserFn<Vec<Real>>),
    /// Operator/value pair of an old input form, no longer supported
    OpVal {
        /// Operator description
        op: String,
        /// Value
        val: Real,
    },
}

impl BcSpec {
    /// Homogeneous Dirichlet condition
    pub fn dirichlet() -> Self {
        BcSpec::Tag("dirichlet".into())
    }

    /// Homogeneous Neumann condition
    pub fn neumann() -> Self {
        BcSpec::Tag("neumann".into())
    }

    /// Periodic condition
    pub fn periodic() -> Self {
        BcSpec::Tag("periodic".into())
    }

    /// Tag with a constant value
    pub fn value(tag: &str, val: Real) -> Self {
        BcSpec::TagValue(tag.into(), BcValue::Const(val))
    }

    /// Nonlinear functional
    pub fn functional(f: UserFn<Vec<Real>>) -> Self {
        BcSpec::Functional(f)
    }

    fn is_periodic(&self) -> bool {
        match self {
            BcSpec::Tag(tag) | BcSpec::TagValue(tag, _) => tag.eq_ignore_ascii_case("periodic"),
            _ => false,
        }
    }
}

/// Conditions at the left end, interior and right end
#[derive(Default)]
pub struct BoundaryConditions {
    /// Left end
    pub left: Option<BcSpec>,
    /// Right end
    pub right: Option<BcSpec>,
    /// Interior functional
    pub middle: Option<BcSpec>,
}

impl BoundaryConditions {
    /// No conditions
    pub fn new() -> Self {
        Self::default()
    }

    /// Periodic conditions on both ends
    pub fn periodic() -> Self {
        BoundaryConditions {
            left: Some(BcSpec::periodic()),
            right: Some(BcSpec::periodic()),
            middle: None,
        }
    }

    /// Set the left condition
    pub fn with_left(mut self, bc: BcSpec) -> Self {
        self.left = Some(bc);
        self
    }

    /// Set the right condition
    pub fn with_right(mut self, bc: BcSpec) -> Self {
        self.right = Some(bc);
        self
    }

    /// Set the interior condition
    pub fn with_middle(mut self, bc: BcSpec) -> Self {
        self.middle = Some(bc);
        self
    }
}

/// Generates constraint rows at a given resolution
#[enum_dispatch]
pub trait RowGenerator {
    /// Rows acting on the stacked grid values of `sys_size` variables
    fn rows(&self, grid: &Grid, sys_size: usize) -> Array2<Real>;
    /// Number of rows
    fn height(&self) -> usize;
}

/// Row generators of all supported conditions
#[enum_dispatch(RowGenerator)]
pub enum RowOp {
    /// Point evaluation of a derivative at an end
    Point(PointRow),
    /// Equal derivatives at both ends
    Periodic(PeriodicRow),
    /// Zero rows reserved for a functional
    Placeholder(PlaceholderRows),
}

/// End of the interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left end
    Left,
    /// Right end
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Derivative of order `order` at one end, one row per variable
pub struct PointRow {
    side: Side,
    order: usize,
    vars: Vec<usize>,
}

impl RowGenerator for PointRow {
    fn rows(&self, grid: &Grid, sys_size: usize) -> Array2<Real> {
        let n = grid.n;
        let idx = match self.side {
            Side::Left => 0,
            Side::Right => n - 1,
        };
        let d = grid.diff_matrix(self.order);
        let mut rows = Array2::zeros((self.vars.len(), sys_size * n));
        for (i, &k) in self.vars.iter().enumerate() {
            rows.slice_mut(s![i, k * n..(k + 1) * n]).assign(&d.row(idx));
        }
        rows
    }

    fn height(&self) -> usize {
        self.vars.len()
    }
}

/// Difference of derivatives `0..order` at both ends per variable
pub struct PeriodicRow {
    /// (variable, differential order)
    vars: Vec<(usize, usize)>,
}

impl RowGenerator for PeriodicRow {
    fn rows(&self, grid: &Grid, sys_size: usize) -> Array2<Real> {
        let n = grid.n;
        let mut rows = Array2::zeros((self.height(), sys_size * n));
        let mut i = 0;
        for &(k, order) in &self.vars {
            for j in 0..order {
                let d = grid.diff_matrix(j);
                let row = &d.row(0) - &d.row(n - 1);
                rows.slice_mut(s![i, k * n..(k + 1) * n]).assign(&row);
                i += 1;
            }
        }
        rows
    }

    fn height(&self) -> usize {
        self.vars.iter().map(|(_, order)| order).sum()
    }
}

/// Zero rows
pub struct PlaceholderRows {
    height: usize,
}

impl RowGenerator for PlaceholderRows {
    fn rows(&self, grid: &Grid, sys_size: usize) -> Array2<Real> {
        Array2::zeros((self.height, sys_size * grid.n))
    }

    fn height(&self) -> usize {
        self.height
    }
}

/// Right hand side of one linear row
#[derive(Clone)]
pub enum RowValue {
    /// Constant
    Const(Real),
    /// Evaluated at the current time
    Time(Rc<dyn Fn(Real) -> Real>),
}

impl RowValue {
    fn at(&self, t: Real) -> Real {
        match self {
            RowValue::Const(v) => *v,
            RowValue::Time(f) => f(t),
        }
    }
}

/// Functional owning a range of constraint rows
pub struct NonlinearBc {
    /// Rows of the constraint block
    pub rows: Range<usize>,
    f: NormalizedFn<Vec<Real>>,
}

impl NonlinearBc {
    /// Evaluate the functional
    ///
    /// # Errors
    /// [`PdeError::Config`] if the number of entries changed.
    pub fn eval(&self, t: Real, x: &Array1<Real>, u: &Fields) -> Result<Vec<Real>> {
        let out = self.f.call(t, x, u);
        if out.len() != self.rows.len() {
            return Err(PdeError::Config(format!(
                "boundary functional returned {} values, expected {}",
                out.len(),
                self.rows.len()
            )));
        }
        Ok(out)
    }
}

/// What the row builder needs to know about the system
pub struct BcContext<'a> {
    /// Grid of the initial condition
    pub grid: Rc<Grid>,
    /// Number of variables
    pub sys_size: usize,
    /// Highest derivative per variable
    pub diff_order: &'a [usize],
    /// Initial time
    pub t0: Real,
    /// Initial state, used to size functionals
    pub y0: &'a Array1<Real>,
}

/// All constraint rows of a system, left, middle and right in this order
pub struct BoundaryConstraintSet {
    ops: Vec<RowOp>,
    values: Vec<RowValue>,
    nonlinear: Vec<NonlinearBc>,
}

impl BoundaryConstraintSet {
    /// Translate the user conditions
    ///
    /// # Errors
    /// [`PdeError::Config`] for unknown tags, non numeric values,
    /// unsupported input forms, or if the number of rows does not match
    /// the total differential order. [`PdeError::Parse`] if a functional
    /// can not be normalized.
    pub fn build(bc: BoundaryConditions, ctx: &BcContext) -> Result<Self> {
        let mut set = BoundaryConstraintSet {
            ops: vec![],
            values: vec![],
            nonlinear: vec![],
        };
        let BoundaryConditions {
            left,
            right,
            middle,
        } = bc;
        let left_periodic = left.as_ref().map_or(false, BcSpec::is_periodic);
        let right_periodic = right.as_ref().map_or(false, BcSpec::is_periodic);
        if (left_periodic && right.is_some() && !right_periodic)
            || (right_periodic && left.is_some() && !left_periodic)
        {
            return Err(PdeError::Config(
                "periodic condition on one end requires periodic or no condition on the other"
                    .into(),
            ));
        }

        if let Some(spec) = left {
            set.push_side(spec, Side::Left, ctx)?;
        }
        if let Some(spec) = middle {
            match spec {
                BcSpec::Functional(f) => set.push_functional(f, Role::Middle, ctx)?,
                _ => {
                    return Err(PdeError::Config(
                        "middle condition must be a functional of the solution".into(),
                    ))
                }
            }
        }
        match right {
            // periodic rows were generated with the left end
            Some(_) if left_periodic && right_periodic => (),
            Some(spec) => set.push_side(spec, Side::Right, ctx)?,
            None => (),
        }

        let total: usize = ctx.diff_order.iter().sum();
        if set.row_count() != total {
            return Err(PdeError::Config(format!(
                "{} boundary rows for a total differential order of {}, check boundary conditions",
                set.row_count(),
                total
            )));
        }
        Ok(set)
    }

    fn push_side(&mut self, spec: BcSpec, side: Side, ctx: &BcContext) -> Result<()> {
        let role = match side {
            Side::Left => Role::Left,
            Side::Right => Role::Right,
        };
        let (tag, value) = match spec {
            BcSpec::Functional(f) => return self.push_functional(f, role, ctx),
            BcSpec::OpVal { op, .. } => {
                return Err(PdeError::Config(format!(
                    "{} condition: operator/value input ({}) is no longer supported",
                    side, op
                )))
            }
            BcSpec::Tag(tag) => (tag, BcValue::Const(0.)),
            BcSpec::TagValue(tag, value) => (tag, value),
        };
        let vars: Vec<usize> = (0..ctx.sys_size)
            .filter(|&k| ctx.diff_order[k] > 0)
            .collect();
        let order = match tag.to_ascii_lowercase().as_str() {
            "dirichlet" => 0,
            "neumann" => 1,
            "periodic" => {
                if !matches!(value, BcValue::Const(v) if v == 0.) {
                    return Err(PdeError::Config(format!(
                        "{} condition: periodic conditions take no value",
                        side
                    )));
                }
                let op = PeriodicRow {
                    vars: vars.iter().map(|&k| (k, ctx.diff_order[k])).collect(),
                };
                self.values
                    .extend(std::iter::repeat(RowValue::Const(0.)).take(op.height()));
                self.ops.push(op.into());
                return Ok(());
            }
            other => {
                return Err(PdeError::Config(format!(
                    "{} condition: unknown boundary condition '{}'",
                    side, other
                )))
            }
        };
        for &k in &vars {
            let v = row_value(&value, k, ctx.sys_size, side)?;
            self.values.push(v);
        }
        self.ops.push(PointRow { side, order, vars }.into());
        Ok(())
    }

    fn push_functional(&mut self, f: UserFn<Vec<Real>>, role: Role, ctx: &BcContext) -> Result<()> {
        let f = normalize(f, role, ctx.sys_size)?;
        let u = Fields::from_state(ctx.y0, ctx.sys_size, Rc::clone(&ctx.grid));
        let height = f.call(ctx.t0, &ctx.grid.x, &u).len();
        let start = self.row_count();
        self.nonlinear.push(NonlinearBc {
            rows: start..start + height,
            f,
        });
        self.values
            .extend(std::iter::repeat(RowValue::Const(0.)).take(height));
        self.ops.push(PlaceholderRows { height }.into());
        Ok(())
    }

    /// Number of constraint rows
    pub fn row_count(&self) -> usize {
        self.ops.iter().map(RowGenerator::height).sum()
    }

    /// Stacked constraint rows at the resolution of `grid`
    pub fn matrix(&self, grid: &Grid, sys_size: usize) -> Array2<Real> {
        let mut b = Array2::zeros((self.row_count(), sys_size * grid.n));
        let mut i = 0;
        for op in &self.ops {
            let h = op.height();
            b.slice_mut(s![i..i + h, ..]).assign(&op.rows(grid, sys_size));
            i += h;
        }
        b
    }

    /// Right hand side of the linear rows at time `t`
    pub fn rhs(&self, t: Real) -> Array1<Real> {
        self.values.iter().map(|v| v.at(t)).collect()
    }

    /// Functionals and the rows they own
    pub fn nonlinear(&self) -> &[NonlinearBc] {
        &self.nonlinear
    }
}

fn row_value(value: &BcValue, k: usize, sys_size: usize, side: Side) -> Result<RowValue> {
    match value {
        BcValue::Const(v) => Ok(RowValue::Const(*v)),
        BcValue::PerVariable(vals) => {
            if vals.len() != sys_size {
                return Err(PdeError::Config(format!(
                    "{} condition: {} values for {} variables",
                    side,
                    vals.len(),
                    sys_size
                )));
            }
            Ok(RowValue::Const(vals[k]))
        }
        BcValue::Time(f) => Ok(RowValue::Time(Rc::clone(f))),
        BcValue::Raw(s) => s.trim().parse::<Real>().map(RowValue::Const).map_err(|_| {
            PdeError::Config(format!(
                "{} condition: value '{}' is not a number",
                side, s
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(grid: &Rc<Grid>, order: &'a [usize], y0: &'a Array1<f64>) -> BcContext<'a> {
        BcContext {
            grid: Rc::clone(grid),
            sys_size: order.len(),
            diff_order: order,
            t0: 0.,
            y0,
        }
    }

    #[test]
    fn test_dirichlet_neumann_rows() {
        let grid = Rc::new(Grid::new(9, [0., 2.]));
        let y0 = Array1::zeros(9);
        let bc = BoundaryConditions::new()
            .with_left(BcSpec::value("dirichlet", 2.))
            .with_right(BcSpec::neumann());
        let set = BoundaryConstraintSet::build(bc, &context(&grid, &[2], &y0)).unwrap();
        assert_eq!(set.row_count(), 2);
        let b = set.matrix(&grid, 1);
        assert_eq!(b[[0, 0]], 1.);
        assert_eq!(b.row(0).sum(), 1.);
        // derivative of x at the right end
        assert!((b.row(1).dot(&grid.x) - 1.).abs() < 1e-12);
        assert_eq!(set.rhs(0.), array![2., 0.]);
    }

    #[test]
    fn test_periodic_rows_per_order() {
        let grid = Rc::new(Grid::new(9, [-1., 1.]));
        let y0 = Array1::zeros(18);
        let set =
            BoundaryConstraintSet::build(BoundaryConditions::periodic(), &context(&grid, &[2, 1], &y0))
                .unwrap();
        assert_eq!(set.row_count(), 3);
        let b = set.matrix(&grid, 2);
        // equal values and slopes at both ends give zero rows
        let u = grid.x.mapv(|x| (1. - x * x).powi(2) + 0.5);
        let mut y = Array1::zeros(18);
        y.slice_mut(s![..9]).assign(&u);
        y.slice_mut(s![9..]).assign(&u);
        for v in b.dot(&y).iter() {
            assert!(v.abs() < 1e-10);
        }
        // one sided periodic
        let bc = BoundaryConditions::new().with_left(BcSpec::periodic());
        let set = BoundaryConstraintSet::build(bc, &context(&grid, &[2, 1], &y0)).unwrap();
        assert_eq!(set.row_count(), 3);
    }

    #[test]
    fn test_functional_height_and_order() {
        let grid = Rc::new(Grid::new(9, [-1., 1.]));
        let y0 = Array1::zeros(9);
        let bc = BoundaryConditions::new()
            .with_left(BcSpec::functional(UserFn::with_t(|t, u| vec![u[0].left() - t])))
            .with_right(BcSpec::dirichlet());
        let set = BoundaryConstraintSet::build(bc, &context(&grid, &[2], &y0)).unwrap();
        assert_eq!(set.nonlinear().len(), 1);
        assert_eq!(set.nonlinear()[0].rows, 0..1);
        assert_eq!(set.matrix(&grid, 1).row(0).sum(), 0.);
        assert_eq!(set.matrix(&grid, 1)[[1, 8]], 1.);
    }

    #[test]
    fn test_per_variable_values() {
        let grid = Rc::new(Grid::new(9, [-1., 1.]));
        let y0 = Array1::zeros(18);
        let bc = BoundaryConditions::new()
            .with_left(BcSpec::TagValue(
                "dirichlet".into(),
                BcValue::PerVariable(vec![1., 3.]),
            ))
            .with_right(BcSpec::TagValue(
                "neumann".into(),
                BcValue::PerVariable(vec![0., -2.]),
            ));
        let set = BoundaryConstraintSet::build(bc, &context(&grid, &[2, 2], &y0)).unwrap();
        assert_eq!(set.rhs(0.), array![1., 3., 0., -2.]);
        let b = set.matrix(&grid, 2);
        assert_eq!(b[[0, 0]], 1.);
        assert_eq!(b[[1, 9]], 1.);
        // neumann row of the second variable acts on its own block only
        assert_eq!(b.slice(s![3, ..9]).sum(), 0.);

        let bc = BoundaryConditions::new()
            .with_left(BcSpec::TagValue("dirichlet".into(), BcValue::PerVariable(vec![1.])))
            .with_right(BcSpec::dirichlet());
        assert!(matches!(
            BoundaryConstraintSet::build(bc, &context(&grid, &[2, 2], &y0)),
            Err(PdeError::Config(_))
        ));
    }

    #[test]
    fn test_time_dependent_value() {
        let grid = Rc::new(Grid::new(9, [-1., 1.]));
        let y0 = Array1::zeros(9);
        let bc = BoundaryConditions::new()
            .with_left(BcSpec::TagValue(
                "dirichlet".into(),
                BcValue::Time(Rc::new(|t: f64| 2. * t)),
            ))
            .with_right(BcSpec::value("dirichlet", 1.));
        let set = BoundaryConstraintSet::build(bc, &context(&grid, &[2], &y0)).unwrap();
        assert_eq!(set.rhs(0.), array![0., 1.]);
        assert_eq!(set.rhs(1.5), array![3., 1.]);
    }

    #[test]
    fn test_functionals_on_every_side() {
        let grid = Rc::new(Grid::new(9, [-1., 1.]));
        let y0 = Array1::zeros(18);
        let bc = BoundaryConditions::new()
            .with_left(BcSpec::functional(UserFn::new(|u| vec![u[0].left()])))
            .with_middle(BcSpec::functional(UserFn::new(|u| {
                vec![u[0].sum() - 1., u[1].eval(0.)]
            })))
            .with_right(BcSpec::functional(UserFn::new(|u| vec![u[0].right() * u[1].right()])));
        let set = BoundaryConstraintSet::build(bc, &context(&grid, &[2, 2], &y0)).unwrap();
        let rows: Vec<Range<usize>> = set.nonlinear().iter().map(|f| f.rows.clone()).collect();
        assert_eq!(rows, vec![0..1, 1..3, 3..4]);
        assert_eq!(set.matrix(&grid, 2).sum(), 0.);
    }

    #[test]
    fn test_invalid_conditions() {
        let grid = Rc::new(Grid::new(9, [-1., 1.]));
        let y0 = Array1::zeros(9);
        let ctx = context(&grid, &[2], &y0);
        let check = |bc: BoundaryConditions| {
            matches!(
                BoundaryConstraintSet::build(bc, &ctx),
                Err(PdeError::Config(_))
            )
        };
        assert!(check(BoundaryConditions::new().with_left(BcSpec::Tag("robin".into()))));
        assert!(check(
            BoundaryConditions::new()
                .with_left(BcSpec::TagValue("dirichlet".into(), BcValue::Raw("one".into())))
                .with_right(BcSpec::dirichlet())
        ));
        assert!(check(BoundaryConditions::new().with_left(BcSpec::OpVal {
            op: "dirichlet".into(),
            val: 0.
        })));
        assert!(check(BoundaryConditions::new().with_middle(BcSpec::dirichlet())));
        // one row for a second order equation
        assert!(check(BoundaryConditions::new().with_left(BcSpec::dirichlet())));
        assert!(check(
            BoundaryConditions::new()
                .with_left(BcSpec::periodic())
                .with_right(BcSpec::dirichlet())
        ));
    }
}
