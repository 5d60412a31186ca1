//! # Time-chunk driver
//!
//! Integrates the DAE of [`super::assemble`] through the output times.
//! With a fixed grid (`PdeOptions::n`) the whole span is one chunk.
//! Otherwise every output is tested for resolution: the solution
//! variables are combined with the weights `1 + sin(k)`, `k = 1..SYSSIZE`,
//! and the coefficient tail of the combination must have decayed below
//! `eps`. An unresolved output stops the chunk, the grid grows to
//! `2n - 1` points and integration restarts at the last stored output.
use super::assemble::{AssemblyContext, DaeAssembler, Discretization};
use super::bc::{BcContext, BoundaryConditions, BoundaryConstraintSet};
use super::grid::Grid;
use super::handle::{normalize, Fields, NormalizedFn, OrderProbe, Role, UserFn};
use super::options::PdeOptions;
use crate::error::{IntegrateError, PdeError, Result};
use crate::field::{adaptive_length, Piecewise, Quasimatrix, SpectralFunction};
use crate::integrate::{Bdf, Control, DaeSystem, Integrator, Status};
use crate::Real;
use log::{debug, info};
use ndarray::prelude::*;
use std::rc::Rc;

/// Right hand side of a PDE system, one array per variable
pub type PdeFn = UserFn<Vec<Array1<Real>>>;

/// Solution snapshots, one column per output time
#[derive(Debug, Clone)]
pub enum Snapshots {
    /// Single variable
    Scalar(Quasimatrix),
    /// One quasimatrix per variable
    System(Vec<Quasimatrix>),
}

impl Snapshots {
    /// Number of stored times
    pub fn num_times(&self) -> usize {
        match self {
            Snapshots::Scalar(q) => q.num_columns(),
            Snapshots::System(qs) => qs.first().map_or(0, Quasimatrix::num_columns),
        }
    }

    /// Snapshots of variable `k`
    pub fn variable(&self, k: usize) -> Option<&Quasimatrix> {
        match self {
            Snapshots::Scalar(q) if k == 0 => Some(q),
            Snapshots::Scalar(_) => None,
            Snapshots::System(qs) => qs.get(k),
        }
    }
}

/// Result of [`pde15s`]
#[derive(Debug, Clone)]
pub struct PdeSolution {
    /// Output times reached
    pub t: Vec<Real>,
    /// Solution at these times
    pub u: Snapshots,
    /// Grid length of the last chunk
    pub length: usize,
}

/// How a chunk ended besides completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkEnd {
    Running,
    Unhappy,
    Interrupted,
}

/// The DAE of one chunk at a fixed grid length
struct ChunkSystem<'a> {
    disc: Rc<Discretization>,
    bcs: &'a BoundaryConstraintSet,
    pde: &'a NormalizedFn<Vec<Array1<Real>>>,
    opts: &'a PdeOptions,
    recorder: &'a mut Recorder,
    sys_size: usize,
    domain: [Real; 2],
    adaptive: bool,
    accepted: usize,
    last: Option<Array1<Real>>,
    end: ChunkEnd,
}

impl<'a> ChunkSystem<'a> {
    fn is_happy(&self, y: &Array1<Real>) -> bool {
        let n = self.disc.n;
        let mut combined = Array1::<Real>::zeros(n);
        for k in 0..self.sys_size {
            let weight = 1. + ((k + 1) as Real).sin();
            combined.scaled_add(weight, &y.slice(s![k * n..(k + 1) * n]));
        }
        SpectralFunction::from_values(combined, self.domain).is_happy(self.opts.eps)
    }
}

impl<'a> DaeSystem for ChunkSystem<'a> {
    fn rhs(&mut self, t: Real, y: &Array1<Real>) -> Result<Array1<Real>> {
        let disc = &self.disc;
        let x = &disc.grid.x;
        let u = Fields::from_state(y, self.sys_size, Rc::clone(&disc.grid));
        let f = stack_rhs(self.pde.call(t, x, &u), self.sys_size, disc.n)?;

        let mut constraints = disc.b.dot(y) - self.bcs.rhs(t);
        for nonlinear in self.bcs.nonlinear() {
            let values = Array1::from(nonlinear.eval(t, x, &u)?);
            constraints
                .slice_mut(s![nonlinear.rows.clone()])
                .assign(&values);
        }
        let nb = disc.row_indices.len();
        let mut out = Array1::zeros(y.len());
        out.slice_mut(s![disc.row_indices.clone()]).assign(&constraints);
        out.slice_mut(s![nb..]).assign(&disc.projection.dot(&f));
        Ok(out)
    }

    fn mass(&self) -> &Array2<Real> {
        &self.disc.mass
    }

    fn output(&mut self, t: Real, y: &Array1<Real>) -> Result<Control> {
        if self.adaptive && !self.is_happy(y) {
            self.end = ChunkEnd::Unhappy;
            return Ok(Control::Stop);
        }
        self.recorder.push_state(t, y, self.disc.n);
        self.accepted += 1;
        self.last = Some(y.clone());
        if self.opts.stop_requested() {
            self.end = ChunkEnd::Interrupted;
            return Ok(Control::Stop);
        }
        Ok(Control::Continue)
    }
}

/// Solve a time dependent PDE system on an interval
///
/// `pde` returns `u_t` for each variable, `u0` holds one initial
/// condition per variable, all on one interval. The solution is stored
/// at every time of `tspan`, starting with the initial condition.
///
/// # Errors
/// - [`PdeError::Config`] for an invalid time span, a fixed grid too
///   coarse for the differential order, inconsistent sizes
///   or boundary conditions whose row count does not match the total
///   differential order
/// - [`PdeError::UnsupportedInput`] for initial data with breakpoints
///   that do not merge
/// - [`PdeError::Parse`] for function signatures that can not be bound
/// - [`PdeError::Convergence`] if the grid would exceed `max_length`
/// - integrator errors otherwise
///
/// # Example
/// Heat equation with homogeneous Dirichlet conditions
/// ```
/// use chebpde::{pde15s, BcSpec, BoundaryConditions, PdeOptions, SpectralFunction, UserFn};
/// let u0 = SpectralFunction::from_fn(|x| (std::f64::consts::FRAC_PI_2 * x).cos(), [-1., 1.], 17);
/// let bc = BoundaryConditions::new()
///     .with_left(BcSpec::dirichlet())
///     .with_right(BcSpec::dirichlet());
/// let pde = UserFn::new(|u| vec![u[0].diff(2)]);
/// let sol = pde15s(pde, &[0., 0.1], vec![u0.into()], bc, PdeOptions::default().with_n(17)).unwrap();
/// assert_eq!(sol.u.num_times(), 2);
/// ```
pub fn pde15s(
    pde: PdeFn,
    tspan: &[Real],
    u0: Vec<Piecewise>,
    bc: BoundaryConditions,
    mut opts: PdeOptions,
) -> Result<PdeSolution> {
    check_tspan(tspan)?;
    if opts.n == Some(0) {
        return Err(PdeError::Config("fixed grid needs at least one point".into()));
    }
    let adaptive = opts.n.is_none();
    let initial = initial_condition(u0, &opts)?;
    let sys_size = initial.len();
    let domain = initial[0].domain();
    let pde = normalize(pde, Role::Interior, sys_size)?;

    let mut length = match opts.n {
        Some(n) => n,
        None => {
            let longest = initial.iter().map(SpectralFunction::len).max().unwrap_or(1);
            let n = adaptive_length(longest);
            if n > opts.max_length {
                return Err(PdeError::Convergence(format!(
                    "initial condition needs {} points, limit is {}",
                    n, opts.max_length
                )));
            }
            n
        }
    };
    let initial: Vec<SpectralFunction> = if adaptive {
        initial
    } else {
        initial.iter().map(|f| f.resample(length)).collect()
    };
    let mut y = stack_state(&initial, length);
    let t0 = tspan[0];
    let grid = Rc::new(Grid::new(length, domain));

    let diff_order = match opts.diff_order.take() {
        Some(order) => order,
        None => infer_diff_order(&pde, t0, &y, sys_size, &grid)?,
    };
    let pde_flag = opts
        .pde_flag
        .take()
        .unwrap_or_else(|| vec![true; sys_size]);
    if diff_order.len() != sys_size || pde_flag.len() != sys_size {
        return Err(PdeError::Config(format!(
            "{} differential orders and {} pde flags for {} variables",
            diff_order.len(),
            pde_flag.len(),
            sys_size
        )));
    }
    debug!("System of {} variables, differential orders {:?}", sys_size, diff_order);

    let bcs = BoundaryConstraintSet::build(
        bc,
        &BcContext {
            grid,
            sys_size,
            diff_order: &diff_order,
            t0,
            y0: &y,
        },
    )?;
    let ctx = AssemblyContext {
        domain,
        sys_size,
        diff_order,
        pde_flag,
        mass: opts.mass.take(),
    };
    let mut assembler = DaeAssembler::new(ctx, bcs);
    let mut recorder = Recorder::new(&mut opts, sys_size, domain, adaptive);
    recorder.push(t0, initial);
    let bdf = Bdf::new(opts.bdf_options());

    let mut cursor = 0;
    loop {
        if opts.stop_requested() {
            info!("pde15s interrupted at t = {}", tspan[cursor]);
            break;
        }
        let disc = assembler.discretize(length)?;
        let mut system = ChunkSystem {
            disc,
            bcs: assembler.constraints(),
            pde: &pde,
            opts: &opts,
            recorder: &mut recorder,
            sys_size,
            domain,
            adaptive,
            accepted: 0,
            last: None,
            end: ChunkEnd::Running,
        };
        let status = bdf
            .integrate(&mut system, &tspan[cursor..], &y)
            .map_err(clarify)?;
        let ChunkSystem {
            accepted, last, end, ..
        } = system;
        cursor += accepted;
        if let Some(state) = last {
            y = state;
        }
        match (status, end) {
            (Status::Completed, _) => break,
            (Status::Stopped { t }, ChunkEnd::Unhappy) => {
                let next = next_length(length, opts.max_length)?;
                debug!("Unresolved at t = {}, grid grows from {} to {}", t, length, next);
                y = resample_state(&y, sys_size, length, next, domain);
                length = next;
            }
            (Status::Stopped { t }, _) => {
                info!("pde15s interrupted at t = {}", t);
                break;
            }
        }
    }
    let solution = recorder.finish(sys_size, length)?;
    info!(
        "pde15s finished with {} snapshots on {} points",
        solution.t.len(),
        length
    );
    Ok(solution)
}

/// Stores snapshots and reports them to observers
struct Recorder {
    times: Vec<Real>,
    columns: Vec<Vec<SpectralFunction>>,
    observer: Option<super::options::Observer>,
    plot: Option<(bool, String)>,
    domain: [Real; 2],
    simplify: Option<Real>,
}

impl Recorder {
    fn new(opts: &mut PdeOptions, sys_size: usize, domain: [Real; 2], adaptive: bool) -> Self {
        let plot = if opts.plot {
            let style = opts.plot_style.clone().unwrap_or_else(|| "-".into());
            Some((opts.hold_plot, style))
        } else {
            None
        };
        Recorder {
            times: vec![],
            columns: vec![vec![]; sys_size],
            observer: opts.observer.take(),
            plot,
            domain,
            simplify: if adaptive { Some(opts.eps) } else { None },
        }
    }

    fn push_state(&mut self, t: Real, y: &Array1<Real>, n: usize) {
        let fns = (0..self.columns.len())
            .map(|k| {
                let f = SpectralFunction::from_values(y.slice(s![k * n..(k + 1) * n]).to_owned(), self.domain);
                match self.simplify {
                    Some(eps) => f.simplify(eps),
                    None => f,
                }
            })
            .collect();
        self.push(t, fns);
    }

    fn push(&mut self, t: Real, fns: Vec<SpectralFunction>) {
        if let Some((hold, style)) = &self.plot {
            let lengths: Vec<usize> = fns.iter().map(SpectralFunction::len).collect();
            info!(
                "t = {:.6}: lengths {:?} (style {}, hold {})",
                t, lengths, style, hold
            );
        }
        if let Some(observer) = self.observer.as_mut() {
            observer(t, &fns);
        }
        self.times.push(t);
        for (column, f) in self.columns.iter_mut().zip(fns) {
            column.push(f);
        }
    }

    fn finish(self, sys_size: usize, length: usize) -> Result<PdeSolution> {
        let mut quasi = self
            .columns
            .into_iter()
            .map(Quasimatrix::new)
            .collect::<Result<Vec<_>>>()?;
        let u = match (sys_size, quasi.pop()) {
            (1, Some(q)) => Snapshots::Scalar(q),
            (_, Some(q)) => {
                quasi.push(q);
                Snapshots::System(quasi)
            }
            (_, None) => Snapshots::System(vec![]),
        };
        Ok(PdeSolution {
            t: self.times,
            u,
            length,
        })
    }
}

/// Grid length after a rejected chunk, `2n - 1` keeps the points of
/// the coarse grid
fn next_length(length: usize, max_length: usize) -> Result<usize> {
    let next = 2 * length - 1;
    if next > max_length {
        return Err(PdeError::Convergence(format!(
            "solution not resolved on {} points, limit is {}",
            length, max_length
        )));
    }
    Ok(next)
}

fn check_tspan(tspan: &[Real]) -> Result<()> {
    if tspan.len() < 2 {
        return Err(PdeError::Config(
            "time span needs a start and at least one output time".into(),
        ));
    }
    if tspan.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(PdeError::Config(
            "time span must be strictly increasing".into(),
        ));
    }
    Ok(())
}

/// Merge breakpoints and simplify in adaptive mode
fn initial_condition(u0: Vec<Piecewise>, opts: &PdeOptions) -> Result<Vec<SpectralFunction>> {
    if u0.is_empty() {
        return Err(PdeError::Config("no initial condition given".into()));
    }
    let mut initial = Vec::with_capacity(u0.len());
    for (k, piecewise) in u0.into_iter().enumerate() {
        let merged = piecewise.merge(opts.eps, opts.max_length);
        let pieces = merged.num_pieces();
        let f = merged.into_single().ok_or_else(|| {
            PdeError::UnsupportedInput(format!(
                "initial condition of variable {} has {} pieces, piecewise data is not supported",
                k, pieces
            ))
        })?;
        initial.push(match opts.n {
            Some(_) => f,
            None => f.simplify(opts.eps),
        });
    }
    let domain = initial[0].domain();
    if initial.iter().any(|f| f.domain() != domain) {
        return Err(PdeError::Config(
            "initial conditions must share one domain".into(),
        ));
    }
    Ok(initial)
}

/// Highest derivative per variable seen while evaluating the PDE once
fn infer_diff_order(
    pde: &NormalizedFn<Vec<Array1<Real>>>,
    t0: Real,
    y: &Array1<Real>,
    sys_size: usize,
    grid: &Rc<Grid>,
) -> Result<Vec<usize>> {
    let probe = Rc::new(OrderProbe::new(sys_size));
    let u = Fields::probe(y, sys_size, Rc::clone(grid), Rc::clone(&probe));
    stack_rhs(pde.call(t0, &grid.x, &u), sys_size, grid.n)?;
    Ok(probe.orders())
}

fn stack_rhs(f: Vec<Array1<Real>>, sys_size: usize, n: usize) -> Result<Array1<Real>> {
    if f.len() != sys_size || f.iter().any(|v| v.len() != n) {
        return Err(PdeError::Config(format!(
            "PDE must return {} arrays of length {}",
            sys_size, n
        )));
    }
    let mut out = Array1::zeros(sys_size * n);
    for (k, v) in f.iter().enumerate() {
        out.slice_mut(s![k * n..(k + 1) * n]).assign(v);
    }
    Ok(out)
}

fn stack_state(fns: &[SpectralFunction], n: usize) -> Array1<Real> {
    let mut y = Array1::zeros(fns.len() * n);
    for (k, f) in fns.iter().enumerate() {
        y.slice_mut(s![k * n..(k + 1) * n])
            .assign(f.resample(n).values());
    }
    y
}

fn resample_state(y: &Array1<Real>, sys_size: usize, n: usize, m: usize, domain: [Real; 2]) -> Array1<Real> {
    let fns: Vec<SpectralFunction> = (0..sys_size)
        .map(|k| SpectralFunction::from_values(y.slice(s![k * n..(k + 1) * n]).to_owned(), domain))
        .collect();
    stack_state(&fns, m)
}

/// A size mismatch of the DAE points to the boundary conditions
fn clarify(err: PdeError) -> PdeError {
    match err {
        PdeError::Integrate(IntegrateError::DimensionMismatch { rows, cols, state }) => {
            PdeError::Config(format!(
                "DAE of size {}x{} does not match {} unknowns, check boundary conditions",
                rows, cols, state
            ))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pde::bc::BcSpec;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn dirichlet() -> BoundaryConditions {
        BoundaryConditions::new()
            .with_left(BcSpec::dirichlet())
            .with_right(BcSpec::dirichlet())
    }

    fn cosine() -> Piecewise {
        SpectralFunction::from_fn(|x| (FRAC_PI_2 * x).cos(), [-1., 1.], 17).into()
    }

    #[test]
    fn test_heat_fixed_grid() {
        let pde = UserFn::new(|u| vec![u[0].diff(2)]);
        let opts = PdeOptions::default().with_n(17);
        let sol = pde15s(pde, &[0., 0.1, 0.2], vec![cosine()], dirichlet(), opts).unwrap();
        assert_eq!(sol.t, vec![0., 0.1, 0.2]);
        let q = sol.u.variable(0).unwrap();
        assert_eq!(q.num_columns(), 3);
        let exact = (-PI * PI / 4. * 0.2).exp() * (FRAC_PI_2 * 0.3).cos();
        let got = q[2].eval(0.3);
        assert!((got - exact).abs() < 1e-4, "got {} expected {}", got, exact);
    }

    #[test]
    fn test_heat_adaptive_with_source() {
        // u_t = u_xx + pi^2/4 cos(pi x / 2) keeps the cosine steady
        let pde = UserFn::with_x(|x, u| {
            vec![u[0].diff(2) + &x.mapv(|x| PI * PI / 4. * (FRAC_PI_2 * x).cos())]
        });
        let opts = PdeOptions::default().with_eps(1e-8);
        let sol = pde15s(pde, &[0., 0.5, 1.], vec![cosine()], dirichlet(), opts).unwrap();
        let q = sol.u.variable(0).unwrap();
        assert!((q[2].eval(0.2) - (FRAC_PI_2 * 0.2).cos()).abs() < 1e-5);
    }

    #[test]
    fn test_system_with_algebraic_variable() {
        // v = u^2 without time derivative
        let pde = UserFn::new(|u| {
            let (a, b) = (&u[0], &u[1]);
            vec![a.diff(2), b.values() - &a.values().mapv(|v| v * v)]
        });
        let opts = PdeOptions::default()
            .with_n(17)
            .with_pde_flag(vec![true, false]);
        let v0 = SpectralFunction::from_fn(|x| (FRAC_PI_2 * x).cos().powi(2), [-1., 1.], 17);
        let sol = pde15s(pde, &[0., 0.05], vec![cosine(), v0.into()], dirichlet(), opts).unwrap();
        let (u, v) = (sol.u.variable(0).unwrap(), sol.u.variable(1).unwrap());
        assert!(matches!(sol.u, Snapshots::System(_)));
        let x = 0.4;
        assert!((v[1].eval(x) - u[1].eval(x).powi(2)).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_input() {
        let run = |tspan: &[f64], u0: Vec<Piecewise>, bc: BoundaryConditions| {
            let pde = UserFn::new(|u| vec![u[0].diff(2)]);
            pde15s(pde, tspan, u0, bc, PdeOptions::default().with_max_length(65))
        };
        assert!(matches!(run(&[0.], vec![cosine()], dirichlet()), Err(PdeError::Config(_))));
        assert!(matches!(run(&[0., 0.], vec![cosine()], dirichlet()), Err(PdeError::Config(_))));
        let left_only = BoundaryConditions::new().with_left(BcSpec::dirichlet());
        assert!(matches!(run(&[0., 1.], vec![cosine()], left_only), Err(PdeError::Config(_))));
        let step = Piecewise::new(vec![
            SpectralFunction::from_fn(|_| 0., [-1., 0.], 5),
            SpectralFunction::from_fn(|_| 1., [0., 1.], 5),
        ])
        .unwrap();
        assert!(matches!(
            run(&[0., 1.], vec![step], dirichlet()),
            Err(PdeError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn test_next_length() {
        let mut length = 9;
        let mut lengths = vec![length];
        while let Ok(next) = next_length(length, 65) {
            lengths.push(next);
            length = next;
        }
        assert_eq!(lengths, vec![9, 17, 33, 65]);
        assert!(matches!(next_length(65, 65), Err(PdeError::Convergence(_))));
        assert_eq!(next_length(33, 1025).unwrap(), 65);
    }

    #[test]
    fn test_grid_grows_from_nine_points() {
        // u_t = cos(8x), resolved to 1e-8 only on 33 points
        let pde = UserFn::with_x(|x, _| vec![x.mapv(|x| (8. * x).cos())]);
        let u0 = SpectralFunction::from_fn(|x| 1. - x * x, [-1., 1.], 9);
        let opts = PdeOptions::default().with_eps(1e-8);
        let sol = pde15s(pde, &[0., 0.5], vec![u0.into()], BoundaryConditions::new(), opts).unwrap();
        // 9 -> 17 -> 33
        assert_eq!(sol.length, 33);
        let q = sol.u.variable(0).unwrap();
        assert_eq!(q.num_columns(), 2);
        for x in [-0.8_f64, 0.1, 0.6] {
            let exact = 1. - x * x + 0.5 * (8. * x).cos();
            assert!((q[1].eval(x) - exact).abs() < 1e-6, "at x = {}", x);
        }
    }

    #[test]
    fn test_fixed_grid_size_checked() {
        let run = |n| {
            let pde = UserFn::new(|u| vec![u[0].diff(2)]);
            pde15s(pde, &[0., 0.1], vec![cosine()], dirichlet(), PdeOptions::default().with_n(n))
        };
        assert!(matches!(run(0), Err(PdeError::Config(_))));
        // two points can not carry a second derivative
        assert!(matches!(run(2), Err(PdeError::Config(_))));
        assert_eq!(run(17).unwrap().length, 17);
    }

    #[test]
    fn test_mass_multiplier() {
        // 2 u_t = u_xx halves the decay rate
        let pde = UserFn::new(|u| vec![u[0].diff(2)]);
        let opts = PdeOptions::default()
            .with_n(17)
            .with_mass(|n| Array2::<Real>::eye(n) * 2.);
        let sol = pde15s(pde, &[0., 0.2], vec![cosine()], dirichlet(), opts).unwrap();
        let q = sol.u.variable(0).unwrap();
        let exact = (-PI * PI / 8. * 0.2).exp() * (FRAC_PI_2 * 0.3).cos();
        let got = q[1].eval(0.3);
        assert!((got - exact).abs() < 1e-4, "got {} expected {}", got, exact);
    }

    #[test]
    fn test_diff_order_override() {
        let run = |order: Vec<usize>| {
            let pde = UserFn::new(|u| vec![u[0].diff(2)]);
            let opts = PdeOptions::default().with_n(17).with_diff_order(order);
            pde15s(pde, &[0., 0.1], vec![cosine()], dirichlet(), opts)
        };
        assert_eq!(run(vec![2]).unwrap().t.len(), 2);
        // two dirichlet rows against a first order override
        match run(vec![1]) {
            Err(PdeError::Config(msg)) => assert!(msg.contains("total differential order of 1")),
            other => panic!("expected a row count error, got {:?}", other.map(|s| s.t)),
        }
        assert!(matches!(run(vec![2, 0]), Err(PdeError::Config(_))));
    }

    #[test]
    fn test_grid_growth_capped() {
        // sin(pi x) itself has coefficients above 1e-10 beyond degree 15
        let pde = UserFn::new(|u| vec![u[0].diff(2) * 1e-3 - &(u[0].values() * &u[0].diff(1))]);
        let u0 = SpectralFunction::from_fn(|x| -(PI * x).sin(), [-1., 1.], 17);
        let opts = PdeOptions::default().with_eps(1e-10).with_max_length(17);
        let res = pde15s(pde, &[0., 0.05], vec![u0.into()], dirichlet(), opts);
        assert!(matches!(res, Err(PdeError::Convergence(_))));
    }
}
