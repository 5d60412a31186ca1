use chebpde::{
    pde15s, Arg, BcSpec, BcValue, BoundaryConditions, PdeError, PdeOptions, SpectralFunction,
    UserFn,
};
use ndarray::Array1;
use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn speed(x: f64) -> f64 {
    1. + 0.6 * (PI * x).sin()
}

fn advection(opts: PdeOptions) -> chebpde::PdeSolution {
    let pde = UserFn::with_x(|x: &Array1<f64>, u| {
        let c = x.mapv(speed);
        vec![-(c * u[0].diff(1)) + u[0].diff(2) * 5e-5]
    });
    let u0 = SpectralFunction::from_fn(|x| ((PI * x).cos() - 1.).exp(), [-1., 1.], 65);
    let tspan: Vec<f64> = (0..=60).map(|i| 0.05 * i as f64).collect();
    pde15s(pde, &tspan, vec![u0.into()], BoundaryConditions::periodic(), opts).unwrap()
}

/// Integral of u / c, conserved by u_t = -c u_x on a periodic domain
fn weighted_mass(u: &SpectralFunction) -> f64 {
    SpectralFunction::from_fn(|x| u.eval(x) / speed(x), [-1., 1.], 257).sum()
}

#[test]
fn test_advection_periodic() {
    let adaptive = advection(PdeOptions::default().with_eps(1e-4));
    assert_eq!(adaptive.t.len(), 61);
    assert_eq!(adaptive.u.num_times(), 61);
    let q = adaptive.u.variable(0).unwrap();
    assert_eq!(q.num_columns(), 61);
    // first column is the initial condition
    for x in [-0.7, 0., 0.45] {
        assert!((q[0].eval(x) - ((PI * x).cos() - 1.).exp()).abs() < 1e-3);
    }

    let m0 = weighted_mass(&q[0]);
    let m1 = weighted_mass(&q[60]);
    assert!(
        ((m1 - m0) / m0).abs() < 2e-2,
        "mass changed from {} to {}",
        m0,
        m1
    );

    let fixed = advection(PdeOptions::default().with_eps(1e-4).with_n(129));
    let r = fixed.u.variable(0).unwrap();
    assert_eq!(r.num_columns(), 61);
    for x in [-0.9, -0.3, 0.2, 0.8] {
        let (a, b) = (q[60].eval(x), r[60].eval(x));
        assert!((a - b).abs() < 5e-3, "adaptive {} fixed {} at x = {}", a, b, x);
    }
}

#[test]
fn test_diffusion_time_dependent_boundary() {
    let pde = UserFn::new(|u| vec![u[0].diff(2) * 0.1]);
    let bc = BoundaryConditions::new()
        .with_left(BcSpec::functional(UserFn::with_t(|t, u| {
            vec![u[0].left() - t]
        })))
        .with_right(BcSpec::value("dirichlet", 0.));
    let u0 = SpectralFunction::from_fn(|x| 0.5 * (1. - x * x), [-1., 1.], 9);
    let tspan: Vec<f64> = (0..=8).map(|i| 0.25 * i as f64).collect();
    let sol = pde15s(pde, &tspan, vec![u0.into()], bc, PdeOptions::default()).unwrap();
    let q = sol.u.variable(0).unwrap();
    assert_eq!(q.num_columns(), tspan.len());
    for (f, t) in q.columns().iter().zip(tspan.iter()) {
        assert!((f.eval(-1.) - t).abs() < 1e-4, "u(-1) = {} at t = {}", f.eval(-1.), t);
        assert!(f.eval(1.).abs() < 1e-4);
    }
}

#[test]
fn test_diffusion_time_dependent_value() {
    let pde = UserFn::new(|u| vec![u[0].diff(2) * 0.1]);
    let bc = BoundaryConditions::new()
        .with_left(BcSpec::TagValue(
            "dirichlet".into(),
            BcValue::Time(Rc::new(|t: f64| t)),
        ))
        .with_right(BcSpec::dirichlet());
    let u0 = SpectralFunction::from_fn(|x| 0.5 * (1. - x * x), [-1., 1.], 9);
    let tspan: Vec<f64> = (0..=8).map(|i| 0.25 * i as f64).collect();
    let sol = pde15s(pde, &tspan, vec![u0.into()], bc, PdeOptions::default()).unwrap();
    let q = sol.u.variable(0).unwrap();
    assert_eq!(q.num_columns(), tspan.len());
    for (f, t) in q.columns().iter().zip(tspan.iter()) {
        assert!((f.eval(-1.) - t).abs() < 1e-4, "u(-1) = {} at t = {}", f.eval(-1.), t);
        assert!(f.eval(1.).abs() < 1e-4);
    }
}

#[test]
fn test_functionals_at_both_ends() {
    // u(-1) = t and u(1) + u(1)^3 = t + t^3
    let pde = UserFn::new(|u| vec![u[0].diff(2) * 0.1]);
    let bc = BoundaryConditions::new()
        .with_left(BcSpec::functional(UserFn::with_t(|t, u| vec![u[0].left() - t])))
        .with_right(BcSpec::functional(UserFn::with_t(|t, u| {
            let r = u[0].right();
            vec![r + r.powi(3) - t - t.powi(3)]
        })));
    let u0 = SpectralFunction::from_fn(|x| 0.5 * (1. - x * x), [-1., 1.], 9);
    let tspan = [0., 0.25, 0.5, 1.];
    let sol = pde15s(pde, &tspan, vec![u0.into()], bc, PdeOptions::default()).unwrap();
    let q = sol.u.variable(0).unwrap();
    for (f, t) in q.columns().iter().zip(tspan.iter()) {
        assert!((f.eval(-1.) - t).abs() < 1e-4, "u(-1) = {} at t = {}", f.eval(-1.), t);
        assert!((f.eval(1.) - t).abs() < 1e-4, "u(1) = {} at t = {}", f.eval(1.), t);
    }
}

#[test]
fn test_integral_constraint_in_middle() {
    // u(-1) = 0 and a fixed mass, the profile relaxes to (x + 1) / 3
    let pde = UserFn::new(|u| vec![u[0].diff(2)]);
    let bc = BoundaryConditions::new()
        .with_left(BcSpec::dirichlet())
        .with_middle(BcSpec::functional(UserFn::new(|u| vec![u[0].sum() - 2. / 3.])));
    let u0 = SpectralFunction::from_fn(|x| 0.5 * (1. - x * x), [-1., 1.], 9);
    let tspan = [0., 0.1, 0.5, 3.];
    let sol = pde15s(pde, &tspan, vec![u0.into()], bc, PdeOptions::default()).unwrap();
    let q = sol.u.variable(0).unwrap();
    assert_eq!(q.num_columns(), 4);
    for f in q.columns() {
        assert!((f.sum() - 2. / 3.).abs() < 1e-5, "mass {}", f.sum());
        assert!(f.eval(-1.).abs() < 1e-5);
    }
    assert!((q[3].eval(0.5) - 0.5).abs() < 1e-3);
}

#[test]
fn test_legacy_and_declared_signatures() {
    // u_t = u_xx, given as (u, t, x, diff) and as (t, x, u)
    let legacy = UserFn::legacy(&["u", "t", "x", "diff"], |a: &[Arg]| {
        match (a[0].var(), a[3].operator()) {
            (Some(u), Some(d)) => vec![d.apply(u, 2)],
            _ => vec![],
        }
    });
    let declared = UserFn::declared(&["t", "x", "u"], |a: &[Arg]| {
        a[2].var().map_or(vec![], |u| vec![u.diff(2)])
    });
    let run = |pde| {
        let u0 = SpectralFunction::from_fn(|x| (PI * x).sin(), [-1., 1.], 33);
        let bc = BoundaryConditions::new()
            .with_left(BcSpec::dirichlet())
            .with_right(BcSpec::dirichlet());
        pde15s(pde, &[0., 0.1], vec![u0.into()], bc, PdeOptions::default().with_n(33)).unwrap()
    };
    let (a, b) = (run(legacy), run(declared));
    let exact = (-PI * PI * 0.1).exp() * (PI * 0.5).sin();
    let (qa, qb) = (a.u.variable(0).unwrap(), b.u.variable(0).unwrap());
    assert!((qa[1].eval(0.5) - exact).abs() < 1e-4);
    assert!((qa[1].eval(0.5) - qb[1].eval(0.5)).abs() < 1e-10);
}

#[test]
fn test_observer_and_stop() {
    let stop = Arc::new(AtomicBool::new(false));
    let seen = Rc::new(RefCell::new(vec![]));
    let (flag, log) = (Arc::clone(&stop), Rc::clone(&seen));
    let opts = PdeOptions::default()
        .with_n(17)
        .with_stop(Arc::clone(&stop))
        .with_observer(move |t, fns: &[SpectralFunction]| {
            log.borrow_mut().push((t, fns.len()));
            if t >= 0.2 {
                flag.store(true, Ordering::Relaxed);
            }
        });
    let pde = UserFn::new(|u| vec![u[0].diff(2)]);
    let u0 = SpectralFunction::from_fn(|x| 1. - x * x, [-1., 1.], 17);
    let bc = BoundaryConditions::new()
        .with_left(BcSpec::dirichlet())
        .with_right(BcSpec::dirichlet());
    let tspan: Vec<f64> = (0..=10).map(|i| 0.1 * i as f64).collect();
    let sol = pde15s(pde, &tspan, vec![u0.into()], bc, opts).unwrap();
    assert_eq!(sol.t.len(), 3);
    assert_eq!(seen.borrow().len(), 3);
    assert!(seen.borrow().iter().all(|(_, k)| *k == 1));
}

#[test]
fn test_wrong_number_of_conditions() {
    let pde = UserFn::new(|u| vec![u[0].diff(1)]);
    let u0 = SpectralFunction::from_fn(|x| x, [-1., 1.], 9);
    let bc = BoundaryConditions::new()
        .with_left(BcSpec::dirichlet())
        .with_right(BcSpec::dirichlet());
    match pde15s(pde, &[0., 1.], vec![u0.into()], bc, PdeOptions::default()) {
        Err(PdeError::Config(msg)) => assert!(msg.contains("check boundary conditions")),
        other => panic!("expected configuration error, got {:?}", other.map(|s| s.t)),
    }
}
