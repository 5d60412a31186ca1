//! Variable speed advection with a little diffusion on a periodic domain
//!
//! u_t = -(1 + 0.6 sin(pi x)) u_x + 5e-5 u_xx
//!
//! cargo run --release --example advection
use chebpde::{pde15s, BoundaryConditions, PdeOptions, SpectralFunction, UserFn};
use ndarray::Array1;
use std::f64::consts::PI;

fn main() {
    // Parameters
    let tspan: Vec<f64> = (0..=60).map(|i| 0.05 * i as f64).collect();
    let u0 = SpectralFunction::from_fn(|x| (3. * (PI * x).sin()).exp(), [-1., 1.], 65);
    let pde = UserFn::with_x(|x: &Array1<f64>, u| {
        let c = x.mapv(|x| 1. + 0.6 * (PI * x).sin());
        vec![-(c * u[0].diff(1)) + u[0].diff(2) * 5e-5]
    });
    let opts = PdeOptions::default().with_observer(|t, u: &[SpectralFunction]| {
        println!("t = {:5.2}  length = {:4}  u(0) = {:10.6}", t, u[0].len(), u[0].eval(0.));
    });

    // Solve
    let sol = match pde15s(pde, &tspan, vec![u0.into()], BoundaryConditions::periodic(), opts) {
        Ok(sol) => sol,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    if let Some(q) = sol.u.variable(0) {
        println!("{} snapshots, integral at the end {:.8}", q.num_columns(), q[q.num_columns() - 1].sum());
    }
}
