//! Helmholtz equation in the unit ball with a manufactured solution
//!
//! lap(u) - K^2 u = f, u = g on the sphere, with u = exp(x + y z)
//!
//! cargo run --release --example ball_helmholtz
use chebpde::{helmholtz, BoundaryData, Rhs};

fn main() {
    let k = 5.;
    let exact = |x: f64, y: f64, z: f64| (x + y * z).exp();
    // lap(exp(x + y z)) = (1 + y^2 + z^2) exp(x + y z)
    let f = Rhs::from_fn(move |x, y, z| (1. + y * y + z * z - k * k) * (x + y * z).exp());
    let g = BoundaryData::from_fn(exact);
    for n in [8, 12, 16, 24, 32] {
        let u = match helmholtz(&f, k, &g, n, n, n) {
            Ok(u) => u,
            Err(e) => {
                eprintln!("{}", e);
                return;
            }
        };
        let (x, y, z) = (0.3, -0.2, 0.5);
        println!(
            "n = {:3}: error at ({}, {}, {}) = {:.3e}",
            n,
            x,
            y,
            z,
            (u.eval(x, y, z) - exact(x, y, z)).abs()
        );
    }
}
