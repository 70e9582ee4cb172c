//! Test support for the ASI geometry crates.
//!
//! - [`SyntheticSkymap`]: radial elevation field with linear corner grids
//! - [`constant_stack`], [`stack_from_fn`], [`indexed_stack`]: image stacks
//! - [`OffsetMagnetic`], [`FailingMagnetic`]: magnetic transform doubles
//! - [`scenario_skymap`]: 3x3 skymap with a known 60° crossing
//! - tolerance assertions and a `tracing` subscriber for test output
//!
//! Pulled in as a path dev-dependency by every crate's tests.

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert `|left - right| <= tol`, treating both sides as `f64`.
///
/// NaN on either side always fails.
///
/// ```
/// test_utils::assert_approx_eq!(0.1 + 0.2, 0.3, 1e-12);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tol:expr $(,)?) => {{
        let (l, r, tol) = ($left as f64, $right as f64, $tol as f64);
        let delta = (l - r).abs();
        assert!(
            delta <= tol,
            "assertion failed: {} ≈ {} (delta {} exceeds {})",
            l,
            r,
            delta,
            tol
        );
    }};
}

/// [`assert_approx_eq!`] on both members of a coordinate pair.
///
/// ```
/// test_utils::assert_coords_approx_eq!((56.05, -110.1), (56.05, -110.1), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_coords_approx_eq {
    ($left:expr, $right:expr, $tol:expr $(,)?) => {{
        let (l, r) = ($left, $right);
        $crate::assert_approx_eq!(l.0, r.0, $tol);
        $crate::assert_approx_eq!(l.1, r.1, $tol);
    }};
}

/// Whether `(x, y)` appears in the paired sequences within `epsilon`.
pub fn contains_point(xs: &[f64], ys: &[f64], x: f64, y: f64, epsilon: f64) -> bool {
    xs.iter()
        .zip(ys)
        .any(|(&px, &py)| (px - x).abs() <= epsilon && (py - y).abs() <= epsilon)
}

/// Install a `tracing` subscriber that writes through the test harness,
/// filtered by `RUST_LOG` (default `warn`). Repeat calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_target(true).with_test_writer().try_init();
}
