//! Math primitives used by association scoring and nucleation.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const PI: f64 = std::f64::consts::PI;
pub const TWO_PI: f64 = 2.0 * std::f64::consts::PI;
pub const RADIANS_TO_DEGREES: f64 = 180.0 / std::f64::consts::PI;
pub const DEGREES_TO_RADIANS: f64 = std::f64::consts::PI / 180.0;

// Process-wide generator, seeded once from the OS. Encapsulated here so
// tests can substitute a deterministic seed via `reseed`.
static GENERATOR: Lazy<Mutex<StdRng>> = Lazy::new(|| Mutex::new(StdRng::from_os_rng()));

/// The significance function: a bell curve with `sig(0, sigma)` pinned
/// to 1. Used for pruning and association, roughly analogous to residual
/// pruning in least-squares approaches.
pub fn sig(x: f64, sigma: f64) -> f64 {
    (-0.5 * x * x / (sigma * sigma)).exp()
}

/// The Laplacian significance function, the L1 analogue of [`sig`].
pub fn sig_laplace_pdf(x: f64, sigma: f64) -> f64 {
    (1.0 / (2.0 * sigma)) * (-x.abs() / sigma).exp()
}

/// A uniform deviate in `[x, y)` from the process-wide generator.
pub fn random_range(x: f64, y: f64) -> f64 {
    GENERATOR.lock().random_range(x..y)
}

/// A Gaussian deviate via the polar form of the Box-Muller method.
pub fn gauss(avg: f64, std: f64) -> f64 {
    let mut rsq;
    let mut v1;
    loop {
        v1 = random_range(-1.0, 1.0);
        let v2 = random_range(-1.0, 1.0);
        rsq = v1 * v1 + v2 * v2;
        if rsq < 1.0 && rsq > 0.0 {
            break;
        }
    }
    let fac = (-2.0 * rsq.ln() / rsq).sqrt();
    std * fac * v1 + avg
}

/// Re-seeds the process-wide generator; for deterministic tests.
pub fn reseed(seed: u64) {
    *GENERATOR.lock() = StdRng::seed_from_u64(seed);
}

/// The minimum angular separation between two angles in degrees.
pub fn angle_difference(angle1: f64, angle2: f64) -> f64 {
    let mut difference = ((angle1 - angle2).abs()) % 360.0;
    if difference > 180.0 {
        difference = 360.0 - difference;
    }
    difference
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sig_pinned_at_zero() {
        assert_eq!(sig(0.0, 1.0), 1.0);
        assert!((sig(1.0, 1.0) - (-0.5f64).exp()).abs() < 1e-12);
        // symmetric
        assert_eq!(sig(2.0, 3.0), sig(-2.0, 3.0));
    }

    #[test]
    fn laplace_pdf_shape() {
        assert!((sig_laplace_pdf(0.0, 1.0) - 0.5).abs() < 1e-12);
        assert_eq!(sig_laplace_pdf(1.5, 2.0), sig_laplace_pdf(-1.5, 2.0));
    }

    #[test]
    fn uniform_stays_in_range() {
        reseed(12345);
        for _ in 0..1000 {
            let v = random_range(-1.0, 1.0);
            assert!((-1.0..1.0).contains(&v));
        }
    }

    #[test]
    fn gauss_has_requested_moments() {
        reseed(42);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| gauss(5.0, 2.0)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var =
            samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n as f64;
        assert!((mean - 5.0).abs() < 0.1, "mean was {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std was {}", var.sqrt());
    }

    #[test]
    fn angle_difference_wraps() {
        assert_eq!(angle_difference(10.0, 350.0), 20.0);
        assert_eq!(angle_difference(0.0, 180.0), 180.0);
        assert_eq!(angle_difference(90.0, 90.0), 0.0);
    }
}
