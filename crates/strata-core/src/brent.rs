//! Brent minimization of a unary scalar function.
//!
//! Golden-section search with parabolic-interpolation acceleration, after
//! Chapter 5 of Richard Brent's "Algorithms for Minimization Without
//! Derivatives". Used by the hypocenter optimizer to refine origin-time and
//! depth estimates along one axis at a time.

/// Minimizes `f` over the bracketing interval `[left_end, right_end]` with
/// stopping tolerance `epsilon`. Returns `(f(x_min), x_min)`.
pub fn minimize<F>(mut f: F, left_end: f64, right_end: f64, epsilon: f64) -> (f64, f64)
where
    F: FnMut(f64) -> f64,
{
    // golden section ratio c = (3 - sqrt(5)) / 2
    let c = 0.5 * (3.0 - 5.0f64.sqrt());
    let sqrt_eps = f64::EPSILON.sqrt();

    let mut a = left_end;
    let mut b = right_end;

    let mut x = a + c * (b - a);
    let mut v = x;
    let mut w = x;
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;
    let mut fx = f(x);
    let mut fv = fx;
    let mut fw = fx;

    loop {
        let m = 0.5 * (a + b);
        let tol = sqrt_eps * x.abs() + epsilon;
        let t2 = 2.0 * tol;

        // stopping criterion
        if (x - m).abs() <= t2 - 0.5 * (b - a) {
            return (fx, x);
        }

        let mut p = 0.0;
        let mut q = 0.0;
        let mut r = 0.0;
        if e.abs() > tol {
            // fit parabola
            r = (x - w) * (fx - fv);
            q = (x - v) * (fx - fw);
            p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            } else {
                q = -q;
            }
            r = e;
            e = d;
        }

        if p.abs() < (0.5 * q * r).abs() && p < q * (a - x) && p < q * (b - x) {
            // parabolic interpolation step
            d = p / q;
            let u = x + d;
            // f must not be evaluated too close to a or b
            if u - a < t2 || b - u < t2 {
                d = if x < m { tol } else { -tol };
            }
        } else {
            // golden section step
            e = if x < m { b - x } else { a - x };
            d = c * e;
        }

        // f must not be evaluated too close to x
        let u = if d.abs() >= tol {
            x + d
        } else if d > 0.0 {
            x + tol
        } else {
            x - tol
        };
        let fu = f(u);

        // update a, b, v, w, and x
        if fu <= fx {
            if u < x {
                b = x;
            } else {
                a = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_parabola_minimum() {
        let c = 1.7;
        let (f_min, x_min) = minimize(|x| (x - c) * (x - c), 0.0, 4.0, 1e-8);
        assert!((x_min - c).abs() < 1e-4, "x_min was {x_min}");
        assert!(f_min < 1e-8);
    }

    #[test]
    fn finds_minimum_near_interval_edge() {
        let c = 0.05;
        let (_, x_min) = minimize(|x| (x - c) * (x - c), 0.0, 10.0, 1e-8);
        assert!((x_min - c).abs() < 1e-4, "x_min was {x_min}");
    }

    #[test]
    fn handles_non_polynomial_objective() {
        // minimum of x + 1/x on (0, inf) is at x = 1
        let (f_min, x_min) = minimize(|x| x + 1.0 / x, 0.1, 5.0, 1e-8);
        assert!((x_min - 1.0).abs() < 1e-4, "x_min was {x_min}");
        assert!((f_min - 2.0).abs() < 1e-6);
    }

    #[test]
    fn monotone_function_converges_to_boundary() {
        let (_, x_min) = minimize(|x| x, 0.0, 1.0, 1e-8);
        assert!(x_min < 1e-3, "x_min was {x_min}");
    }
}
