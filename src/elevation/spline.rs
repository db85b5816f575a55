/// Natural cubic spline through `(x, y)` knots with strictly increasing `x`
///
/// Evaluation outside the knot range clamps to the nearest end value.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Option<Self> {
        let n = xs.len();
        if n < 2 || ys.len() != n || xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let mut m = vec![0.0; n];
        if n > 2 {
            // tridiagonal system for the interior second derivatives
            let mut diag = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                let h0 = xs[i] - xs[i - 1];
                let h1 = xs[i + 1] - xs[i];
                diag[i] = 2.0 * (h0 + h1);
                rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
            }
            for i in 2..n - 1 {
                let h = xs[i] - xs[i - 1];
                let factor = h / diag[i - 1];
                diag[i] -= factor * h;
                rhs[i] -= factor * rhs[i - 1];
            }
            for i in (1..n - 1).rev() {
                let h1 = xs[i + 1] - xs[i];
                m[i] = (rhs[i] - h1 * m[i + 1]) / diag[i];
            }
        }

        Some(Self { xs, ys, m })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        let i = self.xs.partition_point(|&k| k <= x).saturating_sub(1).min(n - 2);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_through_knots() {
        let xs = vec![0.0, 10.0, 20.0, 30.0, 40.0];
        let ys = vec![5.0, 7.0, 2.0, 4.0, 4.0];
        let s = CubicSpline::new(xs.clone(), ys.clone()).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert!((s.evaluate(*x) - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_linear_data_stays_linear() {
        let xs: Vec<f64> = (0..6).map(|i| i as f64 * 5.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        let s = CubicSpline::new(xs, ys).unwrap();
        assert!((s.evaluate(12.5) - 26.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_knots() {
        assert!(CubicSpline::new(vec![0.0], vec![1.0]).is_none());
        assert!(CubicSpline::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_clamps_outside() {
        let s = CubicSpline::new(vec![0.0, 10.0], vec![1.0, 3.0]).unwrap();
        assert_eq!(s.evaluate(-5.0), 1.0);
        assert_eq!(s.evaluate(15.0), 3.0);
        assert!((s.evaluate(5.0) - 2.0).abs() < 1e-12);
    }
}
