//! 1-D interpolants with extrapolation past the sampled range.

use crate::config::InterpolationKind;
use crate::error::{Result, SpectraError};

/// An interpolant through `(x_i, y_i)` with strictly increasing `x`.
#[derive(Debug, Clone)]
pub struct Interpolant {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots; all zero for linear interpolation.
    m: Vec<f64>,
}

impl Interpolant {
    /// Build an interpolant of the requested kind.
    ///
    /// Cubic needs at least 4 knots and falls back to linear below that.
    /// A single knot gives a constant.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, kind: InterpolationKind) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(SpectraError::LengthMismatch {
                expected: xs.len(),
                found: ys.len(),
            });
        }
        if xs.is_empty() {
            return Err(SpectraError::NoData {
                operation: "interpolation",
            });
        }
        if xs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SpectraError::InvalidInput(
                "interpolation knots must be strictly increasing".to_string(),
            ));
        }

        let m = match kind {
            InterpolationKind::Cubic if xs.len() >= 4 => not_a_knot_second_derivatives(&xs, &ys),
            _ => vec![0.0; xs.len()],
        };
        Ok(Self { xs, ys, m })
    }

    /// Interpolant over the implicit row index `0, 1, ..., n-1`.
    pub fn over_index(ys: Vec<f64>, kind: InterpolationKind) -> Result<Self> {
        let xs = (0..ys.len()).map(|i| i as f64).collect();
        Self::new(xs, ys, kind)
    }

    pub fn eval(&self, t: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }
        // Segment k spans [x_k, x_{k+1}]; outside the range the boundary
        // segment's polynomial is extended.
        let k = match self.xs.partition_point(|&x| x <= t) {
            0 => 0,
            p => (p - 1).min(n - 2),
        };
        let (x0, x1) = (self.xs[k], self.xs[k + 1]);
        let (y0, y1) = (self.ys[k], self.ys[k + 1]);
        let (m0, m1) = (self.m[k], self.m[k + 1]);
        let h = x1 - x0;
        let a = (x1 - t) / h;
        let b = (t - x0) / h;
        a * y0 + b * y1 + ((a.powi(3) - a) * m0 + (b.powi(3) - b) * m1) * h * h / 6.0
    }

    pub fn eval_many(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Second derivatives of the not-a-knot cubic spline: the third derivative
/// is continuous at `x_1` and `x_{n-2}`, so the two end segments share a
/// cubic with their neighbours. Needs at least 4 knots.
fn not_a_knot_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    // Continuity rows for the interior knots 1..n-1, unknowns m_1..m_{n-2}.
    let inner = n - 2;
    let mut lower = vec![0.0; inner];
    let mut diag = vec![0.0; inner];
    let mut upper = vec![0.0; inner];
    let mut rhs = vec![0.0; inner];
    for i in 1..n - 1 {
        let j = i - 1;
        lower[j] = h[i - 1];
        diag[j] = 2.0 * (h[i - 1] + h[i]);
        upper[j] = h[i];
        rhs[j] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
    }

    // m_0 and m_{n-1} follow from the end conditions; fold them into the
    // first and last rows.
    let (h0, h1) = (h[0], h[1]);
    diag[0] = (h0 + h1) * (h0 + 2.0 * h1) / h1;
    upper[0] = (h1 * h1 - h0 * h0) / h1;
    let (a, b) = (h[n - 3], h[n - 2]);
    lower[inner - 1] = (a * a - b * b) / a;
    diag[inner - 1] = (a + b) * (2.0 * a + b) / a;

    // Thomas algorithm
    for j in 1..inner {
        let w = lower[j] / diag[j - 1];
        diag[j] -= w * upper[j - 1];
        rhs[j] -= w * rhs[j - 1];
    }
    let mut m = vec![0.0; n];
    m[inner] = rhs[inner - 1] / diag[inner - 1];
    for j in (0..inner - 1).rev() {
        m[j + 1] = (rhs[j] - upper[j] * m[j + 2]) / diag[j];
    }

    m[0] = ((h0 + h1) * m[1] - h0 * m[2]) / h1;
    m[n - 1] = ((a + b) * m[n - 2] - b * m[n - 3]) / a;
    m
}
