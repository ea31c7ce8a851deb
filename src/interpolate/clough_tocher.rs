//! Clough–Tocher C1 piecewise-cubic interpolation over a Delaunay
//! triangulation.
//!
//! Each triangle is split at its centroid into three cubic Bézier patches.
//! Vertex gradients come from a global estimate that minimizes the second
//! derivative along every edge; cross-edge continuity conditions use the
//! centroid of the neighbouring triangle.

use ndarray::Array2;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::InterpolateError;
use super::delaunay::Triangulation;
use crate::grid::SampleGrid;

const GRADIENT_MAX_ITER: usize = 400;
const GRADIENT_TOL: f64 = 1e-6;

/// Scattered-data interpolant. Coordinates are rescaled to unit spread on
/// each axis before triangulation, so axes with very different magnitudes
/// do not produce ill-conditioned triangles.
#[derive(Debug, Clone)]
pub struct CloughTocher {
    triangulation: Triangulation,
    values: Vec<f64>,
    gradients: Vec<(f64, f64)>,
    offset: (f64, f64),
    scale: (f64, f64),
}

impl CloughTocher {
    /// Fits the interpolant to `(x, y, value)` samples. Non-finite samples are
    /// dropped and repeated coordinates keep their first value.
    pub fn fit(samples: &[(f64, f64, f64)]) -> Result<Self, InterpolateError> {
        let finite: Vec<(f64, f64, f64)> = samples
            .iter()
            .copied()
            .filter(|(x, y, v)| x.is_finite() && y.is_finite() && v.is_finite())
            .collect();
        if finite.len() < samples.len() {
            warn!(
                "Dropped {} non-finite samples",
                samples.len() - finite.len()
            );
        }

        let n_finite = finite.len();
        let mut seen = HashSet::new();
        let unique: Vec<(f64, f64, f64)> = finite
            .into_iter()
            // `+ 0.0` folds -0.0 into 0.0
            .filter(|(x, y, _)| seen.insert(((x + 0.0).to_bits(), (y + 0.0).to_bits())))
            .collect();
        if unique.len() < n_finite {
            warn!(
                "Ignored {} samples at repeated coordinates",
                n_finite - unique.len()
            );
        }
        if unique.len() < 3 {
            return Err(InterpolateError::TooFewPoints {
                found: unique.len(),
            });
        }

        let n = unique.len() as f64;
        let offset = (
            unique.iter().map(|s| s.0).sum::<f64>() / n,
            unique.iter().map(|s| s.1).sum::<f64>() / n,
        );
        let spread = |axis: fn(&(f64, f64, f64)) -> f64| {
            let (lo, hi) = unique
                .iter()
                .map(axis)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            let ptp = hi - lo;
            if ptp > 0.0 { ptp } else { 1.0 }
        };
        let scale = (spread(|s| s.0), spread(|s| s.1));

        let points: Vec<(f64, f64)> = unique
            .iter()
            .map(|&(x, y, _)| ((x - offset.0) / scale.0, (y - offset.1) / scale.1))
            .collect();
        let values: Vec<f64> = unique.iter().map(|s| s.2).collect();

        let triangulation = Triangulation::new(points)?;
        let gradients = estimate_gradients(&triangulation, &values);

        Ok(Self {
            triangulation,
            values,
            gradients,
            offset,
            scale,
        })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Interpolated value at `(x, y)`; NaN outside the convex hull of the
    /// samples.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let mut hint = None;
        self.evaluate_with_hint(x, y, &mut hint)
    }

    /// Evaluates at every grid node. Points outside the hull are NaN.
    pub fn evaluate_grid(&self, grid: &SampleGrid) -> Array2<f64> {
        let mut out = Array2::from_elem(grid.shape(), f64::NAN);
        let mut hint = None;

        for (row, &y) in grid.ys().iter().enumerate() {
            for (col, &x) in grid.xs().iter().enumerate() {
                out[[row, col]] = self.evaluate_with_hint(x, y, &mut hint);
            }
        }
        out
    }

    fn evaluate_with_hint(&self, x: f64, y: f64, hint: &mut Option<usize>) -> f64 {
        let xs = (x - self.offset.0) / self.scale.0;
        let ys = (y - self.offset.1) / self.scale.1;

        match self.triangulation.locate(xs, ys, *hint) {
            Some((triangle, bary)) => {
                *hint = Some(triangle);
                self.evaluate_in(triangle, bary)
            }
            None => f64::NAN,
        }
    }

    fn evaluate_in(&self, triangle: usize, b: [f64; 3]) -> f64 {
        let tri = &self.triangulation;
        let ids = tri.triangles()[triangle];
        let p: [(f64, f64); 3] = [tri.vertex(triangle, 0), tri.vertex(triangle, 1), tri.vertex(triangle, 2)];
        let f = ids.map(|i| self.values[i]);
        let df = ids.map(|i| self.gradients[i]);

        let e12 = (p[1].0 - p[0].0, p[1].1 - p[0].1);
        let e23 = (p[2].0 - p[1].0, p[2].1 - p[1].1);
        let e31 = (p[0].0 - p[2].0, p[0].1 - p[2].1);
        let dot = |g: (f64, f64), e: (f64, f64)| g.0 * e.0 + g.1 * e.1;

        let df12 = dot(df[0], e12);
        let df21 = -dot(df[1], e12);
        let df23 = dot(df[1], e23);
        let df32 = -dot(df[2], e23);
        let df31 = dot(df[2], e31);
        let df13 = -dot(df[0], e31);

        // Bézier control values of the split triangle
        let c3000 = f[0];
        let c2100 = (df12 + 3.0 * c3000) / 3.0;
        let c2010 = (df13 + 3.0 * c3000) / 3.0;
        let c0300 = f[1];
        let c1200 = (df21 + 3.0 * c0300) / 3.0;
        let c0210 = (df23 + 3.0 * c0300) / 3.0;
        let c0030 = f[2];
        let c1020 = (df31 + 3.0 * c0030) / 3.0;
        let c0120 = (df32 + 3.0 * c0030) / 3.0;

        let c2001 = (c2100 + c2010 + c3000) / 3.0;
        let c0201 = (c1200 + c0300 + c0210) / 3.0;
        let c0021 = (c1020 + c0120 + c0030) / 3.0;

        // C1 across each edge, from the neighbour's centroid in our
        // barycentric frame. Hull edges use the symmetric value.
        let neighbors = tri.neighbors(triangle);
        let mut g = [-0.5; 3];
        for (k, neighbor) in neighbors.iter().enumerate() {
            let Some(other) = *neighbor else { continue };
            let centroid = (0..3).fold((0.0, 0.0), |acc, v| {
                let q = tri.vertex(other, v);
                (acc.0 + q.0 / 3.0, acc.1 + q.1 / 3.0)
            });
            let c = tri.barycentric(triangle, centroid.0, centroid.1);
            g[k] = match k {
                0 => (2.0 * c[2] + c[1] - 1.0) / (2.0 - 3.0 * c[2] - 3.0 * c[1]),
                1 => (2.0 * c[0] + c[2] - 1.0) / (2.0 - 3.0 * c[0] - 3.0 * c[2]),
                _ => (2.0 * c[1] + c[0] - 1.0) / (2.0 - 3.0 * c[1] - 3.0 * c[0]),
            };
        }

        let c0111 = (g[0] * (-c0300 + 3.0 * c0210 - 3.0 * c0120 + c0030)
            + (-c0300 + 2.0 * c0210 - c0120 + c0021 + c0201))
            / 2.0;
        let c1011 = (g[1] * (-c0030 + 3.0 * c1020 - 3.0 * c2010 + c3000)
            + (-c0030 + 2.0 * c1020 - c2010 + c2001 + c0021))
            / 2.0;
        let c1101 = (g[2] * (-c3000 + 3.0 * c2100 - 3.0 * c1200 + c0300)
            + (-c3000 + 2.0 * c2100 - c1200 + c2001 + c0201))
            / 2.0;

        let c1002 = (c1101 + c1011 + c2001) / 3.0;
        let c0102 = (c1101 + c0111 + c0201) / 3.0;
        let c0012 = (c1011 + c0111 + c0021) / 3.0;

        let c0003 = (c1002 + c0102 + c0012) / 3.0;

        // Coordinates in the sub-triangle: one of b1..b3 is zero
        let minval = b[0].min(b[1]).min(b[2]);
        let b1 = b[0] - minval;
        let b2 = b[1] - minval;
        let b3 = b[2] - minval;
        let b4 = 3.0 * minval;

        b1.powi(3) * c3000
            + 3.0 * b1 * b1 * b2 * c2100
            + 3.0 * b1 * b1 * b3 * c2010
            + 3.0 * b1 * b1 * b4 * c2001
            + 3.0 * b1 * b2 * b2 * c1200
            + 6.0 * b1 * b2 * b4 * c1101
            + 3.0 * b1 * b3 * b3 * c1020
            + 6.0 * b1 * b3 * b4 * c1011
            + 3.0 * b1 * b4 * b4 * c1002
            + b2.powi(3) * c0300
            + 3.0 * b2 * b2 * b3 * c0210
            + 3.0 * b2 * b2 * b4 * c0201
            + 3.0 * b2 * b3 * b3 * c0120
            + 6.0 * b2 * b3 * b4 * c0111
            + 3.0 * b2 * b4 * b4 * c0102
            + b3.powi(3) * c0030
            + 3.0 * b3 * b3 * b4 * c0021
            + 3.0 * b3 * b4 * b4 * c0012
            + b4.powi(3) * c0003
    }
}

/// Gauss–Seidel sweeps over the vertices. Each step picks the gradient that
/// minimizes the summed squared second derivative of the cubic along the
/// vertex's edges, holding the neighbours' gradients fixed.
fn estimate_gradients(tri: &Triangulation, values: &[f64]) -> Vec<(f64, f64)> {
    let points = tri.points();
    let adjacency = tri.vertex_neighbors();
    let mut grad = vec![(0.0, 0.0); points.len()];

    for iteration in 0..GRADIENT_MAX_ITER {
        let mut err: f64 = 0.0;

        for (i, neighbors) in adjacency.iter().enumerate() {
            let mut q = [0.0; 3];
            let mut s = [0.0; 2];

            for &j in neighbors {
                let ex = points[j].0 - points[i].0;
                let ey = points[j].1 - points[i].1;
                let l = (ex * ex + ey * ey).sqrt();
                let l3 = l * l * l;

                let df2 = -ex * grad[j].0 - ey * grad[j].1;
                let rhs = 6.0 * (values[i] - values[j]) - 2.0 * df2;

                q[0] += 4.0 * ex * ex / l3;
                q[1] += 4.0 * ex * ey / l3;
                q[2] += 4.0 * ey * ey / l3;
                s[0] += rhs * ex / l3;
                s[1] += rhs * ey / l3;
            }

            let det = q[0] * q[2] - q[1] * q[1];
            if det == 0.0 || !det.is_finite() {
                continue;
            }
            let r0 = (q[2] * s[0] - q[1] * s[1]) / det;
            let r1 = (-q[1] * s[0] + q[0] * s[1]) / det;

            let change = (grad[i].0 + r0).abs().max((grad[i].1 + r1).abs());
            grad[i] = (-r0, -r1);

            err = err.max(change / r0.abs().max(r1.abs()).max(1.0));
        }

        if err < GRADIENT_TOL {
            debug!("Gradient estimate converged after {} sweeps", iteration + 1);
            return grad;
        }
    }

    warn!(
        "Gradient estimate did not converge in {} sweeps",
        GRADIENT_MAX_ITER
    );
    grad
}
