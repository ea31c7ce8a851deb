//! Delaunay triangulation with a neighbour table for walking point location.
//!
//! The triangulation itself comes from `spade`, whose exact orientation and
//! in-circle predicates keep cocircular input (regular grids, wells on a ring)
//! from producing overlapping triangles.

use spade::{DelaunayTriangulation, Point2, Triangulation as _};
use std::collections::HashMap;

use super::InterpolateError;

/// Barycentric slack when deciding whether a point is inside a triangle, so
/// points on shared edges and hull edges are found.
const BARY_EPS: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<(f64, f64)>,
    /// Counter-clockwise vertex triples.
    triangles: Vec<[usize; 3]>,
    /// `neighbors[t][k]` shares the edge opposite vertex `k` of triangle `t`.
    neighbors: Vec<[Option<usize>; 3]>,
}

impl Triangulation {
    /// Triangulates distinct points. Needs at least three points that are not
    /// all on one line.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, InterpolateError> {
        let n = points.len();
        if n < 3 {
            return Err(InterpolateError::TooFewPoints { found: n });
        }

        let mut delaunay: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
        // Vertex handle index -> input index; a repeated position keeps the
        // first input that landed on it
        let mut input_of: Vec<Option<usize>> = Vec::with_capacity(n);
        for (i, &(x, y)) in points.iter().enumerate() {
            let handle = delaunay
                .insert(Point2::new(x, y))
                .map_err(|_| InterpolateError::InvalidPoint { x, y })?;
            let index = handle.index();
            if index >= input_of.len() {
                input_of.resize(index + 1, None);
            }
            input_of[index].get_or_insert(i);
        }

        let mut triangles: Vec<[usize; 3]> = delaunay
            .inner_faces()
            .filter_map(|face| {
                let [a, b, c] = face.vertices().map(|v| input_of[v.fix().index()]);
                Some([a?, b?, c?])
            })
            .collect();
        if triangles.is_empty() {
            return Err(InterpolateError::Collinear);
        }

        // Canonical order so evaluation does not depend on insertion history
        triangles.sort_unstable();
        let neighbors = build_neighbors(&triangles);

        Ok(Self {
            points,
            triangles,
            neighbors,
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn neighbors(&self, triangle: usize) -> [Option<usize>; 3] {
        self.neighbors[triangle]
    }

    pub fn vertex(&self, triangle: usize, k: usize) -> (f64, f64) {
        self.points[self.triangles[triangle][k]]
    }

    /// Barycentric coordinates of `(x, y)` relative to `triangle`.
    pub fn barycentric(&self, triangle: usize, x: f64, y: f64) -> [f64; 3] {
        let (x0, y0) = self.vertex(triangle, 0);
        let (x1, y1) = self.vertex(triangle, 1);
        let (x2, y2) = self.vertex(triangle, 2);

        let det = (y1 - y2) * (x0 - x2) + (x2 - x1) * (y0 - y2);
        let b0 = ((y1 - y2) * (x - x2) + (x2 - x1) * (y - y2)) / det;
        let b1 = ((y2 - y0) * (x - x2) + (x0 - x2) * (y - y2)) / det;
        [b0, b1, 1.0 - b0 - b1]
    }

    /// Triangle containing `(x, y)` and its barycentric coordinates, walking
    /// from `hint`. `None` outside the convex hull.
    pub fn locate(&self, x: f64, y: f64, hint: Option<usize>) -> Option<(usize, [f64; 3])> {
        let mut current = hint.filter(|&t| t < self.triangles.len()).unwrap_or(0);

        for _ in 0..=self.triangles.len() {
            let b = self.barycentric(current, x, y);
            let (k, worst) = b
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::INFINITY), |acc, (i, v)| if v < acc.1 { (i, v) } else { acc });

            if worst >= -BARY_EPS {
                return Some((current, b));
            }
            match self.neighbors[current][k] {
                Some(next) => current = next,
                None => return self.locate_scan(x, y),
            }
        }

        // A walk that does not settle falls back to a full scan
        self.locate_scan(x, y)
    }

    fn locate_scan(&self, x: f64, y: f64) -> Option<(usize, [f64; 3])> {
        (0..self.triangles.len())
            .map(|t| (t, self.barycentric(t, x, y)))
            .find(|(_, b)| b.iter().all(|&v| v >= -BARY_EPS))
    }

    /// Each vertex's distinct edge neighbours.
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.points.len()];
        for tri in &self.triangles {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }
        adjacency
    }
}

fn build_neighbors(triangles: &[[usize; 3]]) -> Vec<[Option<usize>; 3]> {
    let mut edges: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            let (a, b) = (tri[(k + 1) % 3], tri[(k + 2) % 3]);
            edges.entry((a.min(b), a.max(b))).or_default().push((t, k));
        }
    }

    let mut neighbors = vec![[None; 3]; triangles.len()];
    for shared in edges.values() {
        if let [(t1, k1), (t2, k2)] = shared.as_slice() {
            neighbors[*t1][*k1] = Some(*t2);
            neighbors[*t2][*k2] = Some(*t1);
        }
    }
    neighbors
}
