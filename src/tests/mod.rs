
use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sprs::{CsMat, TriMat};

use crate::points::PointSet;

/// Unit square corners: (0,0), (1,0), (0,1), (1,1).
pub fn square4() -> PointSet {
    PointSet::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap()
}

/// Center spot (index 0) plus its six hexagonal neighbors at unit distance.
pub fn hexagon7() -> PointSet {
    let mut coords = vec![[0.0, 0.0]];
    for k in 0..6 {
        let a = k as f64 * std::f64::consts::PI / 3.0;
        coords.push([a.cos(), a.sin()]);
    }
    PointSet::new(coords).unwrap()
}

/// Offset-row hexagonal lattice with unit spacing, row-major indices.
pub fn hex_lattice(rows: usize, cols: usize) -> PointSet {
    let h = 3f64.sqrt() / 2.0;
    let mut coords = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            coords.push([c as f64 + 0.5 * (r % 2) as f64, r as f64 * h]);
        }
    }
    PointSet::new(coords).unwrap()
}

/// Axis-aligned grid with unit spacing, shifted by `offset`.
pub fn square_grid(nx: usize, ny: usize, offset: [f64; 2]) -> Vec<[f64; 2]> {
    let mut coords = Vec::with_capacity(nx * ny);
    for y in 0..ny {
        for x in 0..nx {
            coords.push([offset[0] + x as f64, offset[1] + y as f64]);
        }
    }
    coords
}

pub fn random_points(n: usize, seed: u64) -> PointSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let coords = (0..n)
        .map(|_| [rng.random_range(0.0..1.0), rng.random_range(0.0..1.0)])
        .collect();
    PointSet::new(coords).unwrap()
}

/// All-ones adjacency without self-loops.
pub fn complete_graph(n: usize) -> CsMat<f64> {
    let mut t = TriMat::new((n, n));
    for i in 0..n {
        for j in 0..n {
            if i != j {
                t.add_triplet(i, j, 1.0);
            }
        }
    }
    t.to_csr()
}

/// Hop distances from `source` following stored row entries, up to `max_hops`.
pub fn bfs_hops(adj: &CsMat<f64>, source: usize, max_hops: usize) -> Vec<Option<usize>> {
    let mut hops = vec![None; adj.rows()];
    hops[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(u) = queue.pop_front() {
        let du = hops[u].unwrap();
        if du == max_hops {
            continue;
        }
        for (v, _) in adj.outer_view(u).unwrap().iter() {
            if hops[v].is_none() {
                hops[v] = Some(du + 1);
                queue.push_back(v);
            }
        }
    }
    hops
}
