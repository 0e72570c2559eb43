use rayon::prelude::*;

/// Symmetric, self-looped, degree-normalized adjacency used for message passing.
///
/// Entry weights follow `D^-1/2 (A + I) D^-1/2`. Every undirected edge is
/// counted once per direction; duplicate links add up.
#[derive(Debug, Clone, Default)]
pub struct NormalizedAdjacency {
    n: usize,
    /// `rows[target]` lists `(source, weight)` contributions
    rows: Vec<Vec<(usize, f64)>>,
}

impl NormalizedAdjacency {
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut entries: Vec<(usize, usize)> = Vec::with_capacity(edges.len() * 2 + n);
        for &(s, t) in edges {
            if s >= n || t >= n {
                continue;
            }
            entries.push((s, t));
            entries.push((t, s));
        }
        for i in 0..n {
            entries.push((i, i));
        }

        let mut degree = vec![0.0_f64; n];
        for &(_, t) in &entries {
            degree[t] += 1.0;
        }

        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (s, t) in entries {
            let weight = 1.0 / (degree[s] * degree[t]).sqrt();
            rows[t].push((s, weight));
        }

        Self { n, rows }
    }

    pub fn node_count(&self) -> usize {
        self.n
    }

    /// Number of stored `(source, target)` entries, self loops included
    pub fn entry_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// `Â · X` for an `n×width` row-major matrix.
    ///
    /// `Â` is symmetric, so this is also the backward pass of itself.
    pub fn propagate(&self, input: &[f64], width: usize) -> Vec<f64> {
        debug_assert_eq!(input.len(), self.n * width);

        let mut out = vec![0.0; self.n * width];
        if width == 0 {
            return out;
        }
        out.par_chunks_mut(width)
            .zip(self.rows.par_iter())
            .for_each(|(out_row, neighbors)| {
                for &(source, weight) in neighbors {
                    let src = &input[source * width..(source + 1) * width];
                    for (o, &x) in out_row.iter_mut().zip(src) {
                        *o += weight * x;
                    }
                }
            });
        out
    }
}
