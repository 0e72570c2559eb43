//! Dense row-major matrix helpers.
//!
//! All matrices are flat `&[f64]` slices in row-major order; callers pass the
//! dimensions explicitly.

/// Matrix product: `A (rows×inner) · B (inner×cols)`
pub fn mat_mul(a: &[f64], b: &[f64], rows: usize, inner: usize, cols: usize) -> Vec<f64> {
    debug_assert_eq!(a.len(), rows * inner);
    debug_assert_eq!(b.len(), inner * cols);

    let mut out = vec![0.0; rows * cols];
    for i in 0..rows {
        let out_row = &mut out[i * cols..(i + 1) * cols];
        for k in 0..inner {
            let a_ik = a[i * inner + k];
            if a_ik == 0.0 {
                continue;
            }
            vec_add_scaled(out_row, &b[k * cols..(k + 1) * cols], a_ik);
        }
    }
    out
}

/// Product with the left operand transposed: `Aᵀ · B`
/// where A is `rows×a_cols` and B is `rows×b_cols`; result is `a_cols×b_cols`.
pub fn mat_mul_transpose_a(
    a: &[f64],
    b: &[f64],
    rows: usize,
    a_cols: usize,
    b_cols: usize,
) -> Vec<f64> {
    debug_assert_eq!(a.len(), rows * a_cols);
    debug_assert_eq!(b.len(), rows * b_cols);

    let mut out = vec![0.0; a_cols * b_cols];
    for r in 0..rows {
        let b_row = &b[r * b_cols..(r + 1) * b_cols];
        for i in 0..a_cols {
            let a_ri = a[r * a_cols + i];
            if a_ri == 0.0 {
                continue;
            }
            vec_add_scaled(&mut out[i * b_cols..(i + 1) * b_cols], b_row, a_ri);
        }
    }
    out
}

/// Product with the right operand transposed: `A · Bᵀ`
/// where A is `rows×inner` and B is `b_rows×inner`; result is `rows×b_rows`.
pub fn mat_mul_transpose_b(
    a: &[f64],
    b: &[f64],
    rows: usize,
    inner: usize,
    b_rows: usize,
) -> Vec<f64> {
    debug_assert_eq!(a.len(), rows * inner);
    debug_assert_eq!(b.len(), b_rows * inner);

    let mut out = vec![0.0; rows * b_rows];
    for i in 0..rows {
        let a_row = &a[i * inner..(i + 1) * inner];
        for j in 0..b_rows {
            out[i * b_rows + j] = dot_product(a_row, &b[j * inner..(j + 1) * inner]);
        }
    }
    out
}

/// Adds `bias` to every row of `m` (`cols` = bias length)
pub fn add_row_bias(m: &mut [f64], bias: &[f64]) {
    let cols = bias.len();
    if cols == 0 {
        return;
    }
    for row in m.chunks_mut(cols) {
        for (v, &b) in row.iter_mut().zip(bias) {
            *v += b;
        }
    }
}

/// Column sums of a `?×cols` matrix
pub fn column_sums(m: &[f64], cols: usize) -> Vec<f64> {
    let mut sums = vec![0.0; cols];
    if cols == 0 {
        return sums;
    }
    for row in m.chunks(cols) {
        for (s, &v) in sums.iter_mut().zip(row) {
            *s += v;
        }
    }
    sums
}

/// Dot product
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}

/// In-place `a += scale * b`
pub fn vec_add_scaled(a: &mut [f64], b: &[f64], scale: f64) {
    for (ai, &bi) in a.iter_mut().zip(b.iter()) {
        *ai += scale * bi;
    }
}

/// Logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
