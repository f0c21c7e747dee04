//! Dense linear algebra over GF(2).
//!
//! Row echelon reduction with an accumulated transform, pivot
//! identification, square-matrix inversion, and a linear solver built
//! from the three. The stabilizer-inactivation post-processor uses
//! these on residual systems whose dimensions are bounded by the size
//! of a single inactivated cluster, so a dense `Array2<u8>` holding one
//! bit per byte is plenty.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Result of [`row_echelon`].
#[derive(Debug, Clone)]
pub struct RowEchelon {
    /// Echelon form of the input.
    pub echelon: Array2<u8>,
    /// Accumulated row operations: `echelon = transform * input` over GF(2).
    pub transform: Array2<u8>,
    /// Number of pivots.
    pub rank: usize,
    /// Pivot column indices in increasing order; `pivot_cols[r]` is the
    /// pivot of echelon row `r`.
    pub pivot_cols: Vec<usize>,
}

/// Reduce `a` to row echelon form by forward elimination.
///
/// Pivots are chosen left to right, always from the topmost unused row,
/// so the reduction is deterministic.
pub fn row_echelon(a: ArrayView2<'_, u8>) -> RowEchelon {
    let (m, n) = a.dim();
    let mut ech = a.mapv(|v| v & 1);
    let mut transform = Array2::<u8>::eye(m);
    let mut pivot_cols = Vec::new();
    let mut rank = 0;

    for col in 0..n {
        let Some(pivot_row) = (rank..m).find(|&r| ech[(r, col)] == 1) else {
            continue;
        };
        if pivot_row != rank {
            for c in 0..n {
                ech.swap((rank, c), (pivot_row, c));
            }
            for c in 0..m {
                transform.swap((rank, c), (pivot_row, c));
            }
        }
        for r in rank + 1..m {
            if ech[(r, col)] == 1 {
                for c in 0..n {
                    let v = ech[(rank, c)];
                    ech[(r, c)] ^= v;
                }
                for c in 0..m {
                    let v = transform[(rank, c)];
                    transform[(r, c)] ^= v;
                }
            }
        }
        pivot_cols.push(col);
        rank += 1;
        if rank == m {
            break;
        }
    }

    RowEchelon {
        echelon: ech,
        transform,
        rank,
        pivot_cols,
    }
}

/// Invert a square matrix over GF(2) by Gauss-Jordan elimination on
/// `[a | I]`. Returns `None` when `a` is singular.
pub fn inverse(a: ArrayView2<'_, u8>) -> Option<Array2<u8>> {
    let (m, n) = a.dim();
    if m != n {
        return None;
    }
    let mut left = a.mapv(|v| v & 1);
    let mut right = Array2::<u8>::eye(n);

    for col in 0..n {
        let pivot_row = (col..n).find(|&r| left[(r, col)] == 1)?;
        if pivot_row != col {
            for c in 0..n {
                left.swap((col, c), (pivot_row, c));
                right.swap((col, c), (pivot_row, c));
            }
        }
        for r in 0..n {
            if r != col && left[(r, col)] == 1 {
                for c in 0..n {
                    let v = left[(col, c)];
                    left[(r, c)] ^= v;
                    let v = right[(col, c)];
                    right[(r, c)] ^= v;
                }
            }
        }
    }
    Some(right)
}

/// Matrix-vector product over GF(2).
pub fn mulvec(a: ArrayView2<'_, u8>, v: ArrayView1<'_, u8>) -> Array1<u8> {
    let (m, n) = a.dim();
    assert_eq!(v.len(), n, "vector length must match column count");
    let mut out = Array1::zeros(m);
    for r in 0..m {
        let mut bit = 0u8;
        for c in 0..n {
            bit ^= a[(r, c)] & v[c];
        }
        out[r] = bit & 1;
    }
    out
}

/// Solve `a * x = b` over GF(2).
///
/// Pivot columns are identified by [`row_echelon`]; the square pivot
/// subsystem is then solved with [`inverse`], and every free variable
/// is set to zero. Returns `None` when the system is inconsistent.
pub fn solve(a: ArrayView2<'_, u8>, b: ArrayView1<'_, u8>) -> Option<Array1<u8>> {
    let (m, n) = a.dim();
    assert_eq!(b.len(), m, "right-hand side length must match row count");

    let re = row_echelon(a);
    let k = re.rank;
    let tb = mulvec(re.transform.view(), b);
    // rows beyond the rank are all-zero; the system is consistent only
    // if the transformed right-hand side vanishes there too
    if tb.iter().skip(k).any(|&v| v != 0) {
        return None;
    }

    let mut x = Array1::zeros(n);
    if k == 0 {
        return Some(x);
    }
    let mut sub = Array2::<u8>::zeros((k, k));
    for r in 0..k {
        for (c, &col) in re.pivot_cols.iter().enumerate() {
            sub[(r, c)] = re.echelon[(r, col)];
        }
    }
    // the pivot submatrix is upper triangular with a unit diagonal
    let inv = inverse(sub.view()).expect("pivot submatrix is invertible");
    let xp = mulvec(inv.view(), tb.slice(ndarray::s![..k]));
    for (c, &col) in re.pivot_cols.iter().enumerate() {
        x[col] = xp[c];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    fn matmul(a: ArrayView2<'_, u8>, b: ArrayView2<'_, u8>) -> Array2<u8> {
        let (m, k) = a.dim();
        let (k2, n) = b.dim();
        assert_eq!(k, k2);
        let mut out = Array2::zeros((m, n));
        for r in 0..m {
            for c in 0..n {
                let mut bit = 0u8;
                for t in 0..k {
                    bit ^= a[(r, t)] & b[(t, c)];
                }
                out[(r, c)] = bit;
            }
        }
        out
    }

    #[test]
    fn echelon_identity_transform() {
        let a = array![[1, 1, 0], [0, 1, 1], [1, 0, 1]];
        let re = row_echelon(a.view());
        assert_eq!(re.echelon, matmul(re.transform.view(), a.view()));
        // rows sum to zero over GF(2), so the rank is 2
        assert_eq!(re.rank, 2);
        assert_eq!(re.pivot_cols, vec![0, 1]);
    }

    #[test]
    fn echelon_pivots_strictly_increase() {
        let a = array![[0, 1, 1, 0], [0, 1, 0, 1], [0, 0, 1, 1]];
        let re = row_echelon(a.view());
        for w in re.pivot_cols.windows(2) {
            assert!(w[0] < w[1]);
        }
        // below each pivot the column is clear
        for (r, &col) in re.pivot_cols.iter().enumerate() {
            assert_eq!(re.echelon[(r, col)], 1);
            for rr in r + 1..a.nrows() {
                assert_eq!(re.echelon[(rr, col)], 0);
            }
        }
    }

    #[test]
    fn inverse_roundtrip() {
        let a = array![[1, 1, 0], [1, 0, 1], [0, 1, 1]];
        // singular: rows sum to zero
        assert!(inverse(a.view()).is_none());

        let b = array![[1, 1, 0], [0, 1, 1], [0, 0, 1]];
        let inv = inverse(b.view()).unwrap();
        assert_eq!(matmul(b.view(), inv.view()), Array2::eye(3));
        assert_eq!(matmul(inv.view(), b.view()), Array2::eye(3));
    }

    #[test]
    fn inverse_rejects_rectangular() {
        let a = array![[1, 0, 1], [0, 1, 1]];
        assert!(inverse(a.view()).is_none());
    }

    #[test]
    fn solve_full_rank() {
        let a = array![[1, 1, 0], [0, 1, 1], [0, 0, 1]];
        let b = array![1, 0, 1];
        let x = solve(a.view(), b.view()).unwrap();
        assert_eq!(mulvec(a.view(), x.view()), b);
    }

    #[test]
    fn solve_underdetermined_zeroes_free_vars() {
        // one equation, three unknowns: x0 ^ x1 ^ x2 = 1
        let a = array![[1, 1, 1]];
        let b = array![1];
        let x = solve(a.view(), b.view()).unwrap();
        assert_eq!(x, array![1, 0, 0]);
    }

    #[test]
    fn solve_inconsistent() {
        let a = array![[1, 1], [1, 1]];
        let b = array![1, 0];
        assert!(solve(a.view(), b.view()).is_none());
    }

    #[test]
    fn solve_wide_rank_deficient() {
        let a = array![[1, 1, 0, 0], [1, 1, 1, 1], [0, 0, 1, 1]];
        // row0 ^ row2 = row1, so the consistent right-hand sides are constrained
        let b = array![1, 1, 0];
        let x = solve(a.view(), b.view()).unwrap();
        assert_eq!(mulvec(a.view(), x.view()), b);
        assert!(solve(a.view(), array![1, 1, 1].view()).is_none());
    }

    proptest! {
        // echelon form always satisfies E = T * A
        #[test]
        fn prop_echelon_transform(bits in proptest::collection::vec(any::<bool>(), 1..36),
                                  m in 1usize..6) {
            let n = bits.len().div_ceil(m).max(1);
            let mut a = Array2::<u8>::zeros((m, n));
            for (i, &b) in bits.iter().enumerate() {
                if i < m * n {
                    a[(i / n, i % n)] = b as u8;
                }
            }
            let re = row_echelon(a.view());
            prop_assert_eq!(&re.echelon, &matmul(re.transform.view(), a.view()));
            prop_assert!(re.rank <= m.min(n));
            prop_assert_eq!(re.pivot_cols.len(), re.rank);
        }

        // a right-hand side built from a known solution is always solvable
        #[test]
        fn prop_solve_consistent(bits in proptest::collection::vec(any::<bool>(), 1..36),
                                 xbits in proptest::collection::vec(any::<bool>(), 6),
                                 m in 1usize..6) {
            let n = bits.len().div_ceil(m).max(1).min(6);
            let mut a = Array2::<u8>::zeros((m, n));
            for (i, &b) in bits.iter().enumerate() {
                if i < m * n {
                    a[(i / n, i % n)] = b as u8;
                }
            }
            let x0 = Array1::from_iter(xbits.iter().take(n).map(|&b| b as u8));
            let b = mulvec(a.view(), x0.view());
            let x = solve(a.view(), b.view());
            prop_assert!(x.is_some());
            prop_assert_eq!(mulvec(a.view(), x.unwrap().view()), b);
        }
    }
}
