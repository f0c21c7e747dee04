//! Orthogonally linked sparse binary matrix.
//!
//! Stores only the 1-entries of an m x n matrix over GF(2). Every
//! nonzero is linked into its row list and its column list, both kept
//! in ascending index order, so message passing can traverse all of a
//! row's entries and then jump to any entry's column (or vice versa) in
//! O(1) per step with no auxiliary position tables.
//!
//! Entries live in a single contiguous arena indexed by `u32`. The
//! first `m + n` slots are sentinels (one per row, one per column) that
//! close each list into a ring; real entries follow and never move
//! after construction. BP messages are stored on the entries
//! themselves: the two-pass exclude-self sweeps in the decoder write
//! partial accumulators into the same slot the opposite pass reads, and
//! the serial schedule snapshots a per-edge message immediately before
//! mutating it, so the storage has to sit on the edge.

use ndarray::{ArrayView2, ArrayViewMut1};

use crate::error::{DecoderError, DecoderResult};

/// Index of an entry in the arena.
pub type EntryIdx = u32;

/// A single nonzero of the matrix, plus its message state.
#[derive(Debug, Clone)]
pub struct Entry {
    /// row index (check)
    pub row: usize,
    /// column index (bit)
    pub col: usize,
    // ring links; sentinels close each list
    left: EntryIdx,
    right: EntryIdx,
    up: EntryIdx,
    down: EntryIdx,
    /// bit-to-check message
    pub var_to_chk: f64,
    /// check-to-bit message
    pub chk_to_var: f64,
    /// sign accumulator for the min-sum sweeps
    pub sgn: u32,
}

impl Entry {
    fn sentinel(row: usize, col: usize, idx: EntryIdx) -> Self {
        Entry {
            row,
            col,
            left: idx,
            right: idx,
            up: idx,
            down: idx,
            var_to_chk: 0.0,
            chk_to_var: 0.0,
            sgn: 0,
        }
    }
}

/// Sparse binary parity-check matrix with per-edge message slots.
#[derive(Debug, Clone)]
pub struct SparseBitMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<Entry>,
}

impl SparseBitMatrix {
    /// Build from coordinate pairs. Each `(row, col)` marks a 1-entry.
    ///
    /// Fails with [`DecoderError::InvalidMatrix`] if either dimension
    /// is zero, an index is out of range, or a coordinate repeats.
    pub fn from_entries(
        rows: usize,
        cols: usize,
        nonzeros: &[(usize, usize)],
    ) -> DecoderResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(DecoderError::InvalidMatrix {
                reason: format!("shape {rows}x{cols} has a zero dimension"),
            });
        }
        for &(r, c) in nonzeros {
            if r >= rows || c >= cols {
                return Err(DecoderError::InvalidMatrix {
                    reason: format!("entry ({r}, {c}) out of range for {rows}x{cols}"),
                });
            }
        }

        let mut coords: Vec<(usize, usize)> = nonzeros.to_vec();
        coords.sort_unstable();
        for w in coords.windows(2) {
            if w[0] == w[1] {
                return Err(DecoderError::InvalidMatrix {
                    reason: format!("duplicate entry ({}, {})", w[0].0, w[0].1),
                });
            }
        }

        let mut entries = Vec::with_capacity(rows + cols + coords.len());
        for r in 0..rows {
            entries.push(Entry::sentinel(r, usize::MAX, r as EntryIdx));
        }
        for c in 0..cols {
            entries.push(Entry::sentinel(usize::MAX, c, (rows + c) as EntryIdx));
        }

        let mut m = SparseBitMatrix {
            rows,
            cols,
            entries,
        };
        // coords are sorted by (row, col), so appending at each ring's
        // tail keeps rows in column order and columns in row order
        for (r, c) in coords {
            m.push_entry(r, c);
        }
        Ok(m)
    }

    /// Build from a dense 0/1 matrix.
    pub fn from_dense(dense: ArrayView2<'_, u8>) -> DecoderResult<Self> {
        let (rows, cols) = dense.dim();
        let mut nonzeros = Vec::new();
        for ((r, c), &v) in dense.indexed_iter() {
            match v {
                0 => {}
                1 => nonzeros.push((r, c)),
                _ => {
                    return Err(DecoderError::InvalidMatrix {
                        reason: format!("entry ({r}, {c}) is {v}, expected 0 or 1"),
                    })
                }
            }
        }
        Self::from_entries(rows, cols, &nonzeros)
    }

    fn push_entry(&mut self, row: usize, col: usize) {
        let idx = self.entries.len() as EntryIdx;
        let row_sent = row as EntryIdx;
        let col_sent = (self.rows + col) as EntryIdx;
        let row_last = self.entries[row_sent as usize].left;
        let col_last = self.entries[col_sent as usize].up;

        self.entries.push(Entry {
            row,
            col,
            left: row_last,
            right: row_sent,
            up: col_last,
            down: col_sent,
            var_to_chk: 0.0,
            chk_to_var: 0.0,
            sgn: 0,
        });
        self.entries[row_last as usize].right = idx;
        self.entries[row_sent as usize].left = idx;
        self.entries[col_last as usize].down = idx;
        self.entries[col_sent as usize].up = idx;
    }

    /// Number of rows (checks).
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (bits).
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Number of 1-entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.entries.len() - self.rows - self.cols
    }

    /// True when `e` is a row or column sentinel, i.e. a traversal has
    /// wrapped past the end of its list.
    #[inline]
    pub fn is_sentinel(&self, e: EntryIdx) -> bool {
        (e as usize) < self.rows + self.cols
    }

    /// First entry of row `i`, or the row sentinel if the row is empty.
    #[inline]
    pub fn first_in_row(&self, i: usize) -> EntryIdx {
        self.entries[i].right
    }

    /// Last entry of row `i`.
    #[inline]
    pub fn last_in_row(&self, i: usize) -> EntryIdx {
        self.entries[i].left
    }

    /// First entry of column `j`.
    #[inline]
    pub fn first_in_col(&self, j: usize) -> EntryIdx {
        self.entries[self.rows + j].down
    }

    /// Last entry of column `j`.
    #[inline]
    pub fn last_in_col(&self, j: usize) -> EntryIdx {
        self.entries[self.rows + j].up
    }

    #[inline]
    pub fn next_in_row(&self, e: EntryIdx) -> EntryIdx {
        self.entries[e as usize].right
    }

    #[inline]
    pub fn prev_in_row(&self, e: EntryIdx) -> EntryIdx {
        self.entries[e as usize].left
    }

    #[inline]
    pub fn next_in_col(&self, e: EntryIdx) -> EntryIdx {
        self.entries[e as usize].down
    }

    #[inline]
    pub fn prev_in_col(&self, e: EntryIdx) -> EntryIdx {
        self.entries[e as usize].up
    }

    #[inline]
    pub fn entry(&self, e: EntryIdx) -> &Entry {
        &self.entries[e as usize]
    }

    #[inline]
    pub fn entry_mut(&mut self, e: EntryIdx) -> &mut Entry {
        &mut self.entries[e as usize]
    }

    /// Number of 1-entries in row `i`.
    pub fn row_weight(&self, i: usize) -> usize {
        let mut w = 0;
        let mut e = self.first_in_row(i);
        while !self.is_sentinel(e) {
            w += 1;
            e = self.next_in_row(e);
        }
        w
    }

    /// Number of 1-entries in column `j`.
    pub fn col_weight(&self, j: usize) -> usize {
        let mut w = 0;
        let mut e = self.first_in_col(j);
        while !self.is_sentinel(e) {
            w += 1;
            e = self.next_in_col(e);
        }
        w
    }

    /// Zero every message and sign slot.
    pub fn reset_messages(&mut self) {
        for e in self.entries.iter_mut().skip(self.rows + self.cols) {
            e.var_to_chk = 0.0;
            e.chk_to_var = 0.0;
            e.sgn = 0;
        }
    }

    /// out[i] = XOR over j of H[i,j] * v[j], by row traversal.
    ///
    /// # Panics
    ///
    /// Panics if `v.len() != n_cols()` or `out.len() != n_rows()`.
    pub fn mulvec(&self, v: &[u8], mut out: ArrayViewMut1<'_, u8>) {
        assert_eq!(v.len(), self.cols, "input length must match column count");
        assert_eq!(out.len(), self.rows, "output length must match row count");
        for i in 0..self.rows {
            let mut bit = 0u8;
            let mut e = self.first_in_row(i);
            while !self.is_sentinel(e) {
                bit ^= v[self.entry(e).col] & 1;
                e = self.next_in_row(e);
            }
            out[i] = bit;
        }
    }
}
