use crate::matrix::error::CscError;

/// Sparse symmetric matrix, lower triangle only, in compressed sparse column
/// form.
/// - column pointers mark the start and end of each column
/// - row indices are the rows of the stored nonzeros, `row >= col`
/// - values run parallel to the row indices
#[derive(Debug, Clone)]
pub struct SymmetricCsc {
    /// Matrix order (the matrix is n-by-n).
    pub n: usize,
    /// Column pointers, len = n + 1
    pub column_pointers: Vec<usize>,
    /// Row indices, len = nnz
    pub row_indices: Vec<usize>,
    /// Nonzero values, len = nnz
    pub values: Vec<f64>,
}

impl SymmetricCsc {
    /// number of stored nonzeros (lower triangle)
    pub fn nnz(&self) -> usize {
        self.row_indices.len()
    }

    pub fn check_invariants(&self) -> Result<(), CscError> {
        if self.column_pointers.len() != self.n + 1 {
            return Err(CscError::InvalidColumnPointersLength {
                expected: self.n + 1,
                actual: self.column_pointers.len(),
            });
        }
        if *self.column_pointers.first().unwrap_or(&1) != 0 {
            return Err(CscError::InvalidColumnPointers {
                index: 0,
                expected: 0,
                actual: *self.column_pointers.first().unwrap_or(&1),
            });
        }
        if self.column_pointers[self.n] != self.nnz() {
            return Err(CscError::InvalidColumnPointers {
                index: self.n,
                expected: self.nnz(),
                actual: self.column_pointers[self.n],
            });
        }
        if self.row_indices.len() != self.values.len() {
            return Err(CscError::RowIndicesValuesLengthMismatch {
                values: self.values.len(),
                row_indices: self.row_indices.len(),
            });
        }
        // per-column sorted, in-range, and on-or-below the diagonal
        for j in 0..self.n {
            let (start, end) = (self.column_pointers[j], self.column_pointers[j + 1]);
            if start > end || end > self.nnz() {
                return Err(CscError::InvalidColumnPointers {
                    index: j,
                    expected: start,
                    actual: end,
                });
            }
            let mut prev = None;
            for &r in &self.row_indices[start..end] {
                if r >= self.n {
                    return Err(CscError::OutOfBoundsIndex {
                        index: r,
                        max: self.n,
                    });
                }
                if r < j {
                    return Err(CscError::UpperTriangleEntry { row: r, col: j });
                }
                if let Some(p) = prev {
                    if r <= p {
                        return Err(CscError::RowsNotStrictlyIncreasing {
                            column: j,
                            previous: p,
                            actual: r,
                        });
                    }
                }
                prev = Some(r);
            }
        }
        Ok(())
    }

    /// Return (row_indices, values) slice for column j
    pub fn col(&self, j: usize) -> (&[usize], &[f64]) {
        let (s, e) = (self.column_pointers[j], self.column_pointers[j + 1]);
        (&self.row_indices[s..e], &self.values[s..e])
    }

    /// y = A*x using the implicit symmetry: each stored lower entry (i,j)
    /// contributes to both y[i] and y[j].
    pub fn matvec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.n);
        let mut y = vec![0.0; self.n];
        for j in 0..self.n {
            let (rows, vals) = self.col(j);
            for (&i, &a) in rows.iter().zip(vals.iter()) {
                y[i] += a * x[j];
                if i != j {
                    y[j] += a * x[i];
                }
            }
        }
        y
    }

    /// Expand this matrix's pattern to full symmetric form.
    pub fn expand_pattern(&self) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
        expand_to_full_with_sources(self.n, &self.column_pointers, &self.row_indices)
    }
}

/// Expand a lower-triangle pattern to full symmetric form, remembering for
/// every expanded entry the position of the lower-triangle nonzero it came
/// from. Returns (full_ptr, full_row, full_src).
pub fn expand_to_full_with_sources(
    n: usize,
    ptr: &[usize],
    row: &[usize],
) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    // count entries per full column
    let mut full_ptr = vec![0usize; n + 1];
    for j in 0..n {
        for &i in &row[ptr[j]..ptr[j + 1]] {
            full_ptr[j + 1] += 1;
            if i != j {
                full_ptr[i + 1] += 1;
            }
        }
    }
    for j in 0..n {
        full_ptr[j + 1] += full_ptr[j];
    }

    let full_nnz = full_ptr[n];
    let mut full_row = vec![0usize; full_nnz];
    let mut full_src = vec![0usize; full_nnz];
    let mut next = full_ptr.clone();
    for j in 0..n {
        for p in ptr[j]..ptr[j + 1] {
            let i = row[p];
            full_row[next[j]] = i;
            full_src[next[j]] = p;
            next[j] += 1;
            if i != j {
                full_row[next[i]] = j;
                full_src[next[i]] = p;
                next[i] += 1;
            }
        }
    }
    (full_ptr, full_row, full_src)
}

/// Builder from symmetric triplets (COO -> canonical lower-triangle CSC).
///
/// Usage:
///   let mut b = CooBuilder::new(n);
///   b.push(i, j, v); ...     // (i,j) and (j,i) refer to the same entry
///   let a = b.build()?;      // sorted rows per col, duplicates summed
#[derive(Debug)]
pub struct CooBuilder {
    n: usize,
    /// (column, row, value) with row >= column
    entries: Vec<(usize, usize, f64)>,
}

impl CooBuilder {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            entries: Vec::new(),
        }
    }

    pub fn reserve(&mut self, nnz: usize) {
        self.entries.reserve(nnz);
    }

    /// push an entry; mirrored coordinates are folded onto the lower triangle
    pub fn push(&mut self, row: usize, col: usize, value: f64) -> Result<(), CscError> {
        if row >= self.n {
            return Err(CscError::OutOfBoundsIndex {
                index: row,
                max: self.n,
            });
        }
        if col >= self.n {
            return Err(CscError::OutOfBoundsIndex {
                index: col,
                max: self.n,
            });
        }
        let (r, c) = if row >= col { (row, col) } else { (col, row) };
        self.entries.push((c, r, value));
        Ok(())
    }

    pub fn build(mut self) -> Result<SymmetricCsc, CscError> {
        let n = self.n;
        self.entries
            .sort_by(|&(c1, r1, _), &(c2, r2, _)| (c1, r1).cmp(&(c2, r2)));

        // combine duplicates; keep explicit zeros so the pattern is stable
        let mut combined: Vec<(usize, usize, f64)> = Vec::with_capacity(self.entries.len());
        for (c, r, v) in self.entries {
            match combined.last_mut() {
                Some(&mut (lc, lr, ref mut acc)) if lc == c && lr == r => *acc += v,
                _ => combined.push((c, r, v)),
            }
        }

        let mut column_pointers = vec![0usize; n + 1];
        for &(c, _r, _v) in &combined {
            column_pointers[c + 1] += 1;
        }
        for j in 0..n {
            column_pointers[j + 1] += column_pointers[j];
        }

        let nnz = combined.len();
        let mut row_indices = vec![0usize; nnz];
        let mut values = vec![0f64; nnz];
        let mut next = column_pointers.clone();
        for (c, r, v) in combined {
            let p = next[c];
            row_indices[p] = r;
            values[p] = v;
            next[c] += 1;
        }

        let a = SymmetricCsc {
            n,
            column_pointers,
            row_indices,
            values,
        };
        a.check_invariants()?;
        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_access() {
        // A = [ 10  0  2
        //        0 20  0
        //        2  0 30 ]
        let mut b = CooBuilder::new(3);
        b.push(0, 0, 10.0).unwrap();
        b.push(2, 0, 2.0).unwrap();
        b.push(1, 1, 20.0).unwrap();
        b.push(2, 2, 30.0).unwrap();
        // duplicate, given as the mirrored coordinate
        b.push(0, 2, 1.0).unwrap();

        let a = b.build().unwrap();
        assert_eq!(a.nnz(), 4);

        let (r0, v0) = a.col(0);
        assert_eq!(r0, &[0, 2]);
        assert_eq!(v0, &[10.0, 3.0]);

        let (r2, v2) = a.col(2);
        assert_eq!(r2, &[2]);
        assert_eq!(v2, &[30.0]);

        assert!(a.check_invariants().is_ok());
    }

    #[test]
    fn matvec_uses_both_triangles() {
        // A = [ 2 1
        //       1 3 ]
        let mut b = CooBuilder::new(2);
        b.push(0, 0, 2.0).unwrap();
        b.push(1, 0, 1.0).unwrap();
        b.push(1, 1, 3.0).unwrap();
        let a = b.build().unwrap();

        let y = a.matvec(&[1.0, 2.0]);
        assert_eq!(y, vec![4.0, 7.0]);
    }

    #[test]
    fn expand_remembers_sources() {
        let mut b = CooBuilder::new(3);
        b.push(0, 0, 1.0).unwrap();
        b.push(2, 0, 5.0).unwrap();
        b.push(1, 1, 1.0).unwrap();
        b.push(2, 2, 1.0).unwrap();
        let a = b.build().unwrap();

        let (fptr, frow, fsrc) = a.expand_pattern();
        // off-diagonal (2,0) appears in both columns 0 and 2
        assert_eq!(fptr, vec![0, 2, 3, 5]);
        assert_eq!(&frow[fptr[0]..fptr[1]], &[0, 2]);
        assert_eq!(&frow[fptr[2]..fptr[3]], &[0, 2]);
        // both expanded copies refer back to the stored (2,0) slot
        let p20 = a.column_pointers[0] + 1;
        assert_eq!(fsrc[1], p20);
        assert_eq!(fsrc[fptr[2]], p20);
    }

    #[test]
    fn rejects_inconsistent_pointers() {
        let a = SymmetricCsc {
            n: 2,
            column_pointers: vec![0, 2],
            row_indices: vec![0, 1],
            values: vec![1.0, 1.0],
        };
        assert!(matches!(
            a.check_invariants(),
            Err(CscError::InvalidColumnPointersLength { .. })
        ));
    }
}
