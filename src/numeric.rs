//! Numeric phase: factor the values of a matrix against a prebuilt symbolic
//! factor, and solve with the result.

use thiserror::Error;

use crate::symbolic::SymbolicFactor;
use crate::workspace::{WorkspaceError, WorkspaceManager};

#[derive(Debug, Error)]
pub enum FactorError {
    /// The matrix is not positive definite. `column` is the original
    /// (unpermuted) variable index of the first failing pivot.
    #[error("matrix is not positive definite (first failing pivot at variable {column})")]
    NotPositiveDefinite { column: usize },

    #[error("values length mismatch: the symbolic pattern has {expected} entries, got {actual}")]
    ValuesLengthMismatch { expected: usize, actual: usize },

    #[error("right-hand side has {actual} entries, {required} required")]
    RhsSizeMismatch { required: usize, actual: usize },

    #[error("leading dimension {ldx} is smaller than the matrix order {n}")]
    InvalidLeadingDimension { ldx: usize, n: usize },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

/// A completed L factor. Borrows the symbolic factor it was built against;
/// many numeric factors can share one symbolic phase.
#[derive(Debug)]
pub struct NumericFactor<'a> {
    sf: &'a SymbolicFactor,
    lval: Vec<f64>,
}

impl<'a> NumericFactor<'a> {
    /// Factor the matrix whose lower-triangle values are `aval`, ordered as
    /// the pattern given to the symbolic phase.
    pub fn new(sf: &'a SymbolicFactor, aval: &[f64]) -> Result<Self, FactorError> {
        if aval.len() != sf.nnz() {
            return Err(FactorError::ValuesLengthMismatch {
                expected: sf.nnz(),
                actual: aval.len(),
            });
        }

        let mut lval = vec![0.0; sf.factor_size()];
        let mut ws = WorkspaceManager::new(sf.workspace_reals(), sf.n());
        let tree = sf.tree();
        let layouts = sf.layouts();
        for chunk in sf.chunks() {
            chunk
                .factor(tree, layouts, aval, &mut lval, &mut ws)
                .map_err(|e| match e {
                    // report the pivot in the caller's numbering
                    FactorError::NotPositiveDefinite { column } => {
                        FactorError::NotPositiveDefinite {
                            column: sf.perm()[column],
                        }
                    }
                    other => other,
                })?;
        }
        Ok(Self { sf, lval })
    }

    pub fn symbolic(&self) -> &SymbolicFactor {
        self.sf
    }

    /// Flat factor storage, laid out per the symbolic node layouts.
    pub fn factor_values(&self) -> &[f64] {
        &self.lval
    }

    /// Solve A x = b for a single right-hand side.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>, FactorError> {
        let n = self.sf.n();
        if b.len() != n {
            return Err(FactorError::RhsSizeMismatch {
                required: n,
                actual: b.len(),
            });
        }
        let mut x = b.to_vec();
        self.solve_multi(1, &mut x, n.max(1))?;
        Ok(x)
    }

    /// Solve A X = B in place for `nrhs` right-hand sides stored column-major
    /// in `x` with leading dimension `ldx`. Right-hand sides are in the
    /// original variable order; permutation happens internally.
    pub fn solve_multi(&self, nrhs: usize, x: &mut [f64], ldx: usize) -> Result<(), FactorError> {
        let n = self.sf.n();
        if ldx < n {
            return Err(FactorError::InvalidLeadingDimension { ldx, n });
        }
        let required = if nrhs == 0 { 0 } else { (nrhs - 1) * ldx + n };
        if x.len() < required {
            return Err(FactorError::RhsSizeMismatch {
                required,
                actual: x.len(),
            });
        }
        if n == 0 || nrhs == 0 {
            return Ok(());
        }

        let perm = self.sf.perm();
        let mut xp = vec![0.0; ldx * nrhs];
        for r in 0..nrhs {
            for k in 0..n {
                xp[r * ldx + k] = x[r * ldx + perm[k]];
            }
        }

        let mut ws = WorkspaceManager::new(self.sf.max_contrib_dim() * nrhs, 0);
        let tree = self.sf.tree();
        for chunk in self.sf.chunks() {
            chunk.forward_solve(tree, &self.lval, nrhs, &mut xp, ldx, &mut ws)?;
        }
        for chunk in self.sf.chunks().iter().rev() {
            chunk.backward_solve(tree, &self.lval, nrhs, &mut xp, ldx, &mut ws)?;
        }

        for r in 0..nrhs {
            for k in 0..n {
                x[r * ldx + perm[k]] = xp[r * ldx + k];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderingKind;
    use crate::{Options, SymbolicFactor};

    fn natural() -> Options {
        Options {
            nemin: 1,
            ordering: OrderingKind::Natural,
        }
    }

    #[test]
    fn rejects_mismatched_value_length() {
        let ptr = vec![0, 1];
        let row = vec![0];
        let sf = SymbolicFactor::new(1, &ptr, &row, &natural()).unwrap();
        assert!(matches!(
            NumericFactor::new(&sf, &[1.0, 2.0]),
            Err(FactorError::ValuesLengthMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn rejects_wrong_rhs_size() {
        let ptr = vec![0, 1];
        let row = vec![0];
        let sf = SymbolicFactor::new(1, &ptr, &row, &natural()).unwrap();
        let nf = NumericFactor::new(&sf, &[4.0]).unwrap();
        assert!(matches!(
            nf.solve(&[1.0, 2.0]),
            Err(FactorError::RhsSizeMismatch { .. })
        ));
    }

    #[test]
    fn one_by_one_solves() {
        let ptr = vec![0, 1];
        let row = vec![0];
        let sf = SymbolicFactor::new(1, &ptr, &row, &natural()).unwrap();
        let nf = NumericFactor::new(&sf, &[4.0]).unwrap();
        assert_eq!(nf.factor_values(), &[2.0]);
        let x = nf.solve(&[8.0]).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn negative_pivot_names_the_variable() {
        let ptr = vec![0, 1];
        let row = vec![0];
        let sf = SymbolicFactor::new(1, &ptr, &row, &natural()).unwrap();
        assert!(matches!(
            NumericFactor::new(&sf, &[-1.0]),
            Err(FactorError::NotPositiveDefinite { column: 0 })
        ));
    }

    #[test]
    fn empty_matrix_is_a_no_op() {
        let ptr = vec![0];
        let row = vec![];
        let sf = SymbolicFactor::new(0, &ptr, &row, &natural()).unwrap();
        let nf = NumericFactor::new(&sf, &[]).unwrap();
        let x = nf.solve(&[]).unwrap();
        assert!(x.is_empty());
    }
}
