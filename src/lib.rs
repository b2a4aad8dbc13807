//! Supernodal sparse Cholesky (LL^T) factorization for symmetric positive
//! definite matrices.
//!
//! The pipeline splits in two: a symbolic phase that orders the matrix,
//! builds the supernodal assembly tree and plans all storage, and a numeric
//! phase that factors values against that plan and solves. One
//! [`SymbolicFactor`] can back any number of numeric factorizations of
//! matrices sharing the same pattern.
//!
//! ```
//! use cholla::{CooBuilder, Options, NumericFactor, SymbolicFactor};
//!
//! // A = [[4, 1], [1, 3]]
//! let mut builder = CooBuilder::new(2);
//! builder.push(0, 0, 4.0).unwrap();
//! builder.push(1, 0, 1.0).unwrap();
//! builder.push(1, 1, 3.0).unwrap();
//! let a = builder.build().unwrap();
//!
//! let sf = SymbolicFactor::new(a.n, &a.column_pointers, &a.row_indices, &Options::default())
//!     .unwrap();
//! let nf = NumericFactor::new(&sf, &a.values).unwrap();
//! let x = nf.solve(&[5.0, 4.0]).unwrap();
//! assert!((x[0] - 1.0).abs() < 1e-12 && (x[1] - 1.0).abs() < 1e-12);
//! ```

pub mod analyse;
pub mod chunk;
pub mod chunker;
pub mod dense;
pub mod error;
pub mod matrix;
pub mod maps;
pub mod node;
pub mod numeric;
pub mod order;
pub mod symbolic;
pub mod tree;
pub mod workspace;

pub use error::SolverError;
pub use matrix::{CooBuilder, CscError, SymmetricCsc};
pub use numeric::{FactorError, NumericFactor};
pub use order::OrderingKind;
pub use symbolic::SymbolicFactor;
pub use tree::AssemblyTree;
pub use workspace::{WorkspaceError, WorkspaceManager};

/// Tuning knobs for the symbolic phase.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Supernode amalgamation threshold: a node absorbs its last child while
    /// either of the two has fewer than `nemin` columns.
    pub nemin: usize,
    /// Fill-reducing ordering applied before the analysis.
    pub ordering: OrderingKind,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            nemin: 8,
            ordering: OrderingKind::MinimumDegree,
        }
    }
}

/// Run the symbolic phase on a lower-triangle pattern.
pub fn build_symbolic(
    n: usize,
    ptr: &[usize],
    row: &[usize],
    options: &Options,
) -> Result<SymbolicFactor, SolverError> {
    SymbolicFactor::new(n, ptr, row, options)
}

/// Factor the values of a matrix against a prebuilt symbolic factor.
pub fn numeric_factor<'a>(
    sf: &'a SymbolicFactor,
    values: &[f64],
) -> Result<NumericFactor<'a>, SolverError> {
    Ok(NumericFactor::new(sf, values)?)
}
