use thiserror::Error;

#[derive(Debug, Error)]
pub enum CscError {
    #[error("out of bounds index: {index} (max: {max})")]
    OutOfBoundsIndex { index: usize, max: usize },

    #[error("invalid column pointers length: {expected} (actual: {actual})")]
    InvalidColumnPointersLength { expected: usize, actual: usize },

    #[error("invalid column pointers: {index} (expected: {expected}, actual: {actual})")]
    InvalidColumnPointers {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("row indices values length mismatch: {values} (actual: {row_indices})")]
    RowIndicesValuesLengthMismatch { values: usize, row_indices: usize },

    #[error("rows not strictly increasing in column {column} (previous: {previous}, actual: {actual})")]
    RowsNotStrictlyIncreasing {
        column: usize,
        previous: usize,
        actual: usize,
    },

    #[error("entry above the diagonal at (row={row}, col={col}); only the lower triangle is stored")]
    UpperTriangleEntry { row: usize, col: usize },
}
