use thiserror::Error;

use crate::analyse::AnalyseError;
use crate::matrix::error::CscError;
use crate::numeric::FactorError;
use crate::order::OrderingError;
use crate::workspace::WorkspaceError;

/// Umbrella error for the whole pipeline.
///
/// Construction-time failures (ordering, analysis, bad input) abort before
/// any numeric work; numeric failures carry enough context to diagnose the
/// offending pivot.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Matrix(#[from] CscError),

    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error(transparent)]
    Analyse(#[from] AnalyseError),

    #[error(transparent)]
    Factor(#[from] FactorError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}
