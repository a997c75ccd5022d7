//! Error types for model fitting and causal queries.

use proteocausal_graph::GraphError;
use proteocausal_scm::ScmError;
use thiserror::Error;

/// Errors raised at the fitting and query boundary.
///
/// Everything here is detected before or outside the optimization loop;
/// numerical trouble *during* optimization degrades the fit-quality flag on
/// the resulting model instead of raising.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferError {
    /// Graph lookup failure (unknown treatment/outcome node, ...).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Spec/graph/dataset inconsistency, including `SpecMismatch`.
    #[error(transparent)]
    Scm(#[from] ScmError),

    /// A measured column has no observed entry in any replicate, so its
    /// imputation would hang on the prior alone. Rejected before
    /// optimization starts.
    #[error("column `{column}` has no observed entries to anchor imputation")]
    MissingnessExhaustion { column: String },

    /// The adjustment regression has fewer complete rows than parameters.
    #[error("adjustment regression needs {needed} complete rows, found {found}")]
    InsufficientData { needed: usize, found: usize },

    /// The adjustment regression's design matrix is not invertible.
    #[error("singular design matrix in adjustment regression")]
    SingularDesign,
}
