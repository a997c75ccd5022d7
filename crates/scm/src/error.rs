//! Error types for the structural-equation layer.

use proteocausal_graph::GraphError;
use thiserror::Error;

/// Errors raised while declaring, validating, or transforming SCM data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScmError {
    /// Graph and spec disagree: a node or parent referenced by one is absent
    /// from the other, or a prior is malformed. Detected eagerly, never
    /// silently repaired.
    #[error("spec mismatch at node `{node}`: {reason}")]
    SpecMismatch { node: String, reason: String },

    /// A column had zero variance during strict standardization.
    #[error("column `{column}` has zero variance across observed entries")]
    DegenerateScale { column: String },

    /// A column name that the dataset does not carry.
    #[error("unknown column `{column}`")]
    UnknownColumn { column: String },

    /// A row was pushed whose width does not match the dataset schema.
    #[error("row has {got} cells, dataset has {expected} columns")]
    RowWidthMismatch { expected: usize, got: usize },

    /// Underlying graph failure.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
