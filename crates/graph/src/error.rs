//! Error types for causal graph construction and queries.

use thiserror::Error;

/// Errors raised while building or querying a causal graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The edge set contains a directed cycle, so no topological order
    /// exists. Reports one node on the cycle.
    #[error("graph contains a cycle through node `{node}`")]
    CycleDetected { node: String },

    /// A name was used that no node in the graph carries.
    #[error("unknown node `{node}`")]
    UnknownNode { node: String },
}
