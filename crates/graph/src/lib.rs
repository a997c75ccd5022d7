//! # Graph - Causal Structure as a Frozen Arena
//!
//! This crate provides the graph data model the rest of the workspace builds
//! upon:
//!
//! - **CausalGraph**: a directed acyclic graph of named entities, frozen at
//!   construction with a precomputed topological order
//! - **Mutilation**: the do-operator's graph surgery, producing a *derived*
//!   graph with incoming edges to intervened nodes removed
//! - **Errors**: cycles and unknown nodes are first-class failures, rejected
//!   at the boundary
//!
//! ## Design
//!
//! Nodes are keyed by stable integer indices assigned in insertion order, so
//! a fitted model and any later mutilated copy agree on what index `i` means.
//! The original graph is never mutated after `build()`; intervention works on
//! a fresh derived copy.
//!
//! ## Example
//!
//! ```rust
//! use proteocausal_graph::CausalGraphBuilder;
//!
//! let mut builder = CausalGraphBuilder::new();
//! builder.add_edge("Ras", "Raf");
//! builder.add_edge("Raf", "Mek");
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.node_count(), 3);
//! let raf = graph.index_of("Raf").unwrap();
//! assert_eq!(graph.parents(raf), vec![graph.index_of("Ras").unwrap()]);
//! ```

mod error;
mod graph;

pub use error::GraphError;
pub use graph::{CausalGraph, CausalGraphBuilder};
