//! The causal graph arena.
//!
//! A `CausalGraph` is built once, validated for acyclicity, and then frozen:
//! the topological order is computed at construction and every later
//! traversal (simulation, model compilation, intervention sampling) reuses
//! it. Interventions never touch the original graph; `mutilate` hands back a
//! derived copy with the treated nodes' incoming edges removed.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use crate::error::GraphError;

/// Incrementally collects nodes and edges, then freezes them into a
/// [`CausalGraph`].
///
/// Nodes may be declared explicitly with [`add_node`](Self::add_node) or
/// implicitly by appearing in an edge. Indices are assigned in first-seen
/// order and remain stable for the lifetime of the built graph.
#[derive(Debug, Clone, Default)]
pub struct CausalGraphBuilder {
    names: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
}

impl CausalGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node, returning its stable index. Declaring the same name
    /// twice returns the original index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Declare a directed structural dependency `source -> target`.
    pub fn add_edge(&mut self, source: &str, target: &str) {
        let s = self.add_node(source);
        let t = self.add_node(target);
        self.edges.push((s, t));
    }

    /// Freeze into an immutable graph, checking acyclicity and computing the
    /// topological order once.
    pub fn build(self) -> Result<CausalGraph, GraphError> {
        let mut graph = DiGraph::<String, ()>::with_capacity(self.names.len(), self.edges.len());
        for name in &self.names {
            graph.add_node(name.clone());
        }
        for &(s, t) in &self.edges {
            graph.add_edge(NodeIndex::new(s), NodeIndex::new(t), ());
        }

        let topo = match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|ix| ix.index()).collect(),
            Err(cycle) => {
                let node = graph[cycle.node_id()].clone();
                return Err(GraphError::CycleDetected { node });
            }
        };

        Ok(CausalGraph {
            graph,
            index: self.index,
            topo,
        })
    }
}

/// A frozen directed acyclic graph of named entities.
///
/// Construction goes through [`CausalGraphBuilder`]; once built, the graph
/// is immutable. All structural queries work on stable integer node indices.
#[derive(Debug, Clone)]
pub struct CausalGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, usize>,
    topo: Vec<usize>,
}

impl CausalGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Stable index of a node by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Like [`index_of`](Self::index_of) but failing with
    /// [`GraphError::UnknownNode`].
    pub fn require(&self, name: &str) -> Result<usize, GraphError> {
        self.index_of(name).ok_or_else(|| GraphError::UnknownNode {
            node: name.to_string(),
        })
    }

    /// Node name for a stable index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds; indices are only produced by this
    /// graph, so an out-of-range index is a caller bug.
    pub fn name(&self, idx: usize) -> &str {
        &self.graph[NodeIndex::new(idx)]
    }

    /// All node names in stable-index order.
    pub fn node_names(&self) -> Vec<&str> {
        (0..self.node_count()).map(|i| self.name(i)).collect()
    }

    /// Direct parents of a node, sorted by index for deterministic
    /// traversal.
    pub fn parents(&self, idx: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .graph
            .neighbors_directed(NodeIndex::new(idx), Direction::Incoming)
            .map(|ix| ix.index())
            .collect();
        out.sort_unstable();
        out
    }

    /// Direct children of a node, sorted by index.
    pub fn children(&self, idx: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .graph
            .neighbors_directed(NodeIndex::new(idx), Direction::Outgoing)
            .map(|ix| ix.index())
            .collect();
        out.sort_unstable();
        out
    }

    /// The topological order computed at construction. Every node appears
    /// after all of its parents.
    pub fn topo_order(&self) -> &[usize] {
        &self.topo
    }

    /// Whether `descendant` is reachable from `ancestor` along directed
    /// edges (a node is not its own descendant).
    pub fn is_descendant(&self, ancestor: usize, descendant: usize) -> bool {
        if ancestor == descendant {
            return false;
        }
        let mut stack = vec![ancestor];
        let mut seen = vec![false; self.node_count()];
        while let Some(n) = stack.pop() {
            for child in self.children(n) {
                if child == descendant {
                    return true;
                }
                if !seen[child] {
                    seen[child] = true;
                    stack.push(child);
                }
            }
        }
        false
    }

    /// Do-operator graph surgery: a derived copy of this graph with every
    /// incoming edge to each node in `targets` removed.
    ///
    /// Node indices in the returned graph are identical to this graph's;
    /// `self` is left untouched. The result of mutilating a DAG is still a
    /// DAG, and the original topological order remains valid for it, so the
    /// derived graph reuses it.
    pub fn mutilate(&self, targets: &[usize]) -> CausalGraph {
        let mut graph =
            DiGraph::<String, ()>::with_capacity(self.node_count(), self.edge_count());
        for i in 0..self.node_count() {
            graph.add_node(self.name(i).to_string());
        }
        for edge in self.graph.edge_references() {
            let target = edge.target().index();
            if targets.contains(&target) {
                continue;
            }
            graph.add_edge(edge.source(), edge.target(), ());
        }

        CausalGraph {
            graph,
            index: self.index.clone(),
            topo: self.topo.clone(),
        }
    }
}
