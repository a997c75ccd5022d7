//! Model compilation: graph + spec + masked data -> a flat joint density.
//!
//! Compilation resolves every name once, up front, into integer-indexed
//! structures the optimizer can traverse without lookups:
//!
//! - each non-fixed equation parameter becomes a latent slot with a Normal
//!   prior in unconstrained space (the noise scale is fitted as its log);
//! - each data cell becomes either an observed constant or a latent slot —
//!   the same tagged-variant treatment the dataset itself uses, so the
//!   density construction is one uniform traversal regardless of the
//!   missingness pattern.
//!
//! All boundary errors (spec mismatch, underdetermined columns) surface
//! here, before any optimization budget is spent.

use proteocausal_graph::CausalGraph;
use proteocausal_scm::{Dataset, ParamRole, Prior, ScmError, SpecSet};

use crate::error::InferError;

/// A resolved equation parameter: fitted latent or fixed constant.
///
/// For the noise term, `Latent` indexes the *log* scale while `Fixed` holds
/// the scale itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Slot {
    Latent(usize),
    Fixed(f64),
}

/// One node's structural equation in index form.
#[derive(Debug, Clone)]
pub(crate) struct CompiledEquation {
    /// Graph index of the node this equation generates.
    pub node: usize,
    pub intercept: Slot,
    /// (parent graph index, coefficient slot), sorted by parent index.
    pub terms: Vec<(usize, Slot)>,
    pub noise: Slot,
}

/// What a latent slot stands for.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LatentKind {
    /// An equation parameter of `node` (graph index).
    Param { node: usize, role: ParamRole },
    /// An unobserved data cell: missing entry or a latent node's value.
    Cell { row: usize, node: usize },
}

/// A latent variable of the joint model.
#[derive(Debug, Clone)]
pub(crate) struct Latent {
    pub kind: LatentKind,
    /// Normal prior (mean, std) in unconstrained space. Data cells carry no
    /// explicit prior; their density comes from the likelihood terms they
    /// participate in.
    pub prior: Option<(f64, f64)>,
    /// Initial location for the variational guide.
    pub init: f64,
}

/// One data cell as the density sees it.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CellState {
    Obs(f64),
    Latent(usize),
}

/// The compiled joint model: equations in topological order, the latent
/// registry, and the cell grid.
#[derive(Debug, Clone)]
pub(crate) struct CompiledModel {
    pub equations: Vec<CompiledEquation>,
    pub latents: Vec<Latent>,
    /// `cells[row][graph node index]`.
    pub cells: Vec<Vec<CellState>>,
    pub n_rows: usize,
}

pub(crate) fn compile(
    graph: &CausalGraph,
    spec: &SpecSet,
    data: &Dataset,
) -> Result<CompiledModel, InferError> {
    spec.validate(graph)?;

    for column in data.columns() {
        if graph.index_of(column).is_none() {
            return Err(ScmError::SpecMismatch {
                node: column.clone(),
                reason: "dataset column is absent from the graph".to_string(),
            }
            .into());
        }
    }
    if let Some(column) = data.fully_missing_columns().into_iter().next() {
        return Err(InferError::MissingnessExhaustion { column });
    }

    let mut latents: Vec<Latent> = Vec::new();
    let mut push_latent = |kind: LatentKind, prior: Option<(f64, f64)>, init: f64| {
        latents.push(Latent { kind, prior, init });
        Slot::Latent(latents.len() - 1)
    };

    // Equation parameters, registered in topological order.
    let mut equations = Vec::with_capacity(graph.node_count());
    for &node in graph.topo_order() {
        let node_spec = spec.get(graph.name(node)).expect("validated above");

        let intercept = match node_spec.intercept {
            Prior::Fixed(v) => Slot::Fixed(v),
            Prior::Normal { mean, std_dev } => push_latent(
                LatentKind::Param {
                    node,
                    role: ParamRole::Intercept,
                },
                Some((mean, std_dev)),
                mean,
            ),
            Prior::LogNormal { .. } => unreachable!("rejected by spec validation"),
        };

        let mut terms = Vec::new();
        for parent in graph.parents(node) {
            let parent_name = graph.name(parent);
            let slot = match node_spec.coefficients[parent_name] {
                Prior::Fixed(v) => Slot::Fixed(v),
                Prior::Normal { mean, std_dev } => push_latent(
                    LatentKind::Param {
                        node,
                        role: ParamRole::Coefficient(parent_name.to_string()),
                    },
                    Some((mean, std_dev)),
                    mean,
                ),
                Prior::LogNormal { .. } => unreachable!("rejected by spec validation"),
            };
            terms.push((parent, slot));
        }

        let noise = match node_spec.noise {
            Prior::Fixed(v) => Slot::Fixed(v),
            Prior::LogNormal { location, scale } => push_latent(
                LatentKind::Param {
                    node,
                    role: ParamRole::NoiseScale,
                },
                Some((location, scale)),
                location,
            ),
            Prior::Normal { .. } => unreachable!("rejected by spec validation"),
        };

        equations.push(CompiledEquation {
            node,
            intercept,
            terms,
            noise,
        });
    }

    // Cell grid: observed constants where the data has values, fresh
    // latents for missing cells and for latent nodes' entire columns.
    let mut column_of = vec![None; graph.node_count()];
    for node in 0..graph.node_count() {
        let name = graph.name(node);
        let node_spec = spec.get(name).expect("validated above");
        let column = data.column_index(name);
        match (node_spec.latent, column) {
            (true, Some(_)) => {
                return Err(ScmError::SpecMismatch {
                    node: name.to_string(),
                    reason: "latent node has a measured column".to_string(),
                }
                .into())
            }
            (false, None) => {
                return Err(ScmError::SpecMismatch {
                    node: name.to_string(),
                    reason: "no measured column for non-latent node".to_string(),
                }
                .into())
            }
            (_, col) => column_of[node] = col,
        }
    }

    let n_rows = data.n_rows();
    let mut cells = Vec::with_capacity(n_rows);
    for row in 0..n_rows {
        let mut row_states = Vec::with_capacity(graph.node_count());
        for node in 0..graph.node_count() {
            let state = match column_of[node] {
                Some(col) => match data.cell(row, col).value() {
                    Some(v) => CellState::Obs(v),
                    None => {
                        let slot = push_latent(LatentKind::Cell { row, node }, None, 0.0);
                        match slot {
                            Slot::Latent(k) => CellState::Latent(k),
                            Slot::Fixed(_) => unreachable!(),
                        }
                    }
                },
                None => {
                    let slot = push_latent(LatentKind::Cell { row, node }, None, 0.0);
                    match slot {
                        Slot::Latent(k) => CellState::Latent(k),
                        Slot::Fixed(_) => unreachable!(),
                    }
                }
            };
            row_states.push(state);
        }
        cells.push(row_states);
    }

    Ok(CompiledModel {
        equations,
        latents,
        cells,
        n_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proteocausal_graph::CausalGraphBuilder;
    use proteocausal_scm::{Cell, ParamRole, Prior};

    fn chain_graph() -> CausalGraph {
        let mut b = CausalGraphBuilder::new();
        b.add_edge("X", "Z");
        b.build().unwrap()
    }

    fn chain_data() -> Dataset {
        let mut ds = Dataset::new(vec!["X".to_string(), "Z".to_string()]);
        ds.push_row(vec![Cell::Observed(0.1), Cell::Observed(0.2)])
            .unwrap();
        ds.push_row(vec![Cell::Observed(-0.3), Cell::Missing]).unwrap();
        ds
    }

    #[test]
    fn test_compile_counts_latents() {
        let graph = chain_graph();
        let spec = SpecSet::default_for(&graph);
        let model = compile(&graph, &spec, &chain_data()).unwrap();

        // X: intercept + noise; Z: intercept + coef + noise; one missing cell.
        assert_eq!(model.latents.len(), 6);
        assert_eq!(model.equations.len(), 2);
        assert_eq!(model.n_rows, 2);

        let cell_latents = model
            .latents
            .iter()
            .filter(|l| matches!(l.kind, LatentKind::Cell { .. }))
            .count();
        assert_eq!(cell_latents, 1);
    }

    #[test]
    fn test_fixed_priors_are_not_latent() {
        let graph = chain_graph();
        let mut spec = SpecSet::default_for(&graph);
        spec.override_prior("Z", ParamRole::Coefficient("X".to_string()), Prior::Fixed(1.0))
            .unwrap();
        spec.override_prior("Z", ParamRole::NoiseScale, Prior::Fixed(0.1))
            .unwrap();
        let model = compile(&graph, &spec, &chain_data()).unwrap();

        let z_eq = &model.equations[1];
        assert_eq!(z_eq.terms[0].1, Slot::Fixed(1.0));
        assert_eq!(z_eq.noise, Slot::Fixed(0.1));
    }

    #[test]
    fn test_fully_missing_column_rejected() {
        let graph = chain_graph();
        let spec = SpecSet::default_for(&graph);
        let mut ds = Dataset::new(vec!["X".to_string(), "Z".to_string()]);
        ds.push_row(vec![Cell::Observed(0.0), Cell::Missing]).unwrap();
        ds.push_row(vec![Cell::Observed(1.0), Cell::Missing]).unwrap();

        let err = compile(&graph, &spec, &ds).unwrap_err();
        assert_eq!(
            err,
            InferError::MissingnessExhaustion {
                column: "Z".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_column_rejected() {
        let graph = chain_graph();
        let spec = SpecSet::default_for(&graph);
        let mut ds = Dataset::new(vec!["X".to_string(), "Z".to_string(), "W".to_string()]);
        ds.push_row(vec![
            Cell::Observed(0.0),
            Cell::Observed(0.0),
            Cell::Observed(0.0),
        ])
        .unwrap();
        assert!(matches!(
            compile(&graph, &spec, &ds),
            Err(InferError::Scm(ScmError::SpecMismatch { .. }))
        ));
    }

    #[test]
    fn test_latent_node_gets_cell_latents() {
        let mut b = CausalGraphBuilder::new();
        b.add_edge("U", "Y");
        let graph = b.build().unwrap();
        let mut spec = SpecSet::default_for(&graph);
        spec.mark_latent("U").unwrap();

        let mut ds = Dataset::new(vec!["Y".to_string()]);
        ds.push_row(vec![Cell::Observed(1.0)]).unwrap();
        ds.push_row(vec![Cell::Observed(2.0)]).unwrap();

        let model = compile(&graph, &spec, &ds).unwrap();
        let cell_latents = model
            .latents
            .iter()
            .filter(|l| matches!(l.kind, LatentKind::Cell { .. }))
            .count();
        assert_eq!(cell_latents, 2);
    }

    #[test]
    fn test_non_latent_node_requires_column() {
        let graph = chain_graph();
        let spec = SpecSet::default_for(&graph);
        let mut ds = Dataset::new(vec!["X".to_string()]);
        ds.push_row(vec![Cell::Observed(0.0)]).unwrap();
        assert!(matches!(
            compile(&graph, &spec, &ds),
            Err(InferError::Scm(ScmError::SpecMismatch { .. }))
        ));
    }
}
