//! Ground-truth data generating process.
//!
//! Forward-samples a dataset from known structural equations in topological
//! order, optionally under an intervention (the do-operator applied at the
//! generation layer: the intervened node's equation is skipped and its fixed
//! value feeds every descendant). Feature-level measurements and an MNAR
//! missingness mechanism can be layered on top, mirroring how quantitative
//! omics data actually arrives: finer-grained noisy features, with
//! low-abundance values more likely to drop out.
//!
//! Every draw is reproducible from the caller-supplied seed.

use proteocausal_graph::CausalGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::dataset::{Cell, Dataset};
use crate::dist::sigmoid;
use crate::error::ScmError;
use crate::spec::Coefficients;

/// Parameters of the missing-not-at-random mechanism.
///
/// A value `v` goes missing with probability
/// `sigmoid(scale · (location − v))`: a logistic curve in the value itself,
/// saturating in [0, 1], with higher missingness at lower abundances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MnarParams {
    pub location: f64,
    pub scale: f64,
}

impl MnarParams {
    pub fn new(location: f64, scale: f64) -> Self {
        Self { location, scale }
    }

    /// Probability that a cell holding `value` drops out.
    pub fn missing_probability(&self, value: f64) -> f64 {
        sigmoid(self.scale * (self.location - value))
    }
}

/// How to expand entity-level truth into feature-level measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Number of features measured per entity.
    pub features_per_entity: usize,
    /// Std dev of the per-feature intensity offset, drawn once per feature.
    pub feature_offset_std: f64,
    /// Std dev of the per-measurement noise.
    pub measurement_noise_std: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            features_per_entity: 5,
            feature_offset_std: 1.0,
            measurement_noise_std: 0.25,
        }
    }
}

/// Everything one simulation run needs beyond the graph and coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub replicates: usize,
    /// Fixed values for intervened nodes; empty for observational data.
    pub intervention: BTreeMap<String, f64>,
    pub mnar: Option<MnarParams>,
    pub features: Option<FeatureConfig>,
    pub seed: u64,
}

impl SimulationConfig {
    pub fn new(replicates: usize, seed: u64) -> Self {
        Self {
            replicates,
            intervention: BTreeMap::new(),
            mnar: None,
            features: None,
            seed,
        }
    }

    pub fn with_intervention(mut self, node: &str, value: f64) -> Self {
        self.intervention.insert(node.to_string(), value);
        self
    }

    pub fn with_mnar(mut self, mnar: MnarParams) -> Self {
        self.mnar = Some(mnar);
        self
    }

    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = Some(features);
        self
    }
}

/// One feature-level measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureObservation {
    pub entity: String,
    pub feature: usize,
    pub replicate: usize,
    pub intensity: Cell,
}

/// Long-format feature-level table, the input schema of the external
/// summarization stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    entities: Vec<String>,
    replicates: usize,
    rows: Vec<FeatureObservation>,
}

impl FeatureTable {
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn replicates(&self) -> usize {
        self.replicates
    }

    pub fn rows(&self) -> &[FeatureObservation] {
        &self.rows
    }
}

/// Output of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    /// Latent entity-level values, fully observed. The ground truth that
    /// benchmark ATEs are computed from.
    pub truth: Dataset,
    /// The truth as a measurement instrument would report it: MNAR-masked
    /// when a mechanism is configured, identical to `truth` otherwise.
    pub observed: Dataset,
    /// Feature-level measurements, when configured.
    pub features: Option<FeatureTable>,
}

/// Forward-sample a dataset consistent with the graph's topological order.
pub fn simulate(
    graph: &CausalGraph,
    coefficients: &Coefficients,
    config: &SimulationConfig,
) -> Result<Simulation, ScmError> {
    coefficients.validate(graph)?;
    let mut intervention = vec![None; graph.node_count()];
    for (node, &value) in &config.intervention {
        intervention[graph.require(node)?] = Some(value);
    }

    // Resolve equations to index form once.
    let equations: Vec<(f64, Vec<(usize, f64)>, f64)> = (0..graph.node_count())
        .map(|idx| {
            let eq = coefficients.get(graph.name(idx)).expect("validated above");
            let terms = graph
                .parents(idx)
                .into_iter()
                .map(|p| (p, eq.coefficients[graph.name(p)]))
                .collect();
            (eq.intercept, terms, eq.noise_std)
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let columns: Vec<String> = graph.node_names().iter().map(|s| s.to_string()).collect();
    let mut truth = Dataset::new(columns.clone());
    let mut observed = Dataset::new(columns);

    debug!(
        replicates = config.replicates,
        seed = config.seed,
        intervened = config.intervention.len(),
        "simulating dataset"
    );

    let mut all_values = Vec::with_capacity(config.replicates);
    for _ in 0..config.replicates {
        let mut values = vec![0.0; graph.node_count()];
        for &idx in graph.topo_order() {
            values[idx] = match intervention[idx] {
                Some(fixed) => fixed,
                None => {
                    let (intercept, ref terms, noise_std) = equations[idx];
                    let mean: f64 =
                        intercept + terms.iter().map(|&(p, w)| w * values[p]).sum::<f64>();
                    let eps: f64 = rng.sample(StandardNormal);
                    mean + noise_std * eps
                }
            };
        }

        truth
            .push_row(values.iter().map(|&v| Cell::Observed(v)).collect())
            .expect("row width matches schema");
        let masked: Vec<Cell> = values
            .iter()
            .map(|&v| mask(v, config.mnar.as_ref(), &mut rng))
            .collect();
        observed.push_row(masked).expect("row width matches schema");
        all_values.push(values);
    }

    let features = config
        .features
        .map(|fc| expand_features(graph, &all_values, &fc, config.mnar.as_ref(), &mut rng));

    Ok(Simulation {
        truth,
        observed,
        features,
    })
}

/// Ground-truth ATE: simulate under two interventions on the same seed and
/// difference the outcome means.
#[allow(clippy::too_many_arguments)]
pub fn simulated_ate(
    graph: &CausalGraph,
    coefficients: &Coefficients,
    treatment: &str,
    low: f64,
    high: f64,
    outcome: &str,
    replicates: usize,
    seed: u64,
) -> Result<f64, ScmError> {
    let low_run = simulate(
        graph,
        coefficients,
        &SimulationConfig::new(replicates, seed).with_intervention(treatment, low),
    )?;
    let high_run = simulate(
        graph,
        coefficients,
        &SimulationConfig::new(replicates, seed).with_intervention(treatment, high),
    )?;
    let low_mean = mean(&low_run.truth.observed_column(outcome)?);
    let high_mean = mean(&high_run.truth.observed_column(outcome)?);
    Ok(high_mean - low_mean)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn mask(value: f64, mnar: Option<&MnarParams>, rng: &mut StdRng) -> Cell {
    match mnar {
        Some(params) => {
            let p = params.missing_probability(value);
            if rng.gen::<f64>() < p {
                Cell::Missing
            } else {
                Cell::Observed(value)
            }
        }
        None => Cell::Observed(value),
    }
}

fn expand_features(
    graph: &CausalGraph,
    all_values: &[Vec<f64>],
    fc: &FeatureConfig,
    mnar: Option<&MnarParams>,
    rng: &mut StdRng,
) -> FeatureTable {
    let entities: Vec<String> = graph.node_names().iter().map(|s| s.to_string()).collect();

    // Feature identity is stable across replicates: one offset per
    // (entity, feature), drawn up front.
    let mut offsets = vec![vec![0.0; fc.features_per_entity]; entities.len()];
    for entity_offsets in &mut offsets {
        for slot in entity_offsets.iter_mut() {
            let eps: f64 = rng.sample(StandardNormal);
            *slot = fc.feature_offset_std * eps;
        }
    }

    let mut rows = Vec::with_capacity(all_values.len() * entities.len() * fc.features_per_entity);
    for (replicate, values) in all_values.iter().enumerate() {
        for (entity_idx, entity) in entities.iter().enumerate() {
            for feature in 0..fc.features_per_entity {
                let eps: f64 = rng.sample(StandardNormal);
                let intensity =
                    values[entity_idx] + offsets[entity_idx][feature] + fc.measurement_noise_std * eps;
                rows.push(FeatureObservation {
                    entity: entity.clone(),
                    feature,
                    replicate,
                    intensity: mask(intensity, mnar, rng),
                });
            }
        }
    }

    FeatureTable {
        entities,
        replicates: all_values.len(),
        rows,
    }
}
