//! Structural-equation specification and priors.
//!
//! Every node in a causal graph carries one equation of the form
//! `value = intercept + Σ coef·parent + noise`. This module declares what is
//! known about each term before fitting: a broad default prior, an
//! informative prior learned elsewhere, or a fixed point value.
//!
//! Priors are addressed by `(node, ParamRole)` pairs — an explicit enum tag
//! per parameter rather than string matching on parameter names, so an
//! override can never accidentally hit the wrong term.

use proteocausal_graph::CausalGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ScmError;

/// Which term of a structural equation a prior or estimate refers to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamRole {
    Intercept,
    /// The coefficient attached to the named parent.
    Coefficient(String),
    NoiseScale,
}

/// A prior over a single equation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Prior {
    /// Gaussian prior, used for intercepts and coefficients.
    Normal { mean: f64, std_dev: f64 },
    /// Log-normal prior, used for the positive-support noise scale. The
    /// latent fitted by the engine is the log of the scale, which carries a
    /// plain Normal(location, scale) density.
    LogNormal { location: f64, scale: f64 },
    /// An informative point value: the parameter is held fixed and not
    /// fitted.
    Fixed(f64),
}

/// Standard deviation of the default weakly-informative priors on
/// intercepts and coefficients, in standardized data units.
pub const DEFAULT_PRIOR_STD: f64 = 3.0;

/// Default prior over the log noise scale.
pub const DEFAULT_NOISE_PRIOR: Prior = Prior::LogNormal {
    location: -1.0,
    scale: 1.0,
};

/// The declared structural equation for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationSpec {
    /// Whether the node has no measured column: its per-replicate values
    /// are inferred as latent variables during fitting.
    pub latent: bool,
    pub intercept: Prior,
    /// One prior per parent, keyed by parent name. Must match the graph's
    /// edge set exactly.
    pub coefficients: BTreeMap<String, Prior>,
    pub noise: Prior,
}

/// One structural-equation spec per graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecSet {
    specs: BTreeMap<String, EquationSpec>,
}

impl SpecSet {
    /// Weakly-informative defaults for every node of `graph`: broad Normal
    /// priors on intercept and coefficients, a log-normal prior on the noise
    /// scale, nothing latent.
    pub fn default_for(graph: &CausalGraph) -> Self {
        let broad = Prior::Normal {
            mean: 0.0,
            std_dev: DEFAULT_PRIOR_STD,
        };
        let mut specs = BTreeMap::new();
        for idx in 0..graph.node_count() {
            let coefficients = graph
                .parents(idx)
                .into_iter()
                .map(|p| (graph.name(p).to_string(), broad))
                .collect();
            specs.insert(
                graph.name(idx).to_string(),
                EquationSpec {
                    latent: false,
                    intercept: broad,
                    coefficients,
                    noise: DEFAULT_NOISE_PRIOR,
                },
            );
        }
        Self { specs }
    }

    /// Informative point priors taken from known equation values: every
    /// parameter becomes `Prior::Fixed`, so fitting reduces to imputing
    /// latent values under the given mechanism.
    pub fn informative(graph: &CausalGraph, coefficients: &Coefficients) -> Self {
        let mut set = Self::default_for(graph);
        for (node, eq) in coefficients.iter() {
            if let Some(spec) = set.specs.get_mut(node) {
                spec.intercept = Prior::Fixed(eq.intercept);
                for (parent, &coef) in &eq.coefficients {
                    spec.coefficients.insert(parent.clone(), Prior::Fixed(coef));
                }
                spec.noise = Prior::Fixed(eq.noise_std);
            }
        }
        set
    }

    pub fn get(&self, node: &str) -> Option<&EquationSpec> {
        self.specs.get(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EquationSpec)> {
        self.specs.iter()
    }

    /// Declare a node latent (no measured column expected).
    pub fn mark_latent(&mut self, node: &str) -> Result<(), ScmError> {
        match self.specs.get_mut(node) {
            Some(spec) => {
                spec.latent = true;
                Ok(())
            }
            None => Err(ScmError::SpecMismatch {
                node: node.to_string(),
                reason: "cannot mark unknown node latent".to_string(),
            }),
        }
    }

    /// Replace the prior for one `(node, role)` pair.
    ///
    /// Fails with [`ScmError::SpecMismatch`] if the node is unknown or the
    /// role names a parent the node does not have.
    pub fn override_prior(
        &mut self,
        node: &str,
        role: ParamRole,
        prior: Prior,
    ) -> Result<(), ScmError> {
        let spec = self.specs.get_mut(node).ok_or_else(|| ScmError::SpecMismatch {
            node: node.to_string(),
            reason: "override targets a node absent from the spec".to_string(),
        })?;
        match role {
            ParamRole::Intercept => spec.intercept = prior,
            ParamRole::NoiseScale => spec.noise = prior,
            ParamRole::Coefficient(parent) => {
                match spec.coefficients.get_mut(&parent) {
                    Some(slot) => *slot = prior,
                    None => {
                        return Err(ScmError::SpecMismatch {
                            node: node.to_string(),
                            reason: format!("no coefficient for parent `{parent}`"),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Check the spec against a graph: node sets must agree, coefficient
    /// keys must match the edge set exactly, and every prior must be
    /// well-formed. Called by the fitter before any optimization starts.
    pub fn validate(&self, graph: &CausalGraph) -> Result<(), ScmError> {
        for (node, spec) in &self.specs {
            let idx = graph.index_of(node).ok_or_else(|| ScmError::SpecMismatch {
                node: node.clone(),
                reason: "spec node is absent from the graph".to_string(),
            })?;

            let parents: Vec<String> = graph
                .parents(idx)
                .into_iter()
                .map(|p| graph.name(p).to_string())
                .collect();
            for parent in &parents {
                if !spec.coefficients.contains_key(parent) {
                    return Err(ScmError::SpecMismatch {
                        node: node.clone(),
                        reason: format!("missing coefficient prior for parent `{parent}`"),
                    });
                }
            }
            for declared in spec.coefficients.keys() {
                if !parents.iter().any(|p| p == declared) {
                    return Err(ScmError::SpecMismatch {
                        node: node.clone(),
                        reason: format!("coefficient for `{declared}` has no matching edge"),
                    });
                }
            }

            validate_location_prior(node, "intercept", &spec.intercept)?;
            for (parent, prior) in &spec.coefficients {
                validate_location_prior(node, &format!("coefficient `{parent}`"), prior)?;
            }
            validate_noise_prior(node, &spec.noise)?;
        }

        for idx in 0..graph.node_count() {
            let name = graph.name(idx);
            if !self.specs.contains_key(name) {
                return Err(ScmError::SpecMismatch {
                    node: name.to_string(),
                    reason: "graph node has no equation spec".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn validate_location_prior(node: &str, term: &str, prior: &Prior) -> Result<(), ScmError> {
    match prior {
        Prior::Normal { std_dev, .. } if *std_dev <= 0.0 => Err(ScmError::SpecMismatch {
            node: node.to_string(),
            reason: format!("{term} prior has non-positive std dev"),
        }),
        Prior::LogNormal { .. } => Err(ScmError::SpecMismatch {
            node: node.to_string(),
            reason: format!("{term} prior must not be log-normal"),
        }),
        _ => Ok(()),
    }
}

fn validate_noise_prior(node: &str, prior: &Prior) -> Result<(), ScmError> {
    match prior {
        Prior::Normal { .. } => Err(ScmError::SpecMismatch {
            node: node.to_string(),
            reason: "noise prior must have positive support (log-normal or fixed)".to_string(),
        }),
        Prior::LogNormal { scale, .. } if *scale <= 0.0 => Err(ScmError::SpecMismatch {
            node: node.to_string(),
            reason: "noise prior has non-positive scale".to_string(),
        }),
        Prior::Fixed(value) if *value <= 0.0 => Err(ScmError::SpecMismatch {
            node: node.to_string(),
            reason: "fixed noise scale must be positive".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Known point values for one structural equation, used by the simulator as
/// ground truth and convertible into informative priors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
    pub noise_std: f64,
}

impl Equation {
    pub fn new(intercept: f64, noise_std: f64) -> Self {
        Self {
            intercept,
            coefficients: BTreeMap::new(),
            noise_std,
        }
    }

    pub fn with_coef(mut self, parent: &str, coef: f64) -> Self {
        self.coefficients.insert(parent.to_string(), coef);
        self
    }
}

/// Ground-truth equation values for every node of a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    map: BTreeMap<String, Equation>,
}

impl Coefficients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: &str, equation: Equation) {
        self.map.insert(node.to_string(), equation);
    }

    pub fn get(&self, node: &str) -> Option<&Equation> {
        self.map.get(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Equation)> {
        self.map.iter()
    }

    /// Check the coefficient table against a graph the same way a spec is
    /// checked: node sets and parent sets must agree.
    pub fn validate(&self, graph: &CausalGraph) -> Result<(), ScmError> {
        for (node, eq) in &self.map {
            let idx = graph.index_of(node).ok_or_else(|| ScmError::SpecMismatch {
                node: node.clone(),
                reason: "coefficient node is absent from the graph".to_string(),
            })?;
            let parents: Vec<String> = graph
                .parents(idx)
                .into_iter()
                .map(|p| graph.name(p).to_string())
                .collect();
            for parent in &parents {
                if !eq.coefficients.contains_key(parent) {
                    return Err(ScmError::SpecMismatch {
                        node: node.clone(),
                        reason: format!("missing coefficient for parent `{parent}`"),
                    });
                }
            }
            for declared in eq.coefficients.keys() {
                if !parents.iter().any(|p| p == declared) {
                    return Err(ScmError::SpecMismatch {
                        node: node.clone(),
                        reason: format!("coefficient for `{declared}` has no matching edge"),
                    });
                }
            }
            if eq.noise_std < 0.0 {
                return Err(ScmError::SpecMismatch {
                    node: node.clone(),
                    reason: "noise std must be non-negative".to_string(),
                });
            }
        }
        for idx in 0..graph.node_count() {
            let name = graph.name(idx);
            if !self.map.contains_key(name) {
                return Err(ScmError::SpecMismatch {
                    node: name.to_string(),
                    reason: "graph node has no coefficients".to_string(),
                });
            }
        }
        Ok(())
    }
}
