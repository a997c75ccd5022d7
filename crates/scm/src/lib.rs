//! # SCM - Structural Causal Model Vocabulary
//!
//! Everything the inference engine consumes and the simulator produces:
//!
//! - **Distributions**: the linear-Gaussian building block ([`Gaussian`])
//!   and the logistic curve behind MNAR dropout
//! - **Specification**: per-node equation priors addressed by typed
//!   `(node, ParamRole)` pairs ([`SpecSet`], [`Prior`])
//! - **Datasets**: wide entity-level tables with tagged missingness
//!   ([`Dataset`], [`Cell`])
//! - **Scaling**: reversible per-column standardization ([`standardize`],
//!   [`ScaleMetrics`])
//! - **Simulation**: the ground-truth data generating process with
//!   interventions, feature expansion, and MNAR masking ([`simulate`])
//! - **Networks**: canonical benchmark topologies ([`networks`])
//!
//! The key modeling decision lives in [`Cell`]: a missing measurement is a
//! tagged variant, not a sentinel, so downstream model compilation treats
//! observed and missing entries as one uniform traversal.

mod dataset;
mod dist;
mod error;
mod networks;
mod scale;
mod simulate;
mod spec;
mod summarize;

pub use dataset::{Cell, Dataset};
pub use dist::{sigmoid, Gaussian};
pub use error::ScmError;
pub use networks::{backdoor, frontdoor, mediator, signaling_network, ExampleNetwork};
pub use scale::{standardize, standardize_strict, ColumnStats, ScaleMetrics};
pub use simulate::{
    simulate, simulated_ate, FeatureConfig, FeatureObservation, FeatureTable, MnarParams,
    Simulation, SimulationConfig,
};
pub use spec::{
    Coefficients, Equation, EquationSpec, ParamRole, Prior, SpecSet, DEFAULT_NOISE_PRIOR,
    DEFAULT_PRIOR_STD,
};
pub use summarize::summarize;
