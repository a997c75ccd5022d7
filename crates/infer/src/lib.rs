//! # Infer - The Structural Causal Model Engine
//!
//! The core of the workspace: compile a causal graph plus per-node priors
//! and a partially-missing standardized dataset into a joint density, fit it
//! by stochastic variational inference, and answer do-operator queries from
//! the fitted posterior.
//!
//! - **Compilation**: names resolved once into flat index structures;
//!   missing cells and latent nodes become first-class latent variables
//! - **Fitting** ([`fit`]): mean-field Normal guide, reparameterized
//!   single-sample ELBO with analytic gradients, Adam, fixed step budget.
//!   The parameter store is per-fit state — nothing global to reset
//! - **Interventions** ([`intervene`]): graph mutilation plus
//!   posterior-predictive resampling in topological order
//! - **ATE** ([`average_treatment_effect`]): the two-arm contrast in
//!   original measurement units
//! - **Baseline** ([`regression_ate`]): the adjustment-regression estimator
//!   the engine is compared against, and [`compare_estimators`] to run all
//!   three ways at once
//!
//! Key insight carried through the whole crate: do(X=x) is not observing
//! X=x. Interventions sever the treated node's incoming edges and keep
//! every downstream equation intact.

mod adjust;
mod compare;
mod compile;
mod error;
mod fitted;
mod intervene;
mod optim;
mod svi;

pub use adjust::{parents_adjustment_set, regression_ate};
pub use compare::{compare_estimators, EstimatorComparison};
pub use error::InferError;
pub use fitted::FittedModel;
pub use intervene::{average_treatment_effect, intervene, AteEstimate, InterventionResult};
pub use optim::Adam;
pub use svi::{fit, Backend, FitConfig, FitQuality};
