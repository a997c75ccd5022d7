//! End-to-end properties of the SCM engine.
//!
//! These tests drive the full pipeline — simulate, standardize, fit,
//! intervene, un-scale — and pin down the causal semantics:
//! - a simple chain recovers its known ATE within sampling error
//! - interventional means order consistently with the coefficient sign
//! - the do-operator severs the treated node's own mechanism bit-for-bit
//! - latent (unmeasured) nodes and MNAR gaps fit without special casing
//! - underdetermined columns are rejected before optimization

use std::collections::BTreeMap;

use proteocausal_graph::{CausalGraph, CausalGraphBuilder};
use proteocausal_infer::{
    average_treatment_effect, fit, intervene, Backend, FitConfig, FitQuality, FittedModel,
    InferError,
};
use proteocausal_scm::{
    frontdoor, signaling_network, simulate, standardize, summarize, Cell, Coefficients, Dataset,
    Equation, FeatureConfig, MnarParams, ParamRole, Prior, SimulationConfig, SpecSet,
};

fn chain(coef: f64, noise: f64) -> (CausalGraph, Coefficients) {
    let mut b = CausalGraphBuilder::new();
    b.add_edge("X", "Z");
    let graph = b.build().unwrap();
    let mut coefs = Coefficients::new();
    coefs.insert("X", Equation::new(0.0, 1.0));
    coefs.insert("Z", Equation::new(0.0, noise).with_coef("X", coef));
    (graph, coefs)
}

// ============================================================================
// The concrete benchmark scenario
// ============================================================================

/// X -> Z with coefficient 1.0 and noise 0.1, 10k replicates, no
/// missingness: do(X=0) vs do(X=2) must give an ATE of about 2.
#[test]
fn chain_ate_recovers_known_effect() {
    let (graph, coefs) = chain(1.0, 0.1);
    let sim = simulate(&graph, &coefs, &SimulationConfig::new(10_000, 21)).unwrap();
    let (scaled, metrics) = standardize(&sim.observed).unwrap();

    let spec = SpecSet::default_for(&graph);
    let config = FitConfig {
        num_steps: 1500,
        learning_rate: 0.1,
        seed: 1,
        ..FitConfig::default()
    };
    let model = fit(&graph, &spec, &scaled, &metrics, &config).unwrap();
    assert_eq!(model.quality(), FitQuality::Converged);

    let estimate = average_treatment_effect(&model, "X", 0.0, 2.0, "Z", 2000, 7).unwrap();
    assert!(
        (estimate.ate - 2.0).abs() < 0.2,
        "expected ATE near 2.0, got {}",
        estimate.ate
    );
}

// ============================================================================
// Sign sanity
// ============================================================================

fn fitted_chain(coef: f64, seed: u64) -> FittedModel {
    let (graph, coefs) = chain(coef, 0.3);
    let sim = simulate(&graph, &coefs, &SimulationConfig::new(500, seed)).unwrap();
    let (scaled, metrics) = standardize(&sim.observed).unwrap();
    let spec = SpecSet::default_for(&graph);
    let config = FitConfig {
        num_steps: 800,
        ..FitConfig::default()
    };
    fit(&graph, &spec, &scaled, &metrics, &config).unwrap()
}

#[test]
fn ate_sign_follows_coefficient_sign() {
    let positive = fitted_chain(0.9, 31);
    let up = average_treatment_effect(&positive, "X", -1.0, 1.0, "Z", 1000, 3).unwrap();
    assert!(up.high_mean > up.low_mean, "positive coefficient: {up:?}");

    let negative = fitted_chain(-0.9, 32);
    let down = average_treatment_effect(&negative, "X", -1.0, 1.0, "Z", 1000, 3).unwrap();
    assert!(down.high_mean < down.low_mean, "negative coefficient: {down:?}");
}

// ============================================================================
// Do-operator severance
// ============================================================================

fn fitted_with_pinned_intercept(intercept: f64) -> FittedModel {
    let (graph, coefs) = chain(0.8, 0.3);
    // Identical data for every caller: the simulator ignores the spec.
    let sim = simulate(&graph, &coefs, &SimulationConfig::new(200, 40)).unwrap();
    let (scaled, metrics) = standardize(&sim.observed).unwrap();

    let mut spec = SpecSet::default_for(&graph);
    spec.override_prior("X", ParamRole::Intercept, Prior::Fixed(intercept))
        .unwrap();
    let config = FitConfig {
        num_steps: 400,
        seed: 5,
        ..FitConfig::default()
    };
    fit(&graph, &spec, &scaled, &metrics, &config).unwrap()
}

/// Changing what X *would have been* (its own intercept) must not move a
/// single sample of do(X=x): the intervention severs X's mechanism
/// entirely, leaving only downstream equations in play.
#[test]
fn intervention_ignores_treated_nodes_own_mechanism() {
    let model_a = fitted_with_pinned_intercept(0.0);
    let model_b = fitted_with_pinned_intercept(5.0);

    let mut assignments = BTreeMap::new();
    assignments.insert("X".to_string(), 1.0);
    let samples_a = intervene(&model_a, &assignments, "Z", 200, 11).unwrap();
    let samples_b = intervene(&model_b, &assignments, "Z", 200, 11).unwrap();

    assert_eq!(samples_a.samples, samples_b.samples);
}

// ============================================================================
// Latent nodes and missingness
// ============================================================================

#[test]
fn frontdoor_network_fits_with_latent_confounder() {
    let net = frontdoor();
    let sim = simulate(
        &net.graph,
        &net.coefficients,
        &SimulationConfig::new(300, 55),
    )
    .unwrap();
    // U is unmeasured: its column never reaches the fitter.
    let observed = sim.observed.drop_columns(&["U"]);

    let mut spec = SpecSet::default_for(&net.graph);
    for latent in &net.latent {
        spec.mark_latent(latent).unwrap();
    }
    let (scaled, metrics) = standardize(&observed).unwrap();
    let config = FitConfig {
        backend: Backend::Map,
        num_steps: 2000,
        learning_rate: 0.05,
        seed: 2,
    };
    let model = fit(&net.graph, &spec, &scaled, &metrics, &config).unwrap();

    // The frontdoor path X -> M -> Y carries 0.9 * 0.8 = 0.72 per unit.
    let estimate = average_treatment_effect(&model, "X", 0.0, 2.0, "Y", 1000, 13).unwrap();
    assert!(estimate.ate.is_finite());
    assert!(
        estimate.ate > 0.4 && estimate.ate < 2.6,
        "ATE through the mediator should be near 1.44, got {}",
        estimate.ate
    );

    let params = model.learned_params();
    assert!(params.contains_key(&("M".to_string(), ParamRole::Coefficient("X".to_string()))));
}

#[test]
fn fully_missing_column_fails_before_fitting() {
    let (graph, _) = chain(1.0, 0.1);
    let mut data = Dataset::new(vec!["X".to_string(), "Z".to_string()]);
    for i in 0..10 {
        data.push_row(vec![Cell::Observed(i as f64), Cell::Missing])
            .unwrap();
    }
    let (scaled, metrics) = standardize(&data).unwrap();
    let spec = SpecSet::default_for(&graph);
    let err = fit(&graph, &spec, &scaled, &metrics, &FitConfig::default()).unwrap_err();
    assert_eq!(
        err,
        InferError::MissingnessExhaustion {
            column: "Z".to_string()
        }
    );
}

// ============================================================================
// The full signaling pipeline
// ============================================================================

/// Simulate feature-level data for the signaling cascade, summarize it to
/// entity level, drop the unmeasured ligands, fit, and estimate the Ras ->
/// Erk effect. Mirrors the benchmark flow this engine exists for.
#[test]
fn signaling_network_pipeline_estimates_ras_erk_effect() {
    let net = signaling_network();
    let config = SimulationConfig::new(100, 77)
        .with_mnar(MnarParams::new(4.0, 1.0))
        .with_features(FeatureConfig::default());
    let sim = simulate(&net.graph, &net.coefficients, &config).unwrap();

    let summarized = summarize(&sim.features.unwrap());
    let observed = summarized.drop_columns(&["EGF", "IGF"]);
    assert_eq!(observed.n_columns(), 7);
    assert_eq!(observed.n_rows(), 100);

    let mut spec = SpecSet::default_for(&net.graph);
    for latent in &net.latent {
        spec.mark_latent(latent).unwrap();
    }

    let (scaled, metrics) = standardize(&observed).unwrap();
    let config = FitConfig {
        backend: Backend::Map,
        num_steps: 2000,
        learning_rate: 0.05,
        seed: 4,
    };
    let model = fit(&net.graph, &spec, &scaled, &metrics, &config).unwrap();

    // Ras reaches Erk through Raf -> Mek (0.8 * 0.75 * 1.2 = 0.72/unit)
    // minus the Akt crosstalk (-0.135/unit): about 1.17 for a 5 -> 7 push.
    let estimate = average_treatment_effect(&model, "Ras", 5.0, 7.0, "Erk", 1000, 6).unwrap();
    assert!(
        estimate.ate > 0.2 && estimate.ate < 2.4,
        "Ras -> Erk ATE should be near 1.17, got {}",
        estimate.ate
    );
}

// ============================================================================
// Re-fit stability
// ============================================================================

#[test]
fn refit_with_same_seed_reproduces_estimates() {
    let model_a = fitted_chain(0.7, 60);
    let model_b = fitted_chain(0.7, 60);

    let params_a = model_a.learned_params();
    let params_b = model_b.learned_params();
    assert_eq!(params_a, params_b);

    let ate_a = average_treatment_effect(&model_a, "X", 0.0, 1.0, "Z", 500, 9).unwrap();
    let ate_b = average_treatment_effect(&model_b, "X", 0.0, 1.0, "Z", 500, 9).unwrap();
    assert_eq!(ate_a, ate_b);
}
