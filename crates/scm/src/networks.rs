//! Benchmark network constructors.
//!
//! Small canonical topologies with known ground-truth coefficients, used by
//! tests and comparisons: the mediator, backdoor, and frontdoor motifs plus
//! a growth-factor signaling cascade. The coefficients put values on a
//! log-intensity-like scale so simulated data resembles real abundance
//! measurements.

use proteocausal_graph::{CausalGraph, CausalGraphBuilder};

use crate::spec::{Coefficients, Equation};

/// A named example network: graph, ground-truth coefficients, and the nodes
/// that go unmeasured in benchmarks (fitted as latent variables).
#[derive(Debug, Clone)]
pub struct ExampleNetwork {
    pub graph: CausalGraph,
    pub coefficients: Coefficients,
    pub latent: Vec<String>,
}

/// Mediation motif: X -> M -> Z with a direct X -> Z edge.
pub fn mediator() -> ExampleNetwork {
    let mut b = CausalGraphBuilder::new();
    b.add_edge("X", "M");
    b.add_edge("M", "Z");
    b.add_edge("X", "Z");
    let graph = b.build().expect("static edge list is acyclic");

    let mut coefficients = Coefficients::new();
    coefficients.insert("X", Equation::new(2.0, 1.0));
    coefficients.insert("M", Equation::new(1.0, 0.5).with_coef("X", 0.8));
    coefficients.insert(
        "Z",
        Equation::new(0.5, 0.5).with_coef("X", 0.4).with_coef("M", 0.7),
    );

    ExampleNetwork {
        graph,
        coefficients,
        latent: vec![],
    }
}

/// Backdoor motif: a measured confounder C drives both treatment X and
/// outcome Y.
pub fn backdoor() -> ExampleNetwork {
    let mut b = CausalGraphBuilder::new();
    b.add_edge("C", "X");
    b.add_edge("C", "Y");
    b.add_edge("X", "Y");
    let graph = b.build().expect("static edge list is acyclic");

    let mut coefficients = Coefficients::new();
    coefficients.insert("C", Equation::new(1.0, 1.0));
    coefficients.insert("X", Equation::new(0.5, 1.0).with_coef("C", 0.7));
    coefficients.insert(
        "Y",
        Equation::new(0.0, 1.0).with_coef("X", 0.6).with_coef("C", 0.5),
    );

    ExampleNetwork {
        graph,
        coefficients,
        latent: vec![],
    }
}

/// Frontdoor motif: an unmeasured confounder U drives X and Y; the effect
/// of X routes through the measured mediator M.
pub fn frontdoor() -> ExampleNetwork {
    let mut b = CausalGraphBuilder::new();
    b.add_edge("U", "X");
    b.add_edge("U", "Y");
    b.add_edge("X", "M");
    b.add_edge("M", "Y");
    let graph = b.build().expect("static edge list is acyclic");

    let mut coefficients = Coefficients::new();
    coefficients.insert("U", Equation::new(0.0, 1.0));
    coefficients.insert("X", Equation::new(1.0, 1.0).with_coef("U", 0.6));
    coefficients.insert("M", Equation::new(0.0, 0.5).with_coef("X", 0.9));
    coefficients.insert(
        "Y",
        Equation::new(2.0, 0.5).with_coef("M", 0.8).with_coef("U", 0.5),
    );

    ExampleNetwork {
        graph,
        coefficients,
        latent: vec!["U".to_string()],
    }
}

/// Growth-factor signaling cascade: EGF/IGF feed SOS and PI3K; signal
/// propagates through Ras, Raf (with Akt crosstalk), Mek, and Erk. The two
/// ligands are conventionally unmeasured.
pub fn signaling_network() -> ExampleNetwork {
    let mut b = CausalGraphBuilder::new();
    b.add_edge("EGF", "SOS");
    b.add_edge("IGF", "SOS");
    b.add_edge("EGF", "PI3K");
    b.add_edge("IGF", "PI3K");
    b.add_edge("SOS", "Ras");
    b.add_edge("Ras", "PI3K");
    b.add_edge("Ras", "Raf");
    b.add_edge("PI3K", "Akt");
    b.add_edge("Akt", "Raf");
    b.add_edge("Raf", "Mek");
    b.add_edge("Mek", "Erk");
    let graph = b.build().expect("static edge list is acyclic");

    let mut coefficients = Coefficients::new();
    coefficients.insert("EGF", Equation::new(6.0, 1.0));
    coefficients.insert("IGF", Equation::new(5.0, 1.0));
    coefficients.insert(
        "SOS",
        Equation::new(2.0, 1.0).with_coef("EGF", 0.6).with_coef("IGF", 0.6),
    );
    coefficients.insert("Ras", Equation::new(3.0, 1.0).with_coef("SOS", 0.5));
    coefficients.insert(
        "PI3K",
        Equation::new(0.0, 1.0)
            .with_coef("EGF", 0.5)
            .with_coef("IGF", 0.5)
            .with_coef("Ras", 0.5),
    );
    coefficients.insert("Akt", Equation::new(1.0, 1.0).with_coef("PI3K", 0.75));
    coefficients.insert(
        "Raf",
        Equation::new(4.0, 1.0).with_coef("Ras", 0.8).with_coef("Akt", -0.4),
    );
    coefficients.insert("Mek", Equation::new(2.0, 1.0).with_coef("Raf", 0.75));
    coefficients.insert("Erk", Equation::new(-2.0, 1.0).with_coef("Mek", 1.2));

    ExampleNetwork {
        graph,
        coefficients,
        latent: vec!["EGF".to_string(), "IGF".to_string()],
    }
}
