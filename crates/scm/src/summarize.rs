//! Feature-to-entity summarization schema adapter.
//!
//! The full summarization pipeline (feature selection, normalization,
//! median polish) is an external collaborator; the engine only depends on
//! its output schema — a wide table with one column per entity and one row
//! per replicate. This adapter provides the minimal version of that
//! contract for tests and demos: the median of the observed feature
//! intensities per (entity, replicate), with a cell left missing when every
//! feature dropped out.

use crate::dataset::{Cell, Dataset};
use crate::simulate::FeatureTable;

/// Collapse a feature-level table into an entity-level wide table.
///
/// An empty input (zero replicates) yields an empty table that still
/// carries the expected entity columns.
pub fn summarize(features: &FeatureTable) -> Dataset {
    let entities = features.entities();
    let mut dataset = Dataset::new(entities.to_vec());
    if features.replicates() == 0 {
        return dataset;
    }

    // Bucket observed intensities by (replicate, entity).
    let mut buckets: Vec<Vec<Vec<f64>>> =
        vec![vec![Vec::new(); entities.len()]; features.replicates()];
    for obs in features.rows() {
        if let Some(value) = obs.intensity.value() {
            let entity_idx = entities
                .iter()
                .position(|e| e == &obs.entity)
                .expect("feature rows only reference declared entities");
            buckets[obs.replicate][entity_idx].push(value);
        }
    }

    for replicate in buckets {
        let row = replicate
            .into_iter()
            .map(|mut values| match values.len() {
                0 => Cell::Missing,
                _ => Cell::Observed(median(&mut values)),
            })
            .collect();
        dataset.push_row(row).expect("row width matches schema");
    }
    dataset
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).expect("intensities are finite"));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
