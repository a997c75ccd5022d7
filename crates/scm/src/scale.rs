//! Reversible per-column standardization.
//!
//! Fitting happens in standardized units (zero mean, unit variance per
//! column); interventional answers are mapped back to original units with
//! the inverse transform. The statistics are computed once, at fit time,
//! over non-missing entries only, and must be kept alongside the fitted
//! model for the un-scaling to be possible.
//!
//! Zero-variance columns cannot be divided by their standard deviation. The
//! default policy substitutes std = 1 (the column is centered but not
//! scaled) — [`standardize`] documents and tests this. [`standardize_strict`]
//! instead refuses with [`ScmError::DegenerateScale`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::error::ScmError;

/// Mean and standard deviation of one column at fit time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Per-column scaling statistics for a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleMetrics {
    stats: BTreeMap<String, ColumnStats>,
}

impl ScaleMetrics {
    pub fn get(&self, column: &str) -> Option<&ColumnStats> {
        self.stats.get(column)
    }

    fn require(&self, column: &str) -> Result<&ColumnStats, ScmError> {
        self.get(column).ok_or_else(|| ScmError::UnknownColumn {
            column: column.to_string(),
        })
    }

    /// Raw units -> standardized units for one value.
    pub fn standardize_value(&self, column: &str, x: f64) -> Result<f64, ScmError> {
        let s = self.require(column)?;
        Ok((x - s.mean) / s.std_dev)
    }

    /// Standardized units -> raw units; the exact algebraic inverse
    /// `z * std + mean`.
    pub fn unstandardize_value(&self, column: &str, z: f64) -> Result<f64, ScmError> {
        let s = self.require(column)?;
        Ok(z * s.std_dev + s.mean)
    }

    /// Un-scale a whole sample set, e.g. interventional outcome draws.
    pub fn unstandardize_samples(&self, column: &str, samples: &[f64]) -> Result<Vec<f64>, ScmError> {
        let s = self.require(column)?;
        Ok(samples.iter().map(|z| z * s.std_dev + s.mean).collect())
    }
}

/// Standardize every column of `dataset`, substituting std = 1 for columns
/// whose observed entries have zero variance (or fewer than two observed
/// entries). Columns with no observed entries get mean = 0, std = 1, leaving
/// their cells untouched; whether such columns are acceptable is the
/// fitter's decision, not the scaler's.
pub fn standardize(dataset: &Dataset) -> Result<(Dataset, ScaleMetrics), ScmError> {
    standardize_inner(dataset, false)
}

/// Like [`standardize`] but failing with [`ScmError::DegenerateScale`] on
/// any zero-variance column.
pub fn standardize_strict(dataset: &Dataset) -> Result<(Dataset, ScaleMetrics), ScmError> {
    standardize_inner(dataset, true)
}

fn standardize_inner(dataset: &Dataset, strict: bool) -> Result<(Dataset, ScaleMetrics), ScmError> {
    let mut stats = BTreeMap::new();
    let mut per_column = Vec::with_capacity(dataset.n_columns());

    for name in dataset.columns() {
        let observed = dataset.observed_column(name)?;
        if strict && observed.len() > 1 && has_zero_spread(&observed) {
            return Err(ScmError::DegenerateScale {
                column: name.clone(),
            });
        }
        let column = column_stats(&observed);
        stats.insert(name.clone(), column);
        per_column.push(column);
    }

    let standardized =
        dataset.map_cells(|col, v| (v - per_column[col].mean) / per_column[col].std_dev);

    Ok((standardized, ScaleMetrics { stats }))
}

fn has_zero_spread(observed: &[f64]) -> bool {
    observed.iter().all(|&v| v == observed[0])
}

fn column_stats(observed: &[f64]) -> ColumnStats {
    if observed.is_empty() {
        return ColumnStats {
            mean: 0.0,
            std_dev: 1.0,
        };
    }
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    if observed.len() < 2 {
        return ColumnStats { mean, std_dev: 1.0 };
    }
    // Sample standard deviation (n - 1 denominator).
    let var = observed.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    let std_dev = var.sqrt();
    ColumnStats {
        mean,
        std_dev: if std_dev > 0.0 { std_dev } else { 1.0 },
    }
}
