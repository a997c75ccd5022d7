//! Wide entity-level datasets with tagged missingness.
//!
//! A dataset is a table: columns are entity identifiers, one row per
//! replicate, and every cell is explicitly `Observed` or `Missing`. Keeping
//! the tag on the cell (instead of a sentinel value) lets the fitter treat
//! observed and missing entries uniformly — a missing cell simply becomes a
//! latent variable.

use serde::{Deserialize, Serialize};

use crate::error::ScmError;

/// One table cell: a measured value or an explicit gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Observed(f64),
    Missing,
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Observed(v) => Some(*v),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Apply a function to the observed value, keeping gaps as gaps.
    pub fn map<F: FnOnce(f64) -> f64>(self, f: F) -> Cell {
        match self {
            Cell::Observed(v) => Cell::Observed(f(v)),
            Cell::Missing => Cell::Missing,
        }
    }
}

/// A wide table of entity-level measurements.
///
/// Immutable during fitting; rows are only appended while assembling the
/// table. A zero-row dataset is valid and keeps its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row. The width must match the schema.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), ScmError> {
        if row.len() != self.columns.len() {
            return Err(ScmError::RowWidthMismatch {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn cell(&self, row: usize, column: usize) -> Cell {
        self.rows[row][column]
    }

    /// All cells of one named column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<Cell>, ScmError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| ScmError::UnknownColumn {
                column: name.to_string(),
            })?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Only the observed values of one named column.
    pub fn observed_column(&self, name: &str) -> Result<Vec<f64>, ScmError> {
        Ok(self
            .column(name)?
            .into_iter()
            .filter_map(|c| c.value())
            .collect())
    }

    /// Columns with at least one row but no observed entry at all. Such
    /// columns make imputation underdetermined and are rejected by the
    /// fitter.
    pub fn fully_missing_columns(&self) -> Vec<String> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.rows.iter().all(|r| r[*idx].is_missing()))
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// A copy of the table without the named columns. Unknown names are
    /// ignored, matching how callers drop unmeasured entities before
    /// fitting.
    pub fn drop_columns(&self, names: &[&str]) -> Dataset {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i].as_str()))
            .collect();
        let columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| keep.iter().map(|&i| r[i]).collect())
            .collect();
        Dataset { columns, rows }
    }

    /// Map every observed cell through `f`, preserving missingness.
    pub fn map_cells<F: Fn(usize, f64) -> f64>(&self, f: F) -> Dataset {
        let rows = self
            .rows
            .iter()
            .map(|r| {
                r.iter()
                    .enumerate()
                    .map(|(col, cell)| cell.map(|v| f(col, v)))
                    .collect()
            })
            .collect();
        Dataset {
            columns: self.columns.clone(),
            rows,
        }
    }
}
