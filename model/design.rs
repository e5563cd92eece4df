//! Design matrix construction.
//!
//! Expands the covariate table's `age + grade + stage` covariates into a
//! numeric matrix, built once and shared read-only across all bootstrap
//! iterations. Categorical covariates become indicator columns: the first
//! categorical factor is coded full-rank (one column per level) and the
//! second drops its first-seen level, the standard coding for a formula
//! with the intercept removed. The missing sentinel is an ordinary level
//! named `missing`, so no patient row is ever silently dropped.

use crate::data::{Category, CovariateTable};
use ndarray::{Array1, Array2, Axis};
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced while building or indexing the design matrix.
#[derive(Debug, Error)]
pub enum DesignError {
    #[error("The covariate table is empty; cannot build a design matrix.")]
    EmptyTable,
    #[error("Row identifier '{0}' is not present in the covariate table.")]
    MissingRow(String),
}

/// The full-cohort design matrix, keyed by patient identifier.
#[derive(Debug)]
pub struct DesignMatrix {
    pub patient_ids: Vec<String>,
    pub column_names: Vec<String>,
    /// Shape: [n_patients, n_design_columns]. Excludes duration and event.
    pub values: Array2<f64>,
    pub durations: Array1<f64>,
    pub events: Array1<u8>,
    row_index: HashMap<String, usize>,
}

/// An owned row subset of the design matrix, in the requested id order.
#[derive(Debug)]
pub struct DesignSubset {
    pub patient_ids: Vec<String>,
    pub covariates: Array2<f64>,
    pub durations: Array1<f64>,
    pub events: Array1<u8>,
}

impl DesignMatrix {
    /// Expand the covariate table into indicator-coded numeric columns.
    pub fn from_table(table: &CovariateTable) -> Result<Self, DesignError> {
        if table.is_empty() {
            return Err(DesignError::EmptyTable);
        }

        let n = table.len();
        let grade_levels = collect_levels(&table.grade);
        let stage_levels = collect_levels(&table.stage);

        let mut column_names = Vec::new();
        let mut columns: Vec<Array1<f64>> = Vec::new();

        column_names.push("age".to_string());
        columns.push(table.age.clone());

        // First categorical factor: full-rank indicator coding.
        for level in &grade_levels {
            column_names.push(format!("grade[{level}]"));
            columns.push(indicator_column(&table.grade, level));
        }

        // Subsequent factors drop their first-seen level.
        for level in stage_levels.iter().skip(1) {
            column_names.push(format!("stage[T.{level}]"));
            columns.push(indicator_column(&table.stage, level));
        }

        let mut values = Array2::<f64>::zeros((n, columns.len()));
        for (j, column) in columns.into_iter().enumerate() {
            values.column_mut(j).assign(&column);
        }

        let mut row_index = HashMap::with_capacity(n);
        for (idx, id) in table.patient_ids.iter().enumerate() {
            row_index.insert(id.clone(), idx);
        }

        log::debug!(
            "Design matrix built: {} patients x {} columns ({:?}).",
            n,
            column_names.len(),
            column_names
        );

        Ok(DesignMatrix {
            patient_ids: table.patient_ids.clone(),
            column_names,
            values,
            durations: table.durations.clone(),
            events: table.events.clone(),
            row_index,
        })
    }

    pub fn len(&self) -> usize {
        self.patient_ids.len()
    }

    /// Select rows by identifier, preserving the requested order.
    ///
    /// Fails on the first identifier absent from the table; an unknown id is
    /// fatal to the whole batch rather than silently padded.
    pub fn select(&self, ids: &[String]) -> Result<DesignSubset, DesignError> {
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            let &row = self
                .row_index
                .get(id)
                .ok_or_else(|| DesignError::MissingRow(id.clone()))?;
            rows.push(row);
        }

        Ok(DesignSubset {
            patient_ids: ids.to_vec(),
            covariates: self.values.select(Axis(0), &rows),
            durations: self.durations.select(Axis(0), &rows),
            events: self.events.select(Axis(0), &rows),
        })
    }
}

impl DesignSubset {
    pub fn len(&self) -> usize {
        self.patient_ids.len()
    }
}

/// Distinct levels of a categorical covariate in first-seen order.
fn collect_levels(values: &[Category]) -> Vec<String> {
    let mut levels = Vec::new();
    for value in values {
        let level = value.level();
        if !levels.iter().any(|existing| existing == level) {
            levels.push(level.to_string());
        }
    }
    levels
}

fn indicator_column(values: &[Category], level: &str) -> Array1<f64> {
    Array1::from_iter(
        values
            .iter()
            .map(|value| if value.level() == level { 1.0 } else { 0.0 }),
    )
}
