//! The split evaluation loop.
//!
//! A fold over the bootstrap splits: select the training rows, fit the
//! estimator, predict median survival for the held-out rows, clamp
//! unbounded estimates to the sentinel, and stack the per-split vectors
//! into the result matrix. Iterations are independent; nothing is shared
//! across them beyond the read-only design matrix.
//!
//! Failure is fatal by policy. The scored output must carry one column per
//! split, so an unknown row identifier or a fit failure on any split aborts
//! the whole batch with no partial results.

use crate::model::design::{DesignError, DesignMatrix, DesignSubset};
use crate::model::{FittedSurvivalModel, MedianEstimate, SurvivalEstimator};
use crate::splits::SplitAssignment;
use ndarray::Array2;
use std::collections::HashMap;
use thiserror::Error;

/// Value written for an unbounded median estimate, and for (patient, split)
/// cells where the patient was not in that split's testing set. Downstream
/// scoring cannot handle non-finite values, so the matrix never carries any.
pub const UNBOUNDED_SENTINEL: f64 = 0.0;

/// Predicted medians stacked across splits: rows are patients in first-seen
/// testing order, columns are splits in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMatrix {
    pub patient_ids: Vec<String>,
    /// Shape: [n_patients, n_splits]. Every entry is finite.
    pub values: Array2<f64>,
}

/// Errors that abort the evaluation batch.
#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("split {split} references unknown patient id '{id}'")]
    MissingRow { split: usize, id: String },
    #[error("split {split} could not select its rows")]
    Selection {
        split: usize,
        #[source]
        source: DesignError,
    },
    #[error("model fit failed on split {split}")]
    Fit {
        split: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Run every split through fit and prediction, producing the result matrix.
pub fn evaluate<E>(
    design: &DesignMatrix,
    splits: &[SplitAssignment],
    estimator: &E,
) -> Result<ResultMatrix, EvaluateError>
where
    E: SurvivalEstimator,
{
    let mut patient_ids: Vec<String> = Vec::new();
    let mut row_index: HashMap<String, usize> = HashMap::new();
    let mut columns: Vec<Vec<(usize, f64)>> = Vec::with_capacity(splits.len());

    for (split_idx, split) in splits.iter().enumerate() {
        let train = select_rows(design, &split.train, split_idx)?;
        let test = select_rows(design, &split.test, split_idx)?;

        let fitted = estimator
            .fit(
                train.covariates.view(),
                train.durations.view(),
                train.events.view(),
            )
            .map_err(|err| EvaluateError::Fit {
                split: split_idx,
                source: Box::new(err),
            })?;

        // Covariate columns only; duration and event never reach prediction.
        let medians = fitted.predict_median(test.covariates.view());

        let mut column = Vec::with_capacity(medians.len());
        let mut clamped = 0usize;
        for (id, estimate) in test.patient_ids.iter().zip(medians) {
            let row = *row_index.entry(id.clone()).or_insert_with(|| {
                patient_ids.push(id.clone());
                patient_ids.len() - 1
            });
            let value = match estimate {
                MedianEstimate::Finite(value) => value,
                MedianEstimate::Unbounded => {
                    clamped += 1;
                    UNBOUNDED_SENTINEL
                }
            };
            column.push((row, value));
        }
        columns.push(column);

        log::info!(
            "Split {}/{}: trained on {} patients, predicted {} ({} clamped).",
            split_idx + 1,
            splits.len(),
            train.len(),
            test.len(),
            clamped
        );
    }

    let mut values =
        Array2::<f64>::from_elem((patient_ids.len(), splits.len()), UNBOUNDED_SENTINEL);
    for (split_idx, column) in columns.iter().enumerate() {
        for &(row, value) in column {
            values[[row, split_idx]] = value;
        }
    }

    Ok(ResultMatrix {
        patient_ids,
        values,
    })
}

fn select_rows(
    design: &DesignMatrix,
    ids: &[String],
    split: usize,
) -> Result<DesignSubset, EvaluateError> {
    design.select(ids).map_err(|err| match err {
        DesignError::MissingRow(id) => EvaluateError::MissingRow { split, id },
        other => EvaluateError::Selection {
            split,
            source: other,
        },
    })
}
