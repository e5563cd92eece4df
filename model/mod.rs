#![allow(clippy::len_without_is_empty)]

pub mod aalen;
pub mod design;

use ndarray::{ArrayView1, ArrayView2};

/// A predicted median survival time, tagged at the point of prediction.
///
/// An additive-hazards estimate is undefined when a subject's cumulative
/// hazard never crosses the 0.5 survival threshold; those estimates are
/// tagged [`MedianEstimate::Unbounded`] instead of leaking a non-finite
/// float into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MedianEstimate {
    Finite(f64),
    Unbounded,
}

impl MedianEstimate {
    /// Tag a raw estimate: any non-finite value is unbounded.
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            MedianEstimate::Finite(value)
        } else {
            MedianEstimate::Unbounded
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, MedianEstimate::Unbounded)
    }
}

/// A survival regression technique the evaluation loop can drive.
///
/// The loop owns subset selection and result stacking; implementors own the
/// fit itself. Fit failures propagate untouched and abort the whole batch.
pub trait SurvivalEstimator {
    type Fitted: FittedSurvivalModel;
    type Error: std::error::Error + Send + Sync + 'static;

    fn fit(
        &self,
        covariates: ArrayView2<'_, f64>,
        durations: ArrayView1<'_, f64>,
        events: ArrayView1<'_, u8>,
    ) -> Result<Self::Fitted, Self::Error>;
}

/// A fitted, ephemeral model: consumed for prediction, then discarded.
pub trait FittedSurvivalModel {
    /// One median estimate per covariate row, in row order.
    fn predict_median(&self, covariates: ArrayView2<'_, f64>) -> Vec<MedianEstimate>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_are_tagged_unbounded() {
        assert!(MedianEstimate::from_value(f64::INFINITY).is_unbounded());
        assert!(MedianEstimate::from_value(f64::NEG_INFINITY).is_unbounded());
        assert!(MedianEstimate::from_value(f64::NAN).is_unbounded());
        assert_eq!(
            MedianEstimate::from_value(42.5),
            MedianEstimate::Finite(42.5)
        );
    }
}
