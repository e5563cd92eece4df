//! Aalen's additive hazards regression.
//!
//! The cumulative hazard is modelled as a sum of covariate-weighted
//! increments over the distinct event times of the training subset. At each
//! event time the increment is estimated by ridge-regularized least squares
//! of the event indicator on the covariates of the at-risk set, with a
//! leading intercept column. The fitted object is ephemeral: it is consumed
//! for median prediction within one bootstrap iteration and discarded.
//!
//! A subject's predicted median is the first event time at which the
//! estimated survival `exp(-H(t))` drops to one half, i.e. the cumulative
//! hazard reaches `ln 2`. Subjects whose hazard never crosses are tagged
//! [`MedianEstimate::Unbounded`].

use crate::model::{FittedSurvivalModel, MedianEstimate, SurvivalEstimator};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use ndarray_linalg::Solve;
use thiserror::Error;

/// Cumulative-hazard level at which survival crosses one half.
const MEDIAN_THRESHOLD: f64 = std::f64::consts::LN_2;

/// Errors surfaced while validating training data or solving the fit.
#[derive(Debug, Error)]
pub enum AalenError {
    #[error("covariate, duration, and event arrays must have consistent dimensions")]
    DimensionMismatch,
    #[error("event indicators must be 0 or 1")]
    InvalidEventFlag,
    #[error("covariate and duration values must be finite")]
    NonFiniteInput,
    #[error("the ridge penalizer must be non-negative")]
    InvalidPenalizer,
    #[error("no events observed in the training subset; nothing to fit")]
    NoEvents,
    #[error("failed to solve the penalized normal equations: {0}")]
    Solve(#[from] ndarray_linalg::error::LinalgError),
}

/// Configuration of the additive hazards fit.
#[derive(Debug, Clone, Copy)]
pub struct AalenFitter {
    /// Ridge penalty applied to every coefficient, intercept included.
    pub penalizer: f64,
}

impl Default for AalenFitter {
    fn default() -> Self {
        Self { penalizer: 1.0 }
    }
}

/// The fitted model: per-event-time coefficient increments.
#[derive(Debug, Clone)]
pub struct FittedAalen {
    /// Distinct event times of the training subset, ascending.
    times: Vec<f64>,
    /// Shape: [n_event_times, 1 + n_covariates]; column 0 is the intercept.
    increments: Array2<f64>,
}

impl SurvivalEstimator for AalenFitter {
    type Fitted = FittedAalen;
    type Error = AalenError;

    fn fit(
        &self,
        covariates: ArrayView2<'_, f64>,
        durations: ArrayView1<'_, f64>,
        events: ArrayView1<'_, u8>,
    ) -> Result<FittedAalen, AalenError> {
        let n = durations.len();
        if covariates.nrows() != n || events.len() != n {
            return Err(AalenError::DimensionMismatch);
        }
        if self.penalizer < 0.0 || !self.penalizer.is_finite() {
            return Err(AalenError::InvalidPenalizer);
        }
        if events.iter().any(|&e| e > 1) {
            return Err(AalenError::InvalidEventFlag);
        }
        if durations.iter().any(|t| !t.is_finite())
            || covariates.iter().any(|x| !x.is_finite())
        {
            return Err(AalenError::NonFiniteInput);
        }

        let mut event_times: Vec<f64> = durations
            .iter()
            .zip(events.iter())
            .filter(|&(_, &event)| event == 1)
            .map(|(&time, _)| time)
            .collect();
        event_times.sort_by(f64::total_cmp);
        event_times.dedup();
        if event_times.is_empty() {
            return Err(AalenError::NoEvents);
        }

        let width = covariates.ncols() + 1;
        let mut increments = Array2::<f64>::zeros((event_times.len(), width));

        for (step, &time) in event_times.iter().enumerate() {
            let at_risk: Vec<usize> = (0..n).filter(|&i| durations[i] >= time).collect();
            let m = at_risk.len();

            // Design of the at-risk set, with a leading intercept column.
            let mut x = Array2::<f64>::zeros((m, width));
            let mut y = Array1::<f64>::zeros(m);
            for (row, &i) in at_risk.iter().enumerate() {
                x[[row, 0]] = 1.0;
                x.slice_mut(s![row, 1..]).assign(&covariates.row(i));
                if durations[i] == time && events[i] == 1 {
                    y[row] = 1.0;
                }
            }

            let mut normal = x.t().dot(&x);
            for d in 0..width {
                normal[[d, d]] += self.penalizer;
            }
            let rhs = x.t().dot(&y);
            let increment = normal.solve_into(rhs)?;
            increments.row_mut(step).assign(&increment);
        }

        log::debug!(
            "Aalen fit: {} subjects, {} distinct event times, penalizer {}.",
            n,
            event_times.len(),
            self.penalizer
        );

        Ok(FittedAalen {
            times: event_times,
            increments,
        })
    }
}

impl FittedSurvivalModel for FittedAalen {
    fn predict_median(&self, covariates: ArrayView2<'_, f64>) -> Vec<MedianEstimate> {
        assert_eq!(
            covariates.ncols() + 1,
            self.increments.ncols(),
            "prediction covariates do not match the fitted design width"
        );

        covariates
            .rows()
            .into_iter()
            .map(|row| self.median_for_row(row))
            .collect()
    }
}

impl FittedAalen {
    pub fn event_times(&self) -> &[f64] {
        &self.times
    }

    fn median_for_row(&self, row: ArrayView1<'_, f64>) -> MedianEstimate {
        let mut hazard = 0.0;
        for (step, &time) in self.times.iter().enumerate() {
            let increment = self.increments.row(step);
            hazard += increment[0] + increment.slice(s![1..]).dot(&row);
            if !hazard.is_finite() {
                return MedianEstimate::Unbounded;
            }
            if hazard >= MEDIAN_THRESHOLD {
                return MedianEstimate::Finite(time);
            }
        }
        MedianEstimate::Unbounded
    }
}
