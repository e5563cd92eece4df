//! # Clinical Data Loading and Validation
//!
//! This module is the exclusive entry point for the clinical covariate and
//! survival outcome files. It reads the two tab-separated inputs, validates
//! them against the expected schema, and aligns them by patient identifier
//! into a single immutable [`CovariateTable`] shared by every bootstrap
//! iteration.
//!
//! - Strict Schema: Column names are not configurable. The clinical file must
//!   carry `age`, `grade`, and `stage`; the survival file must carry `OS_OS`
//!   (duration) and `OS_vital_status` (event indicator).
//! - Missing categorical values are marked in the source files with the
//!   string sentinel `[Not Available]` and are retained as an explicit
//!   [`Category::Missing`] level rather than dropped.
//! - User-Centric Errors: Failures are assumed to be input errors. The
//!   `DataError` enum is designed to give clear, actionable feedback.

use ndarray::Array1;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Duration column in the survival file: observed or censored follow-up time.
pub const DURATION_COLUMN: &str = "OS_OS";
/// Event column in the survival file: 1 for an observed death, 0 for censoring.
pub const EVENT_COLUMN: &str = "OS_vital_status";
/// String sentinel marking a missing categorical value in the clinical file.
pub const MISSING_SENTINEL: &str = "[Not Available]";

const AGE_COLUMN: &str = "age";
const GRADE_COLUMN: &str = "grade";
const STAGE_COLUMN: &str = "stage";

/// A categorical covariate value: an observed level or the missing sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Observed(String),
    Missing,
}

impl Category {
    fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == MISSING_SENTINEL {
            Category::Missing
        } else {
            Category::Observed(trimmed.to_string())
        }
    }

    /// The level name used when expanding this value into indicator columns.
    pub fn level(&self) -> &str {
        match self {
            Category::Observed(level) => level,
            Category::Missing => "missing",
        }
    }
}

/// The immutable covariate table: one row per patient present in both input
/// files, in the clinical file's row order.
#[derive(Debug)]
pub struct CovariateTable {
    pub patient_ids: Vec<String>,
    pub age: Array1<f64>,
    pub grade: Vec<Category>,
    pub stage: Vec<Category>,
    /// Time to event or censoring, finite and non-negative.
    pub durations: Array1<f64>,
    /// Event indicator per patient: 1 observed, 0 censored.
    pub events: Array1<u8>,
}

impl CovariateTable {
    pub fn len(&self) -> usize {
        self.patient_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patient_ids.is_empty()
    }
}

/// Errors surfaced while reading or validating the clinical inputs.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("The required column '{0}' was not found in the input file.")]
    ColumnNotFound(String),
    #[error(
        "Column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error("Missing or null values were found in the required numeric column '{0}'.")]
    MissingValues(String),
    #[error("Non-finite values (NaN or Infinity) were found in the column '{0}'.")]
    NonFiniteValues(String),
    #[error("Column '{0}' contains a negative duration; follow-up times must be >= 0.")]
    NegativeDuration(String),
    #[error("Column '{0}' contains an event indicator other than 0 or 1.")]
    InvalidEventFlag(String),
    #[error("Duplicate patient identifier '{0}' in the input file.")]
    DuplicatePatient(String),
    #[error("The clinical and survival files share no patient identifiers.")]
    NoCommonPatients,
}

/// Read both inputs and align them on patient identifier.
///
/// The first column of each file is taken as the patient identifier, matching
/// the index-column convention of the source data. Patients present in the
/// clinical file but absent from the survival file (or vice versa) are
/// dropped from the table; the surviving row order is the clinical file's.
pub fn load_covariate_table(
    clinical_path: &Path,
    survival_path: &Path,
) -> Result<CovariateTable, DataError> {
    let clinical = read_tsv(clinical_path)?;
    let survival = read_tsv(survival_path)?;

    let clinical_ids = extract_id_column(&clinical)?;
    let survival_ids = extract_id_column(&survival)?;

    let durations_raw = extract_f64_column(&survival, DURATION_COLUMN)?;
    let events_raw = extract_event_column(&survival, EVENT_COLUMN)?;

    let mut outcome_by_id: HashMap<&str, (f64, u8)> = HashMap::with_capacity(survival_ids.len());
    for (idx, id) in survival_ids.iter().enumerate() {
        if outcome_by_id
            .insert(id.as_str(), (durations_raw[idx], events_raw[idx]))
            .is_some()
        {
            return Err(DataError::DuplicatePatient(id.clone()));
        }
    }

    let age_raw = extract_f64_column(&clinical, AGE_COLUMN)?;
    let grade_raw = extract_category_column(&clinical, GRADE_COLUMN)?;
    let stage_raw = extract_category_column(&clinical, STAGE_COLUMN)?;

    let mut patient_ids = Vec::new();
    let mut age = Vec::new();
    let mut grade = Vec::new();
    let mut stage = Vec::new();
    let mut durations = Vec::new();
    let mut events = Vec::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(clinical_ids.len());

    for (idx, id) in clinical_ids.iter().enumerate() {
        if !seen.insert(id.as_str()) {
            return Err(DataError::DuplicatePatient(id.clone()));
        }
        let Some(&(duration, event)) = outcome_by_id.get(id.as_str()) else {
            continue;
        };
        patient_ids.push(id.clone());
        age.push(age_raw[idx]);
        grade.push(grade_raw[idx].clone());
        stage.push(stage_raw[idx].clone());
        durations.push(duration);
        events.push(event);
    }

    if patient_ids.is_empty() {
        return Err(DataError::NoCommonPatients);
    }

    validate_durations(&durations)?;

    log::info!(
        "Covariate table ready: {} patients aligned across clinical and survival files ({} events observed).",
        patient_ids.len(),
        events.iter().filter(|&&e| e == 1).count()
    );

    Ok(CovariateTable {
        patient_ids,
        age: Array1::from_vec(age),
        grade,
        stage,
        durations: Array1::from_vec(durations),
        events: Array1::from_vec(events),
    })
}

fn read_tsv(path: &Path) -> Result<DataFrame, DataError> {
    let file = File::open(path)?;
    CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|options| options.with_separator(b'\t'))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(DataError::from)
}

/// The first column of each input file carries the patient identifier.
fn extract_id_column(df: &DataFrame) -> Result<Vec<String>, DataError> {
    let names = df.get_column_names();
    let id_name = names
        .first()
        .map(|name| name.as_str().to_string())
        .ok_or_else(|| DataError::ColumnNotFound("patient identifier".to_string()))?;
    extract_string_column(df, &id_name)
}

fn extract_string_column(df: &DataFrame, column_name: &str) -> Result<Vec<String>, DataError> {
    let series = df
        .column(column_name)
        .map_err(|_| DataError::ColumnNotFound(column_name.to_string()))?;
    let dtype = series.dtype().clone();
    let casted = series
        .cast(&DataType::String)
        .map_err(|_| DataError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type: "string",
            found_type: dtype.to_string(),
        })?;
    let values = casted.str().expect("casted to string");
    let mut result = Vec::with_capacity(values.len());
    for value in values.into_iter() {
        match value {
            Some(text) => result.push(text.to_string()),
            None => result.push(String::new()),
        }
    }
    Ok(result)
}

fn extract_category_column(df: &DataFrame, column_name: &str) -> Result<Vec<Category>, DataError> {
    let raw = extract_string_column(df, column_name)?;
    Ok(raw.iter().map(|value| Category::from_raw(value)).collect())
}

fn extract_f64_column(df: &DataFrame, column_name: &str) -> Result<Array1<f64>, DataError> {
    let series = df
        .column(column_name)
        .map_err(|_| DataError::ColumnNotFound(column_name.to_string()))?;
    if series.null_count() > 0 {
        return Err(DataError::MissingValues(column_name.to_string()));
    }
    let dtype = series.dtype().clone();
    let casted = series
        .cast(&DataType::Float64)
        .map_err(|_| DataError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: dtype.to_string(),
        })?;
    if casted.null_count() > 0 {
        return Err(DataError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: dtype.to_string(),
        });
    }
    let values = casted.f64().expect("casted to f64");
    let collected: Vec<f64> = values.into_no_null_iter().collect();
    if collected.iter().any(|v| !v.is_finite()) {
        return Err(DataError::NonFiniteValues(column_name.to_string()));
    }
    Ok(Array1::from_vec(collected))
}

fn extract_event_column(df: &DataFrame, column_name: &str) -> Result<Array1<u8>, DataError> {
    let values = extract_f64_column(df, column_name)?;
    let mut result = Array1::<u8>::zeros(values.len());
    for (idx, &value) in values.iter().enumerate() {
        if value == 0.0 {
            result[idx] = 0;
        } else if value == 1.0 {
            result[idx] = 1;
        } else {
            return Err(DataError::InvalidEventFlag(column_name.to_string()));
        }
    }
    Ok(result)
}

fn validate_durations(durations: &[f64]) -> Result<(), DataError> {
    if durations.iter().any(|&d| d < 0.0) {
        return Err(DataError::NegativeDuration(DURATION_COLUMN.to_string()));
    }
    Ok(())
}
