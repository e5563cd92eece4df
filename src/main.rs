// ========================================================================================
//
//                          THE ONE-SHOT ANALYSIS RUN: PROGNOS
//
// ========================================================================================
//
// This binary is the whole analysis, run linearly end to end: authenticate
// against the data portal, fetch the clinical and survival tables plus the
// pre-generated bootstrap index sets, fit an additive hazards model per
// split, predict median survival for each held-out patient, serialize the
// stacked predictions, and push the result back to the portal with
// annotations and provenance before submitting it for scoring.
//
// There are no command-line flags. Every accession identifier and the
// evaluation queue id are fixed constants of the analysis; changing the
// cohort means editing this file, which is itself uploaded as the code
// artifact of the run.

use prognos::data::load_covariate_table;
use prognos::evaluate::evaluate;
use prognos::model::aalen::AalenFitter;
use prognos::model::design::DesignMatrix;
use prognos::output::write_result_matrix;
use prognos::portal::{PortalClient, ProvenanceRecord, ResultAnnotations};
use prognos::splits::load_split_assignments;
use std::error::Error;
use std::path::Path;
use std::process;

// ========================================================================================
//                              ANALYSIS CONSTANTS
// ========================================================================================

/// Kidney renal clear cell carcinoma.
const CANCER_CODE: &str = "KIRC";

/// Training bootstrap index sets for the cohort.
const TRAIN_LABELS_ACCESSION: &str = "syn1714093";
/// Testing bootstrap index sets for the cohort.
const TEST_LABELS_ACCESSION: &str = "syn1714090";
/// Survival outcomes (duration and vital status) per patient.
const SURVIVAL_DATA_ACCESSION: &str = "syn1710303";
/// Clinical covariates (age, grade, stage) per patient.
const CLINICAL_DATA_ACCESSION: &str = "syn1715824";

/// Folder entity receiving the uploaded analysis source.
const CODE_FOLDER_ACCESSION: &str = "syn1720423";
/// Folder entity receiving the uploaded predictions.
const RESULTS_FOLDER_ACCESSION: &str = "syn1720419";
/// Evaluation queue that scores the submitted predictions.
const EVALUATION_QUEUE_ID: u64 = 1876290;

const PORTAL_BASE_URL: &str = "https://repo-prod.prod.sagebase.org/repo/v1/";
const CACHE_DIR: &str = ".prognos-cache";
const PREDICTIONS_FILE: &str = "predictions.csv";
const ANALYSIS_SOURCE: &str = "src/main.rs";
const METHOD_NAME: &str = "Aalen additive model";
const RESULT_ENTITY_NAME: &str = "Aalen additive clinical model";

/// Ridge penalty for the per-event-time regression solves.
const RIDGE_PENALIZER: f64 = 1.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let portal = PortalClient::login(PORTAL_BASE_URL)?;
    let cache_dir = Path::new(CACHE_DIR);

    let train_labels = portal.get_file(TRAIN_LABELS_ACCESSION, cache_dir)?;
    let test_labels = portal.get_file(TEST_LABELS_ACCESSION, cache_dir)?;
    let survival = portal.get_file(SURVIVAL_DATA_ACCESSION, cache_dir)?;
    let clinical = portal.get_file(CLINICAL_DATA_ACCESSION, cache_dir)?;

    let table = load_covariate_table(&clinical, &survival)?;
    let design = DesignMatrix::from_table(&table)?;
    let splits = load_split_assignments(&train_labels, &test_labels)?;

    let fitter = AalenFitter {
        penalizer: RIDGE_PENALIZER,
    };
    let matrix = evaluate(&design, &splits, &fitter)?;

    let predictions_path = Path::new(PREDICTIONS_FILE);
    write_result_matrix(predictions_path, &matrix)?;

    // The code artifact is stored first so the result's provenance can name it.
    let code_entity = portal.store_file(
        Path::new(ANALYSIS_SOURCE),
        "main.rs",
        CODE_FOLDER_ACCESSION,
        None,
        None,
    )?;

    let annotations = ResultAnnotations::clinical_model(CANCER_CODE, METHOD_NAME);
    let provenance = ProvenanceRecord {
        used: vec![
            TRAIN_LABELS_ACCESSION.to_string(),
            TEST_LABELS_ACCESSION.to_string(),
            SURVIVAL_DATA_ACCESSION.to_string(),
            CLINICAL_DATA_ACCESSION.to_string(),
        ],
        executed: vec![code_entity.id.clone()],
    };
    let result_entity = portal.store_file(
        predictions_path,
        RESULT_ENTITY_NAME,
        RESULTS_FOLDER_ACCESSION,
        Some(&annotations),
        Some(&provenance),
    )?;

    let receipt = portal.submit(EVALUATION_QUEUE_ID, &result_entity.id)?;
    log::info!(
        "Submission {} accepted for entity {}.",
        receipt.id,
        receipt.entity_id
    );
    Ok(())
}
