//! End-to-end pipeline test: synthetic cohort files on disk, loaded and
//! evaluated exactly the way the binary drives the library.

use prognos::data::load_covariate_table;
use prognos::evaluate::{evaluate, EvaluateError};
use prognos::model::aalen::AalenFitter;
use prognos::model::design::DesignMatrix;
use prognos::output::write_result_matrix;
use prognos::splits::load_split_assignments;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const COHORT_SIZE: usize = 30;
const SPLIT_COUNT: usize = 3;

fn patient_id(index: usize) -> String {
    format!("TCGA-{index:02}")
}

/// Write a clinical and a survival TSV for a deterministic synthetic cohort.
fn write_cohort_files(dir: &Path) -> (PathBuf, PathBuf) {
    let mut rng = StdRng::seed_from_u64(7);
    let age_noise = Normal::new(0.0, 5.0).expect("valid normal");

    let mut clinical = String::from("patient_id\tage\tgrade\tstage\n");
    let mut survival = String::from("patient_id\tOS_OS\tOS_vital_status\n");

    for index in 0..COHORT_SIZE {
        let id = patient_id(index);
        let age = 60.0 + age_noise.sample(&mut rng);
        let grade = match index % 4 {
            0 => "G1",
            1 => "G2",
            2 => "G3",
            _ => "[Not Available]",
        };
        let stage = if index % 2 == 0 { "Stage I" } else { "Stage II" };
        let duration = 30.0 + index as f64 * 7.0 + rng.gen_range(0.0..5.0);
        let event = u8::from(index % 5 != 4);

        writeln!(clinical, "{id}\t{age:.2}\t{grade}\t{stage}").unwrap();
        writeln!(survival, "{id}\t{duration:.2}\t{event}").unwrap();
    }

    let clinical_path = dir.join("clinical.tsv");
    let survival_path = dir.join("survival.tsv");
    fs::write(&clinical_path, clinical).expect("write clinical");
    fs::write(&survival_path, survival).expect("write survival");
    (clinical_path, survival_path)
}

/// Render identifier columns as a ragged headerless TSV, padding short
/// columns with empty cells the way the portal's index files do.
fn render_columns(columns: &[Vec<String>]) -> String {
    let height = columns.iter().map(Vec::len).max().unwrap_or(0);
    let mut rendered = String::new();
    for row in 0..height {
        let cells: Vec<&str> = columns
            .iter()
            .map(|column| column.get(row).map(String::as_str).unwrap_or(""))
            .collect();
        writeln!(rendered, "{}", cells.join("\t")).unwrap();
    }
    rendered
}

/// Three splits: split `j` tests on patients with `index % 3 == j` and
/// trains on the rest.
fn write_split_files(dir: &Path) -> (PathBuf, PathBuf) {
    let mut train_columns = vec![Vec::new(); SPLIT_COUNT];
    let mut test_columns = vec![Vec::new(); SPLIT_COUNT];
    for index in 0..COHORT_SIZE {
        for (split, test_column) in test_columns.iter_mut().enumerate() {
            if index % SPLIT_COUNT == split {
                test_column.push(patient_id(index));
            } else {
                train_columns[split].push(patient_id(index));
            }
        }
    }

    let train_path = dir.join("train_labels.tsv");
    let test_path = dir.join("test_labels.tsv");
    fs::write(&train_path, render_columns(&train_columns)).expect("write train labels");
    fs::write(&test_path, render_columns(&test_columns)).expect("write test labels");
    (train_path, test_path)
}

#[test]
fn end_to_end_produces_one_finite_column_per_split() {
    let dir = tempdir().expect("tempdir");
    let (clinical_path, survival_path) = write_cohort_files(dir.path());
    let (train_path, test_path) = write_split_files(dir.path());

    let table = load_covariate_table(&clinical_path, &survival_path).expect("covariate table");
    let design = DesignMatrix::from_table(&table).expect("design matrix");
    let splits = load_split_assignments(&train_path, &test_path).expect("splits");
    let matrix = evaluate(&design, &splits, &AalenFitter::default()).expect("evaluation");

    assert_eq!(matrix.values.ncols(), SPLIT_COUNT);
    assert_eq!(matrix.values.nrows(), COHORT_SIZE);
    assert!(matrix.values.iter().all(|value| value.is_finite()));

    let output_path = dir.path().join("predictions.csv");
    write_result_matrix(&output_path, &matrix).expect("write predictions");
    let content = fs::read_to_string(&output_path).expect("read predictions");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), COHORT_SIZE);
    assert!(lines
        .iter()
        .all(|line| line.split('\t').count() == SPLIT_COUNT));
}

#[test]
fn rerunning_the_loop_reproduces_the_matrix() {
    let dir = tempdir().expect("tempdir");
    let (clinical_path, survival_path) = write_cohort_files(dir.path());
    let (train_path, test_path) = write_split_files(dir.path());

    let table = load_covariate_table(&clinical_path, &survival_path).expect("covariate table");
    let design = DesignMatrix::from_table(&table).expect("design matrix");
    let splits = load_split_assignments(&train_path, &test_path).expect("splits");

    let first = evaluate(&design, &splits, &AalenFitter::default()).expect("first run");
    let second = evaluate(&design, &splits, &AalenFitter::default()).expect("second run");
    assert_eq!(first, second);
}

#[test]
fn split_referencing_an_unknown_patient_aborts() {
    let dir = tempdir().expect("tempdir");
    let (clinical_path, survival_path) = write_cohort_files(dir.path());

    let train_path = dir.path().join("train_labels.tsv");
    let test_path = dir.path().join("test_labels.tsv");
    let train_ids: Vec<String> = (0..COHORT_SIZE - 1).map(patient_id).collect();
    fs::write(&train_path, render_columns(&[train_ids])).expect("write train labels");
    fs::write(
        &test_path,
        render_columns(&[vec![patient_id(COHORT_SIZE - 1), "TCGA-99".to_string()]]),
    )
    .expect("write test labels");

    let table = load_covariate_table(&clinical_path, &survival_path).expect("covariate table");
    let design = DesignMatrix::from_table(&table).expect("design matrix");
    let splits = load_split_assignments(&train_path, &test_path).expect("splits");

    let err = evaluate(&design, &splits, &AalenFitter::default()).unwrap_err();
    match err {
        EvaluateError::MissingRow { split, id } => {
            assert_eq!(split, 0);
            assert_eq!(id, "TCGA-99");
        }
        other => panic!("expected MissingRow, got {other:?}"),
    }
}
