//! Bootstrap split loading.
//!
//! The portal supplies two headerless tab-separated files, one for training
//! and one for testing. Column `i` of each file lists the patient
//! identifiers assigned to split `i`; columns are ragged, with short columns
//! padded by empty cells. The two files are zipped into one
//! [`SplitAssignment`] per split and validated for train/test disjointness.

use itertools::Itertools;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// One bootstrap split: the identifiers to train on and to predict for.
#[derive(Debug, Clone)]
pub struct SplitAssignment {
    pub train: Vec<String>,
    pub test: Vec<String>,
}

/// Errors surfaced while reading or validating the split index files.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "The training index file defines {train} splits but the testing index file defines {test}."
    )]
    SplitCountMismatch { train: usize, test: usize },
    #[error("Split {split} assigns no patients to the {side} set.")]
    EmptySplit { split: usize, side: &'static str },
    #[error("Split {split} assigns patient '{id}' to both the training and testing sets.")]
    OverlappingSplit { split: usize, id: String },
}

/// Read and zip the train/test index files into per-split assignments.
pub fn load_split_assignments(
    train_path: &Path,
    test_path: &Path,
) -> Result<Vec<SplitAssignment>, SplitError> {
    let train_columns = read_id_columns(train_path)?;
    let test_columns = read_id_columns(test_path)?;

    if train_columns.len() != test_columns.len() {
        return Err(SplitError::SplitCountMismatch {
            train: train_columns.len(),
            test: test_columns.len(),
        });
    }

    let splits: Vec<SplitAssignment> = train_columns
        .into_iter()
        .zip_eq(test_columns)
        .map(|(train, test)| SplitAssignment { train, test })
        .collect();

    for (index, split) in splits.iter().enumerate() {
        validate_split(index, split)?;
    }

    log::info!("Loaded {} bootstrap splits.", splits.len());
    Ok(splits)
}

/// Read a headerless TSV as one identifier list per column, dropping the
/// null padding that ragged columns carry.
fn read_id_columns(path: &Path) -> Result<Vec<Vec<String>>, SplitError> {
    let file = File::open(path)?;
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .map_parse_options(|options| options.with_separator(b'\t'))
        .into_reader_with_file_handle(file)
        .finish()?;

    let mut columns = Vec::with_capacity(df.width());
    for name in df.get_column_names() {
        let series = df.column(name.as_str())?;
        let casted = series.cast(&DataType::String)?;
        let values = casted.str().expect("casted to string");
        let ids: Vec<String> = values
            .into_iter()
            .flatten()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .map(|text| text.to_string())
            .collect();
        columns.push(ids);
    }
    Ok(columns)
}

fn validate_split(index: usize, split: &SplitAssignment) -> Result<(), SplitError> {
    if split.train.is_empty() {
        return Err(SplitError::EmptySplit {
            split: index,
            side: "training",
        });
    }
    if split.test.is_empty() {
        return Err(SplitError::EmptySplit {
            split: index,
            side: "testing",
        });
    }
    let train_ids: HashSet<&str> = split.train.iter().map(String::as_str).collect();
    if let Some(id) = split.test.iter().find(|id| train_ids.contains(id.as_str())) {
        return Err(SplitError::OverlappingSplit {
            split: index,
            id: id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    fn create_test_tsv(content: &str) -> io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{}", content)?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn reads_ragged_columns() {
        // Split 0 trains on three patients, split 1 on two; the short column
        // is padded with an empty cell in the raw file.
        let train = create_test_tsv("p1\tp4\np2\tp5\np3\t\n").unwrap();
        let test = create_test_tsv("p4\tp1\np5\tp2\n").unwrap();
        let splits = load_split_assignments(train.path(), test.path()).unwrap();

        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].train, vec!["p1", "p2", "p3"]);
        assert_eq!(splits[0].test, vec!["p4", "p5"]);
        assert_eq!(splits[1].train, vec!["p4", "p5"]);
        assert_eq!(splits[1].test, vec!["p1", "p2"]);
    }

    #[test]
    fn split_count_mismatch_is_rejected() {
        let train = create_test_tsv("p1\tp2\np3\tp4\n").unwrap();
        let test = create_test_tsv("p5\np6\n").unwrap();
        let err = load_split_assignments(train.path(), test.path()).unwrap_err();
        match err {
            SplitError::SplitCountMismatch { train, test } => {
                assert_eq!(train, 2);
                assert_eq!(test, 1);
            }
            other => panic!("expected SplitCountMismatch, got {:?}", other),
        }
    }

    #[test]
    fn overlapping_split_is_rejected() {
        let train = create_test_tsv("p1\np2\n").unwrap();
        let test = create_test_tsv("p2\np3\n").unwrap();
        let err = load_split_assignments(train.path(), test.path()).unwrap_err();
        match err {
            SplitError::OverlappingSplit { split, id } => {
                assert_eq!(split, 0);
                assert_eq!(id, "p2");
            }
            other => panic!("expected OverlappingSplit, got {:?}", other),
        }
    }

    #[test]
    fn empty_test_column_is_rejected() {
        let train = create_test_tsv("p1\tp2\np3\tp4\n").unwrap();
        let test = create_test_tsv("p5\t\np6\t\n").unwrap();
        let err = load_split_assignments(train.path(), test.path()).unwrap_err();
        match err {
            SplitError::EmptySplit { split, side } => {
                assert_eq!(split, 1);
                assert_eq!(side, "testing");
            }
            other => panic!("expected EmptySplit, got {:?}", other),
        }
    }
}
