//! Result matrix serialization.
//!
//! The scoring endpoint expects a bare tab-separated table: one row per
//! patient, one column per split, each value rendered with four significant
//! digits the way C's `%.4g` chooses between fixed and scientific notation.
//! The file is written to a temporary sibling and renamed into place so a
//! failed run never leaves a truncated output behind.

use crate::evaluate::ResultMatrix;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Significant digits carried by every serialized prediction.
pub const OUTPUT_DIGITS: usize = 4;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),
}

/// Serialize the result matrix as a headerless TSV.
pub fn write_result_matrix(path: &Path, matrix: &ResultMatrix) -> Result<(), OutputError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "predictions".to_string());
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));

    let write_result = (|| -> Result<(), OutputError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(&temp_path)?;
        for row in matrix.values.rows() {
            let record: Vec<String> = row
                .iter()
                .map(|&value| format_significant(value, OUTPUT_DIGITS))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })?;

    log::info!(
        "Wrote {} patients x {} splits to '{}'.",
        matrix.values.nrows(),
        matrix.values.ncols(),
        path.display()
    );
    Ok(())
}

/// Render `value` with `digits` significant digits, `%g`-style: fixed
/// notation for moderate exponents, scientific otherwise, trailing zeros
/// trimmed. Callers guarantee finiteness; the matrix never carries NaN or
/// infinity.
pub fn format_significant(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    let mut exponent = magnitude.log10().floor() as i32;
    // Rounding at the requested precision can carry into the next decade
    // (9.9999 -> 10.00), which changes the notation decision.
    let scale = 10f64.powi(digits as i32 - 1 - exponent);
    let rounded = (magnitude * scale).round() / scale;
    if rounded != 0.0 && (rounded.log10().floor() as i32) > exponent {
        exponent += 1;
    }

    if exponent < -4 || exponent >= digits as i32 {
        let mantissa = value.signum() * rounded / 10f64.powi(exponent);
        let body = trim_trailing_zeros(&format!("{:.*}", digits - 1, mantissa));
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{body}e{sign}{:02}", exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_trailing_zeros(&format!("{:.*}", decimals, value.signum() * rounded))
    }
}

fn trim_trailing_zeros(rendered: &str) -> String {
    if !rendered.contains('.') {
        return rendered.to_string();
    }
    rendered.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::ResultMatrix;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn renders_four_significant_digits() {
        assert_eq!(format_significant(0.0, 4), "0");
        assert_eq!(format_significant(1.0, 4), "1");
        assert_eq!(format_significant(123.456, 4), "123.5");
        assert_eq!(format_significant(1234.4, 4), "1234");
        assert_eq!(format_significant(0.5, 4), "0.5");
        assert_eq!(format_significant(-42.0, 4), "-42");
    }

    #[test]
    fn switches_to_scientific_outside_the_fixed_range() {
        assert_eq!(format_significant(123456.0, 4), "1.235e+05");
        assert_eq!(format_significant(0.000001234, 4), "1.234e-06");
        assert_eq!(format_significant(-123456.0, 4), "-1.235e+05");
    }

    #[test]
    fn rounding_can_carry_into_the_next_decade() {
        assert_eq!(format_significant(9.9999, 4), "10");
        assert_eq!(format_significant(99999.9, 4), "1e+05");
    }

    #[test]
    fn writes_a_headerless_tsv() {
        let matrix = ResultMatrix {
            patient_ids: vec!["p1".into(), "p2".into()],
            values: array![[12.0, 0.0], [345.26, 1234567.0]],
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        write_result_matrix(&path, &matrix).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "12\t0\n345.3\t1.235e+06\n");
        assert!(!dir.path().join("predictions.csv.tmp").exists());
    }
}
