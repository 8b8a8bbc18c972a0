//! Tabular datasets and the demo data synthesizer for matrisk.
//!
//! - [`Dataset`] — A flat table of string cells read from CSV
//! - [`Vitals`] and [`risk_points`] — The rule used to label synthetic rows
//! - [`generate`] / [`ensure_sample_data`] — Seeded synthetic dataset creation
//!
//! # Example
//!
//! ```rust
//! use matrisk_data::{risk_label, risk_points, Vitals};
//!
//! let vitals = Vitals {
//!     age: 30.0,
//!     systolic_bp: 150.0,
//!     diastolic_bp: 95.0,
//!     blood_sugar: 130.0,
//!     body_temp: 98.6,
//!     heart_rate: 80.0,
//! };
//! assert_eq!(risk_points(&vitals), 4);
//! assert_eq!(risk_label(risk_points(&vitals)), "high risk");
//! ```

mod synth;

pub use synth::{
    ensure_sample_data, generate, label_distribution, risk_label, risk_points, write_csv,
    SyntheticRow, Vitals,
};

use std::path::Path;

use thiserror::Error;

/// Name of the label column in datasets.
pub const TARGET_COLUMN: &str = "RiskLevel";

/// Errors that can occur reading or writing datasets.
#[derive(Error, Debug)]
pub enum DataError {
    /// Filesystem access failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The dataset lacks a required column.
    #[error("Dataset has no '{0}' column")]
    MissingColumn(String),

    /// A sampling distribution had invalid parameters.
    #[error("Invalid distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),

    /// The dataset has a header but no rows.
    #[error("Dataset is empty")]
    Empty,
}

impl DataError {
    /// Creates an IO error with path context.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// A table of raw string cells with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Reads a CSV file with a header row.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| DataError::io(path, e))?;
        Self::from_reader(file)
    }

    /// Reads CSV data with a header row from any reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, DataError> {
        let mut reader = csv::Reader::from_reader(reader);
        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Ok(Self { columns, rows })
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of one column.
    pub fn column(&self, name: &str) -> Result<Vec<&str>, DataError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_rows() {
        let data = "Age,BS,RiskLevel\n25,90.5,low risk\n40,130.0,high risk\n";
        let ds = Dataset::from_reader(data.as_bytes()).unwrap();

        assert_eq!(ds.columns, ["Age", "BS", "RiskLevel"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column("RiskLevel").unwrap(), ["low risk", "high risk"]);
    }

    #[test]
    fn missing_column_is_reported() {
        let ds = Dataset::from_reader("Age\n30\n".as_bytes()).unwrap();
        let err = ds.column(TARGET_COLUMN).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "RiskLevel"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Dataset::from_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
