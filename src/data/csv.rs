//! CSV format dataset implementation
//!
//! Supports loading datasets from CSV files where:
//! - The last column is the label (0 or 1)
//! - All other columns are dense numeric features
//! - First row can be headers (automatically detected)

use crate::core::{ClassifierError, Label, Matrix, Result, NEGATIVE, POSITIVE};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Labeled dense dataset loaded from CSV
#[derive(Debug, Clone)]
pub struct CSVDataset {
    features: Matrix,
    labels: Vec<Label>,
    header: Option<Vec<String>>,
}

impl CSVDataset {
    /// Load a dataset from a CSV file
    ///
    /// The last column is assumed to be the label.
    /// Headers are automatically detected if present.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(ClassifierError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader with header auto-detection
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, true)
    }

    /// Load a dataset from a reader with explicit header option
    pub fn from_reader_with_options<R: BufRead>(
        reader: R,
        auto_detect_header: bool,
    ) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut labels = Vec::new();
        let mut header = None;
        let mut seen_first = false;

        for line in reader.lines() {
            let line = line.map_err(ClassifierError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if !seen_first {
                seen_first = true;
                if auto_detect_header && Self::is_header_line(line) {
                    header = Some(line.split(',').map(|f| f.trim().to_string()).collect());
                    continue;
                }
            }

            let (features, label) = Self::parse_data_line(line)?;
            if let Some(first) = rows.first() {
                if first.len() != features.len() {
                    return Err(ClassifierError::ParseError(format!(
                        "Expected {} features, got {} in line: {line}",
                        first.len(),
                        features.len()
                    )));
                }
            }
            rows.push(features);
            labels.push(label);
        }

        if rows.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }

        Ok(CSVDataset {
            features: Matrix::from_rows(&rows)?,
            labels,
            header,
        })
    }

    /// Check if a line appears to be a header
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();

        if fields.len() < 2 {
            return false;
        }

        // Most feature columns non-numeric means headers
        let non_numeric_count = fields
            .iter()
            .take(fields.len() - 1)
            .filter(|field| field.trim().parse::<f64>().is_err())
            .count();

        non_numeric_count > (fields.len() - 1) / 2
    }

    /// Parse a CSV data line into features and label
    fn parse_data_line(line: &str) -> Result<(Vec<f64>, Label)> {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();

        if fields.len() < 2 {
            return Err(ClassifierError::ParseError(format!(
                "Line has too few fields: {line}"
            )));
        }

        let label_str = fields[fields.len() - 1];
        let label = label_str
            .parse::<f64>()
            .map_err(|_| ClassifierError::ParseError(format!("Invalid label: {label_str}")))?;
        let label = if label == 0.0 {
            NEGATIVE
        } else if label == 1.0 {
            POSITIVE
        } else {
            return Err(ClassifierError::InvalidLabel(label));
        };

        let features = fields[..fields.len() - 1]
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                field.parse::<f64>().map_err(|_| {
                    ClassifierError::ParseError(format!(
                        "Invalid feature value at column {}: {field}",
                        idx + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok((features, label))
    }

    pub fn features(&self) -> &Matrix {
        &self.features
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Column names, when the file had a header row
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of feature columns
    pub fn dim(&self) -> usize {
        self.features.n_cols()
    }

    pub fn into_parts(self) -> (Matrix, Vec<Label>) {
        (self.features, self.labels)
    }
}
