//! Error types for the classifiers and their collaborators

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model not fitted: call fit() before predict()")]
    NotFitted,

    #[error("Insufficient data for class {label}: need at least {required} rows, got {actual}")]
    InsufficientData {
        label: u8,
        required: usize,
        actual: usize,
    },

    #[error("Clustering failed: {0}")]
    Clustering(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label: expected 0 or 1, got {0}")]
    InvalidLabel(f64),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Length mismatch: {features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
