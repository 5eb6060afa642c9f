//! Data loading for labeled dense datasets

pub mod csv;

pub use self::csv::*;
