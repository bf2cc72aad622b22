//! Error types for matrix-mul operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{strategy} needs at least {min} ranks, the group has {size}")]
    Configuration {
        strategy: &'static str,
        min: usize,
        size: usize,
    },

    #[error("{rows} rows cannot be split evenly across {parts} parts")]
    PartitionMismatch { rows: usize, parts: usize },

    #[error("communication failed: {0}")]
    Comm(#[from] comm::Error),

    #[error("matrix dimension mismatch: A is {0}x{1}, B is {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),

    #[error("row {row} has {len} values, expected {expected}")]
    RaggedRows { row: usize, len: usize, expected: usize },

    #[error("rows {offset}..{end} fall outside a matrix of {rows} rows")]
    RowsOutOfRange { offset: usize, end: usize, rows: usize },

    #[error("entry ({row}, {col}) of the product does not fit in 64 bits")]
    Overflow { row: usize, col: usize },

    #[error("{strategy} product differs from the single-process product")]
    ResultMismatch { strategy: &'static str },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}
