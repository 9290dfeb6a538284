use thiserror::Error;

/// Hard failures surfaced to the caller. Everything in this enum is a
/// precondition violation the caller must fix; partial data coverage is
/// never an error (those cells degrade to the missing marker instead).
#[derive(Debug, Error, Clone)]
pub enum EvalError {
    #[error("no devices to evaluate")]
    EmptyDevicePool,
    #[error("device count mismatch: {serials} serial ids but {series} series")]
    DeviceCountMismatch { serials: usize, series: usize },
    #[error("timestamp index is not sorted")]
    UnsortedIndex,
    #[error("column '{column}' has {actual} cells, index has {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
