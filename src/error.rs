use thiserror::Error;

/// Convenience alias for results carrying a [`ReductionError`].
pub type Result<T> = std::result::Result<T, ReductionError>;

/// Everything that can abort a reduction run.
///
/// All variants are fatal: a run either produces a complete report or none.
#[derive(Error, Debug)]
pub enum ReductionError {
    /// A spectral row has the wrong shape or a field of the wrong type.
    #[error("line {line}, field '{field}': {message}")]
    Parse {
        line: usize,
        field: String,
        message: String,
    },

    /// A flat spectrogram does not have 32×32 cells.
    #[error("spectrogram has {actual} values, expected {expected}")]
    Shape { expected: usize, actual: usize },

    /// Nothing left to reduce (no intervals, no droplets, zero volume).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Calibration comparison against a zero average intensity.
    #[error("division by zero: {0}")]
    DivisionByZero(String),

    /// Out-of-range configuration or calibration values.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ReductionError {
    pub(crate) fn parse(line: usize, field: &str, message: impl Into<String>) -> Self {
        ReductionError::Parse {
            line,
            field: field.to_string(),
            message: message.into(),
        }
    }
}
