use thiserror::Error;

/// Result alias for `privgraph`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the synthesis pipeline and its surrounding tooling.
///
/// Numeric edge cases inside a replicate (negative noisy counts, infeasible
/// degree sequences, single-community partitions) are absorbed locally and
/// never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Length or shape mismatch between two inputs.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Shape mismatch (string description).
    #[error("shape mismatch: expected {expected}, actual {actual}")]
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Privacy budget total or split is unusable.
    #[error("invalid privacy budget: {0}")]
    InvalidBudget(String),

    /// Malformed line in an edge-list file.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Result table could not be written.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Configuration file could not be parsed.
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}
