use std::error::Error;
use std::fmt;

/// Custom error type for query-strategy configuration and scoring failures.
#[derive(Debug)]
pub enum StrategyError {
    /// Invalid or contradictory configuration, detected at setup time.
    Configuration(String),
    /// A declared but unimplemented feature was requested (e.g. the
    /// Round-Robin class dimension). Raised at construction, never at
    /// scoring time.
    Unsupported(String),
    /// The underlying classifier failed to train or predict.
    Model(String),
    /// A numeric edge case that has no defined score (singular matrix,
    /// empty distribution, dimension mismatch).
    Numeric(String),
    /// Scoring a single instance failed; the driver recovers locally.
    Scoring { index: usize, reason: String },
    /// The file backing a distance matrix could not be written or removed.
    MatrixFile(std::io::Error),
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StrategyError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            StrategyError::Unsupported(msg) => write!(f, "unsupported feature: {}", msg),
            StrategyError::Model(msg) => write!(f, "model error: {}", msg),
            StrategyError::Numeric(msg) => write!(f, "numeric error: {}", msg),
            StrategyError::Scoring { index, reason } => {
                write!(f, "failed to score unlabeled instance {}: {}", index, reason)
            }
            StrategyError::MatrixFile(err) => write!(f, "distance matrix file error: {}", err),
        }
    }
}

impl Error for StrategyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StrategyError::MatrixFile(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StrategyError {
    fn from(err: std::io::Error) -> Self {
        StrategyError::MatrixFile(err)
    }
}
