//! Error taxonomy shared by the loaders, the selection language and the
//! packing analysis.

use thiserror::Error;

use crate::selection::SelectionError;

/// Fatal conditions for a packing analysis run.
///
/// Nothing in the workspace retries: every variant aborts the run.
#[derive(Debug, Error)]
pub enum PackingError {
    /// Trajectory or topology could not be read, or held no frames.
    #[error("load failure: {0}")]
    LoadFailure(String),

    /// The atom selection matched zero atoms.
    #[error("selection '{0}' matched no atoms")]
    EmptySelection(String),

    /// Every sampled frame was processed but no distance was recorded.
    #[error("no nearest-neighbor distances were recorded: {0}")]
    EmptyResultSet(String),

    /// Statistics were requested from a collection without samples.
    #[error("distance collection is empty")]
    EmptyCollection,

    /// Stride, cutoff, box or histogram parameters are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackingResult<T> = Result<T, PackingError>;

impl PackingError {
    pub fn load(message: impl Into<String>) -> Self {
        PackingError::LoadFailure(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        PackingError::InvalidConfiguration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PackingError::config("stride must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid configuration: stride must be at least 1"
        );

        let err = PackingError::EmptySelection("name OW".to_string());
        assert_eq!(err.to_string(), "selection 'name OW' matched no atoms");
    }

    #[test]
    fn test_selection_error_converts() {
        let err: PackingError = SelectionError::new("Expected integer").into();
        assert!(matches!(err, PackingError::Selection(_)));
        assert!(err.to_string().contains("Expected integer"));
    }
}
