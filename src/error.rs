use thiserror::Error;

/// Main error type for the automapping engine
#[derive(Error, Debug)]
pub enum AutomapError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invariant violation detected during closure expansion.
    /// Fatal to the run: the enclosing transaction rolls back and nothing
    /// from the run is persisted, including the triggering edge.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using AutomapError
pub type Result<T> = std::result::Result<T, AutomapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutomapError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let automap_err: AutomapError = rusqlite_err.into();
        assert!(matches!(automap_err, AutomapError::Database(_)));
    }

    #[test]
    fn test_validation_display() {
        let err = AutomapError::Validation("Issue already mapped to an audit".to_string());
        assert!(err.to_string().contains("Validation error"));
    }
}
