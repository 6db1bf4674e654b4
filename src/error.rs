use crate::schema::ValidationError;
use thiserror::Error;

/// Central error type for the store layer
#[derive(Error, Debug)]
pub enum StoreError {
    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid default value for key \"{key}\": {source}")]
    InvalidDefault {
        key: String,
        #[source]
        source: ValidationError,
    },

    #[error("No data found for key \"{key}\", and the schema does not permit an absent value")]
    NoData { key: String },

    #[error("Failed to deserialize data for key \"{key}\": {reason}")]
    Deserialize { key: String, reason: String },

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Storage quota exceeded while writing key \"{key}\"")]
    QuotaExceeded { key: String },

    #[error("Storage not available")]
    StorageUnavailable,

    #[error("Failed to load from storage: {0}")]
    StorageReadFailed(String),

    #[error("Failed to save to storage: {0}")]
    StorageSaveFailed(String),

    #[error("Invalid JSON stored under key \"{key}\": {reason}")]
    CorruptedData { key: String, reason: String },

    // ============================================================================
    // Registry Errors
    // ============================================================================
    #[error("A storage key must be provided")]
    InvalidKey,

    #[error("Storage key \"{key}\" is already owned by a different store type")]
    KeyConflict { key: String },

    #[error("Store registry already initialized")]
    AlreadyInitialized,

    // ============================================================================
    // Generic/System Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mutex lock error")]
    LockError,

    /// Builder pattern validation error
    #[error("Builder error: {0}")]
    BuilderError(String),
}

impl StoreError {
    /// Whether this error came from the schema rather than the storage medium
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::Validation(_) | StoreError::InvalidDefault { .. } | StoreError::NoData { .. }
        )
    }
}

// Implement conversion from PoisonError for Mutex locks
impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockError
    }
}

// Implement conversion to String for command layers
impl From<StoreError> for String {
    fn from(error: StoreError) -> Self {
        error.to_string()
    }
}

// Helper type alias for Results
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationIssue;

    #[test]
    fn test_error_display() {
        let err = StoreError::NoData {
            key: "store_selected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No data found for key \"store_selected\", and the schema does not permit an absent value"
        );
    }

    #[test]
    fn test_error_conversion_to_string() {
        let err = StoreError::QuotaExceeded {
            key: "store_notifications".to_string(),
        };
        let s: String = err.into();
        assert_eq!(
            s,
            "Storage quota exceeded while writing key \"store_notifications\""
        );
    }

    #[test]
    fn test_validation_error_conversion() {
        let validation = ValidationError::new(vec![ValidationIssue::new("name", "expected string")]);
        let err: StoreError = validation.into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("name: expected string"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
        assert!(!store_err.is_validation());
    }
}
