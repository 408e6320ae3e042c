//! Custom error types for the maintenance manager
//!
//! Library operations return [`MaintenanceError`]. Storage backends report
//! [`StorageError`], which converts into it, and configuration loading reports
//! [`ConfigError`].

use thiserror::Error;

/// Main error type for maintenance-window operations
#[derive(Debug, Error)]
pub enum MaintenanceError {
    /// Malformed target key
    #[error("Invalid target key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Start or end time that cannot be parsed in the configured zone
    #[error("Invalid time '{input}': {reason}")]
    InvalidTime { input: String, reason: String },

    /// Cron expression or recurrence duration that cannot be used
    #[error("Invalid recurrence '{expression}': {reason}")]
    InvalidRecurrence { expression: String, reason: String },

    /// Durable storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Target that does not exist in the host
    #[error("Target '{target}' not found")]
    NotFound { target: String },
}

impl MaintenanceError {
    pub fn target_not_found(target: impl Into<String>) -> Self {
        MaintenanceError::NotFound {
            target: target.into(),
        }
    }

    /// True for errors caused by caller input rather than the system
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MaintenanceError::InvalidKey { .. }
                | MaintenanceError::InvalidTime { .. }
                | MaintenanceError::InvalidRecurrence { .. }
        )
    }
}

/// Storage error variants
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection failed
    #[error("Storage connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// Query execution failed
    #[error("Query '{query}' failed: {reason}")]
    QueryFailed { query: String, reason: String },

    /// Data serialization/deserialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Configuration error variants
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type Result<T, E = MaintenanceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_convert_into_maintenance_errors() {
        let err: MaintenanceError = StorageError::ConnectionFailed {
            reason: "disk gone".to_string(),
        }
        .into();

        assert!(matches!(err, MaintenanceError::Storage(_)));
        assert_eq!(
            err.to_string(),
            "Storage error: Storage connection failed: disk gone"
        );
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn not_found_messages_name_the_missing_thing() {
        assert_eq!(
            MaintenanceError::target_not_found("AGENT:a").to_string(),
            "Target 'AGENT:a' not found"
        );
    }
}
