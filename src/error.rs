//! Error types for the pricing engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the engine can surface. Lookups that find nothing are
//! not errors: resolution returns `None` and the caller decides whether
//! absence is fatal (see [`EngineError::ConfigurationMissing`]).

use thiserror::Error;
use uuid::Uuid;

/// The main error type for the pricing engine.
///
/// # Example
///
/// ```
/// use pricing_engine::error::EngineError;
///
/// let error = EngineError::ConfigurationMissing {
///     key: "lease.base_price".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration missing for key: lease.base_price");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// No setting resolved for a key the caller requires.
    #[error("Configuration missing for key: {key}")]
    ConfigurationMissing {
        /// The key that did not resolve.
        key: String,
    },

    /// A setting, rule, condition or action definition was malformed.
    #[error("Validation failed for '{field}': {message}")]
    ValidationError {
        /// The field or definition that failed validation.
        field: String,
        /// A description of the problem.
        message: String,
    },

    /// The storage layer failed during a read or write.
    #[error("Persistence error: {message}")]
    PersistenceError {
        /// A description of the storage failure.
        message: String,
    },

    /// The audit record for a mutation could not be written.
    ///
    /// The enclosing mutation is always rolled back when this occurs.
    #[error("Audit write failed: {message}")]
    AuditWriteFailure {
        /// A description of the audit failure.
        message: String,
    },

    /// No setting exists with the given id.
    #[error("Setting not found: {id}")]
    SettingNotFound {
        /// The id that was not found.
        id: Uuid,
    },

    /// No pricing rule exists with the given id.
    #[error("Pricing rule not found: {id}")]
    RuleNotFound {
        /// The id that was not found.
        id: Uuid,
    },

    /// No category exists with the given name or id.
    #[error("Category not found: {name}")]
    CategoryNotFound {
        /// The category name (or id) that was not found.
        name: String,
    },

    /// An update carried a stale version token.
    #[error("Version conflict on '{key}': expected version {expected}, found {actual}")]
    VersionConflict {
        /// The setting key being updated.
        key: String,
        /// The version the caller expected.
        expected: u32,
        /// The version currently stored (0 when no setting exists).
        actual: u32,
    },

    /// Arithmetic failed while evaluating a pricing rule.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for building a [`EngineError::ValidationError`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for building a [`EngineError::PersistenceError`].
    pub fn persistence(message: impl Into<String>) -> Self {
        EngineError::PersistenceError {
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_missing_displays_key() {
        let error = EngineError::ConfigurationMissing {
            key: "refill.base_price".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration missing for key: refill.base_price"
        );
    }

    #[test]
    fn test_validation_error_displays_field_and_message() {
        let error = EngineError::validation("actions[0]", "divide by zero");
        assert_eq!(
            error.to_string(),
            "Validation failed for 'actions[0]': divide by zero"
        );
    }

    #[test]
    fn test_version_conflict_displays_versions() {
        let error = EngineError::VersionConflict {
            key: "lease.fee_per_kg".to_string(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            error.to_string(),
            "Version conflict on 'lease.fee_per_kg': expected version 2, found 3"
        );
    }

    #[test]
    fn test_audit_write_failure_displays_message() {
        let error = EngineError::AuditWriteFailure {
            message: "disk full".to_string(),
        };
        assert_eq!(error.to_string(), "Audit write failed: disk full");
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_missing() -> EngineResult<()> {
            Err(EngineError::ConfigurationMissing {
                key: "tax.rate".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_missing()?;
            Ok(())
        }

        assert!(matches!(
            propagates_error(),
            Err(EngineError::ConfigurationMissing { .. })
        ));
    }
}
