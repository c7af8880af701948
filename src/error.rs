// Error taxonomy for the record store.
// Every failure path maps to one of these kinds; callers can always tell
// a bad request from a missing record from a failed write.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Required input missing or empty (correctable by the caller).
    Validation { message: String },

    /// A categorical field does not resolve in the taxonomy registry.
    /// `valid` carries the currently accepted ids so the caller can retry.
    InvalidReference {
        field: String,
        value: String,
        valid: Vec<String>,
    },

    /// No point with the given id.
    NotFound { id: String },

    /// The dataset document could not be read or written.
    Persistence { message: String },
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_reference(
        field: impl Into<String>,
        value: impl Into<String>,
        valid: Vec<String>,
    ) -> Self {
        StoreError::InvalidReference {
            field: field.into(),
            value: value.into(),
            valid,
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        StoreError::NotFound { id: id.into() }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        StoreError::Persistence {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation { message } => write!(f, "validation failed: {}", message),
            StoreError::InvalidReference {
                field,
                value,
                valid,
            } => write!(
                f,
                "invalid {}: '{}' (valid options: {})",
                field,
                value,
                valid.join(", ")
            ),
            StoreError::NotFound { id } => write!(f, "collection point '{}' not found", id),
            StoreError::Persistence { message } => write!(f, "persistence failed: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_reference_lists_options() {
        let err = StoreError::invalid_reference(
            "category",
            "c-99",
            vec!["c-1".to_string(), "c-2".to_string()],
        );
        let text = err.to_string();
        assert!(text.contains("c-99"));
        assert!(text.contains("c-1, c-2"));
    }

    #[test]
    fn test_kinds_are_distinguishable() {
        let not_found = StoreError::not_found("pr-12345678");
        let persistence = StoreError::persistence("disk full");
        assert_ne!(not_found, persistence);
        assert!(matches!(not_found, StoreError::NotFound { .. }));
        assert!(matches!(persistence, StoreError::Persistence { .. }));
    }
}
