//! Error types for catalog models and their loaders.

use thiserror::Error;

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Primary error type for catalog operations.
///
/// Errors are `Clone` so the last load failure can be kept on a stratum and
/// surfaced later by whoever presents the item.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    // === Load Errors ===
    /// A required input (usually the URL) is missing. The load never starts.
    #[error("{title}: {message}")]
    Configuration { title: String, message: String },

    /// The loader rejected the request or the payload was malformed.
    #[error("{title}: {message}")]
    NetworkOrParse { title: String, message: String },

    // === Factory Errors ===
    #[error("Unknown catalog member type: {0}")]
    UnknownType(String),

    #[error("A model with id '{0}' already exists")]
    DuplicateModelId(String),

    // === Schema Errors ===
    #[error("Trait '{name}' is not part of {schema}")]
    UnknownTrait { schema: String, name: String },

    #[error("Invalid value for trait '{name}': expected {expected}")]
    TraitTypeMismatch { name: String, expected: String },

    #[error("Trait '{0}' is already defined")]
    DuplicateTrait(String),

    #[error("{layer} requires trait '{requires}' from an earlier layer")]
    MissingTraitDependency { layer: String, requires: String },

    // === Strata Errors ===
    #[error("Stratum not found: {0}")]
    UnknownStratum(String),

    #[error("Stratum '{0}' does not accept direct writes")]
    ReadOnlyStratum(String),

    // === Value Errors ===
    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    pub fn configuration(title: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::Configuration {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn network_or_parse(title: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::NetworkOrParse {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Short heading suitable for an error dialog.
    pub fn title(&self) -> &str {
        match self {
            CatalogError::Configuration { title, .. } | CatalogError::NetworkOrParse { title, .. } => {
                title
            }
            CatalogError::UnknownType(_) | CatalogError::DuplicateModelId(_) => {
                "Unable to create catalog member"
            }
            CatalogError::UnknownTrait { .. }
            | CatalogError::TraitTypeMismatch { .. }
            | CatalogError::DuplicateTrait(_)
            | CatalogError::MissingTraitDependency { .. } => "Invalid trait",
            CatalogError::UnknownStratum(_) | CatalogError::ReadOnlyStratum(_) => {
                "Invalid stratum"
            }
            CatalogError::InvalidTime(_) => "Invalid time",
            CatalogError::Config(_) => "Invalid configuration",
        }
    }

    /// Detail text for the error.
    pub fn message(&self) -> String {
        match self {
            CatalogError::Configuration { message, .. }
            | CatalogError::NetworkOrParse { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether retrying the same load could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::NetworkOrParse { .. })
    }
}

// Conversion from common error types
impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::network_or_parse("I/O error", err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::network_or_parse("Invalid JSON", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_message() {
        let err = CatalogError::configuration("Unable to load", "no url");
        assert_eq!(err.title(), "Unable to load");
        assert_eq!(err.message(), "no url");
        assert_eq!(err.to_string(), "Unable to load: no url");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_network_errors_are_retryable() {
        let err = CatalogError::network_or_parse("Request failed", "timeout");
        assert!(err.is_retryable());
        assert_eq!(err.clone(), err);
    }
}
