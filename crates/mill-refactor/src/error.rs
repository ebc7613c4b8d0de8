//! Refactoring error types

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the shape of an incoming refactor command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unsupported schema version: {version}")]
    UnsupportedVersion { version: String },

    #[error("Invalid value for field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Malformed command: {message}")]
    Malformed { message: String },
}

impl SchemaError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Refactoring engine errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RefactorError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("Symbol not found: {kind} '{name}' in {}", file.display())]
    SymbolNotFound {
        name: String,
        kind: String,
        file: PathBuf,
    },

    #[error("Ambiguous selector: {candidates} declarations named '{name}' in {}", file.display())]
    AmbiguousSelector {
        name: String,
        file: PathBuf,
        candidates: usize,
    },

    #[error("Unresolvable dependency: '{name}' cannot be imported by {}", file.display())]
    UnresolvableDependency { name: String, file: PathBuf },

    #[error("Name collision: '{name}' is already bound in {}", file.display())]
    NameCollision { name: String, file: PathBuf },

    #[error("Generation failure in {}: {message}", file.display())]
    GenerationFailure { file: PathBuf, message: String },

    #[error("Parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl RefactorError {
    pub fn unsupported_operation(operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
        }
    }

    pub fn symbol_not_found(
        name: impl Into<String>,
        kind: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self::SymbolNotFound {
            name: name.into(),
            kind: kind.into(),
            file: file.into(),
        }
    }

    pub fn unresolvable_dependency(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self::UnresolvableDependency {
            name: name.into(),
            file: file.into(),
        }
    }

    pub fn name_collision(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self::NameCollision {
            name: name.into(),
            file: file.into(),
        }
    }

    pub fn generation(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::GenerationFailure {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RefactorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Schema(SchemaError::Malformed {
            message: err.to_string(),
        })
    }
}

/// Result type alias for refactoring operations
pub type RefactorResult<T> = Result<T, RefactorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_the_field() {
        let err = RefactorError::from(SchemaError::missing_field("selector"));
        assert!(err.to_string().contains("selector"));
    }

    #[test]
    fn json_errors_become_malformed_schema_errors() {
        let err: RefactorError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(
            err,
            RefactorError::Schema(SchemaError::Malformed { .. })
        ));
    }
}
