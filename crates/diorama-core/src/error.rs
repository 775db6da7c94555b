//! Error types for the in-process conductor

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning a DNA file path into an application reference.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Nothing exists at the given path
    #[error("DNA file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read
    #[error("Failed to read DNA file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid DNA definition
    #[error("Failed to parse DNA file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Main error type for conductor operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// DNA could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A DNA declares a zome that has no native implementation registered
    #[error("DNA '{dna}' declares zome '{zome}' but no implementation is registered")]
    ZomeNotRegistered { dna: String, zome: String },

    /// Two instances were configured with the same name
    #[error("Duplicate instance name: {0}")]
    DuplicateInstance(String),

    /// String is not a valid content address
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using CoreError
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::ZomeNotRegistered {
            dna: "my_first_app".to_string(),
            zome: "my_zome".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "DNA 'my_first_app' declares zome 'my_zome' but no implementation is registered"
        );
    }

    #[test]
    fn test_resolution_not_found_display() {
        let err = ResolutionError::NotFound {
            path: PathBuf::from("dist/missing.dna.json"),
        };
        assert_eq!(err.to_string(), "DNA file not found: dist/missing.dna.json");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
    }
}
