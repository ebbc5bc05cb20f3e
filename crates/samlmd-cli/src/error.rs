//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The document could not be read, written or signed.
    #[error(transparent)]
    Saml(#[from] samlmd::SamlError),

    /// A signature failed to verify.
    #[error("verification failed: {0}")]
    Verification(String),

    /// Re-serialization changed the document.
    #[error("round trip mismatch: {0}")]
    Mismatch(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Process exit status: 2 when the document itself is malformed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Saml(err) if err.is_document_error() => 2,
            _ => 1,
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_documents_exit_with_two() {
        let err = CliError::from(samlmd::SamlError::multiple("Organization"));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(CliError::Verification("no signature".into()).exit_code(), 1);
        assert_eq!(CliError::from(samlmd::SamlError::AlreadySigned).exit_code(), 1);
    }
}
