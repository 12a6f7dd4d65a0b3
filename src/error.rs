//! Error types for tlsetup
//!
//! All modules use `TlsetupResult<T>` as their return type.

use crate::classify::ClassifiedError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tlsetup operations
pub type TlsetupResult<T> = Result<T, TlsetupError>;

/// All errors that can occur in tlsetup
#[derive(Error, Debug)]
pub enum TlsetupError {
    // Version errors
    #[error("Invalid TeX Live version: {0}")]
    InvalidVersion(String),

    #[error("TeX Live {version} is not supported{platform_note}")]
    UnsupportedVersion {
        version: String,
        platform_note: String,
    },

    #[error("TeX Live {0} does not support a custom repository (requires 2012 or later)")]
    RepositoryOverrideUnsupported(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // Tool errors (classified from installer / package manager output)
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    #[error("No repository candidates for TeX Live {0}")]
    NoCandidates(String),

    // Network errors
    #[error("HTTP request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Failed to extract {archive}: {reason}")]
    Extract { archive: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create directory {path}: {source}")]
    DirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Cache store error: {0}")]
    CacheStore(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TlsetupError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create an HTTP error
    pub fn http(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// The classified tool failure, if this is one
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Classified(e) => Some(e),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RepositoryOverrideUnsupported(_) => {
                Some("Remove the repository override or request TeX Live 2012 or later")
            }
            Self::UnsupportedVersion { .. } => {
                Some("Run: tlsetup release  (to see the supported release window)")
            }
            Self::Classified(e) => e.kind().hint(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TlsetupError::RepositoryOverrideUnsupported("2011".to_string());
        assert!(err.to_string().contains("2011"));
        assert!(err.to_string().contains("custom repository"));
    }

    #[test]
    fn error_hint() {
        let err = TlsetupError::RepositoryOverrideUnsupported("2010".to_string());
        assert!(err.hint().is_some());
        assert_eq!(TlsetupError::Internal("x".to_string()).hint(), None);
    }

    #[test]
    fn io_error_context() {
        let err = TlsetupError::io(
            "reading profile",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "IO error: reading profile");
        assert!(err.classified().is_none());
    }
}
