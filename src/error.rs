use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    RepositoryAccess,
    ContentLookup,
    ComplexityComputation,
    UnsupportedLanguage,
    ParseError,
    InvalidRequest,
    Cancelled,
    IoError,
    PathOutOfBounds,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepositoryAccess => write!(f, "REPOSITORY_ACCESS"),
            Self::ContentLookup => write!(f, "CONTENT_LOOKUP"),
            Self::ComplexityComputation => write!(f, "COMPLEXITY_COMPUTATION"),
            Self::UnsupportedLanguage => write!(f, "UNSUPPORTED_LANGUAGE"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::IoError => write!(f, "IO_ERROR"),
            Self::PathOutOfBounds => write!(f, "PATH_OUT_OF_BOUNDS"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChurnError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for ChurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ChurnError {}

impl ChurnError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn repository_access(location: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::RepositoryAccess,
            format!("Cannot read git repository at {location}: {reason}"),
        )
    }

    pub fn content_lookup(filename: &str) -> Self {
        Self::new(
            ErrorCode::ContentLookup,
            format!("File not found in working tree: {filename}"),
        )
    }

    pub fn complexity(path: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ComplexityComputation,
            format!("Cannot compute complexity for {path}: {reason}"),
        )
    }

    pub fn unsupported_language(ext: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedLanguage,
            format!("Unsupported language for extension: {ext}"),
        )
    }

    pub fn parse_error(path: &str) -> Self {
        Self::new(ErrorCode::ParseError, format!("Failed to parse: {path}"))
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Analysis cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let err = ChurnError::repository_access("/nope", "not a git repository");
        let text = err.to_string();
        assert!(text.starts_with("[REPOSITORY_ACCESS]"));
        assert!(text.contains("/nope"));
    }

    #[test]
    fn downcast_through_anyhow() {
        let err: anyhow::Error = ChurnError::cancelled().into();
        let churn = err.downcast_ref::<ChurnError>().unwrap();
        assert_eq!(churn.code, ErrorCode::Cancelled);
    }
}
