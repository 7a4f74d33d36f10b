//! Failure taxonomy for a single item's resolution.
//!
//! None of these ever abort a batch: the orchestrator turns every
//! `FetchError` into a placeholder record and keeps going.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no video identifier found in '{0}'")]
    UnrecognizedInput(String),

    #[error("no single video found for '{0}'")]
    NotFound(String),

    #[error("metadata service answered HTTP {status}")]
    Http { status: u16 },

    #[error("network error: {0}")]
    Transport(String),

    #[error("malformed metadata: {0}")]
    Parse(String),

    #[error("yt-dlp failed: {0}")]
    Process(String),

    #[error("analysis cancelled before this item ran")]
    Cancelled,
}

impl FetchError {
    /// Short label used in placeholder titles.
    pub fn label(&self) -> &'static str {
        match self {
            FetchError::UnrecognizedInput(_) => "Invalid URL",
            FetchError::NotFound(_) => "Not Found",
            FetchError::Http { status: 403 } => "Quota/Forbidden",
            FetchError::Http { .. } => "HTTP Error",
            FetchError::Transport(_) => "Timeout/Blocked",
            FetchError::Parse(_) => "Bad Response",
            FetchError::Process(_) => "yt-dlp Error",
            FetchError::Cancelled => "Cancelled",
        }
    }

    /// Whether a retry has a realistic chance of a different answer.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Http { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, _) => FetchError::Http { status },
            ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(FetchError::Transport("timed out".into()).is_transient());
        assert!(FetchError::Http { status: 503 }.is_transient());
        assert!(FetchError::Http { status: 429 }.is_transient());
        assert!(!FetchError::Http { status: 403 }.is_transient());
        assert!(!FetchError::NotFound("x".into()).is_transient());
    }

    #[test]
    fn quota_errors_get_their_own_label() {
        assert_eq!(FetchError::Http { status: 403 }.label(), "Quota/Forbidden");
        assert_eq!(FetchError::Http { status: 500 }.label(), "HTTP Error");
    }
}
