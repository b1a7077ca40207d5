//! Engine Errors
//!
//! Hard failures of the engine and the enhanced fetch error carried by
//! network-backed operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Which upstream catalog could not be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Dimensions,
    Perspectives,
}

impl CatalogKind {
    /// API path the catalog is served from
    pub fn endpoint(&self) -> &'static str {
        match self {
            CatalogKind::Dimensions => "evaluation-dimensions",
            CatalogKind::Perspectives => "cultural-perspectives",
        }
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogKind::Dimensions => write!(f, "dimension"),
            CatalogKind::Perspectives => write!(f, "cultural perspective"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("select at least 2 evaluated subjects to compare (found {found})")]
    InsufficientSubjects { found: usize },

    #[error("{catalog} catalog unavailable and no cached copy exists: {cause}")]
    CatalogUnavailable { catalog: CatalogKind, cause: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("session store error: {0}")]
    Session(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of a failed upstream request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Connection could not be established
    Offline,
    Timeout,
    /// 5xx response
    Server,
    /// 4xx response other than 401/403
    Client,
    /// 401 or 403
    Auth,
    /// Body could not be decoded into the expected shape
    Decode,
    /// Non-success status outside 4xx/5xx (1xx, unfollowed 3xx)
    Unexpected,
}

/// A failed request against the evaluation API.
///
/// Carries enough context for the UI layer to tell "offline" apart from
/// "server error" and to show how many retries were spent.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind:?} error from {endpoint} (status {status:?}, {retries} retries): {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub status: Option<u16>,
    pub endpoint: String,
    pub retries: u32,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            endpoint: endpoint.into(),
            retries: 0,
            message: message.into(),
        }
    }

    /// Build from an HTTP status code
    pub fn from_status(status: u16, endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => FetchErrorKind::Auth,
            400..=499 => FetchErrorKind::Client,
            500..=599 => FetchErrorKind::Server,
            _ => FetchErrorKind::Unexpected,
        };
        Self {
            status: Some(status),
            ..Self::new(kind, endpoint, message)
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Transient network/5xx failures and 401 (token refresh) are retried.
    /// Every other 4xx is final.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            FetchErrorKind::Offline | FetchErrorKind::Timeout | FetchErrorKind::Server => true,
            FetchErrorKind::Auth => self.status == Some(401),
            FetchErrorKind::Client | FetchErrorKind::Decode | FetchErrorKind::Unexpected => false,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.kind, FetchErrorKind::Offline | FetchErrorKind::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(FetchError::from_status(503, "/x", "").kind, FetchErrorKind::Server);
        assert_eq!(FetchError::from_status(404, "/x", "").kind, FetchErrorKind::Client);
        assert_eq!(FetchError::from_status(401, "/x", "").kind, FetchErrorKind::Auth);
    }

    #[test]
    fn test_informational_and_redirect_statuses_are_not_server_errors() {
        for status in [101, 204, 302, 304, 600] {
            let err = FetchError::from_status(status, "/x", "");
            assert_eq!(err.kind, FetchErrorKind::Unexpected, "status {}", status);
            assert!(!err.is_retryable(), "status {}", status);
        }
        assert_eq!(FetchError::from_status(599, "/x", "").kind, FetchErrorKind::Server);
    }

    #[test]
    fn test_retry_policy_by_kind() {
        assert!(FetchError::from_status(500, "/x", "").is_retryable());
        assert!(FetchError::from_status(401, "/x", "").is_retryable());
        assert!(!FetchError::from_status(403, "/x", "").is_retryable());
        assert!(!FetchError::from_status(422, "/x", "").is_retryable());
        assert!(FetchError::new(FetchErrorKind::Offline, "/x", "down").is_retryable());
        assert!(!FetchError::new(FetchErrorKind::Decode, "/x", "bad json").is_retryable());
    }

    #[test]
    fn test_insufficient_subjects_message_is_actionable() {
        let err = EngineError::InsufficientSubjects { found: 1 };
        assert!(err.to_string().contains("at least 2"));
    }
}
