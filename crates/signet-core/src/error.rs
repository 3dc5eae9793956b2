// Error taxonomy for the server and its storage backends.
//
// Three layers: `StorageError` for the persistence contract, `OAuthError`
// for protocol errors that go back to a relying party on the wire, and
// `ServerError` for everything the top-level handler has to absorb.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors produced by a [`crate::storage::Storage`] implementation.
///
/// `NotFound` and `AlreadyExists` are part of normal control flow (expired
/// codes, duplicate ids) and are matched on by the engines. The remaining
/// variants are operational failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("not found")]
    NotFound,

    /// A record with the same key already exists.
    #[error("already exists")]
    AlreadyExists,

    /// An optimistic update kept observing concurrent modifications and
    /// exhausted its retry budget.
    #[error("update conflict")]
    Conflict,

    /// The storage has been closed; no further operations are possible.
    #[error("storage is closed")]
    Closed,

    /// The backend itself failed (I/O, connection, serialization).
    #[error("storage backend: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// True for `NotFound`, the one error callers routinely branch on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// OAuth 2.0 protocol error codes (RFC 6749 §4.1.2.1 and §5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    UnsupportedResponseType,
    InvalidScope,
    AccessDenied,
    ServerError,
    TemporarilyUnavailable,
}

impl OAuthErrorKind {
    /// Wire representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::AccessDenied => "access_denied",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }

    /// HTTP status for a JSON error response at the token endpoint.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidClient => 401,
            Self::ServerError => 500,
            Self::TemporarilyUnavailable => 503,
            _ => 400,
        }
    }
}

impl fmt::Display for OAuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol error together with its human-readable description.
///
/// Rendered either as a JSON body (`{error, error_description}`) at the
/// token endpoint or as redirect query parameters at the authorization
/// endpoint, depending on where it surfaces.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {description}")]
pub struct OAuthError {
    pub kind: OAuthErrorKind,
    pub description: String,
}

impl OAuthError {
    pub fn new(kind: OAuthErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorKind::InvalidRequest, description)
    }

    /// Credential failures are collapsed into one opaque message so the
    /// endpoint cannot be used to enumerate users or codes.
    pub fn invalid_grant() -> Self {
        Self::new(
            OAuthErrorKind::InvalidGrant,
            "Invalid or expired credentials.",
        )
    }

    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorKind::InvalidClient, description)
    }

    pub fn server_error() -> Self {
        Self::new(OAuthErrorKind::ServerError, "Internal server error.")
    }

    /// JSON body per RFC 6749 §5.2.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.kind.as_str(),
            "error_description": self.description,
        })
    }
}

/// Errors raised while opening or driving a connector.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// The stored connector configuration could not be parsed or is
    /// incomplete.
    #[error("invalid connector config: {0}")]
    InvalidConfig(String),

    /// A server-side policy rejected the login before credentials were
    /// checked (e.g. a stored password hash outside the allowed cost range).
    #[error("{0}")]
    Policy(String),

    /// The upstream identity system failed.
    #[error("connector backend: {0}")]
    Backend(String),
}

/// Top-level server failures, absorbed by the outermost handler.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("signing: {0}")]
    Signing(String),

    #[error("{0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_error_kinds_map_to_statuses() {
        assert_eq!(OAuthErrorKind::InvalidClient.status(), 401);
        assert_eq!(OAuthErrorKind::InvalidGrant.status(), 400);
        assert_eq!(OAuthErrorKind::ServerError.status(), 500);
        assert_eq!(OAuthErrorKind::TemporarilyUnavailable.status(), 503);
    }

    #[test]
    fn test_oauth_error_json_body() {
        let err = OAuthError::invalid_request("missing client_id");
        let body = err.to_json();
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["error_description"], "missing client_id");
    }

    #[test]
    fn test_invalid_grant_is_opaque() {
        // The same description regardless of what actually failed.
        assert_eq!(
            OAuthError::invalid_grant().description,
            OAuthError::invalid_grant().description
        );
    }
}
