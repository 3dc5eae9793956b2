// Connector capability traits.
//
// A connector adapts one upstream identity system. Instead of one wide
// interface, each interaction style is its own trait and a connector
// implements the subset it supports; the engines feature-detect through
// `ConnectorHandle` at runtime.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::models::Claims;

/// Scope hints passed to connectors so they can request the right data
/// from the upstream system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scopes {
    /// The client asked for a refresh token; the connector may need to
    /// obtain long-lived upstream credentials.
    pub offline_access: bool,
    /// Group membership was requested.
    pub groups: bool,
}

/// The result of a successful upstream login: the user's claims plus an
/// opaque blob the connector wants echoed back on refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub claims: Claims,
    pub connector_data: Option<serde_json::Value>,
}

/// The subset of an HTTP request a callback connector consumes. The
/// dispatch layer strips `X-Remote-*` headers before constructing this.
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    pub method: String,
    pub query: HashMap<String, String>,
    pub form: HashMap<String, String>,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
}

/// Redirect-based login: the user's browser is sent to the upstream
/// provider and comes back to the server's callback endpoint.
#[async_trait]
pub trait CallbackConnector: Send + Sync {
    /// Build the URL the browser is redirected to. `state` is the value the
    /// upstream must echo back so the callback can be correlated.
    fn login_url(
        &self,
        scopes: &Scopes,
        callback_url: &str,
        state: &str,
    ) -> Result<String, ConnectorError>;

    /// Handle the redirect back from the upstream and extract the identity.
    async fn handle_callback(
        &self,
        scopes: &Scopes,
        request: &CallbackRequest,
    ) -> Result<Identity, ConnectorError>;
}

/// Credential-based login, used by the resource-owner password grant and
/// the built-in login form.
#[async_trait]
pub trait PasswordConnector: Send + Sync {
    /// Label for the username field, e.g. "Email Address".
    fn prompt(&self) -> &str {
        "Username"
    }

    /// Verify the credentials. `Ok(None)` means they were wrong; the caller
    /// keeps the response opaque to prevent user enumeration.
    async fn login(
        &self,
        scopes: &Scopes,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, ConnectorError>;
}

/// Optional: re-validate and refresh an identity when a refresh token is
/// used. Connectors without this capability cause the stored claims to be
/// reused unchanged.
#[async_trait]
pub trait RefreshConnector: Send + Sync {
    async fn refresh(
        &self,
        scopes: &Scopes,
        identity: Identity,
    ) -> Result<Identity, ConnectorError>;
}

/// The capability bundle for one live connector instance.
///
/// Built by a factory (or the server, for the built-in `local` type) and
/// cached in the registry alongside its resource version.
#[derive(Clone, Default)]
pub struct ConnectorHandle {
    pub callback: Option<Arc<dyn CallbackConnector>>,
    pub password: Option<Arc<dyn PasswordConnector>>,
    pub refresh: Option<Arc<dyn RefreshConnector>>,
}

impl ConnectorHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(mut self, c: Arc<dyn CallbackConnector>) -> Self {
        self.callback = Some(c);
        self
    }

    pub fn with_password(mut self, c: Arc<dyn PasswordConnector>) -> Self {
        self.password = Some(c);
        self
    }

    pub fn with_refresh(mut self, c: Arc<dyn RefreshConnector>) -> Self {
        self.refresh = Some(c);
        self
    }

    /// A handle with no capabilities cannot log anyone in.
    pub fn is_empty(&self) -> bool {
        self.callback.is_none() && self.password.is_none()
    }
}

impl std::fmt::Debug for ConnectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorHandle")
            .field("callback", &self.callback.is_some())
            .field("password", &self.password.is_some())
            .field("refresh", &self.refresh.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_handle_has_no_capabilities() {
        let handle = ConnectorHandle::new();
        assert!(handle.is_empty());
        assert!(handle.refresh.is_none());
    }

    #[test]
    fn test_scopes_default_is_minimal() {
        let scopes = Scopes::default();
        assert!(!scopes.offline_access);
        assert!(!scopes.groups);
    }
}
