// Mock connectors for tests and demo deployments.
//
// `mockCallback` immediately bounces the browser back to the server's
// callback endpoint and returns a fixed identity; `mockPassword` accepts a
// single configured username/password pair. The callback mock records the
// header names it saw in `connector_data`, which is how the dispatch
// layer's header stripping is observable from tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use signet_core::connector::{
    CallbackConnector, CallbackRequest, ConnectorHandle, Identity, PasswordConnector,
    RefreshConnector, Scopes,
};
use signet_core::error::ConnectorError;
use signet_core::logger::Logger;
use signet_core::models::Claims;

/// Factory for the `mockCallback` connector type.
pub fn open_callback(
    _id: &str,
    config: &serde_json::Value,
    _logger: Logger,
) -> Result<ConnectorHandle, ConnectorError> {
    let config: CallbackConfig = parse_config(config)?;
    let connector = Arc::new(CallbackMock {
        identity: config.identity(),
    });
    Ok(ConnectorHandle::new()
        .with_callback(connector.clone())
        .with_refresh(connector))
}

/// Factory for the `mockPassword` connector type.
pub fn open_password(
    _id: &str,
    config: &serde_json::Value,
    _logger: Logger,
) -> Result<ConnectorHandle, ConnectorError> {
    let config: PasswordConfig = parse_config(config)?;
    if config.username.is_empty() {
        return Err(ConnectorError::InvalidConfig(
            "no username supplied".to_string(),
        ));
    }
    if config.password.is_empty() {
        return Err(ConnectorError::InvalidConfig(
            "no password supplied".to_string(),
        ));
    }
    Ok(ConnectorHandle::new().with_password(Arc::new(PasswordMock { config })))
}

fn parse_config<T: Default + for<'de> Deserialize<'de>>(
    config: &serde_json::Value,
) -> Result<T, ConnectorError> {
    if config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(config.clone())
        .map_err(|e| ConnectorError::InvalidConfig(format!("parse connector config: {e}")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CallbackConfig {
    user_id: String,
    username: String,
    email: String,
    groups: Vec<String>,
}

impl CallbackConfig {
    fn identity(&self) -> Claims {
        let mut claims = Claims {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            preferred_username: String::new(),
            email: self.email.clone(),
            email_verified: true,
            groups: self.groups.clone(),
        };
        if claims.user_id.is_empty() {
            claims.user_id = "u1".to_string();
        }
        if claims.username.is_empty() {
            claims.username = "Kilgore Trout".to_string();
        }
        if claims.email.is_empty() {
            claims.email = "a@b.c".to_string();
        }
        claims
    }
}

struct CallbackMock {
    identity: Claims,
}

#[async_trait]
impl CallbackConnector for CallbackMock {
    fn login_url(
        &self,
        _scopes: &Scopes,
        callback_url: &str,
        state: &str,
    ) -> Result<String, ConnectorError> {
        Ok(format!(
            "{callback_url}?state={}",
            urlencoding::encode(state)
        ))
    }

    async fn handle_callback(
        &self,
        _scopes: &Scopes,
        request: &CallbackRequest,
    ) -> Result<Identity, ConnectorError> {
        let mut seen: Vec<&String> = request.headers.keys().collect();
        seen.sort();
        Ok(Identity {
            claims: self.identity.clone(),
            connector_data: Some(serde_json::json!({ "seenHeaders": seen })),
        })
    }
}

#[async_trait]
impl RefreshConnector for CallbackMock {
    async fn refresh(
        &self,
        _scopes: &Scopes,
        mut identity: Identity,
    ) -> Result<Identity, ConnectorError> {
        identity.claims.username = self.identity.username.clone();
        Ok(identity)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PasswordConfig {
    username: String,
    password: String,
}

struct PasswordMock {
    config: PasswordConfig,
}

#[async_trait]
impl PasswordConnector for PasswordMock {
    async fn login(
        &self,
        _scopes: &Scopes,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, ConnectorError> {
        if username != self.config.username || password != self.config.password {
            return Ok(None);
        }
        Ok(Some(Identity {
            claims: Claims {
                user_id: "0-385-28089-0".to_string(),
                username: self.config.username.clone(),
                preferred_username: String::new(),
                email: self.config.username.clone(),
                email_verified: true,
                groups: Vec::new(),
            },
            connector_data: None,
        }))
    }
}
