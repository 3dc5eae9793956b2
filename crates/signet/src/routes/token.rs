// The token endpoint.
//
// Supports the authorization_code, refresh_token and password grants.
// Clients authenticate with HTTP Basic or form parameters; secrets and
// token values are compared in constant time. Every failure that involves
// credentials collapses into `invalid_grant` so the endpoint cannot be
// used to probe for valid codes, tokens or users.

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;

use signet_core::connector::{Identity, Scopes};
use signet_core::error::{ConnectorError, OAuthError, OAuthErrorKind, StorageError};
use signet_core::id::{new_id, new_secret};
use signet_core::models::{Claims, RefreshToken};

use crate::handler::{GenericRequest, GenericResponse};
use crate::oidc::{self, ParsedScopes};
use crate::pkce;
use crate::server::Server;

pub async fn handle_token(server: &Server, request: &GenericRequest) -> GenericResponse {
    let form = request.form_params();

    let (client_id, client_secret) = match request.basic_auth() {
        Some(creds) => creds,
        None => (
            form.get("client_id").cloned().unwrap_or_default(),
            form.get("client_secret").cloned().unwrap_or_default(),
        ),
    };

    let client = match server.storage().get_client(&client_id).await {
        Ok(c) => c,
        Err(StorageError::NotFound) => {
            return token_error(&OAuthError::invalid_client("Invalid client credentials."))
        }
        Err(e) => return token_error(&storage_failure(server, "failed to get client", e)),
    };
    if !constant_time_eq(&client.secret, &client_secret) {
        return token_error(&OAuthError::invalid_client("Invalid client credentials."));
    }

    let grant_type = form.get("grant_type").map(String::as_str).unwrap_or("");
    let result = match grant_type {
        "authorization_code" => handle_code_grant(server, &client_id, &form).await,
        "refresh_token" => handle_refresh_grant(server, &client_id, &form).await,
        "password" => handle_password_grant(server, &client_id, &form).await,
        _ => Err(OAuthError::new(
            OAuthErrorKind::UnsupportedGrantType,
            format!("Unsupported grant type {grant_type:?}."),
        )),
    };

    match result {
        Ok(response) => response,
        Err(err) => token_error(&err),
    }
}

// ─── authorization_code ─────────────────────────────────────────

async fn handle_code_grant(
    server: &Server,
    client_id: &str,
    form: &std::collections::HashMap<String, String>,
) -> Result<GenericResponse, OAuthError> {
    let code_id = form
        .get("code")
        .filter(|c| !c.is_empty())
        .ok_or_else(|| OAuthError::invalid_request("No code provided."))?;

    let code = match server.storage().get_auth_code(code_id).await {
        Ok(c) => c,
        Err(StorageError::NotFound) => return Err(OAuthError::invalid_grant()),
        Err(e) => return Err(storage_failure(server, "failed to get auth code", e)),
    };
    let now = server.now();
    if now > code.expiry || code.client_id != client_id {
        return Err(OAuthError::invalid_grant());
    }

    let redirect_uri = form.get("redirect_uri").map(String::as_str).unwrap_or("");
    if redirect_uri != code.redirect_uri {
        return Err(OAuthError::invalid_grant());
    }

    pkce::verify(
        code.pkce.as_ref(),
        form.get("code_verifier").map(String::as_str),
        server.allow_plain_pkce,
    )?;

    // Deleting the code is the redemption point: exactly one exchange
    // observes `Ok` here, so a replayed code always fails.
    match server.storage().delete_auth_code(code_id).await {
        Ok(()) => {}
        Err(StorageError::NotFound) => return Err(OAuthError::invalid_grant()),
        Err(e) => return Err(storage_failure(server, "failed to delete auth code", e)),
    }

    let scopes = oidc::parse_scopes(&code.scopes);
    let minted = mint_tokens(
        server,
        client_id,
        &code.connector_id,
        &code.claims,
        &scopes,
        &code.nonce,
    )
    .await?;

    let refresh = if scopes.offline_access {
        Some(
            issue_refresh_token(
                server,
                client_id,
                &code.connector_id,
                code.claims.clone(),
                code.scopes.clone(),
                code.nonce.clone(),
                code.connector_data.clone(),
                now,
            )
            .await?,
        )
    } else {
        None
    };

    Ok(token_response(&minted, refresh.as_deref()))
}

// ─── refresh_token ──────────────────────────────────────────────

async fn handle_refresh_grant(
    server: &Server,
    client_id: &str,
    form: &std::collections::HashMap<String, String>,
) -> Result<GenericResponse, OAuthError> {
    let raw = form
        .get("refresh_token")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OAuthError::invalid_request("No refresh token provided."))?;
    let Some((id, presented)) = RefreshToken::split_opaque(raw) else {
        return Err(OAuthError::invalid_grant());
    };

    let stored = match server.storage().get_refresh_token(id).await {
        Ok(t) => t,
        Err(StorageError::NotFound) => return Err(OAuthError::invalid_grant()),
        Err(e) => return Err(storage_failure(server, "failed to get refresh token", e)),
    };
    if stored.client_id != client_id {
        return Err(OAuthError::invalid_grant());
    }

    // A narrower scope may be requested, never a wider one.
    let scope_names: Vec<String> = match form.get("scope").filter(|s| !s.is_empty()) {
        Some(requested) => {
            let requested: Vec<String> =
                requested.split_whitespace().map(str::to_string).collect();
            for scope in &requested {
                if !stored.scopes.contains(scope) {
                    return Err(OAuthError::new(
                        OAuthErrorKind::InvalidScope,
                        format!("Scope {scope:?} was not originally granted."),
                    ));
                }
            }
            requested
        }
        None => stored.scopes.clone(),
    };
    let scopes = oidc::parse_scopes(&scope_names);

    let now = server.now();
    if constant_time_eq(&stored.token, presented) {
        return rotate_refresh_token(server, &stored, &scopes, now).await;
    }

    if constant_time_eq(&stored.obsolete_token, presented) {
        // The client retried with the pre-rotation value. Inside the reuse
        // window this is taken for a network replay and answered with the
        // current token; outside it, the token was stolen and the whole
        // family is revoked.
        if now - stored.last_used <= server.refresh_token_reuse_window {
            let minted = mint_tokens(
                server,
                client_id,
                &stored.connector_id,
                &stored.claims,
                &scopes,
                &stored.nonce,
            )
            .await?;
            return Ok(token_response(&minted, Some(&stored.opaque())));
        }
        server.logger().warn(&format!(
            "refresh token replay detected for client {client_id}, revoking token family"
        ));
        if let Err(e) = server.storage().delete_refresh_token(id).await {
            if !e.is_not_found() {
                server
                    .logger()
                    .error(&format!("failed to revoke refresh token: {e}"));
            }
        }
        return Err(OAuthError::invalid_grant());
    }

    Err(OAuthError::invalid_grant())
}

async fn rotate_refresh_token(
    server: &Server,
    stored: &RefreshToken,
    scopes: &ParsedScopes,
    now: DateTime<Utc>,
) -> Result<GenericResponse, OAuthError> {
    // Give the connector a chance to re-validate the user and refresh the
    // claims before anything rotates.
    let identity = Identity {
        claims: stored.claims.clone(),
        connector_data: stored.connector_data.clone(),
    };
    let connector_scopes = Scopes {
        offline_access: true,
        groups: scopes.groups,
    };
    let refreshed = match server.connector(&stored.connector_id).await {
        Ok(connector) => match &connector.handle.refresh {
            Some(refresher) => match refresher.refresh(&connector_scopes, identity).await {
                Ok(i) => i,
                Err(ConnectorError::Policy(msg)) => {
                    server
                        .logger()
                        .info(&format!("refresh rejected by connector: {msg}"));
                    return Err(OAuthError::invalid_grant());
                }
                Err(e) => {
                    server.logger().error(&format!("connector refresh: {e}"));
                    return Err(OAuthError::server_error());
                }
            },
            None => identity,
        },
        Err(e) => {
            server.logger().error(&format!(
                "failed to open connector {}: {e}",
                stored.connector_id
            ));
            return Err(OAuthError::server_error());
        }
    };

    let new_token = new_secret();
    let presented = stored.token.clone();
    let refreshed_claims = refreshed.claims.clone();
    let refreshed_data = refreshed.connector_data.clone();
    let raced = std::sync::atomic::AtomicBool::new(false);
    let update = |mut t: RefreshToken| -> Result<RefreshToken, StorageError> {
        if t.token != presented {
            // Another exchange rotated concurrently; leave it alone.
            raced.store(true, std::sync::atomic::Ordering::Relaxed);
            return Ok(t);
        }
        t.obsolete_token = std::mem::replace(&mut t.token, new_token.clone());
        t.claims = refreshed_claims.clone();
        t.connector_data = refreshed_data.clone();
        t.last_used = now;
        Ok(t)
    };
    match server
        .storage()
        .update_refresh_token(&stored.id, &update)
        .await
    {
        Ok(()) => {}
        Err(StorageError::NotFound) => return Err(OAuthError::invalid_grant()),
        Err(e) => return Err(storage_failure(server, "failed to rotate refresh token", e)),
    }
    if raced.load(std::sync::atomic::Ordering::Relaxed) {
        return Err(OAuthError::invalid_grant());
    }

    let minted = mint_tokens(
        server,
        &stored.client_id,
        &stored.connector_id,
        &refreshed.claims,
        scopes,
        &stored.nonce,
    )
    .await?;
    let opaque = format!("{}.{}", stored.id, new_token);
    Ok(token_response(&minted, Some(&opaque)))
}

// ─── password ───────────────────────────────────────────────────

async fn handle_password_grant(
    server: &Server,
    client_id: &str,
    form: &std::collections::HashMap<String, String>,
) -> Result<GenericResponse, OAuthError> {
    let connector_id = server.password_connector.clone().ok_or_else(|| {
        OAuthError::new(
            OAuthErrorKind::UnsupportedGrantType,
            "Password grant is not enabled.",
        )
    })?;

    let username = form
        .get("username")
        .filter(|u| !u.is_empty())
        .ok_or_else(|| OAuthError::invalid_request("No username provided."))?;
    let password = form
        .get("password")
        .ok_or_else(|| OAuthError::invalid_request("No password provided."))?;

    let scope_names: Vec<String> = match form.get("scope").filter(|s| !s.is_empty()) {
        Some(s) => s.split_whitespace().map(str::to_string).collect(),
        None => vec!["openid".to_string()],
    };
    let scopes = oidc::parse_scopes(&scope_names);
    if !scopes.openid {
        return Err(OAuthError::new(
            OAuthErrorKind::InvalidScope,
            "Missing required scope \"openid\".",
        ));
    }

    let connector = server.connector(&connector_id).await.map_err(|e| {
        server.logger().error(&format!(
            "failed to open password connector {connector_id}: {e}"
        ));
        OAuthError::server_error()
    })?;
    let password_connector = connector.handle.password.as_ref().ok_or_else(|| {
        server.logger().error(&format!(
            "connector {connector_id} does not support the password grant"
        ));
        OAuthError::server_error()
    })?;

    let connector_scopes = Scopes {
        offline_access: scopes.offline_access,
        groups: scopes.groups,
    };
    let identity = match password_connector
        .login(&connector_scopes, username, password)
        .await
    {
        Ok(Some(identity)) => identity,
        Ok(None) => return Err(OAuthError::invalid_grant()),
        Err(ConnectorError::Policy(msg)) => {
            return Err(OAuthError::invalid_request(msg));
        }
        Err(e) => {
            server.logger().error(&format!("password login: {e}"));
            return Err(OAuthError::server_error());
        }
    };

    let minted = mint_tokens(
        server,
        client_id,
        &connector_id,
        &identity.claims,
        &scopes,
        "",
    )
    .await?;

    let refresh = if scopes.offline_access {
        Some(
            issue_refresh_token(
                server,
                client_id,
                &connector_id,
                identity.claims.clone(),
                scope_names,
                String::new(),
                identity.connector_data.clone(),
                server.now(),
            )
            .await?,
        )
    } else {
        None
    };

    Ok(token_response(&minted, refresh.as_deref()))
}

// ─── Shared minting ─────────────────────────────────────────────

pub(crate) struct Minted {
    pub id_token: String,
    pub access_token: String,
    pub expires_in: i64,
}

/// Sign an access token and an ID token for the given identity. Also used
/// by the approval step for the implicit response types.
pub(crate) async fn mint_tokens(
    server: &Server,
    client_id: &str,
    connector_id: &str,
    claims: &Claims,
    scopes: &ParsedScopes,
    nonce: &str,
) -> Result<Minted, OAuthError> {
    // Cross-client audiences require the target client to trust the caller.
    for aud in &scopes.cross_client_audiences {
        if aud == client_id {
            continue;
        }
        let peer = match server.storage().get_client(aud).await {
            Ok(c) => c,
            Err(StorageError::NotFound) => {
                return Err(OAuthError::invalid_request(format!(
                    "Audience client {aud:?} does not exist."
                )))
            }
            Err(e) => {
                server.logger().error(&format!("failed to get client: {e}"));
                return Err(OAuthError::server_error());
            }
        };
        if !peer.trusted_peers.iter().any(|p| p == client_id) {
            return Err(OAuthError::invalid_request(format!(
                "{client_id:?} is not a trusted peer of {aud:?}."
            )));
        }
    }

    let key_set = server.key_set().await.map_err(|e| {
        server.logger().error(&format!("failed to get keys: {e}"));
        OAuthError::server_error()
    })?;
    let Some(signing_key) = &key_set.signing else {
        server.logger().error("no signing key available");
        return Err(OAuthError::server_error());
    };

    let issued_at = server.now();
    let expiry = issued_at + server.id_tokens_valid_for;

    let access_claims = oidc::access_token_claims(
        server.issuer(),
        client_id,
        connector_id,
        claims,
        issued_at,
        expiry,
    );
    let access_token = oidc::sign(&access_claims, signing_key).map_err(|e| {
        server.logger().error(&format!("failed to sign access token: {e}"));
        OAuthError::server_error()
    })?;

    let id_claims = oidc::id_token_claims(&oidc::IdTokenInput {
        issuer: server.issuer(),
        client_id,
        connector_id,
        claims,
        scopes,
        nonce,
        access_token: Some(&access_token),
        audiences: &scopes.cross_client_audiences,
        issued_at,
        expiry,
    });
    let id_token = oidc::sign(&id_claims, signing_key).map_err(|e| {
        server.logger().error(&format!("failed to sign id token: {e}"));
        OAuthError::server_error()
    })?;

    Ok(Minted {
        id_token,
        access_token,
        expires_in: (expiry - issued_at).num_seconds(),
    })
}

#[allow(clippy::too_many_arguments)]
async fn issue_refresh_token(
    server: &Server,
    client_id: &str,
    connector_id: &str,
    claims: Claims,
    scopes: Vec<String>,
    nonce: String,
    connector_data: Option<serde_json::Value>,
    now: DateTime<Utc>,
) -> Result<String, OAuthError> {
    let token = RefreshToken {
        id: new_id(),
        token: new_secret(),
        obsolete_token: String::new(),
        client_id: client_id.to_string(),
        scopes,
        nonce,
        claims,
        connector_id: connector_id.to_string(),
        connector_data,
        created_at: now,
        last_used: now,
    };
    let opaque = token.opaque();
    server
        .storage()
        .create_refresh_token(token)
        .await
        .map_err(|e| {
            server
                .logger()
                .error(&format!("failed to create refresh token: {e}"));
            OAuthError::server_error()
        })?;
    Ok(opaque)
}

fn token_response(minted: &Minted, refresh_token: Option<&str>) -> GenericResponse {
    let mut body = serde_json::json!({
        "access_token": minted.access_token,
        "token_type": "bearer",
        "expires_in": minted.expires_in,
        "id_token": minted.id_token,
    });
    if let Some(rt) = refresh_token {
        body["refresh_token"] = serde_json::Value::String(rt.to_string());
    }
    let mut response = GenericResponse::json(200, &body);
    response.set_header("cache-control", "no-store");
    response.set_header("pragma", "no-cache");
    response
}

/// RFC 6749 §5.2 error body.
pub fn token_error(err: &OAuthError) -> GenericResponse {
    let mut response = GenericResponse::json(err.kind.status(), &err.to_json());
    if err.kind == OAuthErrorKind::InvalidClient {
        response.set_header("www-authenticate", "Basic realm=\"signet\"");
    }
    response
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Storage failures become 503 when the optimistic retry budget ran out
/// and 500 otherwise.
fn storage_failure(server: &Server, context: &str, err: StorageError) -> OAuthError {
    server.logger().error(&format!("{context}: {err}"));
    match err {
        StorageError::Conflict => OAuthError::new(
            OAuthErrorKind::TemporarilyUnavailable,
            "Storage is busy, retry the request.",
        ),
        _ => OAuthError::server_error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secrex"));
        assert!(!constant_time_eq("secret", "longer-secret"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_token_error_shape() {
        let resp = token_error(&OAuthError::invalid_grant());
        assert_eq!(resp.status, 400);
        let body = resp.json_body().unwrap();
        assert_eq!(body["error"], "invalid_grant");

        let resp = token_error(&OAuthError::invalid_client("nope"));
        assert_eq!(resp.status, 401);
        assert!(resp.header("www-authenticate").is_some());
    }

    #[test]
    fn test_token_response_includes_refresh_when_present() {
        let minted = Minted {
            id_token: "id".into(),
            access_token: "at".into(),
            expires_in: 86400,
        };
        let with = token_response(&minted, Some("r.t"));
        assert_eq!(with.json_body().unwrap()["refresh_token"], "r.t");
        assert_eq!(with.header("cache-control"), Some("no-store"));

        let without = token_response(&minted, None);
        assert!(without.json_body().unwrap().get("refresh_token").is_none());
    }
}
