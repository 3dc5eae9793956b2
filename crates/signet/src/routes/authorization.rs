// The authorization endpoint and connector login.
//
// `/auth` validates the request and persists an `AuthRequest`;
// `/auth/{connector}` hands the user to the chosen connector, either by
// redirect (callback connectors) or with a credential form (password
// connectors). Validation failures that can be attributed to the client
// redirect back with OAuth error parameters; everything else renders an
// error page because no trustworthy redirect target exists.

use url::Url;

use signet_core::connector::{Identity, Scopes};
use signet_core::error::{OAuthErrorKind, ServerError, StorageError};
use signet_core::id::new_id;
use signet_core::models::{AuthRequest, Client, Pkce};

use crate::handler::{GenericRequest, GenericResponse};
use crate::oidc;
use crate::routes::{approval, templates};
use crate::server::Server;

/// Redirect target for clients without a redirect endpoint; the code is
/// shown to the user for manual copy.
pub const REDIRECT_URI_OOB: &str = "urn:ietf:wg:oauth:2.0:oob";

pub async fn handle_authorization(server: &Server, request: &GenericRequest) -> GenericResponse {
    let auth_request = match parse_authorization_request(server, request).await {
        Ok(a) => a,
        Err(resp) => return *resp,
    };
    let id = auth_request.id.clone();

    if let Err(e) = server.storage().create_auth_request(auth_request).await {
        server
            .logger()
            .error(&format!("failed to create authorization request: {e}"));
        return templates::error_page(
            500,
            "Internal error",
            "Failed to record the authorization request.",
        );
    }

    let connectors = server.connector_list();
    if let [(connector_id, _)] = connectors.as_slice() {
        let location = format!(
            "{}?req={}",
            server.abs_path(&format!("/auth/{connector_id}")),
            id
        );
        return GenericResponse::redirect(302, &location);
    }

    let html = templates::login_page(&server.web.issuer_name, &connectors, |connector_id| {
        format!("{}?req={}", server.abs_path(&format!("/auth/{connector_id}")), id)
    });
    GenericResponse::html(200, &html)
}

/// Validate `/auth` query parameters into a storable `AuthRequest`.
///
/// The error branch carries a finished response: either an error redirect
/// to the client or a rendered page.
async fn parse_authorization_request(
    server: &Server,
    request: &GenericRequest,
) -> Result<AuthRequest, Box<GenericResponse>> {
    let params = request.query_params();

    let client_id = match params.get("client_id") {
        Some(id) if !id.is_empty() => id.clone(),
        _ => {
            return Err(Box::new(templates::error_page(
                400,
                "Bad request",
                "No client_id provided.",
            )))
        }
    };

    let client = match server.storage().get_client(&client_id).await {
        Ok(c) => c,
        Err(StorageError::NotFound) => {
            return Err(Box::new(templates::error_page(
                400,
                "Bad request",
                &format!("Invalid client_id ({client_id})."),
            )))
        }
        Err(e) => {
            server.logger().error(&format!("failed to get client: {e}"));
            return Err(Box::new(templates::error_page(
                500,
                "Internal error",
                "Database error.",
            )))
        }
    };

    let redirect_uri = match params.get("redirect_uri") {
        Some(uri) if validate_redirect_uri(&client, uri) => uri.clone(),
        Some(uri) => {
            return Err(Box::new(templates::error_page(
                400,
                "Bad request",
                &format!("Unregistered redirect_uri ({uri})."),
            )))
        }
        None => {
            return Err(Box::new(templates::error_page(
                400,
                "Bad request",
                "No redirect_uri provided.",
            )))
        }
    };

    // The redirect target is trusted from here on, so remaining failures
    // go back to the client as OAuth errors.
    let state = params.get("state").cloned().unwrap_or_default();
    let redirect_err = |kind: OAuthErrorKind, description: &str| {
        Box::new(error_redirect(&redirect_uri, &state, kind, description))
    };

    let response_types: Vec<String> = params
        .get("response_type")
        .map(|rt| rt.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    if response_types.is_empty() {
        return Err(redirect_err(
            OAuthErrorKind::InvalidRequest,
            "No response_type provided.",
        ));
    }
    for rt in &response_types {
        match rt.as_str() {
            "code" | "id_token" | "token" => {
                if !server.supports_response_type(rt) {
                    return Err(redirect_err(
                        OAuthErrorKind::UnsupportedResponseType,
                        &format!("Unsupported response type {rt}."),
                    ));
                }
            }
            other => {
                return Err(redirect_err(
                    OAuthErrorKind::UnsupportedResponseType,
                    &format!("Invalid response type {other}."),
                ))
            }
        }
    }

    let scopes: Vec<String> = params
        .get("scope")
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let id_token_requested = response_types
        .iter()
        .any(|rt| rt == "code" || rt == "id_token");
    if id_token_requested && !oidc::parse_scopes(&scopes).openid {
        return Err(redirect_err(
            OAuthErrorKind::InvalidScope,
            "Missing required scope \"openid\".",
        ));
    }

    let pkce = match params.get("code_challenge") {
        Some(challenge) if !challenge.is_empty() => {
            let method = params
                .get("code_challenge_method")
                .cloned()
                .unwrap_or_else(|| "S256".to_string());
            match method.as_str() {
                "S256" => {}
                "plain" if server.allow_plain_pkce => {}
                other => {
                    return Err(redirect_err(
                        OAuthErrorKind::InvalidRequest,
                        &format!("Unsupported code_challenge_method {other}."),
                    ))
                }
            }
            Some(Pkce {
                code_challenge: challenge.clone(),
                code_challenge_method: method,
            })
        }
        _ => None,
    };

    let now = server.now();
    Ok(AuthRequest {
        id: new_id(),
        client_id,
        response_types,
        scopes,
        redirect_uri,
        nonce: params.get("nonce").cloned().unwrap_or_default(),
        state,
        force_approval_prompt: params.get("approval_prompt").map(String::as_str) == Some("force"),
        logged_in: false,
        claims: None,
        connector_id: String::new(),
        connector_data: None,
        expiry: now + server.auth_requests_valid_for,
        hmac_key: new_id(),
        pkce,
    })
}

/// Exact-match redirect URI validation, with the out-of-band URN and the
/// loopback allowance for public clients.
pub fn validate_redirect_uri(client: &Client, redirect_uri: &str) -> bool {
    if client.redirect_uris.iter().any(|u| u == redirect_uri) {
        return true;
    }
    if !client.public {
        return false;
    }
    if redirect_uri == REDIRECT_URI_OOB {
        return true;
    }
    // Native apps listen on an ephemeral loopback port (RFC 8252 §7.3).
    match Url::parse(redirect_uri) {
        Ok(url) => {
            url.scheme() == "http"
                && matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
        }
        Err(_) => false,
    }
}

/// Build an OAuth error redirect back to the client.
pub fn error_redirect(
    redirect_uri: &str,
    state: &str,
    kind: OAuthErrorKind,
    description: &str,
) -> GenericResponse {
    let mut location = format!(
        "{}{}error={}&error_description={}",
        redirect_uri,
        if redirect_uri.contains('?') { "&" } else { "?" },
        kind.as_str(),
        urlencoding::encode(description),
    );
    if !state.is_empty() {
        location.push_str(&format!("&state={}", urlencoding::encode(state)));
    }
    GenericResponse::redirect(302, &location)
}

// ─── Connector login ────────────────────────────────────────────

pub async fn handle_connector_login(
    server: &Server,
    connector_id: &str,
    request: &GenericRequest,
) -> GenericResponse {
    let req_id = match request.param("req") {
        Some(id) if !id.is_empty() => id,
        _ => return templates::error_page(400, "Bad request", "No authorization request."),
    };

    let auth_request = match server.storage().get_auth_request(&req_id).await {
        Ok(a) => a,
        Err(StorageError::NotFound) => {
            return templates::error_page(
                400,
                "Login session expired",
                "Start the login flow again.",
            )
        }
        Err(e) => {
            server.logger().error(&format!("failed to get auth request: {e}"));
            return templates::error_page(500, "Internal error", "Database error.");
        }
    };
    if server.now() > auth_request.expiry {
        return templates::error_page(400, "Login session expired", "Start the login flow again.");
    }

    let connector = match server.connector(connector_id).await {
        Ok(c) => c,
        Err(ServerError::Storage(StorageError::NotFound)) => {
            return templates::error_page(404, "Not found", "Requested connector does not exist.")
        }
        Err(e) => {
            server
                .logger()
                .error(&format!("failed to open connector {connector_id}: {e}"));
            return templates::error_page(500, "Internal error", "Failed to open connector.");
        }
    };

    // Remember which connector this login runs through; the callback and
    // approval steps read it back from storage.
    let chosen = connector_id.to_string();
    if let Err(e) = server
        .storage()
        .update_auth_request(&req_id, &|mut a| {
            a.connector_id = chosen.clone();
            Ok(a)
        })
        .await
    {
        server.logger().error(&format!("failed to set connector id: {e}"));
        return templates::error_page(500, "Internal error", "Database error.");
    }

    let scopes = connector_scopes(&auth_request.scopes);

    if let Some(callback) = &connector.handle.callback {
        let callback_url = server.abs_url("/callback");
        return match callback.login_url(&scopes, &callback_url, &req_id) {
            Ok(url) => GenericResponse::redirect(302, &url),
            Err(e) => {
                server.logger().error(&format!("connector login_url: {e}"));
                templates::error_page(500, "Internal error", "Connector error.")
            }
        };
    }

    if let Some(password) = &connector.handle.password {
        let post_url = format!(
            "{}?req={}",
            server.abs_path(&format!("/auth/{connector_id}")),
            req_id
        );
        if request.method.eq_ignore_ascii_case("GET") {
            return GenericResponse::html(
                200,
                &templates::password_page(&post_url, password.prompt(), false),
            );
        }

        let form = request.form_params();
        let login = form.get("login").cloned().unwrap_or_default();
        let secret = form.get("password").cloned().unwrap_or_default();
        return match password.login(&scopes, &login, &secret).await {
            Ok(Some(identity)) => {
                finalize_login(server, &auth_request, connector_id, identity).await
            }
            Ok(None) => GenericResponse::html(
                200,
                &templates::password_page(&post_url, password.prompt(), true),
            ),
            Err(e) => {
                server.logger().error(&format!("connector login failed: {e}"));
                templates::error_page(500, "Internal error", "Login error.")
            }
        };
    }

    server
        .logger()
        .error(&format!("connector {connector_id} has no login capability"));
    templates::error_page(500, "Internal error", "Connector error.")
}

/// Record a successful connector login on the auth request and send the
/// browser to the approval step.
pub async fn finalize_login(
    server: &Server,
    auth_request: &AuthRequest,
    connector_id: &str,
    identity: Identity,
) -> GenericResponse {
    let connector_id_owned = connector_id.to_string();
    let update = |mut a: AuthRequest| -> Result<AuthRequest, StorageError> {
        a.logged_in = true;
        a.claims = Some(identity.claims.clone());
        a.connector_data = identity.connector_data.clone();
        a.connector_id = connector_id_owned.clone();
        Ok(a)
    };
    if let Err(e) = server
        .storage()
        .update_auth_request(&auth_request.id, &update)
        .await
    {
        server
            .logger()
            .error(&format!("failed to finalize login: {e}"));
        return templates::error_page(500, "Internal error", "Database error.");
    }

    let location = format!(
        "{}?req={}&hmac={}",
        server.abs_path("/approval"),
        auth_request.id,
        approval::approval_token(&auth_request.hmac_key, &auth_request.id),
    );
    GenericResponse::redirect(303, &location)
}

/// Project the requested scope list onto the hints connectors understand.
pub fn connector_scopes(scopes: &[String]) -> Scopes {
    let parsed = oidc::parse_scopes(scopes);
    Scopes {
        offline_access: parsed.offline_access,
        groups: parsed.groups,
    }
}
