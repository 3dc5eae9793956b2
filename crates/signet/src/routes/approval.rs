// The approval (consent) endpoint and code issuance.
//
// The approval form is bound to its auth request with an HMAC over the
// request id, keyed by the per-request `hmac_key`, so a POST cannot be
// forged for somebody else's login. Deleting the auth request is the
// claim that makes approval single-shot; issuing the code or the implicit
// tokens happens after the claim succeeds.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use signet_core::error::{OAuthErrorKind, StorageError};
use signet_core::id::new_id;
use signet_core::models::{AuthCode, AuthRequest};

use crate::handler::{GenericRequest, GenericResponse};
use crate::oidc;
use crate::routes::authorization::{error_redirect, REDIRECT_URI_OOB};
use crate::routes::{templates, token};
use crate::server::Server;

type HmacSha256 = Hmac<Sha256>;

/// MAC binding an approval form to its auth request.
pub fn approval_token(hmac_key: &str, req_id: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(hmac_key.as_bytes()).expect("hmac accepts any key length");
    mac.update(req_id.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

fn verify_approval_token(hmac_key: &str, req_id: &str, presented: &str) -> bool {
    let Ok(decoded) = URL_SAFE_NO_PAD.decode(presented) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(hmac_key.as_bytes()).expect("hmac accepts any key length");
    mac.update(req_id.as_bytes());
    mac.verify_slice(&decoded).is_ok()
}

pub async fn handle_approval(server: &Server, request: &GenericRequest) -> GenericResponse {
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

    let presented = request.param("hmac").unwrap_or_default();
    if !verify_approval_token(&auth_request.hmac_key, &req_id, &presented) {
        return templates::error_page(403, "Forbidden", "Invalid approval request.");
    }
    if !auth_request.logged_in {
        server
            .logger()
            .error("approval reached before connector login finalized");
        return templates::error_page(500, "Internal error", "Login process not yet finalized.");
    }

    if request.method.eq_ignore_ascii_case("GET") {
        if server.skip_approval && !auth_request.force_approval_prompt {
            return send_code(server, auth_request).await;
        }
        let client_name = match server.storage().get_client(&auth_request.client_id).await {
            Ok(c) => c.name,
            Err(_) => auth_request.client_id.clone(),
        };
        let html = templates::approval_page(
            &server.web.issuer_name,
            &client_name,
            &auth_request.scopes,
            &server.abs_path("/approval"),
            &req_id,
            &approval_token(&auth_request.hmac_key, &req_id),
        );
        return GenericResponse::html(200, &html);
    }

    // POST carries the user's decision.
    if request.form_params().get("approval").map(String::as_str) != Some("approve") {
        let response = error_redirect(
            &auth_request.redirect_uri,
            &auth_request.state,
            OAuthErrorKind::AccessDenied,
            "User denied the authorization request.",
        );
        if let Err(e) = server.storage().delete_auth_request(&req_id).await {
            if !e.is_not_found() {
                server
                    .logger()
                    .error(&format!("failed to delete auth request: {e}"));
            }
        }
        return response;
    }

    send_code(server, auth_request).await
}

/// Consume the auth request and hand the browser back to the client with
/// the requested response types.
pub async fn send_code(server: &Server, auth_request: AuthRequest) -> GenericResponse {
    let now = server.now();
    if now > auth_request.expiry {
        return templates::error_page(
            400,
            "Bad request",
            "Authorization request period has expired.",
        );
    }

    // Claim the request first; a concurrent approval of the same login
    // loses here and renders the already-completed page.
    match server.storage().delete_auth_request(&auth_request.id).await {
        Ok(()) => {}
        Err(StorageError::NotFound) => {
            return templates::error_page(
                400,
                "Bad request",
                "Authorization request has already been completed.",
            )
        }
        Err(e) => {
            server.logger().error(&format!("failed to delete auth request: {e}"));
            return templates::error_page(500, "Internal error", "Database error.");
        }
    }

    let Some(claims) = auth_request.claims.clone() else {
        server.logger().error("auth request approved without claims");
        return templates::error_page(500, "Internal error", "Login process not yet finalized.");
    };

    let implicit = auth_request
        .response_types
        .iter()
        .any(|rt| rt == "token" || rt == "id_token");
    let mut code_value = None;
    let mut params: Vec<(String, String)> = Vec::new();

    if auth_request.response_types.iter().any(|rt| rt == "code") {
        let code = AuthCode {
            id: new_id(),
            client_id: auth_request.client_id.clone(),
            scopes: auth_request.scopes.clone(),
            nonce: auth_request.nonce.clone(),
            redirect_uri: auth_request.redirect_uri.clone(),
            claims: claims.clone(),
            connector_id: auth_request.connector_id.clone(),
            connector_data: auth_request.connector_data.clone(),
            expiry: now + server.auth_codes_valid_for,
            pkce: auth_request.pkce.clone(),
        };
        if let Err(e) = server.storage().create_auth_code(code.clone()).await {
            server.logger().error(&format!("failed to create auth code: {e}"));
            return templates::error_page(500, "Internal error", "Database error.");
        }
        params.push(("code".to_string(), code.id.clone()));
        code_value = Some(code.id);
    }

    if implicit {
        let scopes = oidc::parse_scopes(&auth_request.scopes);
        let minted = match token::mint_tokens(
            server,
            &auth_request.client_id,
            &auth_request.connector_id,
            &claims,
            &scopes,
            &auth_request.nonce,
        )
        .await
        {
            Ok(m) => m,
            Err(e) => {
                server.logger().error(&format!("failed to mint tokens: {e}"));
                return templates::error_page(500, "Internal error", "Failed to issue tokens.");
            }
        };
        if auth_request.response_types.iter().any(|rt| rt == "token") {
            params.push(("access_token".to_string(), minted.access_token));
            params.push(("token_type".to_string(), "bearer".to_string()));
            params.push(("expires_in".to_string(), minted.expires_in.to_string()));
        }
        if auth_request.response_types.iter().any(|rt| rt == "id_token") {
            params.push(("id_token".to_string(), minted.id_token));
        }
    }

    if !auth_request.state.is_empty() {
        params.push(("state".to_string(), auth_request.state.clone()));
    }

    if auth_request.redirect_uri == REDIRECT_URI_OOB {
        let code = code_value.unwrap_or_default();
        return GenericResponse::html(200, &templates::oob_page(&code));
    }

    let encoded: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect();
    let encoded = encoded.join("&");

    // Implicit responses travel in the fragment so tokens never reach the
    // client's server logs; plain code responses use the query string.
    let separator = if implicit {
        "#"
    } else if auth_request.redirect_uri.contains('?') {
        "&"
    } else {
        "?"
    };
    let location = format!("{}{}{}", auth_request.redirect_uri, separator, encoded);
    GenericResponse::redirect(303, &location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_token_round_trip() {
        let token = approval_token("key", "req");
        assert!(verify_approval_token("key", "req", &token));
        assert!(!verify_approval_token("key", "other-req", &token));
        assert!(!verify_approval_token("other-key", "req", &token));
        assert!(!verify_approval_token("key", "req", "not-base64!!"));
    }

    #[test]
    fn test_approval_tokens_differ_per_request() {
        assert_ne!(approval_token("key", "req1"), approval_token("key", "req2"));
    }
}
