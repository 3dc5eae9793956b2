// OIDC discovery document and JWKS.
//
// The discovery document never changes at runtime, so it is built once at
// server construction. The JWKS response advertises how long clients may
// cache it: exactly until the next scheduled rotation.

use serde_json::json;

use crate::handler::GenericResponse;
use crate::keys;
use crate::server::Server;

/// Build the discovery document for the given configuration.
pub fn document(
    issuer: &str,
    response_types: &[String],
    password_grant: bool,
    allow_plain_pkce: bool,
) -> serde_json::Value {
    let issuer = issuer.trim_end_matches('/');
    let mut grant_types = vec!["authorization_code", "refresh_token"];
    if password_grant {
        grant_types.push("password");
    }
    let mut challenge_methods = vec!["S256"];
    if allow_plain_pkce {
        challenge_methods.push("plain");
    }
    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/auth"),
        "token_endpoint": format!("{issuer}/token"),
        "jwks_uri": format!("{issuer}/keys"),
        "response_types_supported": response_types,
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": ["RS256"],
        "code_challenge_methods_supported": challenge_methods,
        "scopes_supported": [
            "openid", "email", "profile", "groups", "offline_access",
        ],
        "token_endpoint_auth_methods_supported": [
            "client_secret_basic", "client_secret_post",
        ],
        "grant_types_supported": grant_types,
        "claims_supported": [
            "aud", "email", "email_verified", "exp", "iat", "iss",
            "name", "sub",
        ],
    })
}

pub fn handle_discovery(server: &Server) -> GenericResponse {
    GenericResponse::json(200, &server.discovery)
}

pub async fn handle_jwks(server: &Server) -> GenericResponse {
    let key_set = match server.key_set().await {
        Ok(ks) => ks,
        Err(e) => {
            server.logger().error(&format!("failed to get keys: {e}"));
            return GenericResponse::json(
                500,
                &json!({"error": "server_error", "error_description": "Internal server error."}),
            );
        }
    };

    let jwks = match keys::jwks(&key_set) {
        Ok(set) => set,
        Err(e) => {
            server.logger().error(&format!("failed to serialize keys: {e}"));
            return GenericResponse::json(
                500,
                &json!({"error": "server_error", "error_description": "Internal server error."}),
            );
        }
    };

    let mut response = GenericResponse::json(200, &jwks);
    if let Some(next) = key_set.next_rotation {
        let max_age = (next - server.now()).num_seconds().max(0);
        response.set_header(
            "cache-control",
            &format!("max-age={max_age}, must-revalidate"),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_advertises_endpoints() {
        let doc = document(
            "https://signet.example.com/",
            &["code".to_string()],
            false,
            false,
        );
        assert_eq!(doc["issuer"], "https://signet.example.com");
        assert_eq!(
            doc["authorization_endpoint"],
            "https://signet.example.com/auth"
        );
        assert_eq!(doc["jwks_uri"], "https://signet.example.com/keys");
        assert_eq!(doc["subject_types_supported"], json!(["public"]));
        assert_eq!(doc["id_token_signing_alg_values_supported"], json!(["RS256"]));
        assert!(!doc["grant_types_supported"]
            .as_array()
            .unwrap()
            .contains(&json!("password")));
    }

    #[test]
    fn test_document_password_grant_toggle() {
        let doc = document("https://x", &["code".to_string()], true, true);
        assert!(doc["grant_types_supported"]
            .as_array()
            .unwrap()
            .contains(&json!("password")));
        assert!(doc["code_challenge_methods_supported"]
            .as_array()
            .unwrap()
            .contains(&json!("plain")));
    }
}
