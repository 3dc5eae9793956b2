// ID and access token construction.
//
// Both token kinds are RS256 JWTs signed by the current key; the access
// token simply carries the minimal claim set. The `sub` claim is a
// deterministic encoding of (connector id, upstream user id) so a user's
// identity survives connector re-opens and server restarts.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use signet_core::error::ServerError;
use signet_core::models::{Claims, SigningKey};

/// Scopes the server understands. Anything else is ignored unless it
/// carries one of the reserved prefixes.
pub const SCOPE_OPENID: &str = "openid";
pub const SCOPE_EMAIL: &str = "email";
pub const SCOPE_PROFILE: &str = "profile";
pub const SCOPE_GROUPS: &str = "groups";
pub const SCOPE_OFFLINE_ACCESS: &str = "offline_access";
pub const SCOPE_FEDERATED_ID: &str = "federated:id";
pub const SCOPE_AUDIENCE_PREFIX: &str = "audience:server:client_id:";

/// The view of a scope list the engines act on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScopes {
    pub openid: bool,
    pub email: bool,
    pub profile: bool,
    pub groups: bool,
    pub offline_access: bool,
    pub federated_id: bool,
    /// Client ids named by `audience:server:client_id:<id>` scopes.
    pub cross_client_audiences: Vec<String>,
}

pub fn parse_scopes(scopes: &[String]) -> ParsedScopes {
    let mut parsed = ParsedScopes::default();
    for scope in scopes {
        match scope.as_str() {
            SCOPE_OPENID => parsed.openid = true,
            SCOPE_EMAIL => parsed.email = true,
            SCOPE_PROFILE => parsed.profile = true,
            SCOPE_GROUPS => parsed.groups = true,
            SCOPE_OFFLINE_ACCESS => parsed.offline_access = true,
            SCOPE_FEDERATED_ID => parsed.federated_id = true,
            other => {
                if let Some(peer) = other.strip_prefix(SCOPE_AUDIENCE_PREFIX) {
                    if !peer.is_empty() {
                        parsed.cross_client_audiences.push(peer.to_string());
                    }
                }
                // Unknown scopes without a reserved prefix are ignored.
            }
        }
    }
    parsed
}

/// Stable subject encoding for (connector, upstream user).
#[derive(Debug, Serialize)]
struct Subject<'a> {
    user_id: &'a str,
    conn_id: &'a str,
}

/// Encode the token subject. Field order is fixed by the struct, so the
/// encoding is deterministic for a given pair.
pub fn subject(connector_id: &str, user_id: &str) -> String {
    let subject = Subject {
        user_id,
        conn_id: connector_id,
    };
    // Serializing a two-field struct cannot fail.
    let json = serde_json::to_vec(&subject).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// OIDC `at_hash`: base64url of the left half of SHA-256(access token).
pub fn access_token_hash(access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}

/// Connector provenance claim, included when the `federated:id` scope was
/// requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FederatedClaims {
    pub connector_id: String,
    pub user_id: String,
}

/// JWT payload for both ID tokens and access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    /// A single string for one audience, an array otherwise.
    pub aud: serde_json::Value,
    pub exp: i64,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federated_claims: Option<FederatedClaims>,
}

/// Everything needed to mint one ID token.
pub struct IdTokenInput<'a> {
    pub issuer: &'a str,
    pub client_id: &'a str,
    pub connector_id: &'a str,
    pub claims: &'a Claims,
    pub scopes: &'a ParsedScopes,
    pub nonce: &'a str,
    pub access_token: Option<&'a str>,
    /// Cross-client audiences, already validated against trusted peers.
    pub audiences: &'a [String],
    pub issued_at: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

/// Build the ID token claim set.
pub fn id_token_claims(input: &IdTokenInput<'_>) -> TokenClaims {
    let (aud, azp) = audience(input.client_id, input.audiences);
    TokenClaims {
        iss: input.issuer.to_string(),
        sub: subject(input.connector_id, &input.claims.user_id),
        aud,
        exp: input.expiry.timestamp(),
        iat: input.issued_at.timestamp(),
        auth_time: Some(input.issued_at.timestamp()),
        azp,
        nonce: none_if_empty(input.nonce),
        at_hash: input.access_token.map(access_token_hash),
        email: input.scopes.email.then(|| input.claims.email.clone()),
        email_verified: input.scopes.email.then_some(input.claims.email_verified),
        name: input.scopes.profile.then(|| input.claims.username.clone()),
        preferred_username: (input.scopes.profile
            && !input.claims.preferred_username.is_empty())
        .then(|| input.claims.preferred_username.clone()),
        groups: input.scopes.groups.then(|| input.claims.groups.clone()),
        federated_claims: input.scopes.federated_id.then(|| FederatedClaims {
            connector_id: input.connector_id.to_string(),
            user_id: input.claims.user_id.clone(),
        }),
    }
}

/// Build the minimal access-token claim set.
pub fn access_token_claims(
    issuer: &str,
    client_id: &str,
    connector_id: &str,
    claims: &Claims,
    issued_at: DateTime<Utc>,
    expiry: DateTime<Utc>,
) -> TokenClaims {
    TokenClaims {
        iss: issuer.to_string(),
        sub: subject(connector_id, &claims.user_id),
        aud: serde_json::Value::String(client_id.to_string()),
        exp: expiry.timestamp(),
        iat: issued_at.timestamp(),
        auth_time: None,
        azp: None,
        nonce: None,
        at_hash: None,
        email: None,
        email_verified: None,
        name: None,
        preferred_username: None,
        groups: None,
        federated_claims: None,
    }
}

/// When cross-client audiences are present the requesting client moves to
/// `azp` and the audience becomes the full list.
fn audience(client_id: &str, extra: &[String]) -> (serde_json::Value, Option<String>) {
    if extra.is_empty() {
        return (serde_json::Value::String(client_id.to_string()), None);
    }
    let mut auds: Vec<serde_json::Value> = extra
        .iter()
        .map(|a| serde_json::Value::String(a.clone()))
        .collect();
    if !extra.iter().any(|a| a == client_id) {
        auds.push(serde_json::Value::String(client_id.to_string()));
    }
    (
        serde_json::Value::Array(auds),
        Some(client_id.to_string()),
    )
}

fn none_if_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Sign a claim set with the given key. The header `kid` lets verifiers
/// pick the right key out of the JWKS.
pub fn sign(claims: &TokenClaims, key: &SigningKey) -> Result<String, ServerError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.kid.clone());
    let encoding_key = EncodingKey::from_rsa_der(&key.private_der);
    jsonwebtoken::encode(&header, claims, &encoding_key)
        .map_err(|e| ServerError::Signing(format!("sign token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_is_deterministic_and_distinct() {
        assert_eq!(subject("mock", "u1"), subject("mock", "u1"));
        assert_ne!(subject("mock", "u1"), subject("mock", "u2"));
        assert_ne!(subject("mock", "u1"), subject("local", "u1"));
    }

    #[test]
    fn test_parse_scopes_reserved_prefixes() {
        let parsed = parse_scopes(&[
            "openid".into(),
            "email".into(),
            "offline_access".into(),
            "audience:server:client_id:other-app".into(),
            "federated:id".into(),
            "something-unknown".into(),
        ]);
        assert!(parsed.openid);
        assert!(parsed.email);
        assert!(parsed.offline_access);
        assert!(parsed.federated_id);
        assert_eq!(parsed.cross_client_audiences, vec!["other-app"]);
        assert!(!parsed.groups);
    }

    #[test]
    fn test_single_audience_is_a_string() {
        let (aud, azp) = audience("example-app", &[]);
        assert_eq!(aud, serde_json::json!("example-app"));
        assert!(azp.is_none());
    }

    #[test]
    fn test_cross_client_audience_sets_azp() {
        let (aud, azp) = audience("example-app", &["other-app".to_string()]);
        assert_eq!(aud, serde_json::json!(["other-app", "example-app"]));
        assert_eq!(azp.as_deref(), Some("example-app"));
    }

    #[test]
    fn test_at_hash_is_half_a_sha256() {
        let hash = access_token_hash("token");
        let decoded = URL_SAFE_NO_PAD.decode(hash).unwrap();
        assert_eq!(decoded.len(), 16);
    }

    #[test]
    fn test_scoped_claims_are_conditional() {
        let claims = Claims {
            user_id: "u1".into(),
            username: "Jane Doe".into(),
            preferred_username: "jane".into(),
            email: "a@b.c".into(),
            email_verified: true,
            groups: vec!["admins".into()],
        };
        let scopes = parse_scopes(&["openid".into(), "email".into()]);
        let input = IdTokenInput {
            issuer: "https://signet.example.com",
            client_id: "example-app",
            connector_id: "mock",
            claims: &claims,
            scopes: &scopes,
            nonce: "",
            access_token: None,
            audiences: &[],
            issued_at: Utc::now(),
            expiry: Utc::now() + chrono::Duration::hours(24),
        };
        let token = id_token_claims(&input);
        assert_eq!(token.email.as_deref(), Some("a@b.c"));
        assert_eq!(token.email_verified, Some(true));
        assert!(token.name.is_none());
        assert!(token.groups.is_none());
        assert!(token.nonce.is_none());
    }
}
