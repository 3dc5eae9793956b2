// Domain entities persisted by the storage layer.
//
// Every struct here is plain data: the engines in the `signet` crate hold
// the behavior, storage backends hold the bytes. Timestamps are UTC
// throughout; ids are opaque strings generated by `crate::id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered OAuth 2.0 relying party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub secret: String,
    /// Redirect URIs the client may use. A URI presented at the
    /// authorization endpoint must match one of these exactly.
    pub redirect_uris: Vec<String>,
    /// Client ids allowed to mint tokens audienced at this client
    /// (cross-client trust).
    #[serde(default)]
    pub trusted_peers: Vec<String>,
    /// Public clients (native apps) have no usable secret and get the
    /// loopback redirect allowance.
    #[serde(default)]
    pub public: bool,
    pub name: String,
    #[serde(default)]
    pub logo_url: String,
}

/// Identity attributes produced by a connector and copied into tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub preferred_username: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// An in-flight login, keyed by an unpredictable id carried through the
/// user's browser.
///
/// Created at `/auth`, updated exactly once when the connector reports a
/// successful login, deleted when exchanged for a code or expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub id: String,
    pub client_id: String,
    pub response_types: Vec<String>,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub state: String,
    /// The client asked to always show the approval prompt, overriding
    /// trusted-peer auto-approval.
    #[serde(default)]
    pub force_approval_prompt: bool,
    /// Set once the connector has verified the user.
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub claims: Option<Claims>,
    #[serde(default)]
    pub connector_id: String,
    #[serde(default)]
    pub connector_data: Option<serde_json::Value>,
    pub expiry: DateTime<Utc>,
    /// Key for authenticating the approval form POST back to this request.
    pub hmac_key: String,
    /// PKCE challenge presented at `/auth`, carried into the issued code.
    #[serde(default)]
    pub pkce: Option<Pkce>,
}

/// A one-time ticket exchangeable at `/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCode {
    pub id: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    #[serde(default)]
    pub nonce: String,
    pub redirect_uri: String,
    pub claims: Claims,
    pub connector_id: String,
    #[serde(default)]
    pub connector_data: Option<serde_json::Value>,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub pkce: Option<Pkce>,
}

/// PKCE challenge captured at `/auth` and verified at `/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pkce {
    pub code_challenge: String,
    /// `S256` or `plain`.
    pub code_challenge_method: String,
}

/// A long-lived grant. The opaque value presented by clients is
/// `"{id}.{token}"`; `token` rotates on every use and the previous value is
/// kept in `obsolete_token` for a short replay-tolerance window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: String,
    pub token: String,
    #[serde(default)]
    pub obsolete_token: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    #[serde(default)]
    pub nonce: String,
    pub claims: Claims,
    pub connector_id: String,
    #[serde(default)]
    pub connector_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl RefreshToken {
    /// The opaque wire form handed to the client.
    pub fn opaque(&self) -> String {
        format!("{}.{}", self.id, self.token)
    }

    /// Split an opaque wire value back into `(id, token)`.
    pub fn split_opaque(raw: &str) -> Option<(&str, &str)> {
        raw.split_once('.').filter(|(id, t)| !id.is_empty() && !t.is_empty())
    }
}

/// A local user credential for the built-in password connector.
/// `hash` is a bcrypt hash string; the connector enforces the cost bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Password {
    pub email: String,
    pub hash: String,
    pub username: String,
    pub user_id: String,
}

/// Stored configuration for a connector instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorRecord {
    pub id: String,
    /// Factory type name, e.g. `"local"` or `"mockCallback"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    /// Monotonic token bumped on every administrative update; the server
    /// re-opens the connector when it observes a change.
    #[serde(default)]
    pub resource_version: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// The active signing keypair, DER-encoded for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    /// Fingerprint of the public key, used as the JWT `kid`.
    pub kid: String,
    pub private_der: Vec<u8>,
    pub public_der: Vec<u8>,
}

/// A retired public key kept published until every token it signed has
/// expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    pub kid: String,
    pub public_der: Vec<u8>,
    pub expiry: DateTime<Utc>,
}

/// The single-row key state: current signer, still-valid verifiers, and the
/// moment the next rotation is due.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    #[serde(default)]
    pub signing: Option<SigningKey>,
    #[serde(default)]
    pub verification: Vec<VerificationKey>,
    #[serde(default)]
    pub next_rotation: Option<DateTime<Utc>>,
}

/// Counts returned by a garbage-collection sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcResult {
    pub auth_requests: u64,
    pub auth_codes: u64,
}

impl GcResult {
    pub fn is_empty(&self) -> bool {
        self.auth_requests == 0 && self.auth_codes == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_token_opaque_round_trip() {
        let rt = RefreshToken {
            id: "abc".into(),
            token: "xyz".into(),
            obsolete_token: String::new(),
            client_id: "client".into(),
            scopes: vec!["openid".into()],
            nonce: String::new(),
            claims: Claims::default(),
            connector_id: "local".into(),
            connector_data: None,
            created_at: Utc::now(),
            last_used: Utc::now(),
        };
        let raw = rt.opaque();
        assert_eq!(RefreshToken::split_opaque(&raw), Some(("abc", "xyz")));
    }

    #[test]
    fn test_split_opaque_rejects_malformed_values() {
        assert_eq!(RefreshToken::split_opaque("no-dot"), None);
        assert_eq!(RefreshToken::split_opaque(".token"), None);
        assert_eq!(RefreshToken::split_opaque("id."), None);
    }

    #[test]
    fn test_connector_record_type_field_name() {
        let rec = ConnectorRecord {
            id: "github".into(),
            kind: "github".into(),
            name: "GitHub".into(),
            resource_version: "1".into(),
            config: serde_json::json!({"clientID": "x"}),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["type"], "github");
    }
}
