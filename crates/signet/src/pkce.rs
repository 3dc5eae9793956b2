// PKCE (RFC 7636) challenge verification.
//
// `S256` is always accepted; `plain` only when the server opts in.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use signet_core::error::OAuthError;
use signet_core::models::Pkce;

/// Compute the S256 challenge for a verifier:
/// base64url(SHA-256(verifier)), no padding.
pub fn s256_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Check a token-request verifier against the challenge captured at the
/// authorization endpoint. Mismatches are indistinguishable from a bad
/// code.
pub fn verify(
    pkce: Option<&Pkce>,
    verifier: Option<&str>,
    allow_plain: bool,
) -> Result<(), OAuthError> {
    let Some(pkce) = pkce else {
        // No challenge was bound to the code.
        if verifier.is_some() {
            return Err(OAuthError::invalid_request(
                "No PKCE challenge was supplied at the authorization endpoint.",
            ));
        }
        return Ok(());
    };

    let Some(verifier) = verifier.filter(|v| !v.is_empty()) else {
        return Err(OAuthError::invalid_grant());
    };

    let ok = match pkce.code_challenge_method.as_str() {
        "S256" => constant_time_eq(&s256_challenge(verifier), &pkce.code_challenge),
        "plain" if allow_plain => constant_time_eq(verifier, &pkce.code_challenge),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(OAuthError::invalid_grant())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
