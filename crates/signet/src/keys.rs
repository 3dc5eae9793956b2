// Signing-key lifecycle: generation, rotation, caching, JWKS serialization.
//
// Rotation is driven by a timestamp stored next to the keys themselves, so
// any number of replicas can run the rotation worker against shared
// storage; the optimistic key-set update makes the last writer win and the
// losers no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use signet_core::config::NowFn;
use signet_core::error::ServerError;
use signet_core::logger::Logger;
use signet_core::models::{KeySet, SigningKey, VerificationKey};
use signet_core::storage::{Storage, StorageResult};

const RSA_BITS: usize = 2048;

/// How long keys sign and how long retired keys stay verifiable.
#[derive(Debug, Clone, Copy)]
pub struct RotationStrategy {
    /// Interval between rotations.
    pub rotation_frequency: Duration,
    /// Retired verification keys are published for at least this long, so
    /// every token signed by the outgoing key stays verifiable.
    pub id_tokens_valid_for: Duration,
}

/// Generate a fresh RSA signing keypair, DER-encoded for storage.
pub fn generate_signing_key() -> Result<SigningKey, ServerError> {
    let mut rng = rand::rngs::OsRng;
    let private = RsaPrivateKey::new(&mut rng, RSA_BITS)
        .map_err(|e| ServerError::Signing(format!("generate keypair: {e}")))?;
    let public = RsaPublicKey::from(&private);

    // PKCS#1 DER, the form the JWT signer consumes directly.
    let private_der = private
        .to_pkcs1_der()
        .map_err(|e| ServerError::Signing(format!("encode private key: {e}")))?
        .as_bytes()
        .to_vec();
    let public_der = public
        .to_pkcs1_der()
        .map_err(|e| ServerError::Signing(format!("encode public key: {e}")))?
        .as_bytes()
        .to_vec();

    let kid = key_id(&public_der);
    Ok(SigningKey {
        kid,
        private_der,
        public_der,
    })
}

/// Fingerprint a public key: base64url(SHA-256(DER)). Used as the JWT `kid`.
pub fn key_id(public_der: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(public_der))
}

/// Rotate the stored key set if its `next_rotation` has elapsed.
///
/// Returns `Ok(true)` when this call performed a rotation. Key generation
/// happens before the storage update so the update closure stays pure; a
/// concurrent rotator that commits first makes this call a no-op.
pub async fn rotate(
    storage: &dyn Storage,
    strategy: &RotationStrategy,
    now: DateTime<Utc>,
    logger: &Logger,
) -> Result<bool, ServerError> {
    let current = match storage.get_key_set().await {
        Ok(ks) => ks,
        Err(e) if e.is_not_found() => KeySet::default(),
        Err(e) => return Err(e.into()),
    };
    if !due(&current, now) {
        return Ok(false);
    }

    // Expensive and fallible; on failure the current key keeps signing and
    // the next tick retries.
    let fresh = generate_signing_key()?;
    logger.info(&format!("rotating signing key, new kid={}", fresh.kid));

    let rotated = AtomicBool::new(false);
    let frequency = strategy.rotation_frequency;
    let valid_for = strategy.id_tokens_valid_for;
    storage
        .update_key_set(&|mut ks: KeySet| {
            if !due(&ks, now) {
                // Another replica got there first.
                return Ok(ks);
            }
            if let Some(outgoing) = ks.signing.take() {
                ks.verification.push(VerificationKey {
                    kid: outgoing.kid,
                    public_der: outgoing.public_der,
                    expiry: now + valid_for,
                });
            }
            ks.verification.retain(|vk| vk.expiry > now);
            ks.signing = Some(fresh.clone());
            ks.next_rotation = Some(now + frequency);
            rotated.store(true, Ordering::Relaxed);
            Ok(ks)
        })
        .await?;

    Ok(rotated.load(Ordering::Relaxed))
}

fn due(ks: &KeySet, now: DateTime<Utc>) -> bool {
    match ks.next_rotation {
        Some(next) => now >= next,
        None => true,
    }
}

/// Single-slot cache over the stored key set.
///
/// Readers load the published `Arc` without touching storage while
/// `now < next_rotation`; the slot is replaced whole, never patched. Cache
/// misses fall through to storage and do not trigger rotation.
pub struct KeyCache {
    storage: Arc<dyn Storage>,
    now: NowFn,
    slot: RwLock<Option<Arc<KeySet>>>,
}

impl KeyCache {
    pub fn new(storage: Arc<dyn Storage>, now: NowFn) -> Self {
        Self {
            storage,
            now,
            slot: RwLock::new(None),
        }
    }

    /// The current key set, from cache when still fresh.
    pub async fn key_set(&self) -> StorageResult<Arc<KeySet>> {
        let now = (self.now)();
        if let Some(cached) = self.slot.read().expect("key cache lock").clone() {
            if fresh_until(&cached, now) {
                return Ok(cached);
            }
        }

        let loaded = Arc::new(self.storage.get_key_set().await?);
        if fresh_until(&loaded, now) {
            *self.slot.write().expect("key cache lock") = Some(loaded.clone());
        }
        Ok(loaded)
    }
}

fn fresh_until(ks: &KeySet, now: DateTime<Utc>) -> bool {
    matches!(ks.next_rotation, Some(next) if now < next)
}

// ─── JWKS ───────────────────────────────────────────────────────

/// One RSA public key in JWK form (RFC 7517).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    pub kid: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Serialize a DER-encoded RSA public key into a JWK.
pub fn jwk_from_der(kid: &str, public_der: &[u8]) -> Result<Jwk, ServerError> {
    let key = RsaPublicKey::from_pkcs1_der(public_der)
        .map_err(|e| ServerError::Signing(format!("decode public key: {e}")))?;
    Ok(Jwk {
        kty: "RSA".to_string(),
        key_use: "sig".to_string(),
        alg: "RS256".to_string(),
        kid: kid.to_string(),
        n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
    })
}

/// The published key set: the active signer plus every retired key that may
/// still appear on an unexpired token.
pub fn jwks(ks: &KeySet) -> Result<JwkSet, ServerError> {
    let mut keys = Vec::with_capacity(1 + ks.verification.len());
    if let Some(signing) = &ks.signing {
        keys.push(jwk_from_der(&signing.kid, &signing.public_der)?);
    }
    for vk in &ks.verification {
        keys.push(jwk_from_der(&vk.kid, &vk.public_der)?);
    }
    Ok(JwkSet { keys })
}
