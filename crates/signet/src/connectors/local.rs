// The built-in password database connector.
//
// Wraps the storage's password table directly; it is never opened through
// a factory. Stored hashes are bcrypt, and hashes whose cost falls outside
// [4, 16] are rejected before comparison so misconfigured static
// passwords cannot be used to log in.

use std::sync::Arc;

use async_trait::async_trait;

use signet_core::connector::{
    ConnectorHandle, Identity, PasswordConnector, RefreshConnector, Scopes,
};
use signet_core::error::{ConnectorError, StorageError};
use signet_core::models::Claims;
use signet_core::storage::Storage;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 16;

/// Build the capability handle for the `local` connector type.
pub fn open(storage: Arc<dyn Storage>) -> ConnectorHandle {
    let db = Arc::new(PasswordDb { storage });
    ConnectorHandle::new()
        .with_password(db.clone())
        .with_refresh(db)
}

struct PasswordDb {
    storage: Arc<dyn Storage>,
}

/// Extract the cost field from a bcrypt hash string (`$2y$NN$...`).
fn check_cost(hash: &str) -> Result<(), ConnectorError> {
    let cost = hash
        .split('$')
        .nth(2)
        .and_then(|c| c.parse::<u32>().ok())
        .ok_or_else(|| ConnectorError::Policy("malformed bcrypt hash".to_string()))?;
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        return Err(ConnectorError::Policy(format!(
            "bcrypt cost {cost} outside allowed range [{MIN_COST}, {MAX_COST}]"
        )));
    }
    Ok(())
}

#[async_trait]
impl PasswordConnector for PasswordDb {
    fn prompt(&self) -> &str {
        "Email Address"
    }

    async fn login(
        &self,
        _scopes: &Scopes,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, ConnectorError> {
        let record = match self.storage.get_password(username).await {
            Ok(p) => p,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(ConnectorError::Backend(format!("get password: {e}"))),
        };

        check_cost(&record.hash)?;

        let matches = bcrypt::verify(password, &record.hash)
            .map_err(|e| ConnectorError::Backend(format!("verify password: {e}")))?;
        if !matches {
            return Ok(None);
        }

        Ok(Some(Identity {
            claims: Claims {
                user_id: record.user_id,
                username: record.username,
                preferred_username: String::new(),
                email: record.email,
                email_verified: true,
                groups: Vec::new(),
            },
            connector_data: None,
        }))
    }
}

#[async_trait]
impl RefreshConnector for PasswordDb {
    async fn refresh(
        &self,
        _scopes: &Scopes,
        mut identity: Identity,
    ) -> Result<Identity, ConnectorError> {
        // A deleted user invalidates the refresh token.
        let record = match self.storage.get_password(&identity.claims.email).await {
            Ok(p) => p,
            Err(StorageError::NotFound) => {
                return Err(ConnectorError::Policy("user not found".to_string()))
            }
            Err(e) => return Err(ConnectorError::Backend(format!("get password: {e}"))),
        };

        // User removed but a new user with the same email exists.
        if record.user_id != identity.claims.user_id {
            return Err(ConnectorError::Policy("user not found".to_string()));
        }

        // A changed username shows up in the refreshed token; email is the
        // effective id here, so nothing else refreshes.
        identity.claims.username = record.username;
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signet_core::models::Password;
    use signet_memory::MemoryStorage;

    async fn db_with_user(hash: &str) -> PasswordDb {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .create_password(Password {
                email: "a@b.c".into(),
                hash: hash.into(),
                username: "jane".into(),
                user_id: "u1".into(),
            })
            .await
            .unwrap();
        PasswordDb { storage }
    }

    #[tokio::test]
    async fn test_login_with_correct_password() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        let db = db_with_user(&hash).await;
        let identity = db
            .login(&Scopes::default(), "a@b.c", "hunter2")
            .await
            .unwrap()
            .expect("login should succeed");
        assert_eq!(identity.claims.user_id, "u1");
        assert!(identity.claims.email_verified);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_opaque() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        let db = db_with_user(&hash).await;
        assert!(db
            .login(&Scopes::default(), "a@b.c", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(db
            .login(&Scopes::default(), "nobody@b.c", "hunter2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cost_out_of_range_is_an_explicit_error() {
        // Cost parsing happens before verification, so a synthetic hash at
        // cost 20 never reaches bcrypt.
        let db = db_with_user("$2b$20$0123456789012345678901uHalfwayValidRemainder12345678x").await;
        let err = db
            .login(&Scopes::default(), "a@b.c", "hunter2")
            .await
            .unwrap_err();
        match err {
            ConnectorError::Policy(msg) => assert!(msg.contains("bcrypt cost 20")),
            other => panic!("expected policy error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_rejects_replaced_user() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        let db = db_with_user(&hash).await;
        let identity = Identity {
            claims: Claims {
                user_id: "someone-else".into(),
                email: "a@b.c".into(),
                ..Claims::default()
            },
            connector_data: None,
        };
        assert!(db.refresh(&Scopes::default(), identity).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_renamed_user() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        let db = db_with_user(&hash).await;
        db.storage
            .update_password("a@b.c", &|mut p| {
                p.username = "janet".into();
                Ok(p)
            })
            .await
            .unwrap();
        let identity = Identity {
            claims: Claims {
                user_id: "u1".into(),
                username: "jane".into(),
                email: "a@b.c".into(),
                ..Claims::default()
            },
            connector_data: None,
        };
        let refreshed = db.refresh(&Scopes::default(), identity).await.unwrap();
        assert_eq!(refreshed.claims.username, "janet");
    }
}
