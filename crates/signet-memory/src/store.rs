// In-memory storage — HashMaps behind a single RwLock.
//
// Mutations take the write lock, which serializes them, so the optimistic
// update closures are applied exactly once here; the retry path exists for
// backends whose compare-and-swap can actually lose a race. Password
// records are keyed by lowercased email.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use signet_core::error::StorageError;
use signet_core::models::{
    AuthCode, AuthRequest, Client, ConnectorRecord, GcResult, KeySet, Password, RefreshToken,
};
use signet_core::storage::{Storage, StorageResult, Updater};

#[derive(Default)]
struct Tables {
    closed: bool,
    clients: HashMap<String, Client>,
    auth_requests: HashMap<String, AuthRequest>,
    auth_codes: HashMap<String, AuthCode>,
    refresh_tokens: HashMap<String, RefreshToken>,
    passwords: HashMap<String, Password>,
    connectors: HashMap<String, ConnectorRecord>,
    key_set: Option<KeySet>,
}

impl Tables {
    fn check_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

/// In-memory [`Storage`] implementation.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored auth requests, for tests.
    pub async fn auth_request_count(&self) -> usize {
        self.tables.read().await.auth_requests.len()
    }

    /// Number of stored auth codes, for tests.
    pub async fn auth_code_count(&self) -> usize {
        self.tables.read().await.auth_codes.len()
    }
}

fn create<T>(map: &mut HashMap<String, T>, key: String, value: T) -> StorageResult<()> {
    if map.contains_key(&key) {
        return Err(StorageError::AlreadyExists);
    }
    map.insert(key, value);
    Ok(())
}

fn get<T: Clone>(map: &HashMap<String, T>, key: &str) -> StorageResult<T> {
    map.get(key).cloned().ok_or(StorageError::NotFound)
}

fn update<T: Clone>(
    map: &mut HashMap<String, T>,
    key: &str,
    updater: Updater<'_, T>,
) -> StorageResult<()> {
    let current = map.get(key).cloned().ok_or(StorageError::NotFound)?;
    let next = updater(current)?;
    map.insert(key.to_string(), next);
    Ok(())
}

fn delete<T>(map: &mut HashMap<String, T>, key: &str) -> StorageResult<()> {
    map.remove(key).map(|_| ()).ok_or(StorageError::NotFound)
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_client(&self, client: Client) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        create(&mut t.clients, client.id.clone(), client)
    }

    async fn get_client(&self, id: &str) -> StorageResult<Client> {
        let t = self.tables.read().await;
        t.check_open()?;
        get(&t.clients, id)
    }

    async fn update_client(&self, id: &str, updater: Updater<'_, Client>) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        update(&mut t.clients, id, updater)
    }

    async fn delete_client(&self, id: &str) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        delete(&mut t.clients, id)
    }

    async fn list_clients(&self) -> StorageResult<Vec<Client>> {
        let t = self.tables.read().await;
        t.check_open()?;
        Ok(t.clients.values().cloned().collect())
    }

    async fn create_auth_request(&self, request: AuthRequest) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        create(&mut t.auth_requests, request.id.clone(), request)
    }

    async fn get_auth_request(&self, id: &str) -> StorageResult<AuthRequest> {
        let t = self.tables.read().await;
        t.check_open()?;
        get(&t.auth_requests, id)
    }

    async fn update_auth_request(
        &self,
        id: &str,
        updater: Updater<'_, AuthRequest>,
    ) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        update(&mut t.auth_requests, id, updater)
    }

    async fn delete_auth_request(&self, id: &str) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        delete(&mut t.auth_requests, id)
    }

    async fn create_auth_code(&self, code: AuthCode) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        create(&mut t.auth_codes, code.id.clone(), code)
    }

    async fn get_auth_code(&self, id: &str) -> StorageResult<AuthCode> {
        let t = self.tables.read().await;
        t.check_open()?;
        get(&t.auth_codes, id)
    }

    async fn delete_auth_code(&self, id: &str) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        delete(&mut t.auth_codes, id)
    }

    async fn create_refresh_token(&self, token: RefreshToken) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        create(&mut t.refresh_tokens, token.id.clone(), token)
    }

    async fn get_refresh_token(&self, id: &str) -> StorageResult<RefreshToken> {
        let t = self.tables.read().await;
        t.check_open()?;
        get(&t.refresh_tokens, id)
    }

    async fn update_refresh_token(
        &self,
        id: &str,
        updater: Updater<'_, RefreshToken>,
    ) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        update(&mut t.refresh_tokens, id, updater)
    }

    async fn delete_refresh_token(&self, id: &str) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        delete(&mut t.refresh_tokens, id)
    }

    async fn create_password(&self, password: Password) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        let key = password.email.to_lowercase();
        create(&mut t.passwords, key, password)
    }

    async fn get_password(&self, email: &str) -> StorageResult<Password> {
        let t = self.tables.read().await;
        t.check_open()?;
        get(&t.passwords, &email.to_lowercase())
    }

    async fn update_password(
        &self,
        email: &str,
        updater: Updater<'_, Password>,
    ) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        update(&mut t.passwords, &email.to_lowercase(), updater)
    }

    async fn delete_password(&self, email: &str) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        delete(&mut t.passwords, &email.to_lowercase())
    }

    async fn list_passwords(&self) -> StorageResult<Vec<Password>> {
        let t = self.tables.read().await;
        t.check_open()?;
        Ok(t.passwords.values().cloned().collect())
    }

    async fn create_connector(&self, connector: ConnectorRecord) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        create(&mut t.connectors, connector.id.clone(), connector)
    }

    async fn get_connector(&self, id: &str) -> StorageResult<ConnectorRecord> {
        let t = self.tables.read().await;
        t.check_open()?;
        get(&t.connectors, id)
    }

    async fn update_connector(
        &self,
        id: &str,
        updater: Updater<'_, ConnectorRecord>,
    ) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        update(&mut t.connectors, id, updater)
    }

    async fn delete_connector(&self, id: &str) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        delete(&mut t.connectors, id)
    }

    async fn list_connectors(&self) -> StorageResult<Vec<ConnectorRecord>> {
        let t = self.tables.read().await;
        t.check_open()?;
        Ok(t.connectors.values().cloned().collect())
    }

    async fn get_key_set(&self) -> StorageResult<KeySet> {
        let t = self.tables.read().await;
        t.check_open()?;
        t.key_set.clone().ok_or(StorageError::NotFound)
    }

    async fn update_key_set(&self, updater: Updater<'_, KeySet>) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        let current = t.key_set.clone().unwrap_or_default();
        t.key_set = Some(updater(current)?);
        Ok(())
    }

    async fn garbage_collect(&self, now: DateTime<Utc>) -> StorageResult<GcResult> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        let requests_before = t.auth_requests.len();
        t.auth_requests.retain(|_, r| r.expiry >= now);
        let codes_before = t.auth_codes.len();
        t.auth_codes.retain(|_, c| c.expiry >= now);
        Ok(GcResult {
            auth_requests: (requests_before - t.auth_requests.len()) as u64,
            auth_codes: (codes_before - t.auth_codes.len()) as u64,
        })
    }

    async fn close(&self) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        t.check_open()?;
        *t = Tables {
            closed: true,
            ..Tables::default()
        };
        Ok(())
    }
}
