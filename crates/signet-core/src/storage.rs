// Storage contract — the persistence seam every backend implements.
//
// All read-modify-write cycles on mutable entities go through the
// `update_*` operations: the caller supplies a pure closure that maps the
// current value to the new one, and the backend applies it atomically,
// re-invoking the closure if the record changed underneath it. Backends
// with compare-and-swap semantics retry a bounded number of times and then
// fail with `StorageError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::models::{
    AuthCode, AuthRequest, Client, ConnectorRecord, GcResult, KeySet, Password, RefreshToken,
};

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Update closure for optimistic mutations. May be invoked more than once,
/// so it must be pure over its input.
pub type Updater<'a, T> = &'a (dyn Fn(T) -> StorageResult<T> + Send + Sync);

/// Durable, transactional CRUD for all domain entities.
///
/// Ids are caller-chosen opaque strings; implementations must not interpret
/// them beyond equality. Creation fails with `AlreadyExists` on key
/// collision, lookups fail with `NotFound` when absent.
#[async_trait]
pub trait Storage: Send + Sync {
    // ─── Clients ────────────────────────────────────────────────

    async fn create_client(&self, client: Client) -> StorageResult<()>;
    async fn get_client(&self, id: &str) -> StorageResult<Client>;
    async fn update_client(&self, id: &str, update: Updater<'_, Client>) -> StorageResult<()>;
    async fn delete_client(&self, id: &str) -> StorageResult<()>;
    async fn list_clients(&self) -> StorageResult<Vec<Client>>;

    // ─── Auth requests ──────────────────────────────────────────

    async fn create_auth_request(&self, request: AuthRequest) -> StorageResult<()>;
    async fn get_auth_request(&self, id: &str) -> StorageResult<AuthRequest>;
    async fn update_auth_request(
        &self,
        id: &str,
        update: Updater<'_, AuthRequest>,
    ) -> StorageResult<()>;
    async fn delete_auth_request(&self, id: &str) -> StorageResult<()>;

    // ─── Auth codes ─────────────────────────────────────────────

    async fn create_auth_code(&self, code: AuthCode) -> StorageResult<()>;
    async fn get_auth_code(&self, id: &str) -> StorageResult<AuthCode>;
    /// Deleting the code is the redemption point: exactly one caller
    /// observes `Ok`, every other concurrent redeemer gets `NotFound`.
    async fn delete_auth_code(&self, id: &str) -> StorageResult<()>;

    // ─── Refresh tokens ─────────────────────────────────────────

    async fn create_refresh_token(&self, token: RefreshToken) -> StorageResult<()>;
    async fn get_refresh_token(&self, id: &str) -> StorageResult<RefreshToken>;
    async fn update_refresh_token(
        &self,
        id: &str,
        update: Updater<'_, RefreshToken>,
    ) -> StorageResult<()>;
    async fn delete_refresh_token(&self, id: &str) -> StorageResult<()>;

    // ─── Passwords ──────────────────────────────────────────────
    //
    // Email addresses are compared case-insensitively.

    async fn create_password(&self, password: Password) -> StorageResult<()>;
    async fn get_password(&self, email: &str) -> StorageResult<Password>;
    async fn update_password(
        &self,
        email: &str,
        update: Updater<'_, Password>,
    ) -> StorageResult<()>;
    async fn delete_password(&self, email: &str) -> StorageResult<()>;
    async fn list_passwords(&self) -> StorageResult<Vec<Password>>;

    // ─── Connectors ─────────────────────────────────────────────

    async fn create_connector(&self, connector: ConnectorRecord) -> StorageResult<()>;
    async fn get_connector(&self, id: &str) -> StorageResult<ConnectorRecord>;
    async fn update_connector(
        &self,
        id: &str,
        update: Updater<'_, ConnectorRecord>,
    ) -> StorageResult<()>;
    async fn delete_connector(&self, id: &str) -> StorageResult<()>;
    async fn list_connectors(&self) -> StorageResult<Vec<ConnectorRecord>>;

    // ─── Keys ───────────────────────────────────────────────────

    /// Fetch the single key-set row. `NotFound` until the first rotation
    /// has run.
    async fn get_key_set(&self) -> StorageResult<KeySet>;

    /// Atomically swap the key set. The closure receives the current value
    /// (or the default if none has been written yet), so first-time
    /// initialization and rotation share one path.
    async fn update_key_set(&self, update: Updater<'_, KeySet>) -> StorageResult<()>;

    // ─── Maintenance ────────────────────────────────────────────

    /// Remove every auth request and auth code with `expiry < now`.
    /// Idempotent; safe to run concurrently on multiple replicas.
    async fn garbage_collect(&self, now: DateTime<Utc>) -> StorageResult<GcResult>;

    /// Release all resources. Every later call fails with `Closed`.
    async fn close(&self) -> StorageResult<()>;
}
