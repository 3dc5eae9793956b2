// The server context: configuration made concrete, the connector registry,
// and the key machinery every handler shares.
//
// Built once at startup and shared as `Arc<Server>`. The connector map is
// the only mutable state outside storage; its mutex is held strictly
// around map access, never across a storage or connector await.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use url::Url;

use signet_core::config::{NowFn, ServerConfig, WebConfig};
use signet_core::connector::ConnectorHandle;
use signet_core::error::{ConnectorError, ServerError, StorageError};
use signet_core::logger::Logger;
use signet_core::models::{ConnectorRecord, KeySet};
use signet_core::storage::Storage;

use crate::connectors::{local, mock};
use crate::keys::{KeyCache, RotationStrategy};
use crate::routes::discovery;

/// Connector type handled by the server itself rather than a factory.
pub const LOCAL_CONNECTOR: &str = "local";

/// Opens a connector instance from its stored JSON configuration.
pub type ConnectorFactory =
    fn(id: &str, config: &serde_json::Value, logger: Logger) -> Result<ConnectorHandle, ConnectorError>;

/// Resolve a connector factory by its type name. The table is fixed at
/// compile time; deployments register additional upstreams by extending it.
pub fn factory_for(kind: &str) -> Option<ConnectorFactory> {
    match kind {
        "mockCallback" => Some(mock::open_callback),
        "mockPassword" => Some(mock::open_password),
        _ => None,
    }
}

/// A live connector plus the resource version it was opened from.
#[derive(Clone)]
pub struct RegisteredConnector {
    pub resource_version: String,
    pub name: String,
    pub handle: ConnectorHandle,
}

/// The top-level server object.
pub struct Server {
    issuer: Url,
    storage: Arc<dyn Storage>,
    key_cache: KeyCache,
    connectors: Mutex<HashMap<String, RegisteredConnector>>,
    supported_response_types: HashSet<String>,
    pub(crate) skip_approval: bool,
    pub(crate) password_connector: Option<String>,
    pub(crate) allow_plain_pkce: bool,
    pub(crate) id_tokens_valid_for: Duration,
    pub(crate) auth_requests_valid_for: Duration,
    pub(crate) auth_codes_valid_for: Duration,
    pub(crate) refresh_token_reuse_window: Duration,
    pub(crate) rotation_strategy: RotationStrategy,
    pub(crate) gc_frequency: Duration,
    pub(crate) allowed_origins: Vec<String>,
    pub(crate) web: WebConfig,
    pub(crate) discovery: serde_json::Value,
    request_counts: Mutex<HashMap<String, u64>>,
    now: NowFn,
    logger: Logger,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("issuer", &self.issuer).finish_non_exhaustive()
    }
}

impl Server {
    /// Construct a server from its configuration, opening every connector
    /// currently in storage.
    pub async fn new(
        config: ServerConfig,
        storage: Arc<dyn Storage>,
        logger: Logger,
    ) -> Result<Arc<Self>, ServerError> {
        let issuer = Url::parse(&config.issuer)
            .map_err(|e| ServerError::Config(format!("can't parse issuer URL: {e}")))?;

        let mut supported = HashSet::new();
        let response_types = if config.supported_response_types.is_empty() {
            vec!["code".to_string()]
        } else {
            config.supported_response_types.clone()
        };
        for rt in &response_types {
            match rt.as_str() {
                "code" | "id_token" | "token" => {
                    supported.insert(rt.clone());
                }
                other => {
                    return Err(ServerError::Config(format!(
                        "unsupported response_type {other:?}"
                    )))
                }
            }
        }

        let now = config.clock();
        let mut web = config.web.clone();
        if web.logo_url.is_empty() {
            web.logo_url = format!("{}/theme/logo.png", config.issuer.trim_end_matches('/'));
        }

        let discovery = discovery::document(
            &config.issuer,
            &response_types,
            config.password_connector.is_some(),
            config.allow_plain_pkce,
        );

        let server = Arc::new(Self {
            issuer,
            storage: storage.clone(),
            key_cache: KeyCache::new(storage.clone(), now.clone()),
            connectors: Mutex::new(HashMap::new()),
            supported_response_types: supported,
            skip_approval: config.skip_approval_screen,
            password_connector: config.password_connector.clone(),
            allow_plain_pkce: config.allow_plain_pkce,
            id_tokens_valid_for: config.id_tokens_valid_for,
            auth_requests_valid_for: config.auth_requests_valid_for,
            auth_codes_valid_for: config.auth_codes_valid_for,
            refresh_token_reuse_window: config.refresh_token_reuse_window,
            rotation_strategy: RotationStrategy {
                rotation_frequency: config.rotate_keys_after,
                id_tokens_valid_for: config.id_tokens_valid_for,
            },
            gc_frequency: config.gc_frequency,
            allowed_origins: config.allowed_origins.clone(),
            web,
            discovery,
            request_counts: Mutex::new(HashMap::new()),
            now,
            logger,
        });

        let records = storage.list_connectors().await?;
        if records.is_empty() {
            return Err(ServerError::Config("no connectors specified".to_string()));
        }
        for record in records {
            server.open_connector(&record)?;
        }

        Ok(server)
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now)()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn issuer(&self) -> &str {
        self.issuer.as_str().trim_end_matches('/')
    }

    pub fn supports_response_type(&self, rt: &str) -> bool {
        self.supported_response_types.contains(rt)
    }

    /// The issuer's path joined with `path`, for route matching.
    pub fn abs_path(&self, path: &str) -> String {
        let base = self.issuer.path().trim_end_matches('/');
        format!("{base}{path}")
    }

    /// A full URL under the issuer, for redirects handed to browsers.
    pub fn abs_url(&self, path: &str) -> String {
        let mut url = self.issuer.clone();
        url.set_path(&self.abs_path(path));
        url.set_query(None);
        url.to_string()
    }

    /// Strip the issuer path prefix from a request path. `None` when the
    /// request is outside the issuer's subtree.
    pub fn route_path<'a>(&self, request_path: &'a str) -> Option<&'a str> {
        let base = self.issuer.path().trim_end_matches('/');
        if base.is_empty() {
            return Some(request_path);
        }
        match request_path.strip_prefix(base) {
            Some("") => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }

    // ─── Keys ───────────────────────────────────────────────────

    /// The current key set, via the single-slot cache.
    pub async fn key_set(&self) -> Result<Arc<KeySet>, StorageError> {
        self.key_cache.key_set().await
    }

    /// Rotate the signing key if the schedule says so. Exposed for the
    /// rotation worker and for tests driving an injected clock.
    pub async fn rotate_keys(&self) -> Result<bool, ServerError> {
        crate::keys::rotate(
            self.storage.as_ref(),
            &self.rotation_strategy,
            self.now(),
            &self.logger,
        )
        .await
    }

    // ─── Connector registry ─────────────────────────────────────

    /// Open (or re-open) a connector from its stored record and publish it
    /// into the registry.
    pub fn open_connector(
        &self,
        record: &ConnectorRecord,
    ) -> Result<RegisteredConnector, ServerError> {
        let handle = if record.kind == LOCAL_CONNECTOR {
            local::open(self.storage.clone())
        } else {
            let factory = factory_for(&record.kind).ok_or_else(|| {
                ConnectorError::InvalidConfig(format!("unknown connector type {:?}", record.kind))
            })?;
            factory(
                &record.id,
                &record.config,
                self.logger.with_field("connector", &record.name),
            )?
        };

        let registered = RegisteredConnector {
            resource_version: record.resource_version.clone(),
            name: record.name.clone(),
            handle,
        };
        self.connectors
            .lock()
            .expect("connector registry lock")
            .insert(record.id.clone(), registered.clone());
        Ok(registered)
    }

    /// Resolve a connector id to a live instance, re-opening it when the
    /// stored record's resource version has moved.
    pub async fn connector(&self, id: &str) -> Result<RegisteredConnector, ServerError> {
        let record = self.storage.get_connector(id).await?;

        let cached = {
            let registry = self.connectors.lock().expect("connector registry lock");
            registry.get(id).cloned()
        };
        match cached {
            Some(conn) if conn.resource_version == record.resource_version => Ok(conn),
            _ => self.open_connector(&record),
        }
    }

    // ─── Request accounting ─────────────────────────────────────

    /// Count one dispatched request under its handler group. Path suffixes
    /// (connector ids, asset names) are collapsed so the map stays small.
    pub(crate) fn count_request(&self, route: &str) {
        let handler = if route.starts_with("/auth/") {
            "/auth/{connector}"
        } else if route.starts_with("/callback/") {
            "/callback/{connector}"
        } else if route.starts_with("/static/") {
            "/static"
        } else if route.starts_with("/theme/") {
            "/theme"
        } else {
            route
        };
        let mut counts = self.request_counts.lock().expect("request counts lock");
        *counts.entry(handler.to_string()).or_insert(0) += 1;
    }

    /// Per-handler request counts, for embedders exporting metrics.
    pub fn request_counts(&self) -> HashMap<String, u64> {
        self.request_counts
            .lock()
            .expect("request counts lock")
            .clone()
    }

    /// Snapshot of the registry for the connector-selection page.
    pub fn connector_list(&self) -> Vec<(String, String)> {
        let registry = self.connectors.lock().expect("connector registry lock");
        let mut list: Vec<(String, String)> = registry
            .iter()
            .map(|(id, c)| (id.clone(), c.name.clone()))
            .collect();
        list.sort();
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signet_memory::MemoryStorage;

    async fn storage_with_mock() -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .create_connector(ConnectorRecord {
                id: "mock".into(),
                kind: "mockCallback".into(),
                name: "Mock".into(),
                resource_version: "1".into(),
                config: serde_json::Value::Null,
            })
            .await
            .unwrap();
        storage
    }

    fn config() -> ServerConfig {
        ServerConfig {
            issuer: "https://signet.example.com/idp".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_rejects_bad_response_types() {
        let storage = storage_with_mock().await;
        let cfg = ServerConfig {
            supported_response_types: vec!["bogus".into()],
            ..config()
        };
        let err = Server::new(cfg, storage, Logger::discard()).await.unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[tokio::test]
    async fn test_new_requires_a_connector() {
        let storage = Arc::new(MemoryStorage::new());
        let err = Server::new(config(), storage, Logger::discard())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[tokio::test]
    async fn test_route_path_requires_issuer_prefix() {
        let storage = storage_with_mock().await;
        let server = Server::new(config(), storage, Logger::discard())
            .await
            .unwrap();
        assert_eq!(server.route_path("/idp/auth"), Some("/auth"));
        assert_eq!(server.route_path("/idp"), Some("/"));
        assert_eq!(server.route_path("/other/auth"), None);
        assert_eq!(server.abs_url("/callback"), "https://signet.example.com/idp/callback");
    }

    #[tokio::test]
    async fn test_connector_reopens_on_resource_version_change() {
        let storage = storage_with_mock().await;
        let server = Server::new(config(), storage.clone(), Logger::discard())
            .await
            .unwrap();

        let first = server.connector("mock").await.unwrap();
        let again = server.connector("mock").await.unwrap();
        assert!(Arc::ptr_eq(
            first.handle.callback.as_ref().unwrap(),
            again.handle.callback.as_ref().unwrap()
        ));

        storage
            .update_connector("mock", &|mut c| {
                c.resource_version = "2".into();
                Ok(c)
            })
            .await
            .unwrap();

        let reopened = server.connector("mock").await.unwrap();
        assert_eq!(reopened.resource_version, "2");
        assert!(!Arc::ptr_eq(
            first.handle.callback.as_ref().unwrap(),
            reopened.handle.callback.as_ref().unwrap()
        ));
    }

    #[tokio::test]
    async fn test_unknown_connector_type_fails_to_open() {
        let storage = storage_with_mock().await;
        let server = Server::new(config(), storage.clone(), Logger::discard())
            .await
            .unwrap();
        storage
            .create_connector(ConnectorRecord {
                id: "ghost".into(),
                kind: "no-such-type".into(),
                name: "Ghost".into(),
                resource_version: "1".into(),
                config: serde_json::Value::Null,
            })
            .await
            .unwrap();
        assert!(server.connector("ghost").await.is_err());
        // The broken record does not disturb working connectors.
        assert!(server.connector("mock").await.is_ok());
    }
}
