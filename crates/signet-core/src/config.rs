// Server configuration.
//
// One struct with defaults for every knob; construction-time validation
// lives in the `signet` crate's server constructor. The clock is
// injectable so tests can drive rotation and expiry deterministically.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

/// Injectable clock. Defaults to `Utc::now`.
pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Configuration for a signet server.
///
/// Multiple replicas sharing one storage are expected to be configured
/// identically.
#[derive(Clone)]
pub struct ServerConfig {
    /// Public issuer URL. All endpoint paths are joined onto its path.
    pub issuer: String,

    /// Response types the server will accept at `/auth`. Valid entries are
    /// `"code"`, `"id_token"` and `"token"`; defaults to `["code"]`.
    pub supported_response_types: Vec<String>,

    /// Origins allowed CORS access to the discovery, keys and token
    /// endpoints. Empty disables CORS; `"*"` allows any origin.
    pub allowed_origins: Vec<String>,

    /// Skip the consent screen; logging in implies approval.
    pub skip_approval_screen: bool,

    /// Connector id used for the resource-owner password grant. The grant
    /// is disabled when unset.
    pub password_connector: Option<String>,

    /// Accept the `plain` PKCE challenge method. `S256` is always accepted.
    pub allow_plain_pkce: bool,

    pub rotate_keys_after: Duration,
    pub id_tokens_valid_for: Duration,
    pub auth_requests_valid_for: Duration,
    pub auth_codes_valid_for: Duration,
    pub gc_frequency: Duration,

    /// Replay tolerance for an already-rotated refresh token; outside this
    /// window a replay revokes the whole token family.
    pub refresh_token_reuse_window: Duration,

    /// Clock override for tests.
    pub now: Option<NowFn>,

    pub web: WebConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            supported_response_types: vec!["code".to_string()],
            allowed_origins: Vec::new(),
            skip_approval_screen: false,
            password_connector: None,
            allow_plain_pkce: false,
            rotate_keys_after: Duration::hours(6),
            id_tokens_valid_for: Duration::hours(24),
            auth_requests_valid_for: Duration::hours(24),
            auth_codes_valid_for: Duration::minutes(10),
            gc_frequency: Duration::minutes(5),
            refresh_token_reuse_window: Duration::seconds(30),
            now: None,
            web: WebConfig::default(),
        }
    }
}

impl ServerConfig {
    /// The effective clock: the injected override or `Utc::now`.
    pub fn clock(&self) -> NowFn {
        self.now.clone().unwrap_or_else(|| Arc::new(Utc::now))
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("issuer", &self.issuer)
            .field("supported_response_types", &self.supported_response_types)
            .field("allowed_origins", &self.allowed_origins)
            .field("skip_approval_screen", &self.skip_approval_screen)
            .field("password_connector", &self.password_connector)
            .field("allow_plain_pkce", &self.allow_plain_pkce)
            .field("rotate_keys_after", &self.rotate_keys_after)
            .field("id_tokens_valid_for", &self.id_tokens_valid_for)
            .field("gc_frequency", &self.gc_frequency)
            .field("now", &self.now.as_ref().map(|_| "<injected>"))
            .field("web", &self.web)
            .finish()
    }
}

/// Frontend asset configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Directory containing `static/` and `themes/<theme>/`.
    pub dir: PathBuf,
    /// Defaults to `<issuer>/theme/logo.png` when empty.
    pub logo_url: String,
    /// Display name on rendered pages.
    pub issuer_name: String,
    pub theme: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("web"),
            logo_url: String::new(),
            issuer_name: "signet".to_string(),
            theme: "light".to_string(),
        }
    }
}
