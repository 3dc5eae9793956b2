//! End-to-end flows through the framework-agnostic handler: authorization
//! code flow, token exchange, PKCE, refresh rotation, key rotation overlap,
//! password grant, and the consent screen.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use signet::{oidc, pkce, GenericRequest, GenericResponse, Server};
use signet_core::config::ServerConfig;
use signet_core::logger::Logger;
use signet_core::models::{Client, ConnectorRecord, Password};
use signet_core::storage::Storage;
use signet_memory::MemoryStorage;

const CLIENT_ID: &str = "example-app";
const CLIENT_SECRET: &str = "example-app-secret";
const REDIRECT_URI: &str = "http://127.0.0.1:5555/callback";
const ISSUER: &str = "https://signet.example.test";

struct TestIdp {
    server: Arc<Server>,
    storage: Arc<MemoryStorage>,
    clock: Arc<Mutex<DateTime<Utc>>>,
}

struct Options {
    skip_approval: bool,
    password_connector: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            skip_approval: true,
            password_connector: false,
        }
    }
}

async fn new_idp(options: Options) -> TestIdp {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .create_client(Client {
            id: CLIENT_ID.into(),
            secret: CLIENT_SECRET.into(),
            redirect_uris: vec![REDIRECT_URI.into()],
            trusted_peers: vec![],
            public: false,
            name: "Example App".into(),
            logo_url: String::new(),
        })
        .await
        .unwrap();

    if options.password_connector {
        storage
            .create_connector(ConnectorRecord {
                id: "local".into(),
                kind: "local".into(),
                name: "Email".into(),
                resource_version: "1".into(),
                config: serde_json::Value::Null,
            })
            .await
            .unwrap();
    } else {
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
    }

    let clock = Arc::new(Mutex::new(Utc::now()));
    let now_clock = clock.clone();
    let config = ServerConfig {
        issuer: ISSUER.into(),
        skip_approval_screen: options.skip_approval,
        password_connector: options.password_connector.then(|| "local".to_string()),
        allowed_origins: vec!["*".into()],
        now: Some(Arc::new(move || *now_clock.lock().unwrap())),
        ..Default::default()
    };

    let server = Server::new(config, storage.clone(), Logger::discard())
        .await
        .unwrap();
    server.rotate_keys().await.unwrap();

    TestIdp {
        server,
        storage,
        clock,
    }
}

impl TestIdp {
    fn advance(&self, by: Duration) {
        let mut clock = self.clock.lock().unwrap();
        *clock = *clock + by;
    }

    async fn get(&self, location: &str) -> GenericResponse {
        self.request("GET", location, HashMap::new(), None).await
    }

    async fn request(
        &self,
        method: &str,
        location: &str,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> GenericResponse {
        let trimmed = location
            .strip_prefix(ISSUER)
            .unwrap_or(location)
            .to_string();
        let (path, query) = match trimmed.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (trimmed, None),
        };
        self.server
            .handle(GenericRequest {
                method: method.into(),
                path,
                query,
                headers,
                body,
            })
            .await
    }

    async fn post_form(&self, location: &str, form: &str) -> GenericResponse {
        self.request("POST", location, HashMap::new(), Some(form.as_bytes().to_vec()))
            .await
    }

    /// Run `/auth -> connector -> callback -> approval` and return the
    /// final redirect back to the client.
    async fn authorize(&self, scope: &str, extra: &str) -> GenericResponse {
        let auth = format!(
            "/auth?response_type=code&client_id={CLIENT_ID}&redirect_uri={}&scope={}&state=xyz{extra}",
            urlencoding::encode(REDIRECT_URI),
            urlencoding::encode(scope),
        );
        let mut response = self.get(&auth).await;
        // Connector selection, connector login, callback, approval.
        for _ in 0..4 {
            let Some(location) = response.location().map(str::to_string) else {
                return response;
            };
            if location.starts_with(REDIRECT_URI) {
                return response;
            }
            response = self.get(&location).await;
        }
        response
    }

    /// Full code flow, returning the authorization code.
    async fn obtain_code(&self, scope: &str, extra: &str) -> String {
        let response = self.authorize(scope, extra).await;
        let location = response.location().expect("final redirect").to_string();
        redirect_params(&location)
            .remove("code")
            .expect("code in redirect")
    }

    async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> GenericResponse {
        let mut form = format!(
            "grant_type=authorization_code&code={code}&redirect_uri={}",
            urlencoding::encode(REDIRECT_URI),
        );
        if let Some(v) = verifier {
            form.push_str(&format!("&code_verifier={v}"));
        }
        self.token_request(&form).await
    }

    async fn token_request(&self, form: &str) -> GenericResponse {
        let mut headers = HashMap::new();
        headers.insert(
            "authorization".to_string(),
            format!("Basic {}", STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}"))),
        );
        self.request("POST", "/token", headers, Some(form.as_bytes().to_vec()))
            .await
    }

    /// Decode and verify an ID token against the currently published JWKS.
    async fn verify_id_token(&self, token: &str) -> serde_json::Value {
        let jwks = self.get("/keys").await.json_body().unwrap();
        let header = jsonwebtoken::decode_header(token).unwrap();
        let kid = header.kid.expect("kid in header");
        let jwk = jwks["keys"]
            .as_array()
            .unwrap()
            .iter()
            .find(|k| k["kid"] == kid)
            .unwrap_or_else(|| panic!("kid {kid} not in JWKS"));

        let key = DecodingKey::from_rsa_components(
            jwk["n"].as_str().unwrap(),
            jwk["e"].as_str().unwrap(),
        )
        .unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[CLIENT_ID]);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = false;
        jsonwebtoken::decode::<serde_json::Value>(token, &key, &validation)
            .unwrap()
            .claims
    }
}

fn redirect_params(location: &str) -> HashMap<String, String> {
    let raw = location
        .split_once(['?', '#'])
        .map(|(_, q)| q)
        .unwrap_or("");
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            (
                k.to_string(),
                urlencoding::decode(v).unwrap_or_default().into_owned(),
            )
        })
        .collect()
}

// ─── Authorization code flow ────────────────────────────────────

#[tokio::test]
async fn code_flow_redirects_with_code_and_state() {
    let idp = new_idp(Options::default()).await;
    let response = idp.authorize("openid email", "").await;

    let location = response.location().unwrap();
    assert!(location.starts_with(REDIRECT_URI));
    let params = redirect_params(location);
    assert_eq!(params.get("state").map(String::as_str), Some("xyz"));
    assert_eq!(params.get("code").unwrap().len(), 32);

    // The login session is consumed; the one-time code is waiting.
    assert_eq!(idp.storage.auth_request_count().await, 0);
    assert_eq!(idp.storage.auth_code_count().await, 1);
}

#[tokio::test]
async fn code_exchange_returns_verified_id_token() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid email", "").await;

    let response = idp.exchange_code(&code, None).await;
    assert_eq!(response.status, 200);
    let body = response.json_body().unwrap();
    assert_eq!(body["token_type"], "bearer");
    assert!(body.get("refresh_token").is_none());

    let claims = idp
        .verify_id_token(body["id_token"].as_str().unwrap())
        .await;
    assert_eq!(claims["sub"], oidc::subject("mock", "u1"));
    assert_eq!(claims["email"], "a@b.c");
    assert_eq!(claims["email_verified"], true);
    assert_eq!(claims["iss"], ISSUER);
}

#[tokio::test]
async fn code_is_single_use() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid", "").await;

    assert_eq!(idp.exchange_code(&code, None).await.status, 200);

    let replay = idp.exchange_code(&code, None).await;
    assert_eq!(replay.status, 400);
    assert_eq!(replay.json_body().unwrap()["error"], "invalid_grant");
}

#[tokio::test]
async fn redirect_uri_must_match_exactly_at_token() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid", "").await;

    let form = format!(
        "grant_type=authorization_code&code={code}&redirect_uri={}",
        urlencoding::encode("http://127.0.0.1:5555/callback/other"),
    );
    let response = idp.token_request(&form).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.json_body().unwrap()["error"], "invalid_grant");
}

#[tokio::test]
async fn bad_client_secret_is_rejected() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid", "").await;

    let mut headers = HashMap::new();
    headers.insert(
        "authorization".to_string(),
        format!("Basic {}", STANDARD.encode(format!("{CLIENT_ID}:wrong"))),
    );
    let form = format!(
        "grant_type=authorization_code&code={code}&redirect_uri={}",
        urlencoding::encode(REDIRECT_URI),
    );
    let response = idp
        .request("POST", "/token", headers, Some(form.into_bytes()))
        .await;
    assert_eq!(response.status, 401);
    assert_eq!(response.json_body().unwrap()["error"], "invalid_client");
}

#[tokio::test]
async fn unknown_scopes_are_ignored() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid email something:custom", "").await;
    assert_eq!(idp.exchange_code(&code, None).await.status, 200);
}

#[tokio::test]
async fn auth_rejects_unregistered_redirect_uri() {
    let idp = new_idp(Options::default()).await;
    let auth = format!(
        "/auth?response_type=code&client_id={CLIENT_ID}&redirect_uri={}&scope=openid",
        urlencoding::encode("https://evil.example.com/callback"),
    );
    let response = idp.get(&auth).await;
    assert_eq!(response.status, 400);
    // No redirect to the attacker.
    assert!(response.location().is_none());
}

#[tokio::test]
async fn auth_without_openid_scope_redirects_invalid_scope() {
    let idp = new_idp(Options::default()).await;
    let auth = format!(
        "/auth?response_type=code&client_id={CLIENT_ID}&redirect_uri={}&scope=email&state=xyz",
        urlencoding::encode(REDIRECT_URI),
    );
    let response = idp.get(&auth).await;
    let params = redirect_params(response.location().unwrap());
    assert_eq!(params.get("error").map(String::as_str), Some("invalid_scope"));
    assert_eq!(params.get("state").map(String::as_str), Some("xyz"));
}

// ─── PKCE ───────────────────────────────────────────────────────

#[tokio::test]
async fn pkce_binds_code_to_verifier() {
    let idp = new_idp(Options::default()).await;
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    let challenge = pkce::s256_challenge(verifier);
    let code = idp
        .obtain_code(
            "openid",
            &format!("&code_challenge={challenge}&code_challenge_method=S256"),
        )
        .await;

    // Missing, then wrong, then right.
    let missing = idp.exchange_code(&code, None).await;
    assert_eq!(missing.json_body().unwrap()["error"], "invalid_grant");

    let wrong = idp.exchange_code(&code, Some("a-completely-wrong-verifier")).await;
    assert_eq!(wrong.json_body().unwrap()["error"], "invalid_grant");

    let right = idp.exchange_code(&code, Some(verifier)).await;
    assert_eq!(right.status, 200);
}

// ─── Refresh tokens ─────────────────────────────────────────────

#[tokio::test]
async fn offline_access_issues_rotating_refresh_token() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid email offline_access", "").await;

    let body = idp.exchange_code(&code, None).await.json_body().unwrap();
    let first = body["refresh_token"].as_str().unwrap().to_string();

    let refreshed = idp
        .token_request(&format!("grant_type=refresh_token&refresh_token={first}"))
        .await;
    assert_eq!(refreshed.status, 200);
    let refreshed = refreshed.json_body().unwrap();
    let second = refreshed["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(refreshed["id_token"].as_str().is_some());
}

#[tokio::test]
async fn refresh_token_replay_revokes_the_family() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid offline_access", "").await;
    let body = idp.exchange_code(&code, None).await.json_body().unwrap();
    let first = body["refresh_token"].as_str().unwrap().to_string();

    let refreshed = idp
        .token_request(&format!("grant_type=refresh_token&refresh_token={first}"))
        .await
        .json_body()
        .unwrap();
    let second = refreshed["refresh_token"].as_str().unwrap().to_string();

    // Replaying the rotated-out value past the reuse window means theft:
    // the presented token and its successor both die.
    idp.advance(Duration::seconds(60));
    let replay = idp
        .token_request(&format!("grant_type=refresh_token&refresh_token={first}"))
        .await;
    assert_eq!(replay.status, 400);
    assert_eq!(replay.json_body().unwrap()["error"], "invalid_grant");

    let successor = idp
        .token_request(&format!("grant_type=refresh_token&refresh_token={second}"))
        .await;
    assert_eq!(successor.json_body().unwrap()["error"], "invalid_grant");
}

#[tokio::test]
async fn refresh_token_replay_inside_window_returns_current_token() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid offline_access", "").await;
    let body = idp.exchange_code(&code, None).await.json_body().unwrap();
    let first = body["refresh_token"].as_str().unwrap().to_string();

    let refreshed = idp
        .token_request(&format!("grant_type=refresh_token&refresh_token={first}"))
        .await
        .json_body()
        .unwrap();
    let second = refreshed["refresh_token"].as_str().unwrap().to_string();

    // A quick retry with the old value is treated as a network replay and
    // answered with the current token instead of a rotation.
    let retry = idp
        .token_request(&format!("grant_type=refresh_token&refresh_token={first}"))
        .await;
    assert_eq!(retry.status, 200);
    assert_eq!(
        retry.json_body().unwrap()["refresh_token"].as_str().unwrap(),
        second
    );
}

#[tokio::test]
async fn refresh_scope_cannot_widen() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid offline_access", "").await;
    let body = idp.exchange_code(&code, None).await.json_body().unwrap();
    let token = body["refresh_token"].as_str().unwrap();

    let response = idp
        .token_request(&format!(
            "grant_type=refresh_token&refresh_token={token}&scope=openid+email"
        ))
        .await;
    assert_eq!(response.json_body().unwrap()["error"], "invalid_scope");
}

// ─── Key rotation ───────────────────────────────────────────────

#[tokio::test]
async fn rotation_changes_kid_and_keeps_old_key_published() {
    let idp = new_idp(Options::default()).await;

    let code = idp.obtain_code("openid", "").await;
    let body = idp.exchange_code(&code, None).await.json_body().unwrap();
    let first_token = body["id_token"].as_str().unwrap().to_string();
    let first_kid = jsonwebtoken::decode_header(&first_token).unwrap().kid.unwrap();

    idp.advance(Duration::hours(7));
    assert!(idp.server.rotate_keys().await.unwrap());

    let code = idp.obtain_code("openid", "").await;
    let body = idp.exchange_code(&code, None).await.json_body().unwrap();
    let second_token = body["id_token"].as_str().unwrap().to_string();
    let second_kid = jsonwebtoken::decode_header(&second_token).unwrap().kid.unwrap();
    assert_ne!(first_kid, second_kid);

    // Both tokens verify against the published JWKS during the overlap.
    let kids: Vec<String> = idp.get("/keys").await.json_body().unwrap()["keys"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["kid"].as_str().unwrap().to_string())
        .collect();
    assert!(kids.contains(&first_kid));
    assert!(kids.contains(&second_kid));
    idp.verify_id_token(&first_token).await;
    idp.verify_id_token(&second_token).await;
}

// ─── Password grant ─────────────────────────────────────────────

async fn password_idp() -> TestIdp {
    let idp = new_idp(Options {
        skip_approval: true,
        password_connector: true,
    })
    .await;
    idp.storage
        .create_password(Password {
            email: "a@b.c".into(),
            hash: bcrypt::hash("hunter2", 10).unwrap(),
            username: "jane".into(),
            user_id: "u1".into(),
        })
        .await
        .unwrap();
    idp
}

#[tokio::test]
async fn password_grant_mints_id_token() {
    let idp = password_idp().await;
    let response = idp
        .token_request("grant_type=password&username=a%40b.c&password=hunter2")
        .await;
    assert_eq!(response.status, 200);
    let body = response.json_body().unwrap();
    let claims = idp
        .verify_id_token(body["id_token"].as_str().unwrap())
        .await;
    assert_eq!(claims["sub"], oidc::subject("local", "u1"));
}

#[tokio::test]
async fn password_grant_rejects_wrong_password() {
    let idp = password_idp().await;
    let response = idp
        .token_request("grant_type=password&username=a%40b.c&password=wrong")
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.json_body().unwrap()["error"], "invalid_grant");
}

#[tokio::test]
async fn password_grant_surfaces_cost_out_of_range() {
    let idp = password_idp().await;
    idp.storage
        .update_password("a@b.c", &|mut p| {
            p.hash = "$2b$20$0123456789012345678901uSyntheticHighCostHashValue0000".into();
            Ok(p)
        })
        .await
        .unwrap();

    let response = idp
        .token_request("grant_type=password&username=a%40b.c&password=hunter2")
        .await;
    assert_eq!(response.status, 400);
    let body = response.json_body().unwrap();
    assert_eq!(body["error"], "invalid_request");
    assert!(body["error_description"]
        .as_str()
        .unwrap()
        .contains("bcrypt cost 20"));
}

#[tokio::test]
async fn password_grant_disabled_without_connector() {
    let idp = new_idp(Options::default()).await;
    let response = idp
        .token_request("grant_type=password&username=a%40b.c&password=hunter2")
        .await;
    assert_eq!(
        response.json_body().unwrap()["error"],
        "unsupported_grant_type"
    );
}

// ─── Callback hygiene ───────────────────────────────────────────

#[tokio::test]
async fn generic_callback_strips_x_remote_headers() {
    let idp = new_idp(Options::default()).await;
    let auth = format!(
        "/auth?response_type=code&client_id={CLIENT_ID}&redirect_uri={}&scope=openid",
        urlencoding::encode(REDIRECT_URI),
    );
    let response = idp.get(&auth).await;
    let connector_login = response.location().unwrap().to_string();
    let response = idp.get(&connector_login).await;
    let callback = response.location().unwrap().to_string();

    let mut headers = HashMap::new();
    headers.insert("x-remote-user".to_string(), "spoofed-admin".to_string());
    headers.insert("user-agent".to_string(), "test".to_string());
    let response = idp.request("GET", &callback, headers, None).await;
    assert_eq!(response.status, 303);

    // The mock connector records every header name it was shown.
    let req_id = redirect_params(response.location().unwrap())
        .remove("req")
        .unwrap();
    let auth_request = idp.storage.get_auth_request(&req_id).await.unwrap();
    let seen = auth_request.connector_data.unwrap()["seenHeaders"].clone();
    let seen: Vec<String> = serde_json::from_value(seen).unwrap();
    assert!(seen.contains(&"user-agent".to_string()));
    assert!(!seen.iter().any(|h| h.starts_with("x-remote-")));
}

// ─── Approval screen ────────────────────────────────────────────

async fn reach_approval(idp: &TestIdp) -> (String, String) {
    let auth = format!(
        "/auth?response_type=code&client_id={CLIENT_ID}&redirect_uri={}&scope=openid&state=xyz",
        urlencoding::encode(REDIRECT_URI),
    );
    let response = idp.get(&auth).await;
    let connector_login = response.location().unwrap().to_string();
    let response = idp.get(&connector_login).await;
    let callback = response.location().unwrap().to_string();
    let response = idp.get(&callback).await;
    let approval = response.location().unwrap().to_string();
    let params = redirect_params(&approval);
    (params["req"].clone(), params["hmac"].clone())
}

#[tokio::test]
async fn approval_screen_renders_and_approves() {
    let idp = new_idp(Options {
        skip_approval: false,
        password_connector: false,
    })
    .await;
    let (req, hmac) = reach_approval(&idp).await;

    let page = idp.get(&format!("/approval?req={req}&hmac={hmac}")).await;
    assert_eq!(page.status, 200);
    assert!(String::from_utf8(page.body.clone())
        .unwrap()
        .contains("Grant access"));

    let response = idp
        .post_form("/approval", &format!("req={req}&hmac={hmac}&approval=approve"))
        .await;
    let params = redirect_params(response.location().unwrap());
    assert!(params.contains_key("code"));
}

#[tokio::test]
async fn approval_denial_redirects_access_denied() {
    let idp = new_idp(Options {
        skip_approval: false,
        password_connector: false,
    })
    .await;
    let (req, hmac) = reach_approval(&idp).await;

    let response = idp
        .post_form("/approval", &format!("req={req}&hmac={hmac}&approval=reject"))
        .await;
    let params = redirect_params(response.location().unwrap());
    assert_eq!(params.get("error").map(String::as_str), Some("access_denied"));
    assert_eq!(idp.storage.auth_request_count().await, 0);
}

#[tokio::test]
async fn approval_rejects_bad_hmac() {
    let idp = new_idp(Options {
        skip_approval: false,
        password_connector: false,
    })
    .await;
    let (req, _) = reach_approval(&idp).await;

    let response = idp
        .post_form("/approval", &format!("req={req}&hmac=forged&approval=approve"))
        .await;
    assert_eq!(response.status, 403);
}

// ─── Discovery, JWKS, health, GC ────────────────────────────────

#[tokio::test]
async fn discovery_is_cors_enabled() {
    let idp = new_idp(Options::default()).await;
    let mut headers = HashMap::new();
    headers.insert("origin".to_string(), "https://spa.example.com".to_string());
    let response = idp
        .request("GET", "/.well-known/openid-configuration", headers, None)
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));

    let doc = response.json_body().unwrap();
    assert_eq!(doc["issuer"], ISSUER);
    assert_eq!(doc["token_endpoint"], format!("{ISSUER}/token"));
}

#[tokio::test]
async fn healthz_reports_storage_round_trip() {
    let idp = new_idp(Options::default()).await;
    let response = idp.get("/healthz").await;
    assert_eq!(response.status, 200);
    assert!(String::from_utf8(response.body)
        .unwrap()
        .contains("Health check passed"));
}

#[tokio::test]
async fn expired_login_state_is_garbage_collected_once() {
    let idp = new_idp(Options::default()).await;

    // Park a login mid-flow so an auth request is left behind.
    let auth = format!(
        "/auth?response_type=code&client_id={CLIENT_ID}&redirect_uri={}&scope=openid",
        urlencoding::encode(REDIRECT_URI),
    );
    idp.get(&auth).await;
    assert_eq!(idp.storage.auth_request_count().await, 1);

    idp.advance(Duration::hours(25));
    let first = idp.storage.garbage_collect(idp.server.now()).await.unwrap();
    assert_eq!(first.auth_requests, 1);
    let second = idp.storage.garbage_collect(idp.server.now()).await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn expired_code_is_rejected() {
    let idp = new_idp(Options::default()).await;
    let code = idp.obtain_code("openid", "").await;

    idp.advance(Duration::minutes(11));
    let response = idp.exchange_code(&code, None).await;
    assert_eq!(response.json_body().unwrap()["error"], "invalid_grant");
}
