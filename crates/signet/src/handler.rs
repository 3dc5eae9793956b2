// Framework-agnostic HTTP layer.
//
// Integrations convert their request type into `GenericRequest`, call
// `Server::handle`, and convert the returned `GenericResponse` back. All
// routing lives here: paths are matched after stripping the issuer URL's
// path, `X-Remote-*` headers are removed before the generic callback
// endpoint runs, and CORS is applied to the discovery, keys and token
// endpoints.

use std::collections::HashMap;

use crate::routes;
use crate::server::Server;

// ─── Generic Request ────────────────────────────────────────────

/// A framework-agnostic HTTP request. Header names are lowercased.
#[derive(Debug, Clone, Default)]
pub struct GenericRequest {
    pub method: String,
    /// Full request path, including the issuer URL's path prefix.
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl GenericRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    /// Decoded query parameters.
    pub fn query_params(&self) -> HashMap<String, String> {
        self.query
            .as_deref()
            .map(parse_urlencoded)
            .unwrap_or_default()
    }

    /// Decoded `application/x-www-form-urlencoded` body parameters.
    pub fn form_params(&self) -> HashMap<String, String> {
        self.body
            .as_deref()
            .map(|b| parse_urlencoded(&String::from_utf8_lossy(b)))
            .unwrap_or_default()
    }

    /// One parameter, looked up in the query first and the form second.
    pub fn param(&self, name: &str) -> Option<String> {
        self.query_params()
            .remove(name)
            .or_else(|| self.form_params().remove(name))
    }

    /// HTTP Basic credentials, with both halves form-decoded as OAuth 2.0
    /// requires for client authentication.
    pub fn basic_auth(&self) -> Option<(String, String)> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let value = self.header("authorization")?;
        let encoded = value.strip_prefix("Basic ")?;
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        Some((
            urlencoding::decode(user).ok()?.into_owned(),
            urlencoding::decode(pass).ok()?.into_owned(),
        ))
    }
}

fn parse_urlencoded(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(key).unwrap_or_default().into_owned();
        let value = value.replace('+', " ");
        let value = urlencoding::decode(&value).unwrap_or_default().into_owned();
        params.insert(key, value);
    }
    params
}

// ─── Generic Response ───────────────────────────────────────────

/// A framework-agnostic HTTP response.
#[derive(Debug, Clone, Default)]
pub struct GenericResponse {
    pub status: u16,
    pub headers: HashMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

impl GenericResponse {
    pub fn json<T: serde::Serialize>(status: u16, data: &T) -> Self {
        let mut resp = Self {
            status,
            headers: HashMap::new(),
            body: serde_json::to_vec(data).unwrap_or_default(),
        };
        resp.set_header("content-type", "application/json");
        resp
    }

    pub fn html(status: u16, html: &str) -> Self {
        let mut resp = Self {
            status,
            headers: HashMap::new(),
            body: html.as_bytes().to_vec(),
        };
        resp.set_header("content-type", "text/html; charset=utf-8");
        resp
    }

    pub fn text(status: u16, text: &str) -> Self {
        let mut resp = Self {
            status,
            headers: HashMap::new(),
            body: text.as_bytes().to_vec(),
        };
        resp.set_header("content-type", "text/plain; charset=utf-8");
        resp
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        let mut resp = Self {
            status,
            ..Self::default()
        };
        resp.set_header("location", location);
        resp
    }

    pub fn not_found() -> Self {
        Self::text(404, "404 page not found")
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.to_string(), vec![value.to_string()]);
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    /// The `Location` header, where redirects carry their payload.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

// ─── Dispatch ───────────────────────────────────────────────────

const CORS_ROUTES: &[&str] = &["/.well-known/openid-configuration", "/keys", "/token"];

/// Upper bound on one handler execution; storage or connector hangs turn
/// into a 503 instead of a stuck browser tab.
const HANDLER_DEADLINE: std::time::Duration = std::time::Duration::from_secs(30);

impl Server {
    /// Route one request to its handler.
    pub async fn handle(&self, request: GenericRequest) -> GenericResponse {
        let Some(route) = self.route_path(&request.path).map(str::to_string) else {
            return GenericResponse::not_found();
        };
        let method = request.method.to_uppercase();

        let cors = CORS_ROUTES.contains(&route.as_str());
        if cors && method == "OPTIONS" {
            return self.preflight(&request);
        }

        self.count_request(&route);
        let cors_origin = if cors { self.cors_origin(&request) } else { None };

        let mut response =
            match tokio::time::timeout(HANDLER_DEADLINE, self.dispatch(&method, &route, request))
                .await
            {
                Ok(response) => response,
                Err(_) => {
                    self.logger()
                        .error(&format!("handler deadline exceeded for {route}"));
                    GenericResponse::json(
                        503,
                        &serde_json::json!({
                            "error": "temporarily_unavailable",
                            "error_description": "Request timed out.",
                        }),
                    )
                }
            };
        if let Some(origin) = cors_origin {
            response.set_header("access-control-allow-origin", &origin);
            response.set_header("vary", "Origin");
        }
        response
    }

    async fn dispatch(
        &self,
        method: &str,
        route: &str,
        mut request: GenericRequest,
    ) -> GenericResponse {
        match (method, route) {
            ("GET", "/.well-known/openid-configuration") => {
                routes::discovery::handle_discovery(self)
            }
            ("GET", "/keys") => routes::discovery::handle_jwks(self).await,
            ("POST", "/token") => routes::token::handle_token(self, &request).await,
            ("GET", "/auth") => routes::authorization::handle_authorization(self, &request).await,
            ("GET" | "POST", path) if path.starts_with("/auth/") => {
                let connector_id = path["/auth/".len()..].to_string();
                routes::authorization::handle_connector_login(self, &connector_id, &request).await
            }
            ("GET" | "POST", "/callback") => {
                // Strip X-Remote-* before the connector can see them;
                // authproxy-style deployments must use the per-connector
                // callback path instead.
                request
                    .headers
                    .retain(|name, _| !name.starts_with("x-remote-"));
                routes::callback::handle_callback(self, None, &request).await
            }
            ("GET" | "POST", path) if path.starts_with("/callback/") => {
                let connector_id = path["/callback/".len()..].to_string();
                routes::callback::handle_callback(self, Some(&connector_id), &request).await
            }
            ("GET" | "POST", "/approval") => routes::approval::handle_approval(self, &request).await,
            ("GET", "/healthz") => routes::health::handle_health(self).await,
            ("GET", path) if path.starts_with("/static/") || path.starts_with("/theme/") => {
                routes::assets::handle_asset(self, path).await
            }
            _ => GenericResponse::not_found(),
        }
    }

    fn cors_origin(&self, request: &GenericRequest) -> Option<String> {
        if self.allowed_origins.is_empty() {
            return None;
        }
        let origin = request.header("origin")?;
        if self.allowed_origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        self.allowed_origins
            .iter()
            .find(|o| o.as_str() == origin)
            .map(|_| origin.to_string())
    }

    fn preflight(&self, request: &GenericRequest) -> GenericResponse {
        let mut response = GenericResponse {
            status: 204,
            ..GenericResponse::default()
        };
        if let Some(origin) = self.cors_origin(request) {
            response.set_header("access-control-allow-origin", &origin);
            response.set_header("access-control-allow-methods", "GET, POST, OPTIONS");
            response.set_header(
                "access-control-allow-headers",
                "Content-Type, Authorization",
            );
            response.set_header("vary", "Origin");
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_decode() {
        let request = GenericRequest {
            method: "GET".into(),
            path: "/auth".into(),
            query: Some("redirect_uri=http%3A%2F%2F127.0.0.1%3A5555%2Fcallback&scope=openid+email".into()),
            ..GenericRequest::default()
        };
        let params = request.query_params();
        assert_eq!(
            params.get("redirect_uri").map(String::as_str),
            Some("http://127.0.0.1:5555/callback")
        );
        assert_eq!(params.get("scope").map(String::as_str), Some("openid email"));
    }

    #[test]
    fn test_basic_auth_decodes_form_encoding() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let mut headers = HashMap::new();
        headers.insert(
            "authorization".to_string(),
            format!("Basic {}", STANDARD.encode("example%2Dapp:sec%3Aret")),
        );
        let request = GenericRequest {
            method: "POST".into(),
            path: "/token".into(),
            headers,
            ..GenericRequest::default()
        };
        assert_eq!(
            request.basic_auth(),
            Some(("example-app".to_string(), "sec:ret".to_string()))
        );
    }

    #[test]
    fn test_form_params_from_body() {
        let request = GenericRequest {
            method: "POST".into(),
            path: "/token".into(),
            body: Some(b"grant_type=authorization_code&code=abc".to_vec()),
            ..GenericRequest::default()
        };
        let form = request.form_params();
        assert_eq!(form.get("grant_type").map(String::as_str), Some("authorization_code"));
        assert_eq!(form.get("code").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_response_helpers() {
        let resp = GenericResponse::redirect(303, "https://client.example.com/cb?code=x");
        assert_eq!(resp.status, 303);
        assert_eq!(resp.location(), Some("https://client.example.com/cb?code=x"));

        let resp = GenericResponse::json(200, &serde_json::json!({"ok": true}));
        assert_eq!(resp.json_body().unwrap()["ok"], true);
    }
}
