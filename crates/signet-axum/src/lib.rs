//! # signet-axum
//!
//! Mounts a [`signet::Server`] on an axum [`Router`]. Every request under
//! the issuer's path is converted into the server's framework-agnostic
//! request type and dispatched; the server handles its own routing, CORS
//! and header hygiene.
//!
//! ```no_run
//! # async fn run(server: std::sync::Arc<signet::Server>) {
//! let app = signet_axum::router(server);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5556").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Router;

use signet::{GenericRequest, GenericResponse, Server};

/// Request bodies over this size are rejected; token and approval forms
/// are tiny.
const MAX_BODY_BYTES: usize = 1 << 20;

/// Build a router that forwards everything to the identity provider.
pub fn router(server: Arc<Server>) -> Router {
    Router::new().fallback(dispatch).with_state(server)
}

async fn dispatch(State(server): State<Arc<Server>>, request: Request) -> Response {
    let generic = match into_generic(request).await {
        Ok(g) => g,
        Err(status) => {
            return Response::builder()
                .status(status)
                .body(Body::empty())
                .unwrap_or_default()
        }
    };
    let response = server.handle(generic).await;
    into_axum(response)
}

async fn into_generic(request: Request) -> Result<GenericRequest, StatusCode> {
    let (parts, body) = request.into_parts();

    let mut headers = HashMap::new();
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_lowercase(), value.to_string());
        }
    }

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    Ok(GenericRequest {
        method: parts.method.as_str().to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers,
        body: if body.is_empty() {
            None
        } else {
            Some(body.to_vec())
        },
    })
}

fn into_axum(response: GenericResponse) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));

    if let Some(headers) = builder.headers_mut() {
        for (name, values) in &response.headers {
            let Ok(name) = HeaderName::try_from(name.as_str()) else {
                continue;
            };
            for value in values {
                if let Ok(value) = HeaderValue::from_str(value) {
                    headers.append(name.clone(), value);
                }
            }
        }
    }

    builder.body(Body::from(response.body)).unwrap_or_default()
}
