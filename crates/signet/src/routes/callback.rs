// The connector callback endpoint.
//
// The upstream provider redirects the browser back here with the auth
// request id in `state`. The connector extracts the identity from the
// request, the auth request is marked logged-in, and the browser moves on
// to approval. The generic `/callback` path has its `X-Remote-*` headers
// stripped by the dispatch layer; `/callback/{connector}` is left intact
// for authproxy-style connectors that authenticate via trusted headers.

use signet_core::connector::CallbackRequest;
use signet_core::error::StorageError;

use crate::handler::{GenericRequest, GenericResponse};
use crate::routes::authorization::{connector_scopes, finalize_login};
use crate::routes::templates;
use crate::server::Server;

pub async fn handle_callback(
    server: &Server,
    path_connector: Option<&str>,
    request: &GenericRequest,
) -> GenericResponse {
    let req_id = match request.param("state") {
        Some(id) if !id.is_empty() => id,
        _ => {
            return templates::error_page(
                400,
                "Bad request",
                "No state in connector callback.",
            )
        }
    };

    let auth_request = match server.storage().get_auth_request(&req_id).await {
        Ok(a) => a,
        Err(StorageError::NotFound) => {
            return templates::error_page(
                400,
                "Login session expired",
                "Start the login flow again.",
            )
        }
        Err(e) => {
            server.logger().error(&format!("failed to get auth request: {e}"));
            return templates::error_page(500, "Internal error", "Database error.");
        }
    };
    if server.now() > auth_request.expiry {
        return templates::error_page(400, "Login session expired", "Start the login flow again.");
    }

    if auth_request.connector_id.is_empty() {
        return templates::error_page(
            400,
            "Bad request",
            "No connector selected for this login.",
        );
    }
    if let Some(from_path) = path_connector {
        if from_path != auth_request.connector_id {
            return templates::error_page(
                400,
                "Bad request",
                "Callback connector does not match the login request.",
            );
        }
    }

    let connector = match server.connector(&auth_request.connector_id).await {
        Ok(c) => c,
        Err(e) => {
            server.logger().error(&format!(
                "failed to open connector {}: {e}",
                auth_request.connector_id
            ));
            return templates::error_page(500, "Internal error", "Failed to open connector.");
        }
    };
    let Some(callback) = &connector.handle.callback else {
        return templates::error_page(
            500,
            "Internal error",
            "Connector does not support callbacks.",
        );
    };

    let callback_request = CallbackRequest {
        method: request.method.clone(),
        query: request.query_params(),
        form: request.form_params(),
        headers: request.headers.clone(),
    };
    let scopes = connector_scopes(&auth_request.scopes);

    match callback.handle_callback(&scopes, &callback_request).await {
        Ok(identity) => {
            let connector_id = auth_request.connector_id.clone();
            finalize_login(server, &auth_request, &connector_id, identity).await
        }
        Err(e) => {
            server.logger().error(&format!("connector callback: {e}"));
            templates::error_page(500, "Internal error", "Failed to authenticate.")
        }
    }
}
