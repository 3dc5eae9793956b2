// Liveness probe. Proves a storage round trip, not just process liveness:
// a server that cannot reach its keys cannot sign tokens.

use std::time::Instant;

use crate::handler::GenericResponse;
use crate::server::Server;

pub async fn handle_health(server: &Server) -> GenericResponse {
    let start = Instant::now();
    match server.storage().get_key_set().await {
        Ok(_) => {
            let elapsed = start.elapsed();
            GenericResponse::text(200, &format!("Health check passed in {elapsed:?}"))
        }
        Err(e) => {
            server.logger().error(&format!("health check failed: {e}"));
            GenericResponse::text(500, "Health check failed")
        }
    }
}
