// Background workers: key rotation and garbage collection.
//
// Both are long-lived tasks parented to a shutdown channel. Failures are
// logged and the loop continues; a worker never takes the process down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use crate::server::Server;

/// Rotate once immediately so a fresh storage has signing keys, then spawn
/// the rotation and garbage-collection loops. The tasks end when `true` is
/// sent on the shutdown channel or the sender is dropped.
pub async fn start(server: Arc<Server>, shutdown: watch::Receiver<bool>) {
    if let Err(e) = server.rotate_keys().await {
        server
            .logger()
            .error(&format!("failed to rotate keys: {e}"));
    }

    tokio::spawn(rotation_loop(server.clone(), shutdown.clone()));
    tokio::spawn(gc_loop(server, shutdown));
}

async fn rotation_loop(server: Arc<Server>, mut shutdown: watch::Receiver<bool>) {
    // The tick follows the configured rotation frequency; the schedule
    // itself lives in storage next to the keys, so a missed or failed tick
    // is retried on the next one.
    let frequency = server
        .rotation_strategy
        .rotation_frequency
        .to_std()
        .unwrap_or_else(|_| Duration::from_secs(6 * 60 * 60))
        .max(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = sleep(frequency) => {
                if let Err(e) = server.rotate_keys().await {
                    server.logger().error(&format!("failed to rotate keys: {e}"));
                }
            }
        }
    }
}

async fn gc_loop(server: Arc<Server>, mut shutdown: watch::Receiver<bool>) {
    let frequency = server
        .gc_frequency
        .to_std()
        .unwrap_or_else(|_| Duration::from_secs(300))
        .max(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = sleep(frequency) => {
                match server.storage().garbage_collect(server.now()).await {
                    Ok(result) if !result.is_empty() => {
                        server.logger().info(&format!(
                            "garbage collection run, deleted auth requests={}, auth codes={}",
                            result.auth_requests, result.auth_codes,
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        server.logger().error(&format!("garbage collection failed: {e}"));
                    }
                }
            }
        }
    }
}
