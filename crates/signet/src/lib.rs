//! # signet
//!
//! A federated OpenID Connect identity provider. The server authenticates
//! users against pluggable upstream connectors, issues signed ID tokens and
//! rotating refresh tokens to registered OAuth 2.0 clients, publishes the
//! discovery and JWKS documents, and maintains its signing keys and
//! transient login state in the background.
//!
//! The HTTP layer is framework-agnostic: integrations convert requests
//! into [`GenericRequest`], call [`Server::handle`], and translate the
//! [`GenericResponse`] back. The `signet-axum` crate does this for axum.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use signet::{workers, Server};
//! use signet_core::{config::ServerConfig, logger::Logger};
//! use signet_memory::MemoryStorage;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let config = ServerConfig {
//!     issuer: "https://signet.example.com".into(),
//!     ..Default::default()
//! };
//! let server = Server::new(config, storage, Logger::default()).await?;
//!
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! workers::start(server.clone(), shutdown).await;
//! # Ok(())
//! # }
//! ```

pub mod connectors;
pub mod handler;
pub mod keys;
pub mod oidc;
pub mod pkce;
pub mod routes;
pub mod server;
pub mod workers;

pub use handler::{GenericRequest, GenericResponse};
pub use server::Server;
