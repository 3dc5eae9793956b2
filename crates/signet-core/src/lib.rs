//! # signet-core
//!
//! Core contracts shared by every signet crate: the durable storage
//! interface, the domain entities it persists, the connector capability
//! traits, server configuration, and the error taxonomy.
//!
//! Nothing in this crate talks to the network or renders a page. The
//! `signet` crate builds the authorization and token engines on top of
//! these contracts; storage backends implement [`storage::Storage`].

pub mod config;
pub mod connector;
pub mod error;
pub mod id;
pub mod logger;
pub mod models;
pub mod storage;

pub use config::{ServerConfig, WebConfig};
pub use error::{ConnectorError, OAuthError, OAuthErrorKind, ServerError, StorageError};
pub use storage::{Storage, StorageResult};
