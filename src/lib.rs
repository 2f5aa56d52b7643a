//! Graceful shutdown for axum servers.
//!
//! On SIGINT, SIGTERM or any configured extra signal the server stops taking
//! new requests (503), runs an optional cleanup hook, drains in-flight
//! requests and exits. A force timeout bounds the whole sequence.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use http::{DrainLayer, HttpServer};
pub use lifecycle::{create_shutdown_layer, ShutdownCoordinator, ShutdownOptions};
