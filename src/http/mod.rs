//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, graceful close)
//!     → drain.rs (DrainLayer: 503 once shutdown began)
//!     → trace / timeout layers
//!     → application routes
//! ```

pub mod drain;
pub mod server;

pub use drain::{shutdown_response, DrainGate, DrainLayer, DrainService, SHUTDOWN_MESSAGE};
pub use server::{HttpServer, ServeHandle};
