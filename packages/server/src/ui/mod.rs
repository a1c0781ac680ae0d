//! UI layer: axum router, WebSocket/HTTP handlers, server lifecycle.

pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::Server;
