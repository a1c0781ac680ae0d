//! Data Transfer Objects (DTOs) for the streaming server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket frame DTOs (viewer and producer directions)
//! - `http`: HTTP API response DTOs
//! - `conversion`: domain → frame serialization helpers

pub mod conversion;
pub mod http;
pub mod websocket;
