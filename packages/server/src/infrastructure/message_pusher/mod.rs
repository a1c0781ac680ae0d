//! Viewer pusher implementations.

pub mod websocket;

pub use websocket::WebSocketViewerPusher;
