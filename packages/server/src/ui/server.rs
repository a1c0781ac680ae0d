//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::usecase::{
    ConnectViewerUseCase, DisconnectViewerUseCase, EndStreamUseCase, GetStreamsUseCase,
    SendChatUseCase, SetPoseUseCase, SpeakUseCase, StartStreamUseCase,
};

use super::{
    handler::{
        http::{debug_stream_state, get_stream_detail, get_streams, health_check},
        websocket::{producer_websocket_handler, viewer_websocket_handler},
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Avatar live-streaming server
///
/// Encapsulates the wired usecases and runs the axum router.
pub struct Server {
    start_stream_usecase: Arc<StartStreamUseCase>,
    speak_usecase: Arc<SpeakUseCase>,
    set_pose_usecase: Arc<SetPoseUseCase>,
    end_stream_usecase: Arc<EndStreamUseCase>,
    connect_viewer_usecase: Arc<ConnectViewerUseCase>,
    disconnect_viewer_usecase: Arc<DisconnectViewerUseCase>,
    send_chat_usecase: Arc<SendChatUseCase>,
    get_streams_usecase: Arc<GetStreamsUseCase>,
}

impl Server {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_stream_usecase: Arc<StartStreamUseCase>,
        speak_usecase: Arc<SpeakUseCase>,
        set_pose_usecase: Arc<SetPoseUseCase>,
        end_stream_usecase: Arc<EndStreamUseCase>,
        connect_viewer_usecase: Arc<ConnectViewerUseCase>,
        disconnect_viewer_usecase: Arc<DisconnectViewerUseCase>,
        send_chat_usecase: Arc<SendChatUseCase>,
        get_streams_usecase: Arc<GetStreamsUseCase>,
    ) -> Self {
        Self {
            start_stream_usecase,
            speak_usecase,
            set_pose_usecase,
            end_stream_usecase,
            connect_viewer_usecase,
            disconnect_viewer_usecase,
            send_chat_usecase,
            get_streams_usecase,
        }
    }

    /// Run the streaming server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address
    /// or if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app_state = Arc::new(AppState {
            start_stream_usecase: self.start_stream_usecase,
            speak_usecase: self.speak_usecase,
            set_pose_usecase: self.set_pose_usecase,
            end_stream_usecase: self.end_stream_usecase,
            connect_viewer_usecase: self.connect_viewer_usecase,
            disconnect_viewer_usecase: self.disconnect_viewer_usecase,
            send_chat_usecase: self.send_chat_usecase,
            get_streams_usecase: self.get_streams_usecase,
        });

        // Define handlers
        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws/viewer", get(viewer_websocket_handler))
            .route("/ws/producer", get(producer_websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/streams", get(get_streams))
            .route("/api/streams/{stream_id}", get(get_stream_detail))
            .route("/debug/streams/{stream_id}", get(debug_stream_state))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state);

        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        // Start the server
        tracing::info!(
            "avatar streaming server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("viewers connect to: ws://{}/ws/viewer?stream_id=...", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        // Set up graceful shutdown signal handler
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
