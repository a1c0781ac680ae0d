//! WebSocket connection handlers.
//!
//! Two kinds of connections arrive here:
//! - viewers (`/ws/viewer`): receive the join snapshot, then ticks, chat and
//!   utterance events; may send chat
//! - the producer (`/ws/producer`): authenticated; drives the stream with
//!   `speak` / `set_pose` / `end` commands

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    domain::{ChatRole, ClientId, MessageContent, StreamId},
    infrastructure::dto::websocket::{
        ErrorMessage, IncomingChatMessage, MessageType, ProducerCommand, StreamStartedMessage,
    },
    ui::state::AppState,
    usecase::{ConnectViewerError, StartStreamError},
};

/// Query parameters for a viewer connection
#[derive(Debug, Deserialize)]
pub struct ViewerConnectQuery {
    pub stream_id: String,
    /// Optional; a unique id is generated when absent
    pub client_id: Option<String>,
}

/// Query parameters for a producer connection
#[derive(Debug, Deserialize)]
pub struct ProducerConnectQuery {
    pub stream_id: String,
    #[serde(default)]
    pub token: String,
    pub display_name: Option<String>,
}

pub async fn viewer_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewerConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let stream_id = match StreamId::try_from(query.stream_id.clone()) {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!("invalid stream_id format: '{}'", query.stream_id);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let client_id_str = query
        .client_id
        .unwrap_or_else(|| format!("viewer-{}", Uuid::new_v4().simple()));
    let client_id = match ClientId::try_from(client_id_str.clone()) {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!("invalid client_id format: '{}'", client_id_str);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    // Create a channel for this viewer to receive frames. The join snapshot
    // is queued by the usecase before the socket upgrade completes; the
    // channel preserves its position ahead of any tick.
    let (tx, rx) = mpsc::unbounded_channel();

    match state
        .connect_viewer_usecase
        .execute(&stream_id, client_id.clone(), tx)
        .await
    {
        Ok(_connected_at) => Ok(ws.on_upgrade(move |socket| {
            handle_viewer_socket(socket, state, stream_id, client_id, rx)
        })),
        Err(ConnectViewerError::StreamNotFound(_)) => {
            tracing::warn!("viewer join rejected: stream '{}' not found", stream_id);
            Err(StatusCode::NOT_FOUND)
        }
        Err(ConnectViewerError::DuplicateClientId(_)) => {
            tracing::warn!(
                "viewer with ID '{}' is already connected. Rejecting connection.",
                client_id_str
            );
            Err(StatusCode::CONFLICT)
        }
    }
}

/// Spawns a task that drains the viewer's frame channel into the socket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_viewer_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    stream_id: StreamId,
    client_id: ClientId,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    let mut send_task = pusher_loop(rx, sender);

    let state_clone = state.clone();
    let stream_id_clone = stream_id.clone();
    let client_id_clone = client_id.clone();

    // Receive chat from this viewer
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    // Prefer the JSON shape; fall back to raw text chat
                    let content = match serde_json::from_str::<IncomingChatMessage>(&text) {
                        Ok(incoming) => incoming.content,
                        Err(_) => text.to_string(),
                    };

                    let content = match MessageContent::try_from(content) {
                        Ok(content) => content,
                        Err(e) => {
                            tracing::warn!(
                                "rejecting chat from '{}': {}",
                                client_id_clone,
                                e
                            );
                            continue;
                        }
                    };

                    // The stream owner chats under the stream's own id; this
                    // only affects display styling on the consumer side
                    let role = if client_id_clone.as_str() == stream_id_clone.as_str() {
                        ChatRole::Owner
                    } else {
                        ChatRole::Viewer
                    };

                    if let Err(e) = state_clone
                        .send_chat_usecase
                        .execute(
                            &stream_id_clone,
                            client_id_clone.clone(),
                            role,
                            content,
                        )
                        .await
                    {
                        tracing::warn!("failed to send chat: {}", e);
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("viewer '{}' requested close", client_id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .disconnect_viewer_usecase
        .execute(&stream_id, &client_id)
        .await;
}

pub async fn producer_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProducerConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let stream_id = match StreamId::try_from(query.stream_id.clone()) {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!("invalid stream_id format: '{}'", query.stream_id);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let display_name = query
        .display_name
        .unwrap_or_else(|| stream_id.as_str().to_string());

    // Each producer connection gets its own identity; the most recent
    // successful start owns the producer slot
    let producer_conn = Uuid::new_v4();

    match state
        .start_stream_usecase
        .execute(stream_id.clone(), &query.token, &display_name, producer_conn)
        .await
    {
        Ok(_stream) => Ok(ws.on_upgrade(move |socket| {
            handle_producer_socket(socket, state, stream_id, display_name, producer_conn)
        })),
        Err(StartStreamError::Unauthorized(e)) => {
            tracing::warn!("producer start rejected for '{}': {}", stream_id, e);
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(StartStreamError::InvalidInput(e)) => {
            tracing::warn!("producer start rejected for '{}': {}", stream_id, e);
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

async fn handle_producer_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    stream_id: StreamId,
    display_name: String,
    producer_conn: Uuid,
) {
    let (mut sender, mut receiver) = socket.split();

    // Acknowledge the start so the producer can begin speaking immediately
    let ack = StreamStartedMessage {
        r#type: MessageType::StreamStarted,
        stream_id: stream_id.as_str().to_string(),
        display_name,
    };
    let ack_json = serde_json::to_string(&ack).unwrap();
    if let Err(e) = sender.send(Message::Text(ack_json.into())).await {
        tracing::error!("failed to send start ack to producer: {}", e);
        return;
    }

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!("WebSocket error on producer connection: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let command = match serde_json::from_str::<ProducerCommand>(&text) {
                    Ok(command) => command,
                    Err(e) => {
                        tracing::warn!("unparseable producer command: {}", e);
                        send_error(&mut sender, format!("invalid command: {e}")).await;
                        continue;
                    }
                };

                match command {
                    ProducerCommand::Speak { text, duration_ms } => {
                        if let Err(e) = state
                            .speak_usecase
                            .execute(&stream_id, producer_conn, &text, duration_ms)
                            .await
                        {
                            tracing::warn!("speak rejected: {}", e);
                            send_error(&mut sender, e.to_string()).await;
                        }
                    }
                    ProducerCommand::SetPose { pose } => {
                        if let Err(e) = state
                            .set_pose_usecase
                            .execute(&stream_id, producer_conn, &pose)
                            .await
                        {
                            tracing::warn!("set_pose rejected: {}", e);
                            send_error(&mut sender, e.to_string()).await;
                        }
                    }
                    ProducerCommand::End => {
                        if let Err(e) = state
                            .end_stream_usecase
                            .execute(&stream_id, Some(producer_conn))
                            .await
                        {
                            tracing::warn!("end rejected: {}", e);
                            send_error(&mut sender, e.to_string()).await;
                        }
                        break;
                    }
                }
            }
            Message::Ping(_) => {
                tracing::debug!("received ping");
            }
            Message::Close(_) => {
                tracing::info!("producer for '{}' requested close", stream_id);
                break;
            }
            _ => {}
        }
    }

    // Producer disconnect marks the stream offline, unless a newer
    // connection has taken the producer slot in the meantime
    if let Err(e) = state
        .end_stream_usecase
        .execute(&stream_id, Some(producer_conn))
        .await
    {
        tracing::warn!("failed to end stream on producer disconnect: {}", e);
    }
}

async fn send_error(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    message: String,
) {
    let error = ErrorMessage {
        r#type: MessageType::Error,
        message,
    };
    let json = serde_json::to_string(&error).unwrap();
    if sender.send(Message::Text(json.into())).await.is_err() {
        tracing::warn!("failed to send error frame to producer");
    }
}
