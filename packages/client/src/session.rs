//! WebSocket viewer session management.

use futures_util::{SinkExt, StreamExt};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use butai_server::infrastructure::dto::websocket::{
    BroadcastStateMessage, ChatBroadcastMessage, NewAudioMessage, ShowMediaMessage,
    StreamConnectedMessage, StreamEndedMessage, ViewerCountMessage,
};

use crate::{error::ClientError, formatter::FrameFormatter};

/// Tracks what is currently displayed so only changes get printed; the
/// server re-broadcasts the full state every tick.
#[derive(Default)]
struct DisplayState {
    subtitle: String,
    expression: String,
    gesture: Option<String>,
}

impl DisplayState {
    /// Returns the lines to print for this tick, if anything changed.
    fn apply(&mut self, frame: &BroadcastStateMessage) -> Vec<String> {
        let mut lines = Vec::new();

        let subtitle = if frame.snapshot.subtitle.visible {
            frame.snapshot.subtitle.text.clone()
        } else {
            String::new()
        };
        if subtitle != self.subtitle {
            if !subtitle.is_empty() {
                lines.push(FrameFormatter::format_subtitle(&subtitle));
            }
            self.subtitle = subtitle;
        }

        let expression = enum_name(&frame.snapshot.avatar.expression);
        let gesture = frame.snapshot.avatar.gesture.as_ref().map(enum_name);
        if expression != self.expression || gesture != self.gesture {
            lines.push(FrameFormatter::format_pose(&expression, gesture.as_deref()));
            self.expression = expression;
            self.gesture = gesture;
        }

        lines
    }
}

/// Serialize a unit enum to its wire name ("happy", "wave", ...)
fn enum_name<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn redisplay_prompt(client_id: &str) {
    use std::io::Write;
    print!("{}> ", client_id);
    let _ = std::io::stdout().flush();
}

/// Dispatch one server frame to the terminal.
fn handle_frame(text: &str, display: &mut DisplayState) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            print!("{}", FrameFormatter::format_raw_message(text));
            return;
        }
    };

    let frame_type = value["type"].as_str().map(str::to_string);
    match frame_type.as_deref() {
        Some("stream_connected") => {
            if let Ok(msg) = serde_json::from_value::<StreamConnectedMessage>(value) {
                print!("{}", FrameFormatter::format_stream_connected(&msg));
            }
        }
        Some("broadcast_state") => {
            if let Ok(msg) = serde_json::from_value::<BroadcastStateMessage>(value) {
                for line in display.apply(&msg) {
                    print!("{}", line);
                }
            }
        }
        Some("new_audio") => {
            if let Ok(msg) = serde_json::from_value::<NewAudioMessage>(value) {
                print!("{}", FrameFormatter::format_new_audio(&msg));
            }
        }
        Some("show_media") => {
            if let Ok(msg) = serde_json::from_value::<ShowMediaMessage>(value) {
                print!("{}", FrameFormatter::format_show_media(&msg));
            }
        }
        Some("chat") => {
            if let Ok(msg) = serde_json::from_value::<ChatBroadcastMessage>(value) {
                print!(
                    "{}",
                    FrameFormatter::format_chat_message(&msg.client_id, &msg.content, msg.timestamp)
                );
            }
        }
        Some("viewer_count") => {
            if let Ok(msg) = serde_json::from_value::<ViewerCountMessage>(value) {
                print!("{}", FrameFormatter::format_viewer_count(msg.count));
            }
        }
        Some("stream_ended") => {
            if let Ok(msg) = serde_json::from_value::<StreamEndedMessage>(value) {
                print!("{}", FrameFormatter::format_stream_ended(msg.ended_at));
            }
        }
        _ => {
            print!("{}", FrameFormatter::format_raw_message(text));
        }
    }
}

/// Run the viewer session until the connection closes or the user exits.
pub async fn run_viewer_session(
    url: &str,
    stream_id: &str,
    client_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}?stream_id={}&client_id={}", url, stream_id, client_id);

    let (ws_stream, response) = match connect_async(&url).await {
        Ok(result) => result,
        Err(e) => {
            let error_msg = e.to_string();
            if error_msg.contains("404") {
                return Err(Box::new(ClientError::StreamNotFound));
            }
            if error_msg.contains("409") || error_msg.contains("Conflict") {
                return Err(Box::new(ClientError::DuplicateClientId(
                    client_id.to_string(),
                )));
            }
            return Err(Box::new(ClientError::ConnectionError(error_msg)));
        }
    };

    match response.status().as_u16() {
        404 => return Err(Box::new(ClientError::StreamNotFound)),
        409 => {
            return Err(Box::new(ClientError::DuplicateClientId(
                client_id.to_string(),
            )));
        }
        _ => {}
    }

    tracing::info!("connected to stream '{}'", stream_id);
    println!(
        "\nYou are '{}'. Type messages and press Enter to chat. Press Ctrl+C to exit.\n",
        client_id
    );

    let (mut write, mut read) = ws_stream.split();

    let client_id_for_read = client_id.to_string();

    // Receive and render server frames
    let mut read_task = tokio::spawn(async move {
        let mut display = DisplayState::default();
        let mut connection_error = false;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    handle_frame(&text, &mut display);
                    redisplay_prompt(&client_id_for_read);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("server closed the connection");
                    connection_error = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    connection_error = true;
                    break;
                }
                _ => {}
            }
        }

        connection_error
    });

    // Read chat input on a blocking thread (rustyline is synchronous)
    let client_id = client_id.to_string();
    let client_id_for_prompt = client_id.clone();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", client_id_for_prompt);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Forward chat lines to the server
    let mut write_task = tokio::spawn(async move {
        let mut write_error = false;

        while let Some(line) = input_rx.recv().await {
            let json = serde_json::json!({ "content": line }).to_string();
            if let Err(e) = write.send(Message::Text(json.into())).await {
                tracing::warn!("failed to send chat: {}", e);
                write_error = true;
                break;
            }
            redisplay_prompt(&client_id);
        }

        write_error
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            if read_result.unwrap_or(false) {
                return Err(Box::new(ClientError::ConnectionError(
                    "Connection lost".to_string(),
                )));
            }
        }
        write_result = &mut write_task => {
            read_task.abort();
            if write_result.unwrap_or(false) {
                return Err(Box::new(ClientError::ConnectionError(
                    "Connection lost".to_string(),
                )));
            }
        }
    }

    Ok(())
}
