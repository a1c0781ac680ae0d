//! WebSocket frame DTOs.
//!
//! Every server-to-client frame carries a `type` discriminant so clients can
//! dispatch without trial deserialization of the whole payload. The
//! broadcast snapshot itself serializes straight from the domain type; the
//! DTOs here are the envelopes around it.

use serde::{Deserialize, Serialize};

use crate::domain::{BroadcastSnapshot, ChatRole, MediaRef, PoseUpdate};

/// Frame type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Join acknowledgement: snapshot + chat tail (server → joining viewer)
    StreamConnected,
    /// Periodic state tick (server → all viewers)
    BroadcastState,
    /// A new utterance just started (server → viewers subscribed at start)
    NewAudio,
    /// A resolved media request (server → all viewers)
    ShowMedia,
    /// Chat fan-out (server → viewers)
    Chat,
    /// Viewer count update (server → viewers)
    ViewerCount,
    /// The producer ended the stream (server → viewers)
    StreamEnded,
    /// Start acknowledgement (server → producer)
    StreamStarted,
    /// Operation rejection (server → producer)
    Error,
}

/// Stream identity carried in the join frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetaDto {
    pub id: String,
    pub display_name: String,
}

/// Chat message as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub client_id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: i64,
}

/// Sent once to a viewer immediately on join, strictly before any tick.
/// `snapshot.audio.position_ms` is where the viewer resumes playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConnectedMessage {
    pub r#type: MessageType,
    pub stream: StreamMetaDto,
    pub snapshot: BroadcastSnapshot,
    pub chat_history: Vec<ChatMessageDto>,
}

/// Periodic broadcast tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastStateMessage {
    pub r#type: MessageType,
    pub snapshot: BroadcastSnapshot,
}

/// Pushed the moment an utterance begins, so connected viewers start
/// fetching audio without waiting for the next tick boundary. Late joiners
/// get the same information inside their join snapshot instead, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAudioMessage {
    pub r#type: MessageType,
    pub audio_url: Option<String>,
    pub start_time: i64,
    pub duration_ms: i64,
    pub message: ChatMessageDto,
}

/// A media request that resolved to something displayable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowMediaMessage {
    pub r#type: MessageType,
    pub media: MediaRef,
    pub query: String,
}

/// Chat fan-out frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBroadcastMessage {
    pub r#type: MessageType,
    pub client_id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: i64,
}

/// Viewer count update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerCountMessage {
    pub r#type: MessageType,
    pub count: usize,
}

/// Stream end notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEndedMessage {
    pub r#type: MessageType,
    pub ended_at: i64,
}

/// Producer-side acknowledgement of a successful start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStartedMessage {
    pub r#type: MessageType,
    pub stream_id: String,
    pub display_name: String,
}

/// Producer-side operation rejection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub r#type: MessageType,
    pub message: String,
}

/// Incoming chat from a viewer connection
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingChatMessage {
    pub content: String,
}

/// Commands arriving on the producer connection
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProducerCommand {
    /// Speak a tagged utterance
    Speak {
        text: String,
        #[serde(default)]
        duration_ms: Option<i64>,
    },
    /// Mutate the avatar pose without an utterance
    SetPose {
        #[serde(flatten)]
        pose: PoseUpdate,
    },
    /// End the stream
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_command_speak_deserializes() {
        // テスト項目: speak コマンドの JSON が正しく解釈される
        // given (前提条件):
        let json = r#"{"type":"speak","text":"[happy] hello","duration_ms":2500}"#;

        // when (操作):
        let command: ProducerCommand = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        match command {
            ProducerCommand::Speak { text, duration_ms } => {
                assert_eq!(text, "[happy] hello");
                assert_eq!(duration_ms, Some(2500));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_producer_command_set_pose_flattens_fields() {
        // テスト項目: set_pose コマンドのポーズフィールドが平坦に読める
        // given (前提条件):
        let json = r#"{"type":"set_pose","expression":"happy","look_x":0.5}"#;

        // when (操作):
        let command: ProducerCommand = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        match command {
            ProducerCommand::SetPose { pose } => {
                assert_eq!(pose.expression, Some(crate::domain::Expression::Happy));
                assert_eq!(pose.look_x, Some(0.5));
                assert_eq!(pose.gesture, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_message_type_serializes_as_snake_case() {
        // テスト項目: フレーム種別が snake_case で直列化される
        // given (前提条件):
        // when (操作):
        let json = serde_json::to_string(&MessageType::NewAudio).unwrap();

        // then (期待する結果):
        assert_eq!(json, r#""new_audio""#);
    }
}
