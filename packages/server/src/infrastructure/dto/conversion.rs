//! Domain model → DTO conversions and frame serialization helpers.
//!
//! The tick loop and the utterance path serialize each frame exactly once
//! and hand the string to the pusher, so every receiver gets an identical
//! byte sequence.

use butai_shared::time::timestamp_to_jst_rfc3339;

use crate::domain::{BroadcastSnapshot, ChatEntry, MediaRef, StreamId, StreamOverview};

use super::http::{StreamDetailDto, StreamSummaryDto};
use super::websocket::{
    BroadcastStateMessage, ChatBroadcastMessage, ChatMessageDto, MessageType, NewAudioMessage,
    ShowMediaMessage, StreamConnectedMessage, StreamEndedMessage, StreamMetaDto,
    ViewerCountMessage,
};

impl From<&ChatEntry> for ChatMessageDto {
    fn from(entry: &ChatEntry) -> Self {
        Self {
            client_id: entry.from.as_str().to_string(),
            role: entry.role,
            content: entry.content.as_str().to_string(),
            timestamp: entry.timestamp.value(),
        }
    }
}

impl From<&StreamOverview> for StreamSummaryDto {
    fn from(overview: &StreamOverview) -> Self {
        Self {
            id: overview.id.as_str().to_string(),
            display_name: overview.display_name.clone(),
            is_live: overview.is_live,
            viewer_count: overview.viewer_count,
            created_at: timestamp_to_jst_rfc3339(overview.created_at.value()),
        }
    }
}

impl From<&StreamOverview> for StreamDetailDto {
    fn from(overview: &StreamOverview) -> Self {
        Self {
            id: overview.id.as_str().to_string(),
            display_name: overview.display_name.clone(),
            is_live: overview.is_live,
            viewer_count: overview.viewer_count,
            total_viewers: overview.stats.total_viewers,
            peak_viewers: overview.stats.peak_viewers,
            message_count: overview.stats.message_count,
            created_at: timestamp_to_jst_rfc3339(overview.created_at.value()),
        }
    }
}

/// 参加直後に送る 1 通（スナップショット + チャット履歴の末尾）
pub fn stream_connected_frame(
    stream_id: &StreamId,
    display_name: &str,
    snapshot: &BroadcastSnapshot,
    chat_tail: &[ChatEntry],
) -> String {
    let msg = StreamConnectedMessage {
        r#type: MessageType::StreamConnected,
        stream: StreamMetaDto {
            id: stream_id.as_str().to_string(),
            display_name: display_name.to_string(),
        },
        snapshot: snapshot.clone(),
        chat_history: chat_tail.iter().map(ChatMessageDto::from).collect(),
    };
    serde_json::to_string(&msg).unwrap()
}

/// 周期 tick のフレーム
pub fn broadcast_state_frame(snapshot: &BroadcastSnapshot) -> String {
    let msg = BroadcastStateMessage {
        r#type: MessageType::BroadcastState,
        snapshot: snapshot.clone(),
    };
    serde_json::to_string(&msg).unwrap()
}

/// 発話開始の即時通知フレーム
pub fn new_audio_frame(
    audio_url: Option<&str>,
    start_time: i64,
    duration_ms: i64,
    message: &ChatEntry,
) -> String {
    let msg = NewAudioMessage {
        r#type: MessageType::NewAudio,
        audio_url: audio_url.map(str::to_string),
        start_time,
        duration_ms,
        message: ChatMessageDto::from(message),
    };
    serde_json::to_string(&msg).unwrap()
}

/// 解決できたメディア要求のフレーム
pub fn show_media_frame(media: &MediaRef, query: &str) -> String {
    let msg = ShowMediaMessage {
        r#type: MessageType::ShowMedia,
        media: media.clone(),
        query: query.to_string(),
    };
    serde_json::to_string(&msg).unwrap()
}

/// チャット送出フレーム
pub fn chat_frame(entry: &ChatEntry) -> String {
    let msg = ChatBroadcastMessage {
        r#type: MessageType::Chat,
        client_id: entry.from.as_str().to_string(),
        role: entry.role,
        content: entry.content.as_str().to_string(),
        timestamp: entry.timestamp.value(),
    };
    serde_json::to_string(&msg).unwrap()
}

/// 視聴者数更新フレーム
pub fn viewer_count_frame(count: usize) -> String {
    let msg = ViewerCountMessage {
        r#type: MessageType::ViewerCount,
        count,
    };
    serde_json::to_string(&msg).unwrap()
}

/// 配信終了フレーム
pub fn stream_ended_frame(ended_at: i64) -> String {
    let msg = StreamEndedMessage {
        r#type: MessageType::StreamEnded,
        ended_at,
    };
    serde_json::to_string(&msg).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BroadcastState, ChatRole, ClientId, MessageContent, Timestamp};

    #[test]
    fn test_stream_connected_frame_shape() {
        // テスト項目: 参加フレームが type・snapshot・履歴を含む
        // given (前提条件):
        let stream_id = StreamId::new("airi".to_string()).unwrap();
        let state = BroadcastState::new();
        let entry = ChatEntry::new(
            ClientId::new("alice".to_string()).unwrap(),
            ChatRole::Viewer,
            MessageContent::new("hi".to_string()).unwrap(),
            Timestamp::new(1_700_000_000_000),
        );

        // when (操作):
        let frame = stream_connected_frame(
            &stream_id,
            "Airi",
            &state.to_snapshot(1_700_000_000_500),
            &[entry],
        );
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "stream_connected");
        assert_eq!(value["stream"]["id"], "airi");
        assert_eq!(value["snapshot"]["server_time"], 1_700_000_000_500i64);
        assert_eq!(value["chat_history"][0]["client_id"], "alice");
        assert_eq!(value["chat_history"][0]["role"], "viewer");
    }

    #[test]
    fn test_new_audio_frame_carries_timing_and_message() {
        // テスト項目: new_audio フレームが開始時刻・時間・メッセージを運ぶ
        // given (前提条件):
        let entry = ChatEntry::new(
            ClientId::new("airi".to_string()).unwrap(),
            ChatRole::Agent,
            MessageContent::new("Hi chat!".to_string()).unwrap(),
            Timestamp::new(1_700_000_000_000),
        );

        // when (操作):
        let frame = new_audio_frame(
            Some("https://media.example/a.mp3"),
            1_700_000_000_000,
            3000,
            &entry,
        );
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "new_audio");
        assert_eq!(value["start_time"], 1_700_000_000_000i64);
        assert_eq!(value["duration_ms"], 3000);
        assert_eq!(value["message"]["role"], "agent");
    }
}
