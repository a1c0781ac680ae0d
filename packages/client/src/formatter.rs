//! Frame formatting for terminal display.

use butai_server::infrastructure::dto::websocket::{
    ChatMessageDto, NewAudioMessage, ShowMediaMessage, StreamConnectedMessage,
};
use butai_shared::time::timestamp_to_jst_rfc3339;

/// Frame formatter for terminal display
pub struct FrameFormatter;

impl FrameFormatter {
    /// Format the join frame: stream header, current playback state and the
    /// recent chat history.
    pub fn format_stream_connected(msg: &StreamConnectedMessage) -> String {
        let mut output = String::new();
        output.push_str("\n\n============================================================\n");
        output.push_str(&format!(
            "Watching '{}' ({})\n",
            msg.stream.display_name, msg.stream.id
        ));

        if msg.snapshot.audio.is_playing {
            output.push_str(&format!(
                "Audio in progress: resume at {}ms of {}ms\n",
                msg.snapshot.audio.position_ms, msg.snapshot.audio.duration_ms
            ));
        } else {
            output.push_str("No audio playing right now\n");
        }
        if msg.snapshot.subtitle.visible {
            output.push_str(&format!("Subtitle: {}\n", msg.snapshot.subtitle.text));
        }

        if msg.chat_history.is_empty() {
            output.push_str("(No chat history)\n");
        } else {
            output.push_str("Recent chat:\n");
            for entry in &msg.chat_history {
                output.push_str(&Self::format_chat_line(entry));
            }
        }
        output.push_str("============================================================\n");
        output
    }

    /// Format one chat history line
    pub fn format_chat_line(entry: &ChatMessageDto) -> String {
        let role = serde_json::to_value(entry.role)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        format!("  [{}] {}: {}\n", role, entry.client_id, entry.content)
    }

    /// Format an incoming live chat message
    pub fn format_chat_message(client_id: &str, content: &str, timestamp: i64) -> String {
        format!(
            "\n{} | {}: {}\n",
            timestamp_to_jst_rfc3339(timestamp),
            client_id,
            content
        )
    }

    /// Format the start of a new utterance
    pub fn format_new_audio(msg: &NewAudioMessage) -> String {
        let audio = match &msg.audio_url {
            Some(url) => format!(" [audio: {} ({}ms)]", url, msg.duration_ms),
            None => " [no audio]".to_string(),
        };
        format!("\n* {} says: {}{}\n", msg.message.client_id, msg.message.content, audio)
    }

    /// Format a subtitle change
    pub fn format_subtitle(text: &str) -> String {
        format!("\n  >> {}\n", text)
    }

    /// Format an avatar pose change (expression / gesture names)
    pub fn format_pose(expression: &str, gesture: Option<&str>) -> String {
        match gesture {
            Some(gesture) => format!("\n  ({} / {})\n", expression, gesture),
            None => format!("\n  ({})\n", expression),
        }
    }

    /// Format a resolved media overlay
    pub fn format_show_media(msg: &ShowMediaMessage) -> String {
        format!("\n  [media '{}': {}]\n", msg.query, msg.media.url)
    }

    /// Format a viewer count update
    pub fn format_viewer_count(count: usize) -> String {
        format!("\n({} viewers watching)\n", count)
    }

    /// Format the stream-end notice
    pub fn format_stream_ended(ended_at: i64) -> String {
        format!(
            "\nStream ended at {}. Thanks for watching!\n",
            timestamp_to_jst_rfc3339(ended_at)
        )
    }

    /// Format a raw frame that could not be parsed
    pub fn format_raw_message(text: &str) -> String {
        format!("\n[raw] {}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butai_server::domain::ChatRole;

    fn chat_dto(client_id: &str, content: &str) -> ChatMessageDto {
        ChatMessageDto {
            client_id: client_id.to_string(),
            role: ChatRole::Viewer,
            content: content.to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_format_chat_line_includes_role_and_sender() {
        // テスト項目: チャット行に区分と送信者が含まれる
        // given (前提条件):
        let entry = chat_dto("alice", "hello");

        // when (操作):
        let line = FrameFormatter::format_chat_line(&entry);

        // then (期待する結果):
        assert!(line.contains("[viewer]"));
        assert!(line.contains("alice: hello"));
    }

    #[test]
    fn test_format_new_audio_without_audio_marks_degraded() {
        // テスト項目: 音声なし発話は [no audio] と表示される
        // given (前提条件):
        let msg = NewAudioMessage {
            r#type: butai_server::infrastructure::dto::websocket::MessageType::NewAudio,
            audio_url: None,
            start_time: 1_700_000_000_000,
            duration_ms: 1500,
            message: chat_dto("airi", "still here"),
        };

        // when (操作):
        let line = FrameFormatter::format_new_audio(&msg);

        // then (期待する結果):
        assert!(line.contains("[no audio]"));
        assert!(line.contains("still here"));
    }

    #[test]
    fn test_format_pose_with_and_without_gesture() {
        // テスト項目: ジェスチャー有無の両方で整形できる
        // given (前提条件):
        // when (操作):
        let with = FrameFormatter::format_pose("happy", Some("wave"));
        let without = FrameFormatter::format_pose("neutral", None);

        // then (期待する結果):
        assert!(with.contains("happy / wave"));
        assert!(without.contains("(neutral)"));
    }
}
