//! チャット関連のドメインモデル

use serde::{Deserialize, Serialize};

use super::ids::{ClientId, MessageContent, Timestamp};

/// 送信者の表示区分
///
/// 表示スタイルにのみ影響し、エンジンの挙動には影響しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// 一般の視聴者
    Viewer,
    /// 配信の所有者（自分の配信を視聴しているプロデューサー本人）
    Owner,
    /// 配信しているエージェント自身の発話
    Agent,
}

/// チャット履歴の 1 エントリ
///
/// 発話（utterance）のトリガーとなったメッセージのスナップショットとしても
/// 使われ、途中参加の視聴者への再掲に利用される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub from: ClientId,
    pub role: ChatRole,
    pub content: MessageContent,
    pub timestamp: Timestamp,
}

impl ChatEntry {
    pub fn new(from: ClientId, role: ChatRole, content: MessageContent, timestamp: Timestamp) -> Self {
        Self {
            from,
            role,
            content,
            timestamp,
        }
    }
}
