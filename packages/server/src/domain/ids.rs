//! 値オブジェクト定義
//!
//! ID やメッセージ本文など、バリデーション付きの newtype を定義します。
//! 生成は `new` / `TryFrom<String>` 経由のみで、一度生成された値は常に
//! 不変条件を満たします。

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// ID として許可する最大文字数
const MAX_ID_LEN: usize = 64;

/// チャットメッセージ本文の最大文字数
const MAX_MESSAGE_LEN: usize = 500;

fn is_valid_id(value: &str) -> bool {
    !value.is_empty() && value.chars().count() <= MAX_ID_LEN && !value.contains(char::is_whitespace)
}

/// ストリーム ID（配信 1 本を識別する）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        if is_valid_id(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidStreamId(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StreamId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// クライアント ID（視聴者・プロデューサー接続を識別する）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        if is_valid_id(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidClientId(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// チャットメッセージ本文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, DomainError> {
        let len = value.chars().count();
        if value.trim().is_empty() {
            return Err(DomainError::EmptyMessageContent);
        }
        if len > MAX_MESSAGE_LEN {
            return Err(DomainError::MessageContentTooLong(len, MAX_MESSAGE_LEN));
        }
        Ok(Self(value))
    }

    /// 上限超過を切り詰めて生成する。空入力はプレースホルダになる。
    /// 発話エコーなど、呼び出し側で失敗させたくない経路で使う。
    pub fn truncated(value: String) -> Self {
        let clamped: String = value.chars().take(MAX_MESSAGE_LEN).collect();
        if clamped.trim().is_empty() {
            Self("...".to_string())
        } else {
            Self(clamped)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// タイムスタンプ（JST、ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
