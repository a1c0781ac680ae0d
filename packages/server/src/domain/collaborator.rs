//! 外部コラボレーターのインターフェース
//!
//! 音声合成・メディア検索・プロデューサー認可はエンジンの外にある。
//! ここではドメイン層が必要とする形だけを trait として定義し、HTTP
//! クライアントなどの実装は Infrastructure 層に置く。
//!
//! コラボレーターの失敗は視聴者にエラーとして見せない。音声合成が落ち
//! ていれば音声なしで発話を続け、メディア検索が外れればそのメディアを
//! 出さないだけにする（モダリティの欠落として退行する）。

use async_trait::async_trait;
use thiserror::Error;

use super::ids::StreamId;
use super::tags::MediaKind;

/// 音声合成の結果
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedSpeech {
    /// 再生可能な音声リソースの URL
    pub audio_url: String,
    /// 合成側が分かっていれば正確な再生時間（ミリ秒）
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("speech synthesis backend unavailable: {0}")]
    Unavailable(String),

    #[error("speech synthesis request failed: {0}")]
    RequestFailed(String),
}

/// 音声合成コラボレーター
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedSpeech, SynthesisError>;
}

/// 表示可能なメディアの参照
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum MediaLookupError {
    #[error("media lookup request failed: {0}")]
    RequestFailed(String),
}

/// メディア検索コラボレーター。ヒットなしは `Ok(None)`（エラーではない）
#[async_trait]
pub trait MediaLookup: Send + Sync {
    async fn lookup(&self, kind: MediaKind, query: &str)
    -> Result<Option<MediaRef>, MediaLookupError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid producer token for stream '{0}'")]
    InvalidToken(String),
}

/// プロデューサー操作の認可コラボレーター
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProducerAuthorizer: Send + Sync {
    async fn authorize(&self, stream_id: &StreamId, token: &str) -> Result<(), AuthError>;
}

/// 音声なし発話のための再生時間の見積もり（ミリ秒）。
///
/// 読み上げ速度の目安から単語数で見積もる。字幕の送り速度に使うだけ
/// なので精度は要らないが、短すぎると読めないため下限を設ける。
pub fn estimate_duration_ms(text: &str) -> i64 {
    let words = text.split_whitespace().count() as i64;
    (words * 375).max(1200)
}
