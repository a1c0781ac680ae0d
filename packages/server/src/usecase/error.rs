//! UseCase 層のエラー型定義

use thiserror::Error;

use crate::domain::{AuthError, DomainError, StreamId};

/// 配信開始のエラー
#[derive(Debug, Error)]
pub enum StartStreamError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    InvalidInput(#[from] DomainError),
}

/// 発話のエラー
#[derive(Debug, Error)]
pub enum SpeakError {
    #[error("stream not found: '{0}'")]
    StreamNotFound(StreamId),

    #[error("stream '{0}' is offline")]
    StreamOffline(StreamId),

    #[error("connection does not hold the producer slot for stream '{0}'")]
    NotProducer(StreamId),
}

/// ポーズ更新のエラー
#[derive(Debug, Error)]
pub enum SetPoseError {
    #[error("stream not found: '{0}'")]
    StreamNotFound(StreamId),

    #[error("stream '{0}' is offline")]
    StreamOffline(StreamId),

    #[error("connection does not hold the producer slot for stream '{0}'")]
    NotProducer(StreamId),
}

/// 配信終了のエラー
#[derive(Debug, Error)]
pub enum EndStreamError {
    #[error("stream not found: '{0}'")]
    StreamNotFound(StreamId),
}

/// 視聴者接続のエラー
#[derive(Debug, Error)]
pub enum ConnectViewerError {
    #[error("stream not found: '{0}'")]
    StreamNotFound(StreamId),

    #[error("client id '{0}' is already connected")]
    DuplicateClientId(String),
}

/// チャット送信のエラー
#[derive(Debug, Error)]
pub enum SendChatError {
    #[error("stream not found: '{0}'")]
    StreamNotFound(StreamId),
}
