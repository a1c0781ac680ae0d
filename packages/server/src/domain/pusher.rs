//! ViewerPusher trait 定義
//!
//! 視聴者接続へのフレーム送出を抽象化する。tick ループと発話開始パスは
//! このインターフェースにシリアライズ済みスナップショットを流すだけで、
//! 実際のワイヤープロトコル（WebSocket など）は Infrastructure 層の
//! アダプタが担う。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::ids::ClientId;

/// 視聴者 1 接続分の送信チャネル
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// フレーム送出のエラー
#[derive(Debug, Error)]
pub enum MessagePushError {
    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// 視聴者へのフレーム送出インターフェース
#[async_trait]
pub trait ViewerPusher: Send + Sync {
    /// 視聴者接続のチャネルを登録する
    async fn register_client(&self, client_id: String, sender: PusherChannel);

    /// 視聴者接続のチャネルを解除する
    async fn unregister_client(&self, client_id: &str);

    /// この ID がすでに登録済みか
    async fn is_registered(&self, client_id: &str) -> bool;

    /// 特定の視聴者 1 人に送る
    async fn push_to(&self, client_id: &ClientId, content: &str) -> Result<(), MessagePushError>;

    /// 対象の視聴者全員に送る。一部の送信失敗は許容する
    async fn broadcast(&self, targets: Vec<ClientId>, content: &str)
    -> Result<(), MessagePushError>;
}
