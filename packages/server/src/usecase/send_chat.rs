//! UseCase: チャット送信
//!
//! 履歴（保持件数で切り詰め）へ追加し、送信者以外の視聴者へ送出する。
//! 送信者の画面には送信側でローカルにエコーする。送信者の区分
//! （viewer / owner / agent）は表示スタイルにのみ使われ、エンジンの挙動
//! を変えない。

use std::sync::Arc;

use butai_shared::time::get_jst_timestamp;

use crate::domain::{
    ChatEntry, ChatRole, ClientId, MessageContent, StreamId, StreamRegistry, Timestamp,
    ViewerPusher,
};
use crate::infrastructure::dto::conversion::chat_frame;

use super::error::SendChatError;

/// チャット送信のユースケース
pub struct SendChatUseCase {
    registry: Arc<dyn StreamRegistry>,
    pusher: Arc<dyn ViewerPusher>,
}

impl SendChatUseCase {
    pub fn new(registry: Arc<dyn StreamRegistry>, pusher: Arc<dyn ViewerPusher>) -> Self {
        Self { registry, pusher }
    }

    /// チャットを送信する
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ClientId>)` - 送出対象になった視聴者
    pub async fn execute(
        &self,
        stream_id: &StreamId,
        from: ClientId,
        role: ChatRole,
        content: MessageContent,
    ) -> Result<Vec<ClientId>, SendChatError> {
        let shared = self
            .registry
            .get(stream_id)
            .await
            .ok_or_else(|| SendChatError::StreamNotFound(stream_id.clone()))?;

        let entry = ChatEntry::new(
            from.clone(),
            role,
            content,
            Timestamp::new(get_jst_timestamp()),
        );

        let targets: Vec<ClientId> = {
            let mut stream = shared.lock().await;
            stream.push_chat(entry.clone());
            stream
                .viewer_ids()
                .into_iter()
                .filter(|id| id != &from)
                .collect()
        };

        if let Err(e) = self.pusher.broadcast(targets.clone(), &chat_frame(&entry)).await {
            tracing::warn!("failed to broadcast chat message: {}", e);
        }

        Ok(targets)
    }
}
