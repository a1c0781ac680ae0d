//! WebSocket を使った ViewerPusher 実装
//!
//! ## 責務
//!
//! - 視聴者接続ごとの `UnboundedSender` を管理する
//! - シリアライズ済みフレームの送出（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行う。この実装
//! は生成済みの sender を預かってフレームを流すだけで、ワイヤーの都合を
//! エンジン側に持ち込まない。チャネルは無制限だが、接続が切れた sender
//! への送信は失敗として検知され、該当視聴者だけが欠落する。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ClientId, MessagePushError, PusherChannel, ViewerPusher};

/// WebSocket 視聴者接続へのフレーム送出
pub struct WebSocketViewerPusher {
    /// 接続中の視聴者の sender
    ///
    /// Key: client_id (String)
    /// Value: PusherChannel
    clients: Arc<Mutex<HashMap<String, PusherChannel>>>,
}

impl WebSocketViewerPusher {
    pub fn new(clients: Arc<Mutex<HashMap<String, PusherChannel>>>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl ViewerPusher for WebSocketViewerPusher {
    async fn register_client(&self, client_id: String, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(client_id.clone(), sender);
        tracing::debug!("viewer '{}' registered to pusher", client_id);
    }

    async fn unregister_client(&self, client_id: &str) {
        let mut clients = self.clients.lock().await;
        clients.remove(client_id);
        tracing::debug!("viewer '{}' unregistered from pusher", client_id);
    }

    async fn is_registered(&self, client_id: &str) -> bool {
        let clients = self.clients.lock().await;
        clients.contains_key(client_id)
    }

    async fn push_to(&self, client_id: &ClientId, content: &str) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        if let Some(sender) = clients.get(client_id.as_str()) {
            sender
                .send(content.to_string())
                .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
            Ok(())
        } else {
            Err(MessagePushError::ClientNotFound(
                client_id.as_str().to_string(),
            ))
        }
    }

    async fn broadcast(
        &self,
        targets: Vec<ClientId>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            if let Some(sender) = clients.get(target.as_str()) {
                // 一部の送信失敗は許容し、残りへの送出を続ける
                if let Err(e) = sender.send(content.to_string()) {
                    tracing::warn!(
                        "failed to push frame to viewer '{}': {}",
                        target.as_str(),
                        e
                    );
                }
            } else {
                tracing::warn!(
                    "viewer '{}' not found during broadcast, skipping",
                    target.as_str()
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn create_test_pusher() -> (
        WebSocketViewerPusher,
        Arc<Mutex<HashMap<String, PusherChannel>>>,
    ) {
        let clients = Arc::new(Mutex::new(HashMap::new()));
        let pusher = WebSocketViewerPusher::new(clients.clone());
        (pusher, clients)
    }

    #[tokio::test]
    async fn test_push_to_delivers_frame() {
        // テスト項目: 特定の視聴者 1 人にフレームを送れる
        // given (前提条件):
        let (pusher, _clients) = create_test_pusher();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pusher.register_client("alice".to_string(), tx).await;
        let alice = ClientId::new("alice".to_string()).unwrap();

        // when (操作):
        let result = pusher.push_to(&alice, r#"{"type":"viewer_count","count":1}"#).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(
            rx.recv().await,
            Some(r#"{"type":"viewer_count","count":1}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_push_to_unknown_viewer_is_an_error() {
        // テスト項目: 未登録の視聴者への送信はエラーを返す
        // given (前提条件):
        let (pusher, _clients) = create_test_pusher();
        let ghost = ClientId::new("ghost".to_string()).unwrap();

        // when (操作):
        let result = pusher.push_to(&ghost, "frame").await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(MessagePushError::ClientNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_tolerates_missing_targets() {
        // テスト項目: 一部の宛先が欠けてもブロードキャストは成功する
        // given (前提条件):
        let (pusher, _clients) = create_test_pusher();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pusher.register_client("alice".to_string(), tx).await;
        let alice = ClientId::new("alice".to_string()).unwrap();
        let ghost = ClientId::new("ghost".to_string()).unwrap();

        // when (操作):
        let result = pusher.broadcast(vec![alice, ghost], "frame").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some("frame".to_string()));
    }

    #[tokio::test]
    async fn test_register_and_unregister_roundtrip() {
        // テスト項目: 登録・解除が is_registered に反映される
        // given (前提条件):
        let (pusher, _clients) = create_test_pusher();
        let (tx, _rx) = mpsc::unbounded_channel();

        // when & then (操作と期待する結果):
        assert!(!pusher.is_registered("alice").await);
        pusher.register_client("alice".to_string(), tx).await;
        assert!(pusher.is_registered("alice").await);
        pusher.unregister_client("alice").await;
        assert!(!pusher.is_registered("alice").await);
    }
}
