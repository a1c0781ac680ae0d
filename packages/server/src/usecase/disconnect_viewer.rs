//! UseCase: 視聴者の切断
//!
//! 視聴者集合とチャネル登録から取り除き、残りの視聴者へ人数更新を送る。
//! 二重に呼ばれても安全。

use std::sync::Arc;

use crate::domain::{ClientId, StreamId, StreamRegistry, ViewerPusher};
use crate::infrastructure::dto::conversion::viewer_count_frame;

/// 視聴者切断のユースケース
pub struct DisconnectViewerUseCase {
    registry: Arc<dyn StreamRegistry>,
    pusher: Arc<dyn ViewerPusher>,
}

impl DisconnectViewerUseCase {
    pub fn new(registry: Arc<dyn StreamRegistry>, pusher: Arc<dyn ViewerPusher>) -> Self {
        Self { registry, pusher }
    }

    pub async fn execute(&self, stream_id: &StreamId, client_id: &ClientId) {
        self.pusher.unregister_client(client_id.as_str()).await;

        let Some(shared) = self.registry.get(stream_id).await else {
            return;
        };

        let (removed, count, remaining) = {
            let mut stream = shared.lock().await;
            let removed = stream.remove_viewer(client_id);
            (removed, stream.viewer_count(), stream.viewer_ids())
        };

        if !removed {
            return;
        }

        tracing::info!("viewer '{}' left stream '{}'", client_id, stream_id);

        let frame = viewer_count_frame(count);
        if let Err(e) = self.pusher.broadcast(remaining, &frame).await {
            tracing::warn!("failed to broadcast viewer count: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::message_pusher::WebSocketViewerPusher;
    use crate::infrastructure::repository::InMemoryStreamRegistry;
    use std::collections::HashMap;
    use tokio::sync::{Mutex, mpsc};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_disconnect_removes_viewer_and_notifies_remaining() {
        // テスト項目: 切断で視聴者が外れ、残りに人数更新が届く
        // given (前提条件): 視聴者 2 人の配信
        let registry = Arc::new(InMemoryStreamRegistry::default());
        let clients = Arc::new(Mutex::new(HashMap::new()));
        let pusher = Arc::new(WebSocketViewerPusher::new(clients.clone()));
        let usecase = DisconnectViewerUseCase::new(registry.clone(), pusher);

        let stream_id = StreamId::new("airi".to_string()).unwrap();
        let shared = registry.get_or_create(stream_id.clone(), "Airi").await;
        let alice = ClientId::new("alice".to_string()).unwrap();
        let bob = ClientId::new("bob".to_string()).unwrap();
        {
            let mut stream = shared.lock().await;
            stream.go_live(Uuid::new_v4(), None);
            stream.add_viewer(alice.clone());
            stream.add_viewer(bob.clone());
        }
        let (alice_tx, _alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        {
            let mut map = clients.lock().await;
            map.insert("alice".to_string(), alice_tx);
            map.insert("bob".to_string(), bob_tx);
        }

        // when (操作): alice が切断する
        usecase.execute(&stream_id, &alice).await;

        // then (期待する結果):
        assert_eq!(shared.lock().await.viewer_count(), 1);
        let frame = bob_rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "viewer_count");
        assert_eq!(value["count"], 1);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        // テスト項目: 同じ視聴者の切断を二重に呼んでも安全
        // given (前提条件):
        let registry = Arc::new(InMemoryStreamRegistry::default());
        let pusher = Arc::new(WebSocketViewerPusher::new(Arc::new(Mutex::new(
            HashMap::new(),
        ))));
        let usecase = DisconnectViewerUseCase::new(registry.clone(), pusher);

        let stream_id = StreamId::new("airi".to_string()).unwrap();
        let shared = registry.get_or_create(stream_id.clone(), "Airi").await;
        let alice = ClientId::new("alice".to_string()).unwrap();
        shared.lock().await.add_viewer(alice.clone());

        // when (操作):
        usecase.execute(&stream_id, &alice).await;
        usecase.execute(&stream_id, &alice).await;

        // then (期待する結果):
        assert_eq!(shared.lock().await.viewer_count(), 0);
    }
}
