//! UseCase: ポーズの直接更新
//!
//! 発話を介さずに表情・ジェスチャー・視線だけを変える（アイドル
//! モーションなど）。音声フィールドには触れない。次の tick を待たず、
//! 更新直後のスナップショットを 1 回送出する。

use std::sync::Arc;

use uuid::Uuid;

use butai_shared::time::get_jst_timestamp;

use crate::domain::{PoseUpdate, StreamId, StreamRegistry, ViewerPusher};
use crate::infrastructure::dto::conversion::broadcast_state_frame;

use super::error::SetPoseError;

/// ポーズ更新のユースケース
pub struct SetPoseUseCase {
    registry: Arc<dyn StreamRegistry>,
    pusher: Arc<dyn ViewerPusher>,
}

impl SetPoseUseCase {
    pub fn new(registry: Arc<dyn StreamRegistry>, pusher: Arc<dyn ViewerPusher>) -> Self {
        Self { registry, pusher }
    }

    pub async fn execute(
        &self,
        stream_id: &StreamId,
        producer_conn: Uuid,
        pose: &PoseUpdate,
    ) -> Result<(), SetPoseError> {
        let shared = self
            .registry
            .get(stream_id)
            .await
            .ok_or_else(|| SetPoseError::StreamNotFound(stream_id.clone()))?;

        let (targets, frame) = {
            let mut stream = shared.lock().await;
            let now = get_jst_timestamp();
            if !stream.is_live() {
                return Err(SetPoseError::StreamOffline(stream_id.clone()));
            }
            if !stream.is_producer(producer_conn) {
                return Err(SetPoseError::NotProducer(stream_id.clone()));
            }
            stream.apply_pose(pose);
            (
                stream.viewer_ids(),
                broadcast_state_frame(&stream.snapshot(now)),
            )
        };

        if let Err(e) = self.pusher.broadcast(targets, &frame).await {
            tracing::warn!("failed to broadcast pose update: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientId, Expression};
    use crate::infrastructure::message_pusher::WebSocketViewerPusher;
    use crate::infrastructure::repository::InMemoryStreamRegistry;
    use std::collections::HashMap;
    use tokio::sync::{Mutex, mpsc};

    #[tokio::test]
    async fn test_set_pose_updates_avatar_without_touching_audio() {
        // テスト項目: ポーズ更新が即時送出され、音声フィールドは変わらない
        // given (前提条件): 視聴者 1 人の live 配信
        let registry = Arc::new(InMemoryStreamRegistry::default());
        let clients = Arc::new(Mutex::new(HashMap::new()));
        let pusher = Arc::new(WebSocketViewerPusher::new(clients.clone()));
        let usecase = SetPoseUseCase::new(registry.clone(), pusher.clone());

        let stream_id = StreamId::new("airi".to_string()).unwrap();
        let conn = Uuid::new_v4();
        let shared = registry.get_or_create(stream_id.clone(), "Airi").await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut stream = shared.lock().await;
            stream.go_live(conn, None);
            stream.add_viewer(ClientId::new("alice".to_string()).unwrap());
        }
        clients.lock().await.insert("alice".to_string(), tx);

        // when (操作):
        let pose = PoseUpdate {
            expression: Some(Expression::Happy),
            ..Default::default()
        };
        usecase.execute(&stream_id, conn, &pose).await.unwrap();

        // then (期待する結果): broadcast_state が 1 フレーム届き、音声は休止のまま
        let frame = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "broadcast_state");
        assert_eq!(value["snapshot"]["avatar"]["expression"], "happy");
        assert_eq!(value["snapshot"]["audio"]["is_playing"], false);
        assert!(value["snapshot"]["audio"]["url"].is_null());
    }

    #[tokio::test]
    async fn test_set_pose_requires_producer_slot() {
        // テスト項目: プロデューサー枠のない接続のポーズ更新は拒否される
        // given (前提条件):
        let registry = Arc::new(InMemoryStreamRegistry::default());
        let clients = Arc::new(Mutex::new(HashMap::new()));
        let pusher = Arc::new(WebSocketViewerPusher::new(clients));
        let usecase = SetPoseUseCase::new(registry.clone(), pusher);

        let stream_id = StreamId::new("airi".to_string()).unwrap();
        let shared = registry.get_or_create(stream_id.clone(), "Airi").await;
        shared.lock().await.go_live(Uuid::new_v4(), None);

        // when (操作):
        let result = usecase
            .execute(&stream_id, Uuid::new_v4(), &PoseUpdate::default())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SetPoseError::NotProducer(_))));
    }
}
