//! UseCase: 視聴者の接続
//!
//! 参加時の同期が正しさの中心になる。参加した視聴者はまず、現在の経過
//! 時間から再構成したスナップショット（とチャット履歴の末尾）を 1 通
//! 受け取り、その後に周期 tick を受け取り始める。この順序はストリームの
//! ロックを保持したままスナップショットをキューに積むことで保証する。
//! tick ループも発話開始も同じロックを取るため、参加スナップショットより
//! 古い状態のフレームが後から届くことはない。
//!
//! 発話がすでに終わっていれば休止状態のスナップショットが届くだけで、
//! 過去の音声が遡って再生されることはない。

use std::sync::Arc;

use butai_shared::time::get_jst_timestamp;

use crate::domain::{ClientId, PusherChannel, StreamId, StreamRegistry, Timestamp, ViewerPusher};
use crate::infrastructure::dto::conversion::{stream_connected_frame, viewer_count_frame};

use super::error::ConnectViewerError;

/// 視聴者接続のユースケース
pub struct ConnectViewerUseCase {
    registry: Arc<dyn StreamRegistry>,
    pusher: Arc<dyn ViewerPusher>,
    /// 参加時に送るチャット履歴の件数
    chat_tail_len: usize,
}

impl ConnectViewerUseCase {
    pub fn new(
        registry: Arc<dyn StreamRegistry>,
        pusher: Arc<dyn ViewerPusher>,
        chat_tail_len: usize,
    ) -> Self {
        Self {
            registry,
            pusher,
            chat_tail_len,
        }
    }

    /// 視聴者を配信に接続する
    ///
    /// # Returns
    ///
    /// * `Ok(Timestamp)` - 接続時刻
    /// * `Err(ConnectViewerError)` - 配信が存在しない、または ID が重複
    pub async fn execute(
        &self,
        stream_id: &StreamId,
        client_id: ClientId,
        sender: PusherChannel,
    ) -> Result<Timestamp, ConnectViewerError> {
        let shared = self
            .registry
            .get(stream_id)
            .await
            .ok_or_else(|| ConnectViewerError::StreamNotFound(stream_id.clone()))?;

        if self.pusher.is_registered(client_id.as_str()).await {
            return Err(ConnectViewerError::DuplicateClientId(
                client_id.to_string(),
            ));
        }

        let (now, count, others) = {
            let mut stream = shared.lock().await;
            let now = get_jst_timestamp();
            if !stream.add_viewer(client_id.clone()) {
                return Err(ConnectViewerError::DuplicateClientId(
                    client_id.to_string(),
                ));
            }
            self.pusher
                .register_client(client_id.to_string(), sender)
                .await;

            // 参加スナップショットは必ず最初の周期 tick より先に届ける。
            // ロック保持中に導出してキューに積むことで順序が決まる
            stream.tick(now);
            let frame = stream_connected_frame(
                stream.id(),
                stream.display_name(),
                &stream.snapshot(now),
                &stream.chat_tail(self.chat_tail_len),
            );
            if let Err(e) = self.pusher.push_to(&client_id, &frame).await {
                tracing::warn!("failed to send join snapshot to '{}': {}", client_id, e);
            }

            let others: Vec<ClientId> = stream
                .viewer_ids()
                .into_iter()
                .filter(|id| id != &client_id)
                .collect();
            (now, stream.viewer_count(), others)
        };

        tracing::info!("viewer '{}' joined stream '{}'", client_id, stream_id);

        let frame = viewer_count_frame(count);
        if let Err(e) = self.pusher.broadcast(others, &frame).await {
            tracing::warn!("failed to broadcast viewer count: {}", e);
        }

        Ok(Timestamp::new(now))
    }
}
