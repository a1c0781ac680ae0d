//! UseCase: 配信終了
//!
//! tick ループを即時停止し、offline へ遷移して視聴者へ通知する。複数回
//! 呼んでも安全。プロデューサーの切断経路から呼ばれる場合は、その接続が
//! まだプロデューサー枠を持っているときだけ終了させる（新しい接続に枠を
//! 奪われた後の古い切断で配信を落とさないため）。
//!
//! レジストリのエントリとチャット履歴は削除しない。再接続で同じ ID の
//! 配信を再開できる。

use std::sync::Arc;

use uuid::Uuid;

use butai_shared::time::get_jst_timestamp;

use crate::domain::{StreamId, StreamRegistry, ViewerPusher};
use crate::infrastructure::dto::conversion::stream_ended_frame;

use super::error::EndStreamError;

/// 配信終了のユースケース
pub struct EndStreamUseCase {
    registry: Arc<dyn StreamRegistry>,
    pusher: Arc<dyn ViewerPusher>,
}

impl EndStreamUseCase {
    pub fn new(registry: Arc<dyn StreamRegistry>, pusher: Arc<dyn ViewerPusher>) -> Self {
        Self { registry, pusher }
    }

    /// 配信を終了する
    ///
    /// # Arguments
    ///
    /// * `stream_id` - 配信 ID
    /// * `producer_conn` - 切断経路では呼び出し元接続。`None` は無条件終了
    pub async fn execute(
        &self,
        stream_id: &StreamId,
        producer_conn: Option<Uuid>,
    ) -> Result<(), EndStreamError> {
        let shared = self
            .registry
            .get(stream_id)
            .await
            .ok_or_else(|| EndStreamError::StreamNotFound(stream_id.clone()))?;

        let now = get_jst_timestamp();
        let (handle, targets) = {
            let mut stream = shared.lock().await;

            if let Some(conn) = producer_conn {
                if !stream.is_producer(conn) {
                    // 枠を失った接続の切断。現在の配信はそのまま続ける
                    tracing::debug!(
                        "stale producer connection for stream '{}'; ignoring end",
                        stream_id
                    );
                    return Ok(());
                }
            }

            if !stream.is_live() {
                return Ok(());
            }

            (stream.end(), stream.viewer_ids())
        };

        // offline 遷移後は 1 tick も走らせない
        if let Some(handle) = handle {
            handle.abort();
        }

        tracing::info!("stream '{}' ended", stream_id);

        let frame = stream_ended_frame(now);
        if let Err(e) = self.pusher.broadcast(targets, &frame).await {
            tracing::warn!("failed to broadcast stream_ended: {}", e);
        }
        Ok(())
    }
}
