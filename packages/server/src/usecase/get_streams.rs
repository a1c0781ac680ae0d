//! UseCase: 配信一覧・詳細の取得
//!
//! ディスカバリ用の読み取り専用操作。状態は一切変更しない。

use std::sync::Arc;

use butai_shared::time::get_jst_timestamp;

use crate::domain::{BroadcastSnapshot, StreamId, StreamOverview, StreamRegistry};

/// 配信一覧・詳細取得のユースケース
pub struct GetStreamsUseCase {
    registry: Arc<dyn StreamRegistry>,
}

impl GetStreamsUseCase {
    pub fn new(registry: Arc<dyn StreamRegistry>) -> Self {
        Self { registry }
    }

    /// 登録済みの全配信の概要
    pub async fn list(&self) -> Vec<StreamOverview> {
        let mut overviews = Vec::new();
        for shared in self.registry.list().await {
            overviews.push(shared.lock().await.overview());
        }
        // ID 順で安定した並びにする
        overviews.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        overviews
    }

    /// 1 配信の概要
    pub async fn detail(&self, stream_id: &StreamId) -> Option<StreamOverview> {
        let shared = self.registry.get(stream_id).await?;
        let overview = shared.lock().await.overview();
        Some(overview)
    }

    /// デバッグ用: 概要と現時刻のスナップショット
    pub async fn debug_snapshot(
        &self,
        stream_id: &StreamId,
    ) -> Option<(StreamOverview, BroadcastSnapshot)> {
        let shared = self.registry.get(stream_id).await?;
        let stream = shared.lock().await;
        Some((stream.overview(), stream.snapshot(get_jst_timestamp())))
    }
}
