//! 固定レートの tick ループ
//!
//! live な配信 1 本につき 1 つの tokio タスクがこのループを回す。
//! 1 tick の仕事は「状態を経過時間から導出し、スナップショットを全視聴
//! 者へ送出する」だけで、外部コラボレーターを await しない。これが tick
//! の遅延を抑え、20Hz のケイデンスを保つ。
//!
//! 視聴者が 0 人の間は送出を省く。状態は常に経過時間から再導出されるの
//! で、送らなかった tick に依存する状態は存在しない。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use butai_shared::time::get_jst_timestamp;

use crate::domain::{SharedStream, ViewerPusher};
use crate::infrastructure::dto::conversion::broadcast_state_frame;

/// 配信ごとの tick ループを生成する
pub struct StreamTicker {
    pusher: Arc<dyn ViewerPusher>,
    tick_interval: Duration,
}

impl StreamTicker {
    pub fn new(pusher: Arc<dyn ViewerPusher>, tick_interval_ms: u64) -> Self {
        Self {
            pusher,
            tick_interval: Duration::from_millis(tick_interval_ms.max(1)),
        }
    }

    /// 配信の tick ループを起動する。
    ///
    /// ループは配信が offline になった時点で自ら止まる。即時停止が必要な
    /// 場合（配信終了）は返り値のハンドルを abort する。
    pub fn spawn(&self, stream: SharedStream) -> JoinHandle<()> {
        let pusher = Arc::clone(&self.pusher);
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let (targets, frame) = {
                    let mut stream = stream.lock().await;
                    // 時刻はロック取得後に読む。ロックが配信ごとの全書き込み
                    // を直列化するので、視聴者から見た position は後戻りしない
                    let now = get_jst_timestamp();
                    if !stream.is_live() {
                        tracing::debug!(
                            "stream '{}' went offline; stopping tick loop",
                            stream.id()
                        );
                        break;
                    }

                    stream.tick(now);

                    if stream.viewer_count() == 0 {
                        continue;
                    }

                    (stream.viewer_ids(), broadcast_state_frame(&stream.snapshot(now)))
                };

                // 送信失敗は該当視聴者の欠落として扱い、ループは続ける
                if let Err(e) = pusher.broadcast(targets, &frame).await {
                    tracing::warn!("failed to broadcast tick frame: {}", e);
                }
            }
        })
    }
}
