//! UseCase: 配信開始
//!
//! プロデューサーの認可、レジストリへの登録（初回のみ作成）、live への
//! 遷移、tick ループの起動までを行う。すでに live の配信に対する開始は
//! 冪等で、プロデューサー枠を新しい接続に付け替えるだけになる。

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{ProducerAuthorizer, SharedStream, StreamId, StreamRegistry};

use super::error::StartStreamError;
use super::ticker::StreamTicker;

/// 配信開始のユースケース
pub struct StartStreamUseCase {
    registry: Arc<dyn StreamRegistry>,
    authorizer: Arc<dyn ProducerAuthorizer>,
    ticker: StreamTicker,
}

impl StartStreamUseCase {
    pub fn new(
        registry: Arc<dyn StreamRegistry>,
        authorizer: Arc<dyn ProducerAuthorizer>,
        ticker: StreamTicker,
    ) -> Self {
        Self {
            registry,
            authorizer,
            ticker,
        }
    }

    /// 配信を開始する
    ///
    /// # Arguments
    ///
    /// * `stream_id` - 配信 ID
    /// * `token` - プロデューサーの認可トークン
    /// * `display_name` - 配信の表示名
    /// * `producer_conn` - この接続の識別子（プロデューサー枠の持ち主になる）
    pub async fn execute(
        &self,
        stream_id: StreamId,
        token: &str,
        display_name: &str,
        producer_conn: Uuid,
    ) -> Result<SharedStream, StartStreamError> {
        self.authorizer.authorize(&stream_id, token).await?;

        let shared = self
            .registry
            .get_or_create(stream_id.clone(), display_name)
            .await;

        {
            let mut stream = shared.lock().await;
            stream.go_live(producer_conn, Some(display_name.to_string()));

            // tick ループは live の間ずっと 1 本だけ走らせる
            if !stream.has_tick_handle() {
                let handle = self.ticker.spawn(Arc::clone(&shared));
                stream.set_tick_handle(handle);
            }
        }

        tracing::info!("stream '{}' is now live", stream_id);
        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuthError;
    use crate::domain::collaborator::MockProducerAuthorizer;
    use crate::infrastructure::message_pusher::WebSocketViewerPusher;
    use crate::infrastructure::repository::InMemoryStreamRegistry;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    fn ticker() -> StreamTicker {
        let pusher = Arc::new(WebSocketViewerPusher::new(Arc::new(Mutex::new(
            HashMap::new(),
        ))));
        StreamTicker::new(pusher, 20)
    }

    #[tokio::test]
    async fn test_start_goes_live_and_spawns_tick_loop() {
        // テスト項目: 開始で live になり tick ループが 1 本起動する
        // given (前提条件):
        let registry = Arc::new(InMemoryStreamRegistry::default());
        let mut authorizer = MockProducerAuthorizer::new();
        authorizer.expect_authorize().returning(|_, _| Ok(()));
        let usecase = StartStreamUseCase::new(registry.clone(), Arc::new(authorizer), ticker());

        // when (操作):
        let stream_id = StreamId::new("airi".to_string()).unwrap();
        let shared = usecase
            .execute(stream_id, "token", "Airi Channel", Uuid::new_v4())
            .await
            .unwrap();

        // then (期待する結果):
        let mut stream = shared.lock().await;
        assert!(stream.is_live());
        assert!(stream.has_tick_handle());
        assert_eq!(stream.display_name(), "Airi Channel");

        // 後始末: ループを止める
        if let Some(handle) = stream.end() {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_start_with_bad_credentials_mutates_nothing() {
        // テスト項目: 認可失敗は拒否され、レジストリに何も作られない
        // given (前提条件):
        let registry = Arc::new(InMemoryStreamRegistry::default());
        let mut authorizer = MockProducerAuthorizer::new();
        authorizer
            .expect_authorize()
            .returning(|id, _| Err(AuthError::InvalidToken(id.as_str().to_string())));
        let usecase = StartStreamUseCase::new(registry.clone(), Arc::new(authorizer), ticker());

        // when (操作):
        let stream_id = StreamId::new("airi".to_string()).unwrap();
        let result = usecase
            .execute(stream_id.clone(), "wrong", "Airi", Uuid::new_v4())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(StartStreamError::Unauthorized(_))));
        assert!(registry.get(&stream_id).await.is_none());
    }

    #[tokio::test]
    async fn test_restart_is_idempotent_and_reuses_tick_loop() {
        // テスト項目: live 中の再開始は同じエンティティを使い、枠だけ付け替える
        // given (前提条件):
        let registry = Arc::new(InMemoryStreamRegistry::default());
        let mut authorizer = MockProducerAuthorizer::new();
        authorizer.expect_authorize().returning(|_, _| Ok(()));
        let usecase = StartStreamUseCase::new(registry.clone(), Arc::new(authorizer), ticker());

        let stream_id = StreamId::new("airi".to_string()).unwrap();
        let first_conn = Uuid::new_v4();
        let second_conn = Uuid::new_v4();

        // when (操作):
        let first = usecase
            .execute(stream_id.clone(), "", "Airi", first_conn)
            .await
            .unwrap();
        let second = usecase
            .execute(stream_id.clone(), "", "Airi Evening", second_conn)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(Arc::ptr_eq(&first, &second));
        let mut stream = second.lock().await;
        assert!(stream.is_live());
        assert!(!stream.is_producer(first_conn));
        assert!(stream.is_producer(second_conn));
        assert_eq!(stream.display_name(), "Airi Evening");

        // 後始末: ループを止める
        if let Some(handle) = stream.end() {
            handle.abort();
        }
    }
}
