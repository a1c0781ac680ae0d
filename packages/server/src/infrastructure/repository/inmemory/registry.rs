//! インメモリの StreamRegistry 実装
//!
//! プロセス内の `HashMap` でストリーム ID と配信エンティティを対応付け
//! る。エントリは作成後、プロセスが生きている限り保持される（offline に
//! なっても削除しない）。永続化は行わない。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use butai_shared::time::get_jst_timestamp;

use crate::config::EngineConfig;
use crate::domain::{SharedStream, Stream, StreamId, StreamRegistry, Timestamp};

/// インメモリの StreamRegistry
pub struct InMemoryStreamRegistry {
    streams: Mutex<HashMap<StreamId, SharedStream>>,
    config: EngineConfig,
}

impl InMemoryStreamRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            config,
        }
    }
}

impl Default for InMemoryStreamRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[async_trait]
impl StreamRegistry for InMemoryStreamRegistry {
    async fn get_or_create(&self, id: StreamId, display_name: &str) -> SharedStream {
        let mut streams = self.streams.lock().await;
        if let Some(existing) = streams.get(&id) {
            return Arc::clone(existing);
        }

        tracing::info!("registering new stream '{}'", id);
        let stream = Arc::new(Mutex::new(Stream::with_config(
            id.clone(),
            display_name.to_string(),
            Timestamp::new(get_jst_timestamp()),
            self.config.chat_history_capacity,
            self.config.chunk_policy,
        )));
        streams.insert(id, Arc::clone(&stream));
        stream
    }

    async fn get(&self, id: &StreamId) -> Option<SharedStream> {
        let streams = self.streams.lock().await;
        streams.get(id).map(Arc::clone)
    }

    async fn list(&self) -> Vec<SharedStream> {
        let streams = self.streams.lock().await;
        streams.values().map(Arc::clone).collect()
    }
}
