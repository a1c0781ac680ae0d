//! メディア検索コラボレーターの実装
//!
//! `[gif:...]` などのメディア要求を表示可能な URL に解決する。ヒットなし
//! は `Ok(None)` で、エンジン側はそのメディアを出さないだけになる。

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{MediaKind, MediaLookup, MediaLookupError, MediaRef};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    url: String,
}

/// HTTP の検索 API に委譲するメディア検索
pub struct HttpMediaLookup {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMediaLookup {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn kind_param(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Gif => "gif",
            MediaKind::Video => "video",
        }
    }
}

#[async_trait]
impl MediaLookup for HttpMediaLookup {
    async fn lookup(
        &self,
        kind: MediaKind,
        query: &str,
    ) -> Result<Option<MediaRef>, MediaLookupError> {
        let mut request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("kind", Self::kind_param(kind)), ("q", query), ("limit", "1")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MediaLookupError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MediaLookupError::RequestFailed(format!(
                "search backend returned {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| MediaLookupError::RequestFailed(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .next()
            .map(|hit| MediaRef { kind, url: hit.url }))
    }
}

/// バックエンド未設定時のメディア検索。常にヒットなし
pub struct NullMediaLookup;

#[async_trait]
impl MediaLookup for NullMediaLookup {
    async fn lookup(
        &self,
        _kind: MediaKind,
        _query: &str,
    ) -> Result<Option<MediaRef>, MediaLookupError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_media_lookup_never_hits() {
        // テスト項目: Null 実装は常にヒットなしを返す
        // given (前提条件):
        let lookup = NullMediaLookup;

        // when (操作):
        let result = lookup.lookup(MediaKind::Gif, "cats").await;

        // then (期待する結果):
        assert_eq!(result.unwrap(), None);
    }
}
