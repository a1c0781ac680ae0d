//! 音声合成コラボレーターの実装
//!
//! 実際の合成は外部サービスが行う。ここでは HTTP 経由の実装と、バック
//! エンド未設定時に使う Null 実装を提供する。Null 実装は常に「利用不可」
//! を返し、発話は音声なしに退行する（字幕と表情は出る）。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{SpeechSynthesizer, SynthesisError, SynthesizedSpeech};

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    audio_url: String,
    #[serde(default)]
    duration_ms: Option<i64>,
}

/// HTTP バックエンドに委譲する音声合成
pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedSpeech, SynthesisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SynthesisRequest { text })
            .send()
            .await
            .map_err(|e| SynthesisError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SynthesisError::RequestFailed(format!(
                "backend returned {}",
                response.status()
            )));
        }

        let body: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::RequestFailed(e.to_string()))?;

        Ok(SynthesizedSpeech {
            audio_url: body.audio_url,
            duration_ms: body.duration_ms,
        })
    }
}

/// バックエンド未設定時の音声合成。常に利用不可を返す
pub struct NullSpeechSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NullSpeechSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<SynthesizedSpeech, SynthesisError> {
        Err(SynthesisError::Unavailable(
            "no synthesis backend configured".to_string(),
        ))
    }
}
