//! UseCase: 発話
//!
//! エージェントの応答テキストを 1 回の発話として配信に載せる。
//!
//! 1. タグを解釈して表情・ジェスチャー・メディア要求・表示テキストを得る
//! 2. 発話チケットを取り、音声合成を await する（ロックの外）
//! 3. 合成完了後、チケットがまだ最新なら放送状態を切り替える。
//!    すでに新しい発話に追い越されていたら結果は黙って捨てる
//! 4. その時点で接続済みの視聴者にだけ `new_audio` イベントを即時送出する
//!    （以降に参加する視聴者は参加時スナップショットで同じ情報を得るの
//!    で、二重に開始が通知されることはない）
//! 5. メディア要求を解決できたものだけ `show_media` として送出する
//!
//! 音声合成の失敗は発話を止めない。音声なし・見積もり時間で字幕と表情
//! だけの発話に退行する。

use std::sync::Arc;

use uuid::Uuid;

use butai_shared::time::get_jst_timestamp;

use crate::domain::{
    ChatEntry, ChatRole, ClientId, MediaLookup, MessageContent, SpeechSynthesizer, StreamId,
    StreamRegistry, Timestamp, ViewerPusher, estimate_duration_ms, tags,
};
use crate::infrastructure::dto::conversion::{chat_frame, new_audio_frame, show_media_frame};

use super::error::SpeakError;

/// 発話のユースケース
pub struct SpeakUseCase {
    registry: Arc<dyn StreamRegistry>,
    pusher: Arc<dyn ViewerPusher>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    media_lookup: Arc<dyn MediaLookup>,
}

impl SpeakUseCase {
    pub fn new(
        registry: Arc<dyn StreamRegistry>,
        pusher: Arc<dyn ViewerPusher>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        media_lookup: Arc<dyn MediaLookup>,
    ) -> Self {
        Self {
            registry,
            pusher,
            synthesizer,
            media_lookup,
        }
    }

    /// 発話を実行する
    ///
    /// # Arguments
    ///
    /// * `stream_id` - 配信 ID
    /// * `producer_conn` - 呼び出し元接続（プロデューサー枠の確認に使う）
    /// * `text` - タグ入りの発話テキスト
    /// * `estimated_duration_ms` - 呼び出し元が知っている再生時間（省略可）
    pub async fn execute(
        &self,
        stream_id: &StreamId,
        producer_conn: Uuid,
        text: &str,
        estimated_duration_ms: Option<i64>,
    ) -> Result<(), SpeakError> {
        let shared = self
            .registry
            .get(stream_id)
            .await
            .ok_or_else(|| SpeakError::StreamNotFound(stream_id.clone()))?;

        let parsed = tags::parse(text);

        // チケットは合成の前に取る。合成中に新しい発話が始まったら、この
        // チケットは追い越されており適用されない
        let ticket = {
            let mut stream = shared.lock().await;
            if !stream.is_live() {
                return Err(SpeakError::StreamOffline(stream_id.clone()));
            }
            if !stream.is_producer(producer_conn) {
                return Err(SpeakError::NotProducer(stream_id.clone()));
            }
            stream.issue_utterance_ticket()
        };

        // 音声合成はロックの外で await する。失敗しても発話は続ける
        let (audio_url, duration_ms) = match self.synthesizer.synthesize(&parsed.display_text).await
        {
            Ok(speech) => {
                let duration = estimated_duration_ms
                    .or(speech.duration_ms)
                    .unwrap_or_else(|| estimate_duration_ms(&parsed.display_text));
                (Some(speech.audio_url), duration)
            }
            Err(e) => {
                tracing::warn!(
                    "speech synthesis failed for stream '{}'; continuing without audio: {}",
                    stream_id,
                    e
                );
                let duration = estimated_duration_ms
                    .unwrap_or_else(|| estimate_duration_ms(&parsed.display_text));
                (None, duration)
            }
        };

        let media_requests = parsed.media_requests.clone();

        // 放送状態の切り替えと通知対象の確定は同じロック区間で行う。
        // ここで確定した視聴者だけが new_audio を受け取る。開始時刻も
        // ロック内で読み、視聴者から見た position が後戻りしないようにする
        let (targets, entry, now) = {
            let mut stream = shared.lock().await;
            let now = get_jst_timestamp();
            let entry = ChatEntry::new(
                ClientId::new(stream_id.as_str().to_string())
                    .expect("stream id is a valid client id"),
                ChatRole::Agent,
                // タグのみの発話でもメッセージスナップショットは残す
                MessageContent::truncated(parsed.display_text.clone()),
                Timestamp::new(now),
            );
            let applied = stream.begin_utterance(
                ticket,
                audio_url.clone(),
                &parsed,
                duration_ms,
                Some(entry.clone()),
                now,
            );
            if !applied {
                tracing::debug!(
                    "utterance for stream '{}' superseded before synthesis completed; dropping",
                    stream_id
                );
                return Ok(());
            }
            stream.push_chat(entry.clone());
            (stream.viewer_ids(), entry, now)
        };

        let frame = new_audio_frame(audio_url.as_deref(), now, duration_ms, &entry);
        if let Err(e) = self.pusher.broadcast(targets.clone(), &frame).await {
            tracing::warn!("failed to broadcast new_audio: {}", e);
        }
        if let Err(e) = self.pusher.broadcast(targets, &chat_frame(&entry)).await {
            tracing::warn!("failed to broadcast utterance chat echo: {}", e);
        }

        // メディア要求の解決は発話開始後に行う。外れは黙って飛ばす
        for request in media_requests {
            match self.media_lookup.lookup(request.kind, &request.query).await {
                Ok(Some(media)) => {
                    let targets = {
                        let stream = shared.lock().await;
                        // 解決中に発話が替わっていたら出さない
                        if !stream.is_current_utterance(ticket) {
                            break;
                        }
                        stream.viewer_ids()
                    };
                    let frame = show_media_frame(&media, &request.query);
                    if let Err(e) = self.pusher.broadcast(targets, &frame).await {
                        tracing::warn!("failed to broadcast show_media: {}", e);
                    }
                }
                Ok(None) => {
                    tracing::debug!("no media hit for {:?} '{}'", request.kind, request.query);
                }
                Err(e) => {
                    tracing::warn!(
                        "media lookup failed for {:?} '{}': {}",
                        request.kind,
                        request.query,
                        e
                    );
                }
            }
        }

        Ok(())
    }
}
