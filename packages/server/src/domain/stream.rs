//! 配信（ストリーム）エンティティ
//!
//! 放送状態・視聴者集合・チャット履歴・統計を所有する。状態機械は
//! `offline → live → offline` のみ。すでに live の開始は冪等で、
//! 最後に認証に成功した接続がプロデューサー枠を取る。
//!
//! 発話はチケット（単調増加の連番）で順序付けられる。音声合成の完了が
//! 遅れて新しい発話に追い越された場合、古いチケットの適用は拒否される。
//! これは想定内の並行性であってエラーではない。

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::broadcast::{BroadcastSnapshot, BroadcastState, PoseUpdate};
use super::chat::ChatEntry;
use super::ids::{ClientId, StreamId, Timestamp};
use super::subtitle::{self, ChunkPolicy};
use super::tags::ParsedUtterance;

/// チャット履歴の保持件数のデフォルト
const DEFAULT_CHAT_CAPACITY: usize = 100;

/// 配信の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Offline,
    Live,
}

/// 配信の統計（単調増加カウンタと最大値のみ）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub total_viewers: u64,
    pub peak_viewers: usize,
    pub message_count: u64,
}

/// 一覧・詳細表示用の読み取り専用ビュー
#[derive(Debug, Clone, Serialize)]
pub struct StreamOverview {
    pub id: StreamId,
    pub display_name: String,
    pub is_live: bool,
    pub viewer_count: usize,
    pub stats: StreamStats,
    pub created_at: Timestamp,
}

/// 配信 1 本。`Arc<Mutex<Stream>>` 経由でのみ共有される（単一書き込み者）。
pub struct Stream {
    id: StreamId,
    display_name: String,
    status: StreamStatus,
    created_at: Timestamp,
    viewers: HashSet<ClientId>,
    chat_history: VecDeque<ChatEntry>,
    chat_capacity: usize,
    chunk_policy: ChunkPolicy,
    stats: StreamStats,
    broadcast: BroadcastState,
    subtitle_chunks: Vec<String>,
    /// 発行済みチケットの最大値
    ticket_counter: u64,
    /// 最後に適用されたチケット
    applied_ticket: u64,
    /// 現在プロデューサー枠を持つ接続
    producer_conn: Option<Uuid>,
    /// tick ループのハンドル。live かつエンジン起動済みのときだけ存在する
    tick_handle: Option<JoinHandle<()>>,
}

impl Stream {
    pub fn new(id: StreamId, display_name: String, created_at: Timestamp) -> Self {
        Self::with_config(
            id,
            display_name,
            created_at,
            DEFAULT_CHAT_CAPACITY,
            ChunkPolicy::default(),
        )
    }

    pub fn with_config(
        id: StreamId,
        display_name: String,
        created_at: Timestamp,
        chat_capacity: usize,
        chunk_policy: ChunkPolicy,
    ) -> Self {
        Self {
            id,
            display_name,
            status: StreamStatus::Offline,
            created_at,
            viewers: HashSet::new(),
            chat_history: VecDeque::new(),
            chat_capacity,
            chunk_policy,
            stats: StreamStats::default(),
            broadcast: BroadcastState::new(),
            subtitle_chunks: Vec::new(),
            ticket_counter: 0,
            applied_ticket: 0,
            producer_conn: None,
            tick_handle: None,
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn is_live(&self) -> bool {
        self.status == StreamStatus::Live
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn broadcast(&self) -> &BroadcastState {
        &self.broadcast
    }

    // ---- 状態機械 ----

    /// 配信を開始する。すでに live なら冪等で、プロデューサー枠と表示名
    /// だけを更新する（最後に成功した開始が勝つ）。
    pub fn go_live(&mut self, producer_conn: Uuid, display_name: Option<String>) {
        self.status = StreamStatus::Live;
        self.producer_conn = Some(producer_conn);
        if let Some(name) = display_name {
            self.display_name = name;
        }
    }

    /// この接続が現在のプロデューサー枠を持っているか
    pub fn is_producer(&self, conn: Uuid) -> bool {
        self.producer_conn == Some(conn)
    }

    /// 配信を終了する。冪等。tick ループのハンドルを返すので、呼び出し側
    /// がロックの外で abort する。
    pub fn end(&mut self) -> Option<JoinHandle<()>> {
        self.status = StreamStatus::Offline;
        self.producer_conn = None;
        self.tick_handle.take()
    }

    pub fn has_tick_handle(&self) -> bool {
        self.tick_handle.is_some()
    }

    pub fn set_tick_handle(&mut self, handle: JoinHandle<()>) {
        self.tick_handle = Some(handle);
    }

    // ---- 視聴者 ----

    /// 視聴者を追加する。重複していれば false。
    pub fn add_viewer(&mut self, client_id: ClientId) -> bool {
        let added = self.viewers.insert(client_id);
        if added {
            self.stats.total_viewers += 1;
            self.stats.peak_viewers = self.stats.peak_viewers.max(self.viewers.len());
        }
        added
    }

    pub fn remove_viewer(&mut self, client_id: &ClientId) -> bool {
        self.viewers.remove(client_id)
    }

    pub fn has_viewer(&self, client_id: &ClientId) -> bool {
        self.viewers.contains(client_id)
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// ブロードキャスト対象（現在の視聴者全員）
    pub fn viewer_ids(&self) -> Vec<ClientId> {
        self.viewers.iter().cloned().collect()
    }

    // ---- チャット ----

    /// チャット履歴に追加する。保持件数を超えた分は古い順に捨てる
    /// （保持ポリシーであってエラーではない）。
    pub fn push_chat(&mut self, entry: ChatEntry) {
        self.chat_history.push_back(entry);
        while self.chat_history.len() > self.chat_capacity {
            self.chat_history.pop_front();
        }
        self.stats.message_count += 1;
    }

    /// 直近 n 件のチャット履歴
    pub fn chat_tail(&self, n: usize) -> Vec<ChatEntry> {
        let skip = self.chat_history.len().saturating_sub(n);
        self.chat_history.iter().skip(skip).cloned().collect()
    }

    pub fn chat_len(&self) -> usize {
        self.chat_history.len()
    }

    // ---- 発話 ----

    /// 発話チケットを発行する。音声合成の前に取得し、合成完了後の適用時に
    /// 追い越し判定に使う。
    pub fn issue_utterance_ticket(&mut self) -> u64 {
        self.ticket_counter += 1;
        self.ticket_counter
    }

    /// このチケットの発話がまだ現在の発話か（メディア解決の遅延適用判定用）
    pub fn is_current_utterance(&self, ticket: u64) -> bool {
        self.applied_ticket == ticket
    }

    /// 発話を開始する。より新しい発話がすでに始まっていれば適用せず false
    /// を返す（遅れて届いた古い合成結果は黙って捨てる）。
    pub fn begin_utterance(
        &mut self,
        ticket: u64,
        audio_url: Option<String>,
        parsed: &ParsedUtterance,
        duration_ms: i64,
        message: Option<ChatEntry>,
        now: i64,
    ) -> bool {
        if ticket <= self.applied_ticket {
            return false;
        }
        self.applied_ticket = ticket;

        self.subtitle_chunks = subtitle::chunk(&parsed.display_text, &self.chunk_policy);
        let first_chunk = self.subtitle_chunks.first().cloned();
        self.broadcast
            .begin(audio_url, parsed, first_chunk, duration_ms, message, now);
        true
    }

    /// tick 時の状態導出
    pub fn tick(&mut self, now: i64) {
        self.broadcast.tick(now, &self.subtitle_chunks);
    }

    /// ポーズの直接更新
    pub fn apply_pose(&mut self, pose: &PoseUpdate) {
        self.broadcast.apply_pose(pose);
    }

    /// 現時刻のスナップショット
    pub fn snapshot(&self, now: i64) -> BroadcastSnapshot {
        self.broadcast.to_snapshot(now)
    }

    pub fn overview(&self) -> StreamOverview {
        StreamOverview {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            is_live: self.is_live(),
            viewer_count: self.viewers.len(),
            stats: self.stats,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::ChatRole;
    use crate::domain::ids::MessageContent;
    use crate::domain::tags;

    const T0: i64 = 1_700_000_000_000;

    fn test_stream() -> Stream {
        Stream::new(
            StreamId::new("airi".to_string()).unwrap(),
            "Airi Channel".to_string(),
            Timestamp::new(T0),
        )
    }

    fn chat_entry(from: &str, content: &str, at: i64) -> ChatEntry {
        ChatEntry::new(
            ClientId::new(from.to_string()).unwrap(),
            ChatRole::Viewer,
            MessageContent::new(content.to_string()).unwrap(),
            Timestamp::new(at),
        )
    }

    fn begin(stream: &mut Stream, text: &str, duration_ms: i64, now: i64) -> u64 {
        let ticket = stream.issue_utterance_ticket();
        let parsed = tags::parse(text);
        let applied = stream.begin_utterance(
            ticket,
            Some("https://media.example/a.mp3".to_string()),
            &parsed,
            duration_ms,
            None,
            now,
        );
        assert!(applied);
        ticket
    }

    #[test]
    fn test_late_join_snapshot_reconstructs_exact_offset() {
        // テスト項目: T0 開始の発話に T0+Δ で参加した視聴者の再生位置が Δ になる
        // given (前提条件): T0 に 3000ms の発話を開始
        let mut stream = test_stream();
        begin(&mut stream, "[excited] Hello chat!", 3000, T0);

        // when (操作): 1200ms 後に参加した視聴者向けのスナップショット
        stream.tick(T0 + 1200);
        let snapshot = stream.snapshot(T0 + 1200);

        // then (期待する結果):
        assert!(snapshot.audio.is_playing);
        assert_eq!(snapshot.audio.position_ms, 1200);

        // 1 秒後に参加した別の視聴者はちょうど 1 秒大きいオフセットになる
        stream.tick(T0 + 2200);
        let later = stream.snapshot(T0 + 2200);
        assert_eq!(later.audio.position_ms, 2200);
    }

    #[test]
    fn test_join_after_expiry_sees_rest_state() {
        // テスト項目: 発話終了後に参加した視聴者は休止状態を受け取る
        // given (前提条件):
        let mut stream = test_stream();
        begin(&mut stream, "Short hello.", 1000, T0);

        // when (操作): duration 経過後の tick とスナップショット
        stream.tick(T0 + 1500);
        let snapshot = stream.snapshot(T0 + 1500);

        // then (期待する結果): 音声なし・字幕なし
        assert!(!snapshot.audio.is_playing);
        assert_eq!(snapshot.audio.url, None);
        assert_eq!(snapshot.audio.position_ms, 0);
        assert!(!snapshot.subtitle.visible);
        assert_eq!(snapshot.avatar.mouth_open, 0.0);
    }

    #[test]
    fn test_stale_synthesis_result_is_discarded() {
        // テスト項目: 追い越された古いチケットの発話は適用されない
        // given (前提条件): チケット 1 を発行した後、チケット 2 の発話が先に始まる
        let mut stream = test_stream();
        let stale_ticket = stream.issue_utterance_ticket();
        let newer_ticket = stream.issue_utterance_ticket();

        let newer = tags::parse("[happy] newer utterance");
        assert!(stream.begin_utterance(
            newer_ticket,
            Some("https://media.example/new.mp3".to_string()),
            &newer,
            3000,
            None,
            T0,
        ));

        // when (操作): 遅れて届いた古い合成結果を適用しようとする
        let stale = tags::parse("[sad] stale utterance");
        let applied = stream.begin_utterance(
            stale_ticket,
            Some("https://media.example/old.mp3".to_string()),
            &stale,
            2000,
            None,
            T0 + 100,
        );

        // then (期待する結果): 適用されず、新しい発話の状態が保たれる
        assert!(!applied);
        assert_eq!(stream.broadcast().audio_url(), Some("https://media.example/new.mp3"));
        assert_eq!(
            stream.broadcast().expression(),
            crate::domain::tags::Expression::Happy
        );
        assert!(stream.is_current_utterance(newer_ticket));
        assert!(!stream.is_current_utterance(stale_ticket));
    }

    #[test]
    fn test_go_live_is_idempotent_and_last_producer_wins() {
        // テスト項目: live 中の再開始は冪等で、プロデューサー枠は後勝ち
        // given (前提条件):
        let mut stream = test_stream();
        let first_conn = Uuid::new_v4();
        let second_conn = Uuid::new_v4();

        // when (操作):
        stream.go_live(first_conn, None);
        stream.go_live(second_conn, Some("Airi 2nd Session".to_string()));

        // then (期待する結果):
        assert!(stream.is_live());
        assert!(!stream.is_producer(first_conn));
        assert!(stream.is_producer(second_conn));
        assert_eq!(stream.display_name(), "Airi 2nd Session");
    }

    #[test]
    fn test_end_is_idempotent() {
        // テスト項目: 終了は複数回呼んでも安全
        // given (前提条件):
        let mut stream = test_stream();
        stream.go_live(Uuid::new_v4(), None);

        // when (操作):
        let first = stream.end();
        let second = stream.end();

        // then (期待する結果):
        assert!(!stream.is_live());
        assert!(first.is_none()); // tick ハンドル未設定なら None
        assert!(second.is_none());
    }

    #[test]
    fn test_viewer_stats_are_monotonic() {
        // テスト項目: total_viewers は単調増加、peak_viewers は最大値を保持
        // given (前提条件):
        let mut stream = test_stream();
        let alice = ClientId::new("alice".to_string()).unwrap();
        let bob = ClientId::new("bob".to_string()).unwrap();

        // when (操作): 2 人参加して 1 人離脱、さらに 1 人参加
        assert!(stream.add_viewer(alice.clone()));
        assert!(stream.add_viewer(bob.clone()));
        stream.remove_viewer(&alice);
        let carol = ClientId::new("carol".to_string()).unwrap();
        assert!(stream.add_viewer(carol));

        // then (期待する結果):
        assert_eq!(stream.stats().total_viewers, 3);
        assert_eq!(stream.stats().peak_viewers, 2);
        assert_eq!(stream.viewer_count(), 2);
    }

    #[test]
    fn test_duplicate_viewer_is_rejected() {
        // テスト項目: 同じ視聴者の二重追加は false を返しカウントも増えない
        // given (前提条件):
        let mut stream = test_stream();
        let alice = ClientId::new("alice".to_string()).unwrap();
        assert!(stream.add_viewer(alice.clone()));

        // when (操作):
        let added = stream.add_viewer(alice);

        // then (期待する結果):
        assert!(!added);
        assert_eq!(stream.stats().total_viewers, 1);
    }

    #[test]
    fn test_chat_history_is_trimmed_to_capacity() {
        // テスト項目: チャット履歴は保持件数を超えた分が古い順に捨てられる
        // given (前提条件): 保持件数 3 のストリーム
        let mut stream = Stream::with_config(
            StreamId::new("airi".to_string()).unwrap(),
            "Airi".to_string(),
            Timestamp::new(T0),
            3,
            ChunkPolicy::default(),
        );

        // when (操作): 5 件追加
        for i in 0..5 {
            stream.push_chat(chat_entry("alice", &format!("message {i}"), T0 + i));
        }

        // then (期待する結果): 新しい 3 件だけが残り、カウンタは総数を数える
        assert_eq!(stream.chat_len(), 3);
        let tail = stream.chat_tail(10);
        assert_eq!(tail[0].content.as_str(), "message 2");
        assert_eq!(tail[2].content.as_str(), "message 4");
        assert_eq!(stream.stats().message_count, 5);
    }

    #[test]
    fn test_chat_tail_returns_most_recent_entries() {
        // テスト項目: chat_tail は直近 n 件を古い順で返す
        // given (前提条件):
        let mut stream = test_stream();
        for i in 0..10 {
            stream.push_chat(chat_entry("bob", &format!("m{i}"), T0 + i));
        }

        // when (操作):
        let tail = stream.chat_tail(4);

        // then (期待する結果):
        assert_eq!(tail.len(), 4);
        assert_eq!(tail[0].content.as_str(), "m6");
        assert_eq!(tail[3].content.as_str(), "m9");
    }
}
