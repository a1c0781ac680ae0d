//! 配信 1 本の放送状態（Broadcast State）
//!
//! サーバーが唯一の書き込み権を持つ状態スナップショットで、音声タイム
//! ライン・アバターのポーズ・字幕を保持する。口の開き具合と字幕チャンク
//! は毎 tick、経過時間だけから再導出される（蓄積された差分には依存しな
//! い）。そのため任意の時点で `to_snapshot` を呼べば、途中参加の視聴者
//! にも正しい再生位置が再構成できる。

use serde::{Deserialize, Serialize};

use super::chat::ChatEntry;
use super::tags::{Expression, Gesture, ParsedUtterance};

/// 口の開き具合を経過時間から導出する。
///
/// 実際の音声解析ではなく、発話らしい周波数の正弦波の和を [0, 1] に
/// クランプした表示用の振幅。経過時間のみの純粋関数なので、同じ経過時間
/// からは誰が計算しても同じ値になる。
pub fn mouth_amplitude(elapsed_ms: i64) -> f64 {
    use std::f64::consts::TAU;
    let t = elapsed_ms as f64 / 1000.0;
    let wave = 0.45
        + 0.35 * (TAU * 4.3 * t).sin()
        + 0.20 * (TAU * 2.1 * t + 1.3).sin()
        + 0.15 * (TAU * 6.7 * t + 0.7).sin();
    wave.clamp(0.0, 1.0)
}

/// ポーズの部分更新。音声フィールドには一切触れない。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseUpdate {
    pub expression: Option<Expression>,
    pub gesture: Option<Gesture>,
    pub look_x: Option<f64>,
    pub look_y: Option<f64>,
    pub mouth_open: Option<f64>,
}

/// 放送状態。所有する `Stream` だけが書き込める。
#[derive(Debug, Clone)]
pub struct BroadcastState {
    audio_url: Option<String>,
    audio_start_time: i64,
    audio_duration_ms: i64,
    is_playing: bool,
    mouth_open: f64,
    expression: Expression,
    gesture: Option<Gesture>,
    look_x: f64,
    look_y: f64,
    subtitle_text: String,
    subtitle_visible: bool,
    chunk_index: usize,
    current_message: Option<ChatEntry>,
}

impl Default for BroadcastState {
    fn default() -> Self {
        Self {
            audio_url: None,
            audio_start_time: 0,
            audio_duration_ms: 0,
            is_playing: false,
            mouth_open: 0.0,
            expression: Expression::Neutral,
            gesture: None,
            look_x: 0.0,
            look_y: 0.0,
            subtitle_text: String::new(),
            subtitle_visible: false,
            chunk_index: 0,
            current_message: None,
        }
    }
}

impl BroadcastState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn audio_url(&self) -> Option<&str> {
        self.audio_url.as_deref()
    }

    pub fn audio_start_time(&self) -> i64 {
        self.audio_start_time
    }

    pub fn audio_duration_ms(&self) -> i64 {
        self.audio_duration_ms
    }

    pub fn expression(&self) -> Expression {
        self.expression
    }

    pub fn gesture(&self) -> Option<Gesture> {
        self.gesture
    }

    pub fn mouth_open(&self) -> f64 {
        self.mouth_open
    }

    pub fn subtitle_text(&self) -> &str {
        &self.subtitle_text
    }

    pub fn subtitle_visible(&self) -> bool {
        self.subtitle_visible
    }

    /// 新しい発話を開始する。
    ///
    /// 表情・ジェスチャー・視線・最初の字幕チャンクは次の tick を待たずに
    /// この時点で反映される。進行中の発話があれば無条件で上書きする。
    pub fn begin(
        &mut self,
        audio_url: Option<String>,
        parsed: &ParsedUtterance,
        first_chunk: Option<String>,
        duration_ms: i64,
        message: Option<ChatEntry>,
        now: i64,
    ) {
        self.expression = parsed.expression;
        self.gesture = parsed.gesture;
        let (look_x, look_y) = parsed.look.map(|l| l.vector()).unwrap_or((0.0, 0.0));
        self.look_x = look_x;
        self.look_y = look_y;

        match first_chunk {
            Some(chunk) => {
                self.subtitle_text = chunk;
                self.subtitle_visible = true;
            }
            None => {
                self.subtitle_text.clear();
                self.subtitle_visible = false;
            }
        }
        self.chunk_index = 0;

        self.audio_url = audio_url;
        self.audio_start_time = now;
        self.audio_duration_ms = duration_ms;
        self.is_playing = true;
        self.mouth_open = mouth_amplitude(0);
        self.current_message = message;
    }

    /// tick 時の導出。再生中でなければ何も変えない。
    ///
    /// 経過時間が duration に達した tick で、再生中フィールドすべてを
    /// 同時に休止状態へ戻す。途中の tick を観測しても「再生中なのに期限
    /// 切れ」という状態は見えない。
    pub fn tick(&mut self, now: i64, chunks: &[String]) {
        if !self.is_playing {
            return;
        }

        let elapsed = now - self.audio_start_time;
        if elapsed >= self.audio_duration_ms {
            self.rest();
            return;
        }

        self.mouth_open = mouth_amplitude(elapsed);

        if !chunks.is_empty() && self.audio_duration_ms > 0 {
            let count = chunks.len() as i64;
            let index =
                ((elapsed * count) / self.audio_duration_ms).clamp(0, count - 1) as usize;
            // 帯域節約のため、チャンクが切り替わったときだけ書き換える
            if index != self.chunk_index {
                self.chunk_index = index;
                self.subtitle_text = chunks[index].clone();
            }
        }
    }

    /// 発話終了後の休止状態へ戻す
    fn rest(&mut self) {
        self.is_playing = false;
        self.mouth_open = 0.0;
        self.subtitle_text.clear();
        self.subtitle_visible = false;
        self.audio_url = None;
        self.gesture = None;
        self.chunk_index = 0;
    }

    /// 発話の外でポーズだけを直接更新する（アイドルモーションなど）。
    /// 音声フィールドには触れない。
    pub fn apply_pose(&mut self, pose: &PoseUpdate) {
        if let Some(expression) = pose.expression {
            self.expression = expression;
        }
        if let Some(gesture) = pose.gesture {
            self.gesture = Some(gesture);
        }
        if let Some(x) = pose.look_x {
            self.look_x = x.clamp(-1.0, 1.0);
        }
        if let Some(y) = pose.look_y {
            self.look_y = y.clamp(-1.0, 1.0);
        }
        if let Some(mouth) = pose.mouth_open {
            self.mouth_open = mouth.clamp(0.0, 1.0);
        }
    }

    /// 現時刻のスナップショットを生成する。
    ///
    /// `position_ms` と `server_time` は必ず呼び出し時点で計算する。
    /// 途中参加の視聴者はこの 2 つから再生位置を再構成する。
    pub fn to_snapshot(&self, now: i64) -> BroadcastSnapshot {
        let position_ms = if self.is_playing {
            (now - self.audio_start_time).clamp(0, self.audio_duration_ms)
        } else {
            0
        };

        BroadcastSnapshot {
            audio: AudioSnapshot {
                url: self.audio_url.clone(),
                start_time: self.audio_start_time,
                duration_ms: self.audio_duration_ms,
                is_playing: self.is_playing,
                position_ms,
            },
            avatar: AvatarSnapshot {
                mouth_open: self.mouth_open,
                expression: self.expression,
                gesture: self.gesture,
                look_x: self.look_x,
                look_y: self.look_y,
            },
            subtitle: SubtitleSnapshot {
                text: self.subtitle_text.clone(),
                visible: self.subtitle_visible,
            },
            message: self.current_message.clone(),
            server_time: now,
        }
    }
}

/// 音声タイムラインのスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSnapshot {
    pub url: Option<String>,
    pub start_time: i64,
    pub duration_ms: i64,
    pub is_playing: bool,
    pub position_ms: i64,
}

/// アバターのポーズのスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarSnapshot {
    pub mouth_open: f64,
    pub expression: Expression,
    pub gesture: Option<Gesture>,
    pub look_x: f64,
    pub look_y: f64,
}

/// 字幕のスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSnapshot {
    pub text: String,
    pub visible: bool,
}

/// 放送状態の不変スナップショット。
/// 事前の履歴なしに、これ 1 つでクライアント表示を再構成できる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastSnapshot {
    pub audio: AudioSnapshot,
    pub avatar: AvatarSnapshot,
    pub subtitle: SubtitleSnapshot,
    pub message: Option<ChatEntry>,
    pub server_time: i64,
}
