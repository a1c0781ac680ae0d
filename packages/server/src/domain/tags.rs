//! 発話テキストに埋め込まれたタグの解釈
//!
//! エージェントの応答テキストには `[happy]` `[wave]` `[gif:cats]` のような
//! 角括弧タグが含まれる。このモジュールはタグを閉じた語彙として解釈し、
//! 表示用テキストからすべての角括弧トークンを除去する。
//!
//! - 表情・視線: 最初に出現したタグのみが有効
//! - ジェスチャー: 3 段階の優先度で解決する（特殊 > 全身 > 腕）。
//!   同じ優先度内では先に出現したものが勝つ
//! - メディア要求: 出現したものすべてを出現順に収集する
//! - 未知の角括弧トークン: どのフィールドにも影響しないが、表示用
//!   テキストからは除去される

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 角括弧トークン（ネストなし）にマッチする
static BRACKET_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("bracket token regex must compile"));

/// 表情タグの閉じた語彙
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Surprised,
    Excited,
    Confused,
    Smug,
}

impl Expression {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "neutral" => Some(Self::Neutral),
            "happy" => Some(Self::Happy),
            "sad" => Some(Self::Sad),
            "angry" => Some(Self::Angry),
            "surprised" => Some(Self::Surprised),
            "excited" => Some(Self::Excited),
            "confused" => Some(Self::Confused),
            "smug" => Some(Self::Smug),
            _ => None,
        }
    }
}

/// ジェスチャーの優先度（値が小さいほど優先）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GestureTier {
    /// 見せ場になる特殊ジェスチャー
    Special,
    /// 全身のモーション
    Body,
    /// 腕の動き
    Arm,
}

/// ジェスチャータグの閉じた語彙
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    // Special
    Magic,
    Heart,
    Spin,
    // Body
    Dance,
    Shy,
    Cute,
    Think,
    Nod,
    // Arm
    Wave,
    Point,
    RaiseArm,
    LowerArm,
    Clap,
}

impl Gesture {
    pub fn tier(&self) -> GestureTier {
        match self {
            Self::Magic | Self::Heart | Self::Spin => GestureTier::Special,
            Self::Dance | Self::Shy | Self::Cute | Self::Think | Self::Nod => GestureTier::Body,
            Self::Wave | Self::Point | Self::RaiseArm | Self::LowerArm | Self::Clap => {
                GestureTier::Arm
            }
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "magic" => Some(Self::Magic),
            "heart" => Some(Self::Heart),
            "spin" => Some(Self::Spin),
            "dance" => Some(Self::Dance),
            "shy" => Some(Self::Shy),
            "cute" => Some(Self::Cute),
            "think" => Some(Self::Think),
            "nod" => Some(Self::Nod),
            "wave" => Some(Self::Wave),
            "point" => Some(Self::Point),
            "raise_arm" => Some(Self::RaiseArm),
            "lower_arm" => Some(Self::LowerArm),
            "clap" => Some(Self::Clap),
            _ => None,
        }
    }
}

/// 視線タグの閉じた語彙
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookDirection {
    Left,
    Right,
    Up,
    Down,
}

impl LookDirection {
    /// 視線方向を固定の単位ベクトル (x, y) にマップする
    pub fn vector(&self) -> (f64, f64) {
        match self {
            Self::Left => (-0.8, 0.0),
            Self::Right => (0.8, 0.0),
            Self::Up => (0.0, 0.8),
            Self::Down => (0.0, -0.8),
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "look_left" => Some(Self::Left),
            "look_right" => Some(Self::Right),
            "look_up" => Some(Self::Up),
            "look_down" => Some(Self::Down),
            _ => None,
        }
    }
}

/// メディア要求の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Gif,
    Video,
}

impl MediaKind {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "gif" => Some(Self::Gif),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// `[gif:query]` 形式のメディア要求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRequest {
    pub kind: MediaKind,
    pub query: String,
}

/// タグ解釈の結果
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUtterance {
    pub expression: Expression,
    pub gesture: Option<Gesture>,
    pub look: Option<LookDirection>,
    pub media_requests: Vec<MediaRequest>,
    pub display_text: String,
}

/// 認識された 1 トークン
enum Tag {
    Expression(Expression),
    Gesture(Gesture),
    Look(LookDirection),
    Media(MediaRequest),
    Unrecognized,
}

fn classify(raw: &str) -> Tag {
    let token = raw.trim();

    // `kind:query` 形式はメディア要求候補。query は原文のまま保持する
    if let Some((kind, query)) = token.split_once(':') {
        let query = query.trim();
        if let Some(kind) = MediaKind::from_token(&kind.trim().to_ascii_lowercase()) {
            if !query.is_empty() {
                return Tag::Media(MediaRequest {
                    kind,
                    query: query.to_string(),
                });
            }
        }
        return Tag::Unrecognized;
    }

    let token = token.to_ascii_lowercase();
    if let Some(e) = Expression::from_token(&token) {
        return Tag::Expression(e);
    }
    if let Some(g) = Gesture::from_token(&token) {
        return Tag::Gesture(g);
    }
    if let Some(l) = LookDirection::from_token(&token) {
        return Tag::Look(l);
    }
    Tag::Unrecognized
}

/// 発話テキストを解釈する。純粋関数で、どんな入力に対しても結果を返す。
pub fn parse(text: &str) -> ParsedUtterance {
    let mut expression: Option<Expression> = None;
    let mut gesture: Option<Gesture> = None;
    let mut look: Option<LookDirection> = None;
    let mut media_requests = Vec::new();

    for caps in BRACKET_TOKEN.captures_iter(text) {
        match classify(&caps[1]) {
            Tag::Expression(e) => {
                // 最初に出現した表情タグのみ有効
                if expression.is_none() {
                    expression = Some(e);
                }
            }
            Tag::Gesture(g) => {
                // より高い優先度のみ置き換える。同じ優先度は先勝ち
                let wins = match gesture {
                    None => true,
                    Some(current) => g.tier() < current.tier(),
                };
                if wins {
                    gesture = Some(g);
                }
            }
            Tag::Look(l) => {
                if look.is_none() {
                    look = Some(l);
                }
            }
            Tag::Media(m) => media_requests.push(m),
            Tag::Unrecognized => {}
        }
    }

    // 認識の有無にかかわらず、角括弧トークンはすべて除去する
    let stripped = BRACKET_TOKEN.replace_all(text, " ");
    let display_text = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    ParsedUtterance {
        expression: expression.unwrap_or_default(),
        gesture,
        look,
        media_requests,
        display_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_returns_defaults() {
        // テスト項目: タグなしテキストはデフォルト値と原文を返す
        // given (前提条件):
        let text = "Hello everyone, welcome back!";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.expression, Expression::Neutral);
        assert_eq!(result.gesture, None);
        assert_eq!(result.look, None);
        assert!(result.media_requests.is_empty());
        assert_eq!(result.display_text, "Hello everyone, welcome back!");
    }

    #[test]
    fn test_parse_first_expression_wins() {
        // テスト項目: 表情タグは最初に出現したものが有効になる
        // given (前提条件):
        let text = "[happy] so glad [sad] to see you";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.expression, Expression::Happy);
        assert_eq!(result.display_text, "so glad to see you");
    }

    #[test]
    fn test_parse_gesture_special_tier_beats_arm_tier() {
        // テスト項目: 腕タグが先に出現しても特殊タグが勝つ
        // given (前提条件):
        let text = "[wave] watch this [magic] tada!";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.gesture, Some(Gesture::Magic));
    }

    #[test]
    fn test_parse_gesture_same_tier_first_wins() {
        // テスト項目: 同じ優先度のジェスチャーは先に出現したものが勝つ
        // given (前提条件):
        let text = "[point] over there [wave] bye";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.gesture, Some(Gesture::Point));
    }

    #[test]
    fn test_parse_look_direction_maps_to_vector() {
        // テスト項目: 視線タグが固定ベクトルにマップされる
        // given (前提条件):
        let text = "[look_left] what is that?";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.look, Some(LookDirection::Left));
        assert_eq!(result.look.unwrap().vector(), (-0.8, 0.0));
    }

    #[test]
    fn test_parse_collects_all_media_requests_in_order() {
        // テスト項目: メディア要求はすべて出現順に収集される
        // given (前提条件):
        let text = "look [gif:cats dancing] and [video:rocket launch] wow [gif:confetti]";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.media_requests.len(), 3);
        assert_eq!(result.media_requests[0].kind, MediaKind::Gif);
        assert_eq!(result.media_requests[0].query, "cats dancing");
        assert_eq!(result.media_requests[1].kind, MediaKind::Video);
        assert_eq!(result.media_requests[1].query, "rocket launch");
        assert_eq!(result.media_requests[2].query, "confetti");
    }

    #[test]
    fn test_parse_strips_unrecognized_bracket_tokens() {
        // テスト項目: 未知の角括弧トークンも表示用テキストから除去される
        // given (前提条件):
        let text = "[frobnicate] hello [?!] world";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.expression, Expression::Neutral);
        assert_eq!(result.gesture, None);
        assert_eq!(result.display_text, "hello world");
    }

    #[test]
    fn test_parse_is_idempotent_on_display_text() {
        // テスト項目: display_text を再度 parse しても変化しない
        // given (前提条件):
        let text = "[excited] [wave] Hi chat! [gif:hello]";

        // when (操作):
        let first = parse(text);
        let second = parse(&first.display_text);

        // then (期待する結果):
        assert_eq!(first.display_text, "Hi chat!");
        assert_eq!(second.display_text, first.display_text);
        assert_eq!(second.expression, Expression::Neutral);
        assert_eq!(second.gesture, None);
        assert!(second.media_requests.is_empty());
    }

    #[test]
    fn test_parse_whitespace_is_collapsed() {
        // テスト項目: タグ除去後の空白が 1 つにまとめられる
        // given (前提条件):
        let text = "  well   [think]  let me   see  ";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.display_text, "well let me see");
        assert_eq!(result.gesture, Some(Gesture::Think));
    }

    #[test]
    fn test_parse_tags_are_case_insensitive_but_query_keeps_case() {
        // テスト項目: タグ名は大文字小文字を無視、メディアの query は原文保持
        // given (前提条件):
        let text = "[HAPPY] look [GIF:Cute Corgi]";

        // when (操作):
        let result = parse(text);

        // then (期待する結果):
        assert_eq!(result.expression, Expression::Happy);
        assert_eq!(result.media_requests[0].query, "Cute Corgi");
    }
}
