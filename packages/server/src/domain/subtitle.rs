//! 字幕チャンク分割
//!
//! 発話テキスト（タグ除去済み）を、読みやすい長さの短いチャンク列に分割
//! する。分割は決定的で、単語を落とすことも並べ替えることもない。
//! チャンクの切り替えは再生経過時間から導出されるため、同じ入力は常に
//! 同じチャンク列にならなければならない。

use serde::{Deserialize, Serialize};

/// 文末として扱う記号
const SENTENCE_END: &[char] = &['.', '!', '?', '…'];

/// 節の区切りとして扱う記号
const CLAUSE_END: &[char] = &[',', ';', ':'];

/// 強制分割時に直後で切りたい接続語
const CONNECTIVES: &[&str] = &[
    "and", "but", "or", "so", "then", "because", "that", "which", "while", "when",
];

/// チャンク分割の上限パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPolicy {
    /// この単語数以下の文はそのまま 1 チャンクになる
    pub max_sentence_words: usize,
    /// この単語数以下の節はそのまま 1 チャンクになる
    pub max_clause_words: usize,
    /// それでも長い断片を強制分割する間隔（単語数）
    pub hard_split_words: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            max_sentence_words: 10,
            max_clause_words: 12,
            hard_split_words: 9,
        }
    }
}

fn ends_with_any(word: &str, terminators: &[char]) -> bool {
    word.chars().last().is_some_and(|c| terminators.contains(&c))
}

fn is_connective(word: &str) -> bool {
    let bare = word.trim_matches(|c: char| !c.is_alphanumeric());
    CONNECTIVES.contains(&bare.to_ascii_lowercase().as_str())
}

/// 区切り記号で終わる単語の直後で語列を分割する
fn split_after<'a>(words: &[&'a str], terminators: &[char]) -> Vec<Vec<&'a str>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for word in words {
        current.push(*word);
        if ends_with_any(word, terminators) {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// `target` 単語ごとに強制分割する。境界付近に接続語があればその直後で切る
fn hard_split(words: &[&str], target: usize, out: &mut Vec<String>) {
    let target = target.max(1);
    let mut rest = words;
    while rest.len() > target {
        let mut cut = target;
        // 境界の少し手前までを見て、接続語の直後を優先する
        let lo = target.saturating_sub(3).max(1);
        for i in (lo..=target).rev() {
            if is_connective(rest[i - 1]) {
                cut = i;
                break;
            }
        }
        out.push(rest[..cut].join(" "));
        rest = &rest[cut..];
    }
    if !rest.is_empty() {
        out.push(rest.join(" "));
    }
}

/// テキストをチャンク列に分割する。空入力は空列を返す。
pub fn chunk(text: &str, policy: &ChunkPolicy) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    for sentence in split_after(&words, SENTENCE_END) {
        if sentence.len() <= policy.max_sentence_words {
            chunks.push(sentence.join(" "));
            continue;
        }
        for clause in split_after(&sentence, CLAUSE_END) {
            if clause.len() <= policy.max_clause_words {
                chunks.push(clause.join(" "));
            } else {
                hard_split(&clause, policy.hard_split_words, &mut chunks);
            }
        }
    }
    chunks
}
