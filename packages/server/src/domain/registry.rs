//! StreamRegistry trait 定義
//!
//! プロセス全体でストリーム ID と配信エンティティを対応付けるレジストリ
//! のインターフェース。具体的な実装は Infrastructure 層が提供する
//! （依存性の逆転）。
//!
//! エントリは最初の配信開始時に作られ、配信終了や切断では offline に
//! なるだけで削除されない。再接続時に同じ ID・同じチャット履歴で再開
//! できるようにするためで、ガベージコレクションは行わない。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::ids::StreamId;
use super::stream::Stream;

/// 共有ストリームハンドル。
/// 状態の変更は必ずこの Mutex を通すので、単一書き込み者が保たれる。
pub type SharedStream = Arc<Mutex<Stream>>;

/// ストリームレジストリのインターフェース
#[async_trait]
pub trait StreamRegistry: Send + Sync {
    /// ID に対応するストリームを取得し、なければ作成する
    async fn get_or_create(&self, id: StreamId, display_name: &str) -> SharedStream;

    /// ID に対応するストリームを取得する
    async fn get(&self, id: &StreamId) -> Option<SharedStream>;

    /// 登録済みの全ストリーム
    async fn list(&self) -> Vec<SharedStream>;
}
