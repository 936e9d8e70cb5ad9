pub mod memory;
pub mod postgres;

pub use memory::InMemoryResetTokenStore;
pub use postgres::PgResetTokenStore;

use async_trait::async_trait;
use time::Duration;
use uuid::Uuid;

/// トークンストアのバックエンド障害
///
/// リトライ可能なインフラエラーとして呼び出し元へ伝播させる。
/// 黙って成功扱いにしてはならない。
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("ストアバックエンドエラー")]
    Backend(#[from] sqlx::Error),
}

/// パスワードリセットトークンストア
///
/// アカウントごとに最大1件のトークンハッシュをTTL付きで保持する
/// key-expiry-value ストア。平文トークンは保持しない（SHA-256ダイジェストのみ）。
/// バックエンドは差し替え可能で、フローコントローラには
/// `Arc<dyn ResetTokenStore>` として注入される。
///
/// 書き込みの原子性はバックエンドに委譲する（Postgres は upsert、
/// インメモリは単一ミューテックス）。コントローラ側でのロックは行わない。
#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    /// トークンハッシュをTTL付きで保存する
    ///
    /// 同一アカウントの既存エントリは原子的に上書きされ、
    /// 以前のトークンは即座に検証不能になる。
    async fn store(
        &self,
        account_id: Uuid,
        token_hash: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError>;

    /// 有効期限内のエントリが存在し、ハッシュが完全一致する場合のみ true
    ///
    /// エントリ不在・期限切れ・不一致はすべて false。
    async fn verify(&self, account_id: Uuid, token_hash: &str) -> Result<bool, TokenStoreError>;

    /// トークンハッシュから有効期限内のアカウントIDを逆引きする
    async fn find_account(&self, token_hash: &str) -> Result<Option<Uuid>, TokenStoreError>;

    /// エントリを削除する（存在しない場合は何もしない）
    async fn clear(&self, account_id: Uuid) -> Result<(), TokenStoreError>;

    /// 期限切れエントリを削除し、削除件数を返す
    async fn purge_expired(&self) -> Result<u64, TokenStoreError>;
}
