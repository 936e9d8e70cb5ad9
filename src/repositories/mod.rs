pub mod memory;
pub mod postgres;

pub use memory::InMemoryUserRepository;
pub use postgres::PgUserRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::User;

#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("このメールアドレスは既に登録されています")]
    DuplicateEmail,

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),
}

/// アカウントリポジトリ
///
/// フローコントローラには `Arc<dyn UserRepository>` として注入される。
/// バックエンド（Postgres、インメモリ）は差し替え可能。
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// メールアドレスでユーザーを検索
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError>;

    /// ユーザーIDでユーザーを検索
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, UserRepositoryError>;

    /// 新しいユーザーを作成
    ///
    /// メールアドレスが既に存在する場合は `DuplicateEmail` を返す。
    async fn create_user(
        &self,
        email: &str,
        full_name: &str,
        password_hash: &str,
    ) -> Result<User, UserRepositoryError>;

    /// ユーザーのパスワードを更新
    ///
    /// # Note
    /// password_hash はログに出力しないこと
    async fn update_password(
        &self,
        user_id: Uuid,
        new_password_hash: &str,
    ) -> Result<(), UserRepositoryError>;
}
