use async_trait::async_trait;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::stores::{ResetTokenStore, TokenStoreError};

/// Postgres バックエンドのリセットトークンストア
///
/// `reset_tokens` は account_id を主キーとする1アカウント1行のテーブル。
/// 上書きは `ON CONFLICT ... DO UPDATE` で原子的に行い、
/// token_hash の UNIQUE インデックスで消費時の逆引きを O(1) にする。
#[derive(Clone)]
pub struct PgResetTokenStore {
    pool: PgPool,
}

impl PgResetTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenStore for PgResetTokenStore {
    async fn store(
        &self,
        account_id: Uuid,
        token_hash: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let expires_at = OffsetDateTime::now_utc() + ttl;

        sqlx::query(
            r#"
            INSERT INTO reset_tokens (account_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id)
            DO UPDATE SET token_hash = EXCLUDED.token_hash, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(account_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn verify(&self, account_id: Uuid, token_hash: &str) -> Result<bool, TokenStoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM reset_tokens
                WHERE account_id = $1 AND token_hash = $2 AND expires_at > NOW()
            )
            "#,
        )
        .bind(account_id)
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_account(&self, token_hash: &str) -> Result<Option<Uuid>, TokenStoreError> {
        let account_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT account_id
            FROM reset_tokens
            WHERE token_hash = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account_id)
    }

    async fn clear(&self, account_id: Uuid) -> Result<(), TokenStoreError> {
        sqlx::query(
            r#"
            DELETE FROM reset_tokens
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, TokenStoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM reset_tokens
            WHERE expires_at <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
