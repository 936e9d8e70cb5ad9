use std::collections::HashMap;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::stores::{ResetTokenStore, TokenStoreError};

struct Entry {
    token_hash: String,
    expires_at: OffsetDateTime,
}

#[derive(Default)]
struct Inner {
    /// アカウント → 現在のエントリ（1アカウント1件）
    by_account: HashMap<Uuid, Entry>,
    /// トークンハッシュ → アカウントの逆引きインデックス
    by_hash: HashMap<String, Uuid>,
}

/// インメモリのリセットトークンストア
///
/// DB不要のテストおよびローカル開発用。両方のマップを
/// 単一ミューテックス内で更新するため、上書きと読み取りは
/// キー単位で一貫した値を観測する。期限切れエントリは
/// 読み取り時に不在として扱われ、実際の削除は `purge_expired` が行う。
#[derive(Default)]
pub struct InMemoryResetTokenStore {
    inner: Mutex<Inner>,
}

impl InMemoryResetTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_live(entry: &Entry, now: OffsetDateTime) -> bool {
    entry.expires_at > now
}

#[async_trait]
impl ResetTokenStore for InMemoryResetTokenStore {
    async fn store(
        &self,
        account_id: Uuid,
        token_hash: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let mut inner = self.inner.lock().await;

        // 上書き: 旧トークンの逆引きも同時に消す
        if let Some(old) = inner.by_account.remove(&account_id) {
            inner.by_hash.remove(&old.token_hash);
        }

        inner.by_hash.insert(token_hash.to_string(), account_id);
        inner.by_account.insert(
            account_id,
            Entry {
                token_hash: token_hash.to_string(),
                expires_at: OffsetDateTime::now_utc() + ttl,
            },
        );

        Ok(())
    }

    async fn verify(&self, account_id: Uuid, token_hash: &str) -> Result<bool, TokenStoreError> {
        let inner = self.inner.lock().await;
        let now = OffsetDateTime::now_utc();

        Ok(inner
            .by_account
            .get(&account_id)
            .is_some_and(|entry| is_live(entry, now) && entry.token_hash == token_hash))
    }

    async fn find_account(&self, token_hash: &str) -> Result<Option<Uuid>, TokenStoreError> {
        let inner = self.inner.lock().await;
        let now = OffsetDateTime::now_utc();

        let Some(account_id) = inner.by_hash.get(token_hash) else {
            return Ok(None);
        };

        let live = inner
            .by_account
            .get(account_id)
            .is_some_and(|entry| is_live(entry, now) && entry.token_hash == token_hash);

        Ok(live.then_some(*account_id))
    }

    async fn clear(&self, account_id: Uuid) -> Result<(), TokenStoreError> {
        let mut inner = self.inner.lock().await;

        if let Some(entry) = inner.by_account.remove(&account_id) {
            inner.by_hash.remove(&entry.token_hash);
        }

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, TokenStoreError> {
        let mut inner = self.inner.lock().await;
        let now = OffsetDateTime::now_utc();

        let expired: Vec<Uuid> = inner
            .by_account
            .iter()
            .filter(|(_, entry)| !is_live(entry, now))
            .map(|(id, _)| *id)
            .collect();

        for account_id in &expired {
            if let Some(entry) = inner.by_account.remove(account_id) {
                inner.by_hash.remove(&entry.token_hash);
            }
        }

        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::seconds(600);

    #[tokio::test]
    async fn test_store_then_verify() {
        let store = InMemoryResetTokenStore::new();
        let account = Uuid::new_v4();

        store.store(account, "hash-1", TTL).await.unwrap();

        assert!(store.verify(account, "hash-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_mismatched_token_is_false() {
        let store = InMemoryResetTokenStore::new();
        let account = Uuid::new_v4();

        store.store(account, "hash-1", TTL).await.unwrap();

        assert!(!store.verify(account, "other-hash").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_unknown_account_is_false() {
        let store = InMemoryResetTokenStore::new();

        assert!(!store.verify(Uuid::new_v4(), "hash-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_then_verify_is_false() {
        let store = InMemoryResetTokenStore::new();
        let account = Uuid::new_v4();

        store.store(account, "hash-1", TTL).await.unwrap();
        store.clear(account).await.unwrap();

        assert!(!store.verify(account, "hash-1").await.unwrap());
        assert!(store.find_account("hash-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = InMemoryResetTokenStore::new();
        let account = Uuid::new_v4();

        store.clear(account).await.unwrap();
        store.clear(account).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_store_supersedes_first() {
        let store = InMemoryResetTokenStore::new();
        let account = Uuid::new_v4();

        store.store(account, "hash-1", TTL).await.unwrap();
        store.store(account, "hash-2", TTL).await.unwrap();

        // 旧トークンはTTL内でも検証不能
        assert!(!store.verify(account, "hash-1").await.unwrap());
        assert!(store.find_account("hash-1").await.unwrap().is_none());

        assert!(store.verify(account, "hash-2").await.unwrap());
        assert_eq!(store.find_account("hash-2").await.unwrap(), Some(account));
    }

    #[tokio::test]
    async fn test_expired_entry_is_invisible() {
        let store = InMemoryResetTokenStore::new();
        let account = Uuid::new_v4();

        store
            .store(account, "hash-1", Duration::seconds(0))
            .await
            .unwrap();

        assert!(!store.verify(account, "hash-1").await.unwrap());
        assert!(store.find_account("hash-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_account_returns_owner() {
        let store = InMemoryResetTokenStore::new();
        let account = Uuid::new_v4();

        store.store(account, "hash-1", TTL).await.unwrap();

        assert_eq!(store.find_account("hash-1").await.unwrap(), Some(account));
        assert!(store.find_account("unknown-hash").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_removes_only_dead_entries() {
        let store = InMemoryResetTokenStore::new();
        let live = Uuid::new_v4();
        let dead = Uuid::new_v4();

        store.store(live, "hash-live", TTL).await.unwrap();
        store
            .store(dead, "hash-dead", Duration::seconds(-1))
            .await
            .unwrap();

        let purged = store.purge_expired().await.unwrap();

        assert_eq!(purged, 1);
        assert!(store.verify(live, "hash-live").await.unwrap());
        assert!(store.find_account("hash-dead").await.unwrap().is_none());
    }
}
