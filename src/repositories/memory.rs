use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::User;
use crate::repositories::{UserRepository, UserRepositoryError};

/// インメモリのアカウントリポジトリ
///
/// DB不要のテストおよびローカル開発用。重複チェックと更新は
/// 単一のミューテックス内で行うため、並行リクエストに対しても
/// 「先勝ち」の一意性が保たれる。
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, UserRepositoryError> {
        let users = self.users.lock().await;
        Ok(users.get(&user_id).cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        full_name: &str,
        password_hash: &str,
    ) -> Result<User, UserRepositoryError> {
        let mut users = self.users.lock().await;

        if users.values().any(|u| u.email == email) {
            return Err(UserRepositoryError::DuplicateEmail);
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        new_password_hash: &str,
    ) -> Result<(), UserRepositoryError> {
        let mut users = self.users.lock().await;

        if let Some(user) = users.get_mut(&user_id) {
            user.password_hash = new_password_hash.to_string();
            user.updated_at = OffsetDateTime::now_utc();
        }

        Ok(())
    }
}
