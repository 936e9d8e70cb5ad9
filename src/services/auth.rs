use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserRepository;

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// 認証サービス
#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// ユーザー認証を実行
    ///
    /// メールアドレス不在（`UserNotFound` / 404）とパスワード不一致
    /// （`InvalidCredentials` / 400）は区別して返す。
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self.user_repo.find_by_email(email).await?;

        let Some(user) = user else {
            tracing::warn!(email = %email, "認証失敗: ユーザー不在");
            return Err(AppError::UserNotFound);
        };

        if self.verify_password(password, &user.password_hash)? {
            tracing::info!(email = %email, "認証成功");
            Ok(user)
        } else {
            tracing::warn!(email = %email, "認証失敗: パスワード不一致");
            Err(AppError::InvalidCredentials)
        }
    }

    /// パスワードを検証
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
            AppError::Internal(anyhow::anyhow!("password hash parse error"))
        })?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryUserRepository;

    #[test]
    fn test_invalid_hash_format_is_rejected() {
        let invalid_hash = "invalid_hash_format";
        let parsed = argon2::PasswordHash::new(invalid_hash);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_hash_then_verify_roundtrip() {
        let hash = hash_password("password123").unwrap();
        let parsed = argon2::PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"password123", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong-password", &parsed)
                .is_err()
        );
    }

    async fn service_with_user(email: &str, password: &str) -> AuthService {
        let repo = Arc::new(InMemoryUserRepository::new());
        let hash = hash_password(password).unwrap();
        repo.create_user(email, "Test User", &hash).await.unwrap();
        AuthService::new(repo)
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let service = service_with_user("test@example.com", "password123").await;

        let user = service
            .authenticate("test@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let service = service_with_user("test@example.com", "password123").await;

        let result = service.authenticate("test@example.com", "wrong-password").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_email() {
        let service = service_with_user("test@example.com", "password123").await;

        let result = service.authenticate("nobody@example.com", "password123").await;
        assert!(matches!(result, Err(AppError::UserNotFound)));
    }
}
