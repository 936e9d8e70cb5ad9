use std::sync::Arc;

use rand::{Rng, distributions::Alphanumeric, thread_rng};
use sha2::{Digest, Sha256};
use time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::UserRepository;
use crate::services::auth::hash_password;
use crate::services::email::EmailClient;
use crate::stores::ResetTokenStore;

/// リセットトークン長（英数字62種から一様に選ぶ）
const RESET_TOKEN_LEN: usize = 32;

/// リセットトークンを生成する
///
/// ThreadRng（CSPRNG）から英数字を一様に引く。決定的なシードは使わない。
pub fn generate_reset_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// トークンをSHA-256でハッシュ化
///
/// ストアには平文トークンを置かず、このダイジェストのみ保存する。
/// 照合も固定長ダイジェスト同士の比較になる。
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// パスワードリセットサービス
///
/// トークンのライフサイクル
/// `未発行 → 発行済み → (消費 | 期限切れ | 上書き)` を管理する。
/// 終端状態はいずれもストアにエントリが無い状態に戻る。
#[derive(Clone)]
pub struct PasswordResetService {
    user_repo: Arc<dyn UserRepository>,
    token_store: Arc<dyn ResetTokenStore>,
    email_client: Arc<dyn EmailClient>,
    config: Arc<Config>,
}

impl PasswordResetService {
    /// 新しい PasswordResetService を作成
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        token_store: Arc<dyn ResetTokenStore>,
        email_client: Arc<dyn EmailClient>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            user_repo,
            token_store,
            email_client,
            config,
        }
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// - ユーザーが存在しない場合も常に成功を返す（情報漏洩防止）
    /// - トークン（平文）はログに出力しない
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let user = self.user_repo.find_by_email(email).await?;

        // ユーザーが存在しない場合も成功を返す（情報漏洩防止）
        let user = match user {
            Some(u) => u,
            None => {
                tracing::info!(email = %email, "パスワードリセット: ユーザー不在（成功レスポンス返却）");
                return Ok(());
            }
        };

        let token = generate_reset_token();
        let token_hash = hash_token(&token);
        let ttl = Duration::seconds(self.config.reset_token_ttl_secs);

        // 上書き保存: 同一アカウントの未消費トークンはここで無効化される
        self.token_store.store(user.id, &token_hash, ttl).await?;

        let subject = "パスワードリセットのご案内";
        let body = reset_email_body(&token, self.config.reset_token_ttl_secs);

        if let Err(e) = self.email_client.send(email, subject, &body).await {
            tracing::error!(error = %e, email = %email, "リセットメール送信失敗");
            // 届かなかったトークンは破棄してから 500 を返す
            self.token_store.clear(user.id).await?;
            return Err(AppError::DeliveryFailure);
        }

        tracing::info!(email = %email, "パスワードリセットメール送信完了");

        Ok(())
    }

    /// パスワードをリセット
    ///
    /// トークンハッシュの逆引きで所有アカウントを特定し、
    /// 認証情報を更新してからエントリを消費する。
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let token_hash = hash_token(token);

        // 有効期限内のエントリのみヒットする
        let account_id = self
            .token_store
            .find_account(&token_hash)
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

        let password_hash = hash_password(new_password)?;
        self.user_repo
            .update_password(account_id, &password_hash)
            .await?;

        // 消費済みトークンは再利用不可
        self.token_store.clear(account_id).await?;

        tracing::info!(account_id = %account_id, "パスワードリセット完了");

        Ok(())
    }
}

/// リセットメール本文を構築
fn reset_email_body(token: &str, ttl_secs: i64) -> String {
    format!(
        "パスワードリセットのリクエストを受け付けました。\n\
         以下のトークンを使用してパスワードを再設定してください。\n\
         \n\
         トークン: {token}\n\
         \n\
         このトークンは{}分後に失効します。\n\
         心当たりがない場合はこのメールを無視してください。\n",
        ttl_secs / 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryUserRepository;
    use crate::services::AuthService;
    use crate::services::email::EmailError;
    use crate::stores::InMemoryResetTokenStore;
    use secrecy::SecretBox;
    use tokio::sync::Mutex;

    #[test]
    fn test_generate_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_reset_token_is_not_constant() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    #[test]
    fn test_hash_token_is_stable_hex_digest() {
        let a = hash_token("some-token");
        let b = hash_token("some-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_token("other-token"));
    }

    /// 送信内容を記録するテスト用クライアント。fail 指定時は記録後に失敗する。
    #[derive(Default)]
    struct RecordingEmailClient {
        sent: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl EmailClient for RecordingEmailClient {
        async fn send(
            &self,
            recipient: &str,
            subject: &str,
            body: &str,
        ) -> Result<(), EmailError> {
            self.sent.lock().await.push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            if self.fail {
                return Err(EmailError("smtp unavailable".to_string()));
            }
            Ok(())
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            database_url: SecretBox::new(Box::new("postgres://unused".to_string())),
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: SecretBox::new(Box::new("test-secret".to_string())),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 7 * 24 * 3600,
            reset_token_ttl_secs: 600,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from_address: None,
        })
    }

    struct Fixture {
        service: PasswordResetService,
        user_repo: Arc<InMemoryUserRepository>,
        token_store: Arc<InMemoryResetTokenStore>,
        mailbox: Arc<RecordingEmailClient>,
    }

    async fn fixture_with_user(email: &str, password: &str, fail_delivery: bool) -> Fixture {
        let user_repo = Arc::new(InMemoryUserRepository::new());
        let token_store = Arc::new(InMemoryResetTokenStore::new());
        let mailbox = Arc::new(RecordingEmailClient {
            fail: fail_delivery,
            ..Default::default()
        });

        let hash = hash_password(password).unwrap();
        user_repo
            .create_user(email, "Test User", &hash)
            .await
            .unwrap();

        let service = PasswordResetService::new(
            user_repo.clone(),
            token_store.clone(),
            mailbox.clone(),
            test_config(),
        );

        Fixture {
            service,
            user_repo,
            token_store,
            mailbox,
        }
    }

    async fn delivered_token(mailbox: &RecordingEmailClient) -> String {
        let sent = mailbox.sent.lock().await;
        let (_, _, body) = sent.last().expect("メールが送信されていること");
        body.lines()
            .find_map(|l| l.trim().strip_prefix("トークン: "))
            .expect("本文にトークン行があること")
            .to_string()
    }

    #[tokio::test]
    async fn test_request_then_reset_changes_credential() {
        let fx = fixture_with_user("a@example.com", "old-password", false).await;

        fx.service.request_reset("a@example.com").await.unwrap();
        let token = delivered_token(&fx.mailbox).await;

        fx.service
            .reset_password(&token, "new-password-123")
            .await
            .unwrap();

        let auth = AuthService::new(fx.user_repo.clone());
        assert!(auth.authenticate("a@example.com", "new-password-123").await.is_ok());
        assert!(matches!(
            auth.authenticate("a@example.com", "old-password").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let fx = fixture_with_user("a@example.com", "old-password", false).await;

        fx.service.request_reset("a@example.com").await.unwrap();
        let token = delivered_token(&fx.mailbox).await;

        fx.service
            .reset_password(&token, "new-password-123")
            .await
            .unwrap();

        let second = fx.service.reset_password(&token, "another-password").await;
        assert!(matches!(second, Err(AppError::InvalidOrExpiredToken)));
    }

    #[tokio::test]
    async fn test_garbage_token_always_fails() {
        let fx = fixture_with_user("a@example.com", "old-password", false).await;

        let result = fx
            .service
            .reset_password("garbage-token", "new-password-123")
            .await;
        assert!(matches!(result, Err(AppError::InvalidOrExpiredToken)));
    }

    #[tokio::test]
    async fn test_unknown_email_is_silently_accepted() {
        let fx = fixture_with_user("a@example.com", "old-password", false).await;

        fx.service.request_reset("nobody@example.com").await.unwrap();

        assert!(fx.mailbox.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_request_supersedes_first_token() {
        let fx = fixture_with_user("a@example.com", "old-password", false).await;

        fx.service.request_reset("a@example.com").await.unwrap();
        let first = delivered_token(&fx.mailbox).await;

        fx.service.request_reset("a@example.com").await.unwrap();
        let second = delivered_token(&fx.mailbox).await;

        assert_ne!(first, second);
        assert!(matches!(
            fx.service.reset_password(&first, "new-password-123").await,
            Err(AppError::InvalidOrExpiredToken)
        ));
        fx.service
            .reset_password(&second, "new-password-123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delivery_failure_clears_token() {
        let fx = fixture_with_user("a@example.com", "old-password", true).await;

        let result = fx.service.request_reset("a@example.com").await;
        assert!(matches!(result, Err(AppError::DeliveryFailure)));

        // 届かなかったトークンは消費できない
        let token = delivered_token(&fx.mailbox).await;
        assert!(
            fx.token_store
                .find_account(&hash_token(&token))
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            fx.service.reset_password(&token, "new-password-123").await,
            Err(AppError::InvalidOrExpiredToken)
        ));
    }
}
