use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::Config;
use crate::repositories::UserRepository;
use crate::services::email::EmailClient;
use crate::services::session::SessionTokenService;
use crate::stores::ResetTokenStore;

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
/// リポジトリ・トークンストア・メールクライアントはトレイトオブジェクトとして
/// 注入され、本番は Postgres/SMTP、テストはインメモリ実装に差し替えられる。
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// アカウントリポジトリ
    pub user_repo: Arc<dyn UserRepository>,
    /// リセットトークンストア
    pub token_store: Arc<dyn ResetTokenStore>,
    /// メール送信クライアント
    pub email_client: Arc<dyn EmailClient>,
    /// セッショントークン発行サービス
    pub session_tokens: SessionTokenService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(
        config: Arc<Config>,
        user_repo: Arc<dyn UserRepository>,
        token_store: Arc<dyn ResetTokenStore>,
        email_client: Arc<dyn EmailClient>,
    ) -> Self {
        let session_tokens = SessionTokenService::new(
            config.jwt_secret.expose_secret(),
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
        );

        Self {
            config,
            user_repo,
            token_store,
            email_client,
            session_tokens,
        }
    }
}
