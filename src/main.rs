use std::net::SocketAddr;
use std::sync::Arc;

use http::{Method, header};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use authgate::{
    config::Config,
    handlers,
    repositories::PgUserRepository,
    services::email::{EmailClient, LogEmailClient},
    state::AppState,
    stores::{PgResetTokenStore, ResetTokenStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ログ初期化（JSON形式、環境変数でレベル制御）
    init_tracing();

    tracing::info!("authgate 起動中...");

    // 設定読み込み
    let config = Config::load().map_err(|e| {
        tracing::error!(error = ?e, "設定の読み込みに失敗");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(host = %config.host, port = %config.port, "設定読み込み完了");

    // サーバーアドレスを先に構築（config が move される前に）
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = ?e, "アドレスのパースに失敗");
            anyhow::anyhow!("Failed to parse address: {}", e)
        })?;

    // データベース接続プール作成
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "データベース接続に失敗");
            anyhow::anyhow!("Failed to connect to database: {}", e)
        })?;

    tracing::info!("データベース接続完了");

    // 依存の構築（本番は Postgres バックエンド）
    let email_client = build_email_client(&config);
    let user_repo = Arc::new(PgUserRepository::new(db_pool.clone()));
    let token_store: Arc<dyn ResetTokenStore> = Arc::new(PgResetTokenStore::new(db_pool.clone()));

    // 期限切れリセットトークンの掃除タスク
    spawn_token_sweeper(token_store.clone());

    // AppState 構築
    let state = AppState::new(Arc::new(config), user_repo, token_store, email_client);

    // Router 構築（CORS付き）
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    let app = handlers::router(state).layer(cors);

    // サーバー起動
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = ?e, addr = %addr, "ポートのバインドに失敗");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!(addr = %addr, "サーバー起動");

    // Graceful shutdown 対応
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "サーバーエラー");
            anyhow::anyhow!("Server error: {}", e)
        })?;

    tracing::info!("サーバー終了");

    Ok(())
}

/// tracing の初期化（JSON形式）
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,authgate=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// メール送信クライアントの構築（SMTP設定が揃っている場合のみSMTP送信）
#[cfg(feature = "email")]
fn build_email_client(config: &Config) -> Arc<dyn EmailClient> {
    use authgate::services::email::SmtpEmailClient;

    if let (Some(host), Some(username), Some(password), Some(from)) = (
        &config.smtp_host,
        &config.smtp_username,
        &config.smtp_password,
        &config.smtp_from_address,
    ) {
        match SmtpEmailClient::new(
            host,
            config.smtp_port,
            username.expose_secret(),
            password.expose_secret(),
            from,
        ) {
            Ok(client) => {
                tracing::info!(host = %host, "SMTPメールクライアントを初期化");
                return Arc::new(client);
            }
            Err(e) => {
                tracing::error!(error = %e, "SMTPクライアント初期化に失敗（ログ出力に切替）");
            }
        }
    } else {
        tracing::info!("SMTP未設定（ログ出力のみ）");
    }

    Arc::new(LogEmailClient::new())
}

/// メール送信クライアントの構築（email機能無効時はログ出力のみ）
#[cfg(not(feature = "email"))]
fn build_email_client(config: &Config) -> Arc<dyn EmailClient> {
    if config.smtp_host.is_some() {
        tracing::warn!("SMTP設定がありますが、email機能が無効のためログ出力のみ使用します");
    }

    Arc::new(LogEmailClient::new())
}

/// 期限切れリセットトークンを定期削除するバックグラウンドタスク
///
/// 期限切れは読み取り時にも不在として扱われるため、このタスクは
/// ストレージ上の残骸を片付けるだけでよい。
fn spawn_token_sweeper(token_store: Arc<dyn ResetTokenStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            match token_store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(count = n, "期限切れリセットトークンを削除"),
                Err(e) => tracing::warn!(error = %e, "期限切れトークンの削除に失敗"),
            }
        }
    });
}

/// Graceful shutdown シグナル待機
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "Ctrl+C ハンドラーのインストールに失敗");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "SIGTERM ハンドラーのインストールに失敗");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}
