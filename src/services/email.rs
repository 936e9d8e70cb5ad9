use async_trait::async_trait;

/// メール送信の失敗
///
/// 送信失敗は値として返す。このモジュールはパニックしない。
#[derive(Debug, thiserror::Error)]
#[error("メール送信失敗: {0}")]
pub struct EmailError(pub String);

/// メール送信クライアント
///
/// フローコントローラには `Arc<dyn EmailClient>` として注入される。
#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

/// 開発用のメールクライアント（ログ出力のみ）
///
/// SMTP未設定の環境ではこちらが使われる。本文には平文トークンが
/// 含まれるためログには出さず、宛先と件名のみ記録する。
#[derive(Debug, Clone, Default)]
pub struct LogEmailClient;

impl LogEmailClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailClient for LogEmailClient {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<(), EmailError> {
        tracing::info!(
            to = %recipient,
            subject = %subject,
            "メール送信（開発モード: ログ出力のみ）"
        );
        Ok(())
    }
}

/// SMTP経由のメールクライアント（lettre）
#[cfg(feature = "email")]
pub struct SmtpEmailClient {
    transport: lettre::AsyncSmtpTransport<lettre::Tokio1Executor>,
    from: lettre::message::Mailbox,
}

#[cfg(feature = "email")]
impl SmtpEmailClient {
    /// リレーホストと認証情報からクライアントを構築
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from_address: &str,
    ) -> Result<Self, EmailError> {
        use lettre::transport::smtp::authentication::Credentials;

        let from = from_address
            .parse()
            .map_err(|e| EmailError(format!("差出人アドレスが不正です: {e}")))?;

        let transport = lettre::AsyncSmtpTransport::<lettre::Tokio1Executor>::relay(host)
            .map_err(|e| EmailError(e.to_string()))?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from })
    }
}

#[cfg(feature = "email")]
#[async_trait]
impl EmailClient for SmtpEmailClient {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        use lettre::AsyncTransport;

        let to = recipient
            .parse()
            .map_err(|e| EmailError(format!("宛先アドレスが不正です: {e}")))?;

        let message = lettre::Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| EmailError(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError(e.to_string()))?;

        tracing::info!(to = %recipient, "メール送信完了");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_client_always_succeeds() {
        let client = LogEmailClient::new();
        let result = client
            .send("test@example.com", "件名", "本文")
            .await;
        assert!(result.is_ok());
    }
}
