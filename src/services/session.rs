use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;

/// セッショントークンのクレーム
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// アカウントID
    pub sub: Uuid,
    /// 有効期限（UNIXタイムスタンプ）
    pub exp: i64,
    /// 発行時刻（UNIXタイムスタンプ）
    pub iat: i64,
    /// トークン種別（"access" / "refresh"）
    pub typ: String,
}

/// アクセス/リフレッシュトークンのペア
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// セッショントークン発行サービス（HS256）
///
/// 認証フローからは `mint` と `verify_access` だけが使われる。
/// 署名アルゴリズムの内部はこのモジュールに閉じる。
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionTokenService {
    /// 新しい SessionTokenService を作成
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// アカウントに対してトークンペアを発行する
    pub fn mint(&self, account_id: Uuid) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.encode(account_id, self.access_ttl, "access")?,
            refresh: self.encode(account_id, self.refresh_ttl, "refresh")?,
        })
    }

    /// アクセストークンを検証してクレームを返す
    ///
    /// 署名不正・期限切れ・リフレッシュトークンの流用はすべて `Unauthorized`。
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| AppError::Unauthorized)?;

        if data.claims.typ != "access" {
            return Err(AppError::Unauthorized);
        }

        Ok(data.claims)
    }

    fn encode(&self, account_id: Uuid, ttl: Duration, typ: &str) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: account_id,
            exp: (now + ttl).unix_timestamp(),
            iat: now.unix_timestamp(),
            typ: typ.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = ?e, "セッショントークン発行エラー");
            AppError::Internal(anyhow::anyhow!("token encode error"))
        })
    }
}
