use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // セッショントークン設定
    /// JWT署名シークレット（HS256）
    pub jwt_secret: SecretBox<String>,
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: i64,

    // パスワードリセット設定
    #[serde(default = "default_reset_token_ttl_secs")]
    pub reset_token_ttl_secs: i64,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 900;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;
const DEFAULT_RESET_TOKEN_TTL_SECS: i64 = 600;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_access_token_ttl_secs() -> i64 {
    DEFAULT_ACCESS_TOKEN_TTL_SECS
}

fn default_refresh_token_ttl_secs() -> i64 {
    DEFAULT_REFRESH_TOKEN_TTL_SECS
}

fn default_reset_token_ttl_secs() -> i64 {
    DEFAULT_RESET_TOKEN_TTL_SECS
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
