use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repositories::UserRepositoryError;
use crate::stores::TokenStoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("このメールアドレスは既に登録されています")]
    EmailAlreadyExists,

    #[error("このメールアドレスのユーザーは存在しません")]
    UserNotFound,

    #[error("認証エラー")]
    InvalidCredentials,

    #[error("無効または期限切れのトークンです")]
    InvalidOrExpiredToken,

    #[error("認証が必要です")]
    Unauthorized,

    #[error("メール送信エラー")]
    DeliveryFailure,

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("トークンストアエラー")]
    TokenStore(#[from] TokenStoreError),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

impl From<UserRepositoryError> for AppError {
    fn from(e: UserRepositoryError) -> Self {
        match e {
            UserRepositoryError::DuplicateEmail => Self::EmailAlreadyExists,
            UserRepositoryError::Database(e) => Self::Database(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::EmailAlreadyExists => (
                StatusCode::BAD_REQUEST,
                "このメールアドレスは既に登録されています".to_string(),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "このメールアドレスのユーザーは存在しません".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "メールアドレスまたはパスワードが正しくありません".to_string(),
            ),
            Self::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                // 不在・不一致・期限切れは区別しない
                "無効または期限切れのトークンです".to_string(),
            ),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "認証が必要です".to_string()),
            Self::DeliveryFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "メールの送信に失敗しました".to_string(),
            ),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::TokenStore(e) => {
                tracing::error!(error = ?e, "トークンストアエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
