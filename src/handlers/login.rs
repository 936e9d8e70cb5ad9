use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::AuthService;
use crate::services::session::TokenPair;
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// ユーザーのメールアドレス
    pub email: String,
    /// ユーザーのパスワード
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

/// ログインレスポンス
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserSummary,
    pub tokens: TokenPair,
}

/// ログインハンドラー
///
/// POST /api/login
///
/// 処理フロー:
/// 1. リクエストバリデーション
/// 2. ユーザー認証（不在は404、パスワード不一致は400）
/// 3. セッショントークンペアを発行して返却
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&request)?;

    let auth_service = AuthService::new(state.user_repo.clone());
    let user = auth_service
        .authenticate(request.email.trim(), &request.password)
        .await?;

    let tokens = state.session_tokens.mint(user.id)?;

    tracing::info!(email = %user.email, "ログイン成功");

    Ok(Json(LoginResponse {
        user: UserSummary {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        },
        tokens,
    }))
}

/// ログインリクエストのバリデーション
fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    // email: 必須、メール形式
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("メールアドレスは必須です".to_string()));
    }

    // 簡易的なメール形式チェック（@ が含まれているか）
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }

    // password: 必須
    if request.password.is_empty() {
        return Err(AppError::Validation("パスワードは必須です".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_email() {
        let request = LoginRequest {
            email: "".to_string(),
            password: "password123".to_string(),
        };

        let result = validate_login_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let request = LoginRequest {
            email: "invalid-email".to_string(),
            password: "password123".to_string(),
        };

        let result = validate_login_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "".to_string(),
        };

        let result = validate_login_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };

        let result = validate_login_request(&request);
        assert!(result.is_ok());
    }
}
