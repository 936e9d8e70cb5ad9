use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::repositories::UserRepository;
use crate::services::auth::hash_password;
use crate::services::session::TokenPair;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
    pub password_confirm: String,
}

/// レスポンス用のアカウント要約（パスワードハッシュは含まない）
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserSummary,
    pub tokens: TokenPair,
}

/// ユーザー登録ハンドラー
///
/// POST /api/register
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    validate_register_request(&request)?;

    let password_hash = hash_password(&request.password)?;

    // 重複メールはリポジトリ側の一意性チェックが検出する
    let user = state
        .user_repo
        .create_user(
            request.email.trim(),
            request.full_name.trim(),
            &password_hash,
        )
        .await?;

    let tokens = state.session_tokens.mint(user.id)?;

    tracing::info!(email = %user.email, "ユーザー登録成功");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserSummary {
                id: user.id,
                email: user.email,
                full_name: user.full_name,
            },
            tokens,
        }),
    ))
}

/// 登録リクエストのバリデーション
fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    // email: 必須、メール形式
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("メールアドレスは必須です".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    // full_name: 必須
    if request.full_name.trim().is_empty() {
        return Err(AppError::Validation("氏名は必須です".to_string()));
    }
    // password: 8文字以上
    if request.password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    // password_confirm: 一致必須
    if request.password != request.password_confirm {
        return Err(AppError::Validation(
            "パスワードと確認用パスワードが一致しません".to_string(),
        ));
    }
    Ok(())
}
