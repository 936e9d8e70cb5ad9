use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::PasswordResetService;
use crate::state::AppState;

// === リセットリクエスト ===

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
}

/// POST /api/forgot-password
///
/// # Security
/// ユーザー存在有無にかかわらず同一の 200 を返す（存在漏洩防止）。
/// 例外は既存ユーザーへの送信が実際に失敗した場合の 500 のみ。
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, AppError> {
    validate_email(&request.email)?;

    let password_reset_service = PasswordResetService::new(
        state.user_repo.clone(),
        state.token_store.clone(),
        state.email_client.clone(),
        state.config.clone(),
    );
    password_reset_service
        .request_reset(request.email.trim())
        .await?;

    Ok(Json(ForgotPasswordResponse {
        message: "パスワードリセット手順をメールで送信しました".to_string(),
    }))
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub message: String,
}

/// POST /api/reset-password
///
/// # Security
/// - token, new_password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, AppError> {
    validate_reset_password_request(&request)?;

    let password_reset_service = PasswordResetService::new(
        state.user_repo.clone(),
        state.token_store.clone(),
        state.email_client.clone(),
        state.config.clone(),
    );
    password_reset_service
        .reset_password(&request.token, &request.new_password)
        .await?;

    Ok(Json(ResetPasswordResponse {
        message: "パスワードが更新されました".to_string(),
    }))
}

/// メールアドレスのバリデーション
fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    Ok(())
}

/// リセットパスワードリクエストのバリデーション
fn validate_reset_password_request(request: &ResetPasswordRequest) -> Result<(), AppError> {
    if request.token.trim().is_empty() {
        return Err(AppError::Validation("トークンは必須です".to_string()));
    }
    if request.new_password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    if request.new_password != request.new_password_confirm {
        return Err(AppError::Validation(
            "パスワードと確認用パスワードが一致しません".to_string(),
        ));
    }
    Ok(())
}
