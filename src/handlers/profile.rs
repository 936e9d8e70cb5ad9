use axum::{Json, extract::State};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::AuthenticatedUser;
use crate::repositories::UserRepository;
use crate::state::AppState;

/// プロフィールレスポンス（公開プロジェクション）
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// プロフィール取得ハンドラー
///
/// GET /api/profile
///
/// Bearer アクセストークンの検証済みアカウントを返す。
pub async fn profile(
    State(state): State<AppState>,
    AuthenticatedUser(account_id): AuthenticatedUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state
        .user_repo
        .find_by_id(account_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        created_at: user.created_at,
    }))
}
