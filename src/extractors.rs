use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Bearer アクセストークンで認証済みのアカウント
///
/// `Authorization: Bearer <access>` を検証し、アカウントIDを取り出す。
/// ヘッダ不在・形式不正・検証失敗はすべて 401。
pub struct AuthenticatedUser(pub Uuid);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let claims = state.session_tokens.verify_access(token)?;

        Ok(Self(claims.sub))
    }
}
