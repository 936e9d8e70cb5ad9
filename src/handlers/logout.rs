use axum::Json;
use serde::Serialize;

/// ログアウトレスポンス
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// ログアウトハンドラー
///
/// POST /api/logout
///
/// セッション状態をサーバー側に持たないため、破棄するものはない。
/// クライアントが保持するトークンの破棄を促す定型レスポンスのみ返す。
pub async fn logout() -> Json<LogoutResponse> {
    Json(LogoutResponse {
        message: "ログアウトしました".to_string(),
    })
}
