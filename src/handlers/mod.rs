pub mod health;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod profile;
pub mod register;

pub use health::health_check;
pub use login::login;
pub use logout::logout;
pub use password_reset::{forgot_password, reset_password};
pub use profile::profile;
pub use register::register;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Router の構築
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/forgot-password", post(forgot_password))
        .route("/api/reset-password", post(reset_password))
        .route("/api/profile", get(profile))
        .with_state(state)
}
