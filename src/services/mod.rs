pub mod auth;
pub mod email;
pub mod password_reset;
pub mod session;

pub use auth::AuthService;
pub use email::{EmailClient, EmailError, LogEmailClient};
pub use password_reset::PasswordResetService;
pub use session::{SessionTokenService, TokenPair};

#[cfg(feature = "email")]
pub use email::SmtpEmailClient;
