//! Authentication: tokens, password hashing and account flows

pub mod account_service;
pub mod auth_api;
pub mod auth_service;
pub mod notifier;
pub mod password_service;

pub use account_service::AccountService;
pub use auth_service::{AuthService, TokenClaims, TokenType};
pub use notifier::{LogNotifier, Notifier};
pub use password_service::{PasswordPolicy, PasswordService};
