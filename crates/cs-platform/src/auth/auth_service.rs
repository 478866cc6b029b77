//! Authentication Service
//!
//! HS256 token issuance and validation. One signing secret covers every
//! token kind; the `typ` claim keeps them from being used interchangeably.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::shared::error::{PlatformError, Result};
use crate::user::entity::User;
use crate::TsidGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
    PasswordReset,
    EmailVerification,
}

/// JWT claims shared by every token kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,

    /// Coarse user role at issue time
    #[serde(default)]
    pub role: String,

    /// Role document ids at issue time
    #[serde(default)]
    pub roles: Vec<String>,

    pub typ: TokenType,

    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub jti: String,
}

/// A signed token and its lifetime in seconds
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

pub struct AuthService {
    config: cs_config::AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: cs_config::AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        info!(issuer = %config.issuer, "AuthService initialized with HS256");

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &cs_config::AuthConfig {
        &self.config
    }

    fn lifetime(&self, typ: TokenType) -> i64 {
        match typ {
            TokenType::Access => self.config.access_token_expiry_secs,
            TokenType::Refresh => self.config.refresh_token_expiry_secs,
            TokenType::PasswordReset => self.config.password_reset_expiry_secs,
            TokenType::EmailVerification => self.config.email_verification_expiry_secs,
        }
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to encode JWT: {}", e)))
    }

    /// Issue a token of `typ` for `user`, valid from `now`.
    pub fn issue(&self, user: &User, typ: TokenType, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_in = self.lifetime(typ);
        let claims = TokenClaims {
            sub: user.id.clone(),
            role: user.role.as_str().to_string(),
            roles: user.role_refs.clone(),
            typ,
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expires_in)).timestamp(),
            jti: TsidGenerator::generate(),
        };
        Ok(IssuedToken {
            token: self.sign(&claims)?,
            expires_in,
        })
    }

    pub fn generate_access_token(&self, user: &User) -> Result<IssuedToken> {
        self.issue(user, TokenType::Access, Utc::now())
    }

    pub fn generate_refresh_token(&self, user: &User) -> Result<IssuedToken> {
        self.issue(user, TokenType::Refresh, Utc::now())
    }

    /// Validate signature, issuer, expiry and token kind.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => PlatformError::TokenExpired,
                _ => PlatformError::InvalidToken { message: e.to_string() },
            })?;

        if claims.typ != expected {
            return Err(PlatformError::InvalidToken {
                message: "token type not accepted here".to_string(),
            });
        }
        Ok(claims)
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenClaims> {
        self.validate(token, TokenType::Access)
    }
}

/// Extract bearer token from an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::entity::{CreateUserInput, UserRole};

    pub(crate) fn service() -> AuthService {
        let mut config = cs_config::AuthConfig::default();
        config.jwt_secret = "test-secret-that-is-long-enough-for-hs256".to_string();
        AuthService::new(config)
    }

    fn user() -> User {
        let mut user = User::create(
            CreateUserInput {
                email: "admin@example.vn".to_string(),
                password: String::new(),
                full_name: "Quản trị".to_string(),
                phone: None,
                avatar: None,
                role: Some(UserRole::Admin),
                permissions: vec![],
                status: None,
            },
            "hash".to_string(),
            None,
            Utc::now(),
        )
        .unwrap();
        user.role_refs = vec!["ROLE1".to_string()];
        user
    }

    #[test]
    fn test_generate_and_validate_token() {
        let service = service();
        let user = user();
        let issued = service.generate_access_token(&user).unwrap();
        assert_eq!(issued.expires_in, 86_400);

        let claims = service.validate_token(&issued.token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.roles, vec!["ROLE1"]);
    }

    #[test]
    fn test_expired_token() {
        let service = service();
        let issued = service
            .issue(&user(), TokenType::Access, Utc::now() - Duration::days(2))
            .unwrap();
        assert!(matches!(
            service.validate_token(&issued.token),
            Err(PlatformError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_kinds_not_interchangeable() {
        let service = service();
        let refresh = service.generate_refresh_token(&user()).unwrap();
        assert!(matches!(
            service.validate_token(&refresh.token),
            Err(PlatformError::InvalidToken { .. })
        ));
        assert!(service.validate(&refresh.token, TokenType::Refresh).is_ok());

        let reset = service.issue(&user(), TokenType::PasswordReset, Utc::now()).unwrap();
        assert!(service.validate(&reset.token, TokenType::EmailVerification).is_err());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let mut other_config = cs_config::AuthConfig::default();
        other_config.jwt_secret = "a-completely-different-secret-value!!".to_string();
        let other = AuthService::new(other_config);
        let token = other.generate_access_token(&user()).unwrap().token;
        assert!(matches!(
            service().validate_token(&token),
            Err(PlatformError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc123"), None);
    }
}
