//! Password Service
//!
//! Argon2id hashing with a per-password random salt.

use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::debug;

use crate::shared::error::{PlatformError, Result};

/// Password policy configuration
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    /// Require at least one alphabetic character
    pub require_letter: bool,
    /// Require at least one digit
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_letter: true,
            require_digit: true,
        }
    }
}

impl PasswordPolicy {
    /// Validate a password against the policy
    pub fn validate(&self, password: &str) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let length = password.chars().count();

        if length < self.min_length {
            errors.push(format!("password: must be at least {} characters", self.min_length));
        }
        if length > self.max_length {
            errors.push(format!("password: must be at most {} characters", self.max_length));
        }
        if self.require_letter && !password.chars().any(char::is_alphabetic) {
            errors.push("password: must contain at least one letter".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("password: must contain at least one digit".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Password hashing service
pub struct PasswordService {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
    /// Hash checked when the account is missing, so both paths cost the same.
    dummy_hash: OnceLock<String>,
}

impl PasswordService {
    pub fn new(settings: &cs_config::Argon2Settings, policy: PasswordPolicy) -> Result<Self> {
        let params = Params::new(settings.memory_kib, settings.iterations, settings.parallelism, None)
            .map_err(|e| PlatformError::Configuration {
                message: format!("Invalid Argon2 parameters: {}", e),
            })?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            policy,
            dummy_hash: OnceLock::new(),
        })
    }

    /// Low-cost parameters for tests.
    pub fn testing() -> Self {
        let settings = cs_config::Argon2Settings {
            memory_kib: 4096,
            iterations: 1,
            parallelism: 1,
        };
        match Self::new(&settings, PasswordPolicy::default()) {
            Ok(service) => service,
            Err(_) => Self {
                argon2: Argon2::default(),
                policy: PasswordPolicy::default(),
                dummy_hash: OnceLock::new(),
            },
        }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Check the policy without hashing.
    pub fn check_policy(&self, password: &str) -> Result<()> {
        self.policy
            .validate(password)
            .map_err(|errors| PlatformError::validation(errors.join("; ")))
    }

    /// Validate against the policy, then hash.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        self.check_policy(password)?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PlatformError::internal(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a candidate against a stored PHC string.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| PlatformError::internal(format!("Invalid password hash format: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password verification failed");
                Ok(false)
            }
            Err(e) => Err(PlatformError::internal(format!("Password verification error: {}", e))),
        }
    }

    /// Verify against the stored hash, or burn one verification on a
    /// throwaway hash with the same parameters when there is none.
    pub fn verify_or_dummy(&self, password: &str, hash: Option<&str>) -> Result<bool> {
        match hash {
            Some(hash) => self.verify_password(password, hash),
            None => {
                let dummy = self.dummy_hash()?;
                self.verify_password(password, dummy)?;
                Ok(false)
            }
        }
    }

    fn dummy_hash(&self) -> Result<&str> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash.as_str());
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(salt.as_str().as_bytes(), &salt)
            .map_err(|e| PlatformError::internal(format!("Failed to hash password: {}", e)))?
            .to_string();
        Ok(self.dummy_hash.get_or_init(|| hash).as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = PasswordService::testing();
        let hash = service.hash_password("matkhau2024").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify_password("matkhau2024", &hash).unwrap());
        assert!(!service.verify_password("matkhau2025", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let service = PasswordService::testing();
        let a = service.hash_password("Password1").unwrap();
        let b = service.hash_password("Password1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_policy() {
        let policy = PasswordPolicy::default();
        assert!(policy.validate("abc12345").is_ok());
        assert!(policy.validate("mậtkhẩu9").is_ok());
        assert!(policy.validate("short1").is_err());
        assert!(policy.validate("onlyletters").is_err());
        assert!(policy.validate("1234567890").is_err());
        assert!(policy.validate(&format!("a1{}", "x".repeat(127))).is_err());
    }

    #[test]
    fn test_missing_account_still_runs_a_verification() {
        let service = PasswordService::testing();
        assert!(!service.verify_or_dummy("matkhau2024", None).unwrap());
        assert!(!service.verify_or_dummy("", None).unwrap());

        let dummy = service.dummy_hash().unwrap().to_string();
        assert!(dummy.starts_with("$argon2id$v=19$m=4096,t=1,p=1$"));
        assert_eq!(service.dummy_hash().unwrap(), dummy);

        let real = service.hash_password("matkhau2024").unwrap();
        assert!(service.verify_or_dummy("matkhau2024", Some(&real)).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let service = PasswordService::testing();
        assert!(service.verify_password("whatever1", "not-a-hash").is_err());
    }
}
