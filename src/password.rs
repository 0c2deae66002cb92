//! Password hashing and complexity rules.

use crate::config::AuthConfig;
use crate::error::AuthError;

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use std::fmt;

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Characters that satisfy the special-character rule
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Argon2id hasher with a configurable work factor
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
        )
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();
        Ok(hash)
    }

    /// Verify a password against a stored hash.
    ///
    /// The cost parameters are read from the hash string itself, so hashes
    /// produced under an older work factor still verify. A malformed hash
    /// is a mismatch, never an error.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// A single complexity rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    SpecialCharacter,
}

impl PolicyRule {
    pub fn message(&self) -> &'static str {
        match self {
            PolicyRule::MinLength => "Password must be at least 8 characters long.",
            PolicyRule::Uppercase => "Password must contain at least one uppercase letter.",
            PolicyRule::Lowercase => "Password must contain at least one lowercase letter.",
            PolicyRule::Digit => "Password must contain at least one digit.",
            PolicyRule::SpecialCharacter => {
                "Password must contain at least one special character."
            }
        }
    }
}

/// Rules a candidate password failed, in check order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyError {
    violations: Vec<PolicyRule>,
}

impl PolicyError {
    pub fn first(&self) -> PolicyRule {
        self.violations[0]
    }

    pub fn violations(&self) -> &[PolicyRule] {
        &self.violations
    }

    pub fn messages(&self) -> Vec<&'static str> {
        self.violations.iter().map(PolicyRule::message).collect()
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first().message())
    }
}

impl std::error::Error for PolicyError {}

impl From<PolicyError> for AuthError {
    fn from(err: PolicyError) -> Self {
        AuthError::PolicyViolation(err.to_string())
    }
}

/// Password complexity validator
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordPolicy;

impl PasswordPolicy {
    /// Check every rule and report all that fail
    pub fn validate(&self, password: &str) -> Result<(), PolicyError> {
        let mut violations = Vec::new();

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            violations.push(PolicyRule::MinLength);
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            violations.push(PolicyRule::Uppercase);
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            violations.push(PolicyRule::Lowercase);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push(PolicyRule::Digit);
        }
        if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
            violations.push(PolicyRule::SpecialCharacter);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(PolicyError { violations })
        }
    }
}
