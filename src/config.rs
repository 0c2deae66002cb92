//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// Access token lifetime in seconds (from JWT_ACCESS_EXPIRATION env var)
    pub access_token_expiration: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Password reset token lifetime in seconds (from PASSWORD_RESET_EXPIRATION env var)
    pub password_reset_expiration: i64,

    /// Login attempts allowed per client within the window (from LOGIN_RATE_LIMIT env var)
    pub login_rate_limit: usize,

    /// Login throttle window in seconds (from LOGIN_RATE_WINDOW env var)
    pub login_rate_window: i64,

    /// Seconds between sweeps of expired in-memory state (from SWEEP_INTERVAL env var)
    pub sweep_interval: u64,

    /// Answer forgot-password identically for unknown emails
    /// (from FORGOT_PASSWORD_UNIFORM_RESPONSE env var)
    pub uniform_forgot_password_response: bool,

    /// Reverse proxies whose forwarding headers are believed
    /// (from TRUSTED_PROXIES env var, comma-separated IPs)
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for AuthConfig {
    /// Defaults for every tunable. The secret is empty and must be supplied.
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_expiration: 1800,
            jwt_issuer: "storefront".to_string(),
            jwt_audience: "storefront-api".to_string(),
            argon2_memory_cost: 19456,
            argon2_time_cost: 2,
            argon2_parallelism: 1,
            password_reset_expiration: 3600,
            login_rate_limit: 5,
            login_rate_window: 60,
            sweep_interval: 300,
            uniform_forgot_password_response: false,
            trusted_proxies: Vec::new(),
        }
    }
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T, AuthError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AuthError::Config(format!("{key} has an invalid value"))),
        Err(_) => Ok(default),
    }
}

fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>, AuthError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse().map_err(|_| {
                AuthError::Config(format!("TRUSTED_PROXIES has an invalid address: {entry}"))
            })
        })
        .collect()
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let defaults = Self::default();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AuthError::Config("JWT_SECRET must be set".to_string()))?;

        let config = Self {
            jwt_secret,
            access_token_expiration: parsed_or(
                "JWT_ACCESS_EXPIRATION",
                defaults.access_token_expiration,
            )?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            argon2_memory_cost: parsed_or("ARGON2_MEMORY_COST", defaults.argon2_memory_cost)?,
            argon2_time_cost: parsed_or("ARGON2_TIME_COST", defaults.argon2_time_cost)?,
            argon2_parallelism: parsed_or("ARGON2_PARALLELISM", defaults.argon2_parallelism)?,
            password_reset_expiration: parsed_or(
                "PASSWORD_RESET_EXPIRATION",
                defaults.password_reset_expiration,
            )?,
            login_rate_limit: parsed_or("LOGIN_RATE_LIMIT", defaults.login_rate_limit)?,
            login_rate_window: parsed_or("LOGIN_RATE_WINDOW", defaults.login_rate_window)?,
            sweep_interval: parsed_or("SWEEP_INTERVAL", defaults.sweep_interval)?,
            uniform_forgot_password_response: env::var("FORGOT_PASSWORD_UNIFORM_RESPONSE")
                .ok()
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.uniform_forgot_password_response),
            trusted_proxies: match env::var("TRUSTED_PROXIES") {
                Ok(raw) => parse_ip_list(&raw)?,
                Err(_) => defaults.trusted_proxies,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.access_token_expiration < 1 {
            return Err(AuthError::Config(
                "JWT_ACCESS_EXPIRATION must be at least 1 second".to_string(),
            ));
        }

        if self.password_reset_expiration <= 0 {
            return Err(AuthError::Config(
                "PASSWORD_RESET_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.login_rate_limit == 0 {
            return Err(AuthError::Config(
                "LOGIN_RATE_LIMIT must be at least 1".to_string(),
            ));
        }

        if self.login_rate_window < 1 {
            return Err(AuthError::Config(
                "LOGIN_RATE_WINDOW must be at least 1 second".to_string(),
            ));
        }

        if self.sweep_interval == 0 {
            return Err(AuthError::Config(
                "SWEEP_INTERVAL must be at least 1 second".to_string(),
            ));
        }

        argon2::Params::new(
            self.argon2_memory_cost,
            self.argon2_time_cost,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "a".repeat(32),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AuthConfig {
            jwt_secret: "short".to_string(),
            ..valid_config()
        };

        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_config_validation_zero_access_ttl() {
        let config = AuthConfig {
            access_token_expiration: 0,
            ..valid_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_rate_limit() {
        let config = AuthConfig {
            login_rate_limit: 0,
            ..valid_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_argon2_params() {
        let config = AuthConfig {
            argon2_time_cost: 0,
            ..valid_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_trusted_proxies() {
        assert_eq!(
            parse_ip_list(" 10.0.0.1, ::1 ,").unwrap(),
            vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse().unwrap()]
        );
        assert!(matches!(
            parse_ip_list("10.0.0.1, proxy.internal"),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.access_token_expiration, 1800);
        assert_eq!(config.password_reset_expiration, 3600);
        assert_eq!(config.login_rate_limit, 5);
        assert_eq!(config.login_rate_window, 60);
        assert!(!config.uniform_forgot_password_response);
        assert!(config.trusted_proxies.is_empty());
    }
}
