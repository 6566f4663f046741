//! Configuration management for the Mutuelle server
//!
//! Configuration is read from environment variables (optionally seeded from a
//! `.env` file) and validated once at start-up.

use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL URL; `None` selects the in-memory store
    pub database_url: Option<String>,

    pub environment: Environment,

    pub port: u16,

    pub db_max_connections: u32,

    /// Comma separated list, permissive CORS when unset
    pub cors_allowed_origins: Option<String>,

    /// Default tracing filter when RUST_LOG is not set
    pub log_level: String,

    /// HS256 signing secret for access tokens
    pub jwt_secret: String,

    /// Access token TTL in seconds (default: 3600)
    pub jwt_access_token_ttl_seconds: i64,

    pub bcrypt_cost: u32,

    /// Interest applied to disbursed loans, in basis points (500 = 5%)
    pub loan_interest_rate_bps: i32,

    /// Registering with this e-mail grants the PRESIDENT role
    pub bootstrap_president_email: Option<String>,
}

/// Development defaults: in-memory store, no env lookups
impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            environment: Environment::Development,
            port: 3001,
            db_max_connections: 5,
            cors_allowed_origins: None,
            log_level: "info".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_access_token_ttl_seconds: 3600,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            loan_interest_rate_bps: 500,
            bootstrap_president_email: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if database_url.is_none() && environment.is_production() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(5);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let jwt_access_token_ttl_seconds = env::var("JWT_ACCESS_TOKEN_TTL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<i64>()
            .unwrap_or(3600);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(bcrypt::DEFAULT_COST);

        let loan_interest_rate_bps = env::var("LOAN_INTEREST_RATE_BPS")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<i32>()
            .map_err(|_| {
                ConfigError::InvalidValue("LOAN_INTEREST_RATE_BPS must be an integer".to_string())
            })?;
        if loan_interest_rate_bps < 0 {
            return Err(ConfigError::InvalidValue(
                "LOAN_INTEREST_RATE_BPS must not be negative".to_string(),
            ));
        }

        let bootstrap_president_email = env::var("BOOTSTRAP_PRESIDENT_EMAIL")
            .ok()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        Ok(Config {
            database_url,
            environment,
            port,
            db_max_connections,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_access_token_ttl_seconds,
            bcrypt_cost,
            loan_interest_rate_bps,
            bootstrap_president_email,
        })
    }

    /// Database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> Option<String> {
        let url = self.database_url.as_ref()?;
        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return Some(format!("{}****{}", prefix, suffix));
            }
        }
        Some(url.clone())
    }
}
