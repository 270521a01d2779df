use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

use crate::models::Role;
use crate::rating::{RatingWeights, VotingPolicy};

/// Service configuration, layered from `NESTOR_*` environment variables over
/// the defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestorConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub rating: RatingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Require an authenticated actor on state-changing requests
    pub enable_auth: bool,
    /// Key required by moderation endpoints; those endpoints refuse every
    /// request while it is unset
    pub admin_api_key: Option<String>,
    /// Requests per minute per client
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub postgres_url: String,
    /// Without PostgreSQL the service runs on the in-memory store
    pub postgres_enabled: bool,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// error, warn, info, debug or trace
    pub level: String,
    /// Emit span open/close events for each request
    pub log_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConfig {
    pub authority_weight: f64,
    pub publication_weight: f64,
    pub comment_weight: f64,
    /// Roles covered by the user-rating sweep
    pub sweep_roles: Vec<Role>,
    /// Lowest voter rating still allowed to vote on comments
    pub min_comment_voter_rating: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        let weights = RatingWeights::default();
        Self {
            authority_weight: weights.authority,
            publication_weight: weights.publication,
            comment_weight: weights.comment,
            sweep_roles: Role::ELEVATED.to_vec(),
            min_comment_voter_rating: VotingPolicy::default().min_comment_voter_rating,
        }
    }
}

impl RatingConfig {
    pub fn to_weights(&self) -> RatingWeights {
        RatingWeights {
            authority: self.authority_weight,
            publication: self.publication_weight,
            comment: self.comment_weight,
        }
    }

    pub fn to_policy(&self) -> VotingPolicy {
        VotingPolicy {
            min_comment_voter_rating: self.min_comment_voter_rating,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/nestor".to_string(),
            postgres_enabled: false,
            max_connections: 10,
        }
    }
}

impl Default for NestorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            security: SecurityConfig {
                enable_auth: true,
                admin_api_key: None,
                rate_limit_per_minute: 120,
                max_request_size: 64 * 1024,
            },
            database: DatabaseConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                log_requests: false,
            },
            rating: RatingConfig::default(),
        }
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid {} value", name)),
        Err(_) => Ok(None),
    }
}

impl NestorConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Ok(host) = env::var("NESTOR_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_var("NESTOR_PORT")? {
            config.server.port = port;
        }

        // Security configuration
        if let Some(enable_auth) = parse_var("NESTOR_ENABLE_AUTH")? {
            config.security.enable_auth = enable_auth;
        }
        config.security.admin_api_key = env::var("NESTOR_ADMIN_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        if config.security.admin_api_key.is_none() {
            warn!("NESTOR_ADMIN_API_KEY not set, moderation endpoints are disabled");
        }
        if let Some(limit) = parse_var("NESTOR_RATE_LIMIT_PER_MINUTE")? {
            config.security.rate_limit_per_minute = limit;
        }
        if let Some(size) = parse_var("NESTOR_MAX_REQUEST_SIZE")? {
            config.security.max_request_size = size;
        }

        // Database configuration
        if let Ok(url) = env::var("NESTOR_POSTGRES_URL") {
            config.database.postgres_url = url;
        }
        if let Some(enabled) = parse_var("NESTOR_POSTGRES_ENABLED")? {
            config.database.postgres_enabled = enabled;
        }
        if let Some(max) = parse_var("NESTOR_POSTGRES_MAX_CONNECTIONS")? {
            config.database.max_connections = max;
        }

        // Logging configuration
        if let Ok(level) = env::var("NESTOR_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(log_requests) = parse_var("NESTOR_LOG_REQUESTS")? {
            config.logging.log_requests = log_requests;
        }

        // Rating configuration
        if let Some(weight) = parse_var("NESTOR_AUTHORITY_WEIGHT")? {
            config.rating.authority_weight = weight;
        }
        if let Some(weight) = parse_var("NESTOR_PUBLICATION_WEIGHT")? {
            config.rating.publication_weight = weight;
        }
        if let Some(weight) = parse_var("NESTOR_COMMENT_WEIGHT")? {
            config.rating.comment_weight = weight;
        }
        if let Some(min) = parse_var("NESTOR_MIN_COMMENT_VOTER_RATING")? {
            config.rating.min_comment_voter_rating = min;
        }
        if let Ok(roles) = env::var("NESTOR_SWEEP_ROLES") {
            config.rating.sweep_roles = parse_roles(&roles)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if self.database.postgres_enabled && self.database.postgres_url.is_empty() {
            return Err(anyhow::anyhow!(
                "PostgreSQL is enabled but NESTOR_POSTGRES_URL is empty"
            ));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("Database pool needs at least one connection"));
        }

        for (name, weight) in [
            ("authority", self.rating.authority_weight),
            ("publication", self.rating.publication_weight),
            ("comment", self.rating.comment_weight),
        ] {
            if !weight.is_finite() {
                return Err(anyhow::anyhow!("Rating weight {} must be finite", name));
            }
        }
        if self.rating.sweep_roles.is_empty() {
            return Err(anyhow::anyhow!("User rating sweep needs at least one role"));
        }

        if let Some(key) = &self.security.admin_api_key {
            if key.len() < 16 {
                return Err(anyhow::anyhow!(
                    "Admin API key is too short (minimum 16 characters)"
                ));
            }
        }

        Ok(())
    }
}

fn parse_roles(value: &str) -> Result<Vec<Role>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Role::parse(s)
                .ok_or_else(|| anyhow::anyhow!("Unknown role in NESTOR_SWEEP_ROLES: {}", s))
        })
        .collect()
}

/// Mask a secret or a credential-bearing URL for logging
pub fn sanitize_for_logging(value: &str) -> String {
    if let Some((scheme, rest)) = value.split_once("://") {
        if let Some((_, host)) = rest.rsplit_once('@') {
            return format!("{}://***@{}", scheme, host);
        }
        return value.to_string();
    }

    if value.len() <= 8 {
        return "*".repeat(value.len());
    }
    format!("{}...{}", &value[..4], &value[value.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = NestorConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.database.postgres_enabled);
        assert_eq!(config.rating.sweep_roles, Role::ELEVATED.to_vec());
    }

    #[test]
    fn test_weights_conversion() {
        let rating = RatingConfig {
            authority_weight: 2.0,
            publication_weight: 1.0,
            comment_weight: 0.25,
            ..RatingConfig::default()
        };
        let weights = rating.to_weights();
        assert_eq!(weights.authority, 2.0);
        assert_eq!(weights.comment, 0.25);
        assert_eq!(rating.to_policy().min_comment_voter_rating, -15.0);
    }

    #[test]
    fn test_short_admin_key_rejected() {
        let mut config = NestorConfig::default();
        config.security.admin_api_key = Some("short".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let mut config = NestorConfig::default();
        config.rating.comment_weight = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_roles() {
        assert_eq!(
            parse_roles("author, admin").unwrap(),
            vec![Role::Author, Role::Admin]
        );
        assert!(parse_roles("author,wizard").is_err());
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(
            sanitize_for_logging("postgresql://nestor:hunter2@db:5432/nestor"),
            "postgresql://***@db:5432/nestor"
        );
        assert_eq!(sanitize_for_logging("secret"), "******");
        assert_eq!(sanitize_for_logging("abcdefghijklmnop"), "abcd...mnop");
    }
}
