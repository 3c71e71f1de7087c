//! Configuration for Horta
//!
//! CLI arguments and environment variable handling using clap.
//! A `.env` file in the working directory is loaded before parsing.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Insecure secret used only when dev mode is on and no JWT_SECRET is set
const DEV_JWT_SECRET: &str = "dev-only-insecure-secret-not-for-production";

/// Longest token lifetime accepted (one year)
const MAX_JWT_EXPIRY_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Horta - community garden management API
#[derive(Parser, Debug, Clone)]
#[command(name = "horta")]
#[command(about = "Community garden management backend")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// SQLite database file holding the domain data
    #[arg(long, env = "DATABASE_PATH", default_value = "horta.db")]
    pub database_path: PathBuf,

    /// MongoDB connection URI for the audit trail
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name for the audit trail
    #[arg(long, env = "MONGODB_DB", default_value = "horta_logs")]
    pub mongodb_db: String,

    /// Write audit records to MongoDB
    #[arg(long, env = "AUDIT_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub audit_enabled: bool,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Route protection: `open` checks a token only on /usuarios/me,
    /// `groups` applies the admin and member allow-lists to every write
    #[arg(long, env = "ACCESS_MODE", value_enum, default_value_t = AccessMode::Open)]
    pub access_mode: AccessMode,

    /// Group ids allowed to manage users, groups, gardens, products, plots and events
    #[arg(long, env = "ADMIN_GROUPS", value_delimiter = ',', default_value = "1")]
    pub admin_groups: Vec<i64>,

    /// Group ids allowed to record participations, plantings and harvests
    #[arg(long, env = "MEMBER_GROUPS", value_delimiter = ',', default_value = "1,2")]
    pub member_groups: Vec<i64>,

    /// Allowed CORS origins ("*" allows any)
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Enable development mode (insecure default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Which routes require a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccessMode {
    /// Only the caller's own profile needs a token
    Open,
    /// User reads need a token; writes need an allow-listed group
    Groups,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        match &self.jwt_secret {
            Some(secret) => Some(secret.clone()),
            None if self.dev_mode => Some(DEV_JWT_SECRET.to_string()),
            None => None,
        }
    }

    /// Whether a CORS origin is allowed
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.cors_origins.iter().any(|o| o == "*" || o == origin)
    }

    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        if self.jwt_expiry_seconds > MAX_JWT_EXPIRY_SECONDS {
            return Err(format!(
                "JWT_EXPIRY_SECONDS must be at most {}",
                MAX_JWT_EXPIRY_SECONDS
            ));
        }

        if self.admin_groups.is_empty() || self.member_groups.is_empty() {
            return Err("ADMIN_GROUPS and MEMBER_GROUPS must not be empty".to_string());
        }

        Ok(())
    }
}
