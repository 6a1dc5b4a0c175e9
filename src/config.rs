//! Configuration for SkillForge
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// SkillForge - REST backend for a gamified knowledge-exchange platform
#[derive(Parser, Debug, Clone)]
#[command(name = "skillforge")]
#[command(about = "Headless content API for challenges, responses and activity feeds")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:1337")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "skillforge")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (default one week, matching the session cookie)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "604800")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (MongoDB optional, insecure JWT default allowed)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum page size for list endpoints
    #[arg(long, env = "MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: i64,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.max_page_size < 1 {
            return Err("MAX_PAGE_SIZE must be at least 1".to_string());
        }

        Ok(())
    }
}
