//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. For local development a `.env` file is
//! honoured, and `BACKEND=memory` runs the whole service without Firebase.

use std::env;

/// Longest accepted session lifetime.
pub const MAX_SESSION_TTL_DAYS: i64 = 365;

fn parse_ttl_days(raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|days| (1..=MAX_SESSION_TTL_DAYS).contains(days))
        .ok_or_else(|| {
            ConfigError::Invalid(
                "SESSION_TTL_DAYS",
                format!("must be between 1 and {}", MAX_SESSION_TTL_DAYS),
            )
        })
}

/// Which backing services the process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Cloud Firestore + Firebase Authentication.
    Firestore,
    /// In-process store and identity provider (development, tests).
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" | "firebase" => Ok(Backend::Firestore),
            "memory" | "offline" => Ok(Backend::Memory),
            other => Err(ConfigError::Invalid(
                "BACKEND",
                format!("expected 'firestore' or 'memory', got '{}'", other),
            )),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project hosting Firestore
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Backing services
    pub backend: Backend,
    /// Firebase Web API key (identity REST API)
    pub firebase_api_key: String,
    /// Identity emulator host, e.g. `localhost:9099`
    pub auth_emulator_host: Option<String>,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Session token lifetime in days
    pub session_ttl_days: i64,
}

impl Config {
    /// Deterministic config for tests: memory backend, fixed signing key.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            backend: Backend::Memory,
            firebase_api_key: "test_api_key".to_string(),
            auth_emulator_host: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            session_ttl_days: 30,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let backend: Backend = env::var("BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse()?;

        // The memory backend never calls Firebase, so the key is optional there.
        let firebase_api_key = match (env::var("FIREBASE_API_KEY"), backend) {
            (Ok(key), _) => key.trim().to_string(),
            (Err(_), Backend::Memory) => String::new(),
            (Err(_), Backend::Firestore) => return Err(ConfigError::Missing("FIREBASE_API_KEY")),
        };

        let session_ttl_days = match env::var("SESSION_TTL_DAYS") {
            Ok(raw) => parse_ttl_days(&raw)?,
            Err(_) => 30,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            backend,
            firebase_api_key,
            auth_emulator_host: env::var("FIREBASE_AUTH_EMULATOR_HOST").ok(),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            session_ttl_days,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
