//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment
//! (Cloud Run secret bindings), so no Secret Manager round-trips happen
//! at runtime.

use std::env;

/// Header value Cloud Scheduler attaches to its HTTP invocations.
/// Cloud Run strips this header from external requests, so its presence
/// guarantees the request originated inside the project.
pub const SCHEDULER_HEADER: &str = "x-cloudscheduler";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS and redirect targets
    pub frontend_url: String,
    /// GCP project ID (also the identity-toolkit project)
    pub gcp_project_id: String,
    /// Identity-toolkit web API key (public, per-project)
    pub identity_api_key: String,
    /// Server port
    pub port: u16,

    // --- Secrets (injected as env vars) ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Bearer token for identity-toolkit admin operations.
    /// `owner` against the Auth emulator; a service-account token in prod.
    pub identity_admin_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            identity_api_key: env::var("IDENTITY_API_KEY")
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            identity_admin_token: env::var("IDENTITY_ADMIN_TOKEN")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| "owner".to_string()),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            identity_api_key: "test_api_key".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            identity_admin_token: "owner".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("IDENTITY_API_KEY", "test_key");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.identity_api_key, "test_key");
        assert_eq!(config.port, 8080);
        // No IDENTITY_ADMIN_TOKEN set: falls back to the emulator owner token
        assert_eq!(config.identity_admin_token, "owner");
    }
}
