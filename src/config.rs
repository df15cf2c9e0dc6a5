//! Application configuration loaded from environment variables.
//!
//! The hosted backend is optional: without `SUPABASE_URL` the service runs
//! in offline mode on the in-memory fallback data and local accounts.

use std::env;
use std::time::Duration;

use crate::credential::DEFAULT_ADMIN_SECRET_KEY;

/// Points awarded to a report owner when an authority verifies the report.
pub const POINTS_FOR_VERIFICATION: u32 = 10;

/// Connection details for the hosted backend.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Hosted backend, `None` for offline mode
    pub supabase: Option<SupabaseConfig>,
    /// Storage bucket for incident photos
    pub photo_bucket: String,
    /// Whether the fallback store answers profile lookups
    pub fallback_admin_profile: bool,
    /// Per-request timeout for backend calls
    pub remote_timeout: Duration,

    // --- Secrets ---
    /// HS256 key for session cookies (raw bytes)
    pub session_signing_key: Vec<u8>,
    /// Pass-phrase gating authority signup
    pub admin_secret_key: String,
}

impl Config {
    /// Config for tests: offline mode with fixed keys.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            supabase: None,
            photo_bucket: "incident-photos".to_string(),
            fallback_admin_profile: true,
            remote_timeout: Duration::from_secs(5),
            session_signing_key: b"test_session_key_32_bytes_min!!".to_vec(),
            admin_secret_key: DEFAULT_ADMIN_SECRET_KEY.to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let supabase = match (env::var("SUPABASE_URL"), env::var("SUPABASE_ANON_KEY")) {
            (Ok(url), Ok(anon_key)) => Some(SupabaseConfig {
                url: url.trim().trim_end_matches('/').to_string(),
                anon_key: anon_key.trim().to_string(),
            }),
            (Err(_), Err(_)) => None,
            (Ok(_), Err(_)) => return Err(ConfigError::Missing("SUPABASE_ANON_KEY")),
            (Err(_), Ok(_)) => return Err(ConfigError::Missing("SUPABASE_URL")),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            supabase,
            photo_bucket: env::var("PHOTO_BUCKET")
                .unwrap_or_else(|_| "incident-photos".to_string()),
            fallback_admin_profile: parse_bool("FALLBACK_ADMIN_PROFILE", true)?,
            remote_timeout: Duration::from_secs(
                env::var("REMOTE_TIMEOUT_SECS")
                    .ok()
                    .map(|v| {
                        v.trim()
                            .parse()
                            .map_err(|_| ConfigError::Invalid("REMOTE_TIMEOUT_SECS"))
                    })
                    .transpose()?
                    .unwrap_or(30),
            ),
            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .into_bytes(),
            admin_secret_key: env::var("ADMIN_SECRET_KEY")
                .unwrap_or_else(|_| DEFAULT_ADMIN_SECRET_KEY.to_string()),
        })
    }

    /// Whether a hosted backend is configured.
    pub fn is_offline(&self) -> bool {
        self.supabase.is_none()
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(name)),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
