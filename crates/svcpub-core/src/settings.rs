//! Deployment settings
//!
//! Settings are loaded once at startup, before any prompting, so a missing
//! credential fails fast. Values come from the process environment, with an
//! adjacent `.env` file loaded first if present (a missing `.env` is fine).
//!
//! Required keys:
//! - `CLOUDFLARE_API_TOKEN`: API token with DNS edit permission
//! - `CLOUDFLARE_ZONE_ID`: zone the CNAME record is created in
//! - `DOMAIN_NAME`: base domain services are published under
//! - `CONFIG_FILE_PATH`: path to the reverse proxy's dynamic config file
//!
//! Optional:
//! - `CLOUDFLARE_PROXIED`: `true` (default) or `false` for an unproxied
//!   record; anything else is rejected
//! - `AUTHELIA_CONFIG_PATH`: when set, the published host is also added
//!   to the auth portal's access-control rules at this path

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Deployment parameters, constructed once and passed explicitly
///
/// No component reads the environment after this struct is built.
pub struct Settings {
    /// Cloudflare API token
    /// Never log this value
    pub api_token: String,

    /// Cloudflare zone ID for the base domain
    pub zone_id: String,

    /// Base domain (e.g. "example.com")
    pub domain_name: String,

    /// Path to the reverse proxy's dynamic config file
    pub config_file_path: PathBuf,

    /// Whether the created record goes through the provider's proxy
    pub proxied: bool,

    /// Auth portal config to add the published host to, when set
    pub authelia_config_path: Option<PathBuf>,
}

// The API token is redacted from Debug output
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("domain_name", &self.domain_name)
            .field("config_file_path", &self.config_file_path)
            .field("proxied", &self.proxied)
            .field("authelia_config_path", &self.authelia_config_path)
            .finish()
    }
}

impl Settings {
    /// Load settings from `.env` (if present) and the process environment
    ///
    /// Fails with [`Error::MissingConfig`] naming the first key that is
    /// unset or empty. No side effects beyond reading.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("loaded settings file {}", path.display()),
            Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!("failed to load .env file: {}", err),
        }

        Ok(Self {
            api_token: require("CLOUDFLARE_API_TOKEN", env::var("CLOUDFLARE_API_TOKEN").ok())?,
            zone_id: require("CLOUDFLARE_ZONE_ID", env::var("CLOUDFLARE_ZONE_ID").ok())?,
            domain_name: require("DOMAIN_NAME", env::var("DOMAIN_NAME").ok())?,
            config_file_path: PathBuf::from(require(
                "CONFIG_FILE_PATH",
                env::var("CONFIG_FILE_PATH").ok(),
            )?),
            proxied: parse_flag("CLOUDFLARE_PROXIED", env::var("CLOUDFLARE_PROXIED").ok())?,
            authelia_config_path: env::var("AUTHELIA_CONFIG_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Reject unset or empty values, naming the absent key
fn require(key: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::MissingConfig(key)),
    }
}

/// Parse an optional boolean flag; only `true`/`false` are accepted
fn parse_flag(key: &'static str, value: Option<String>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(true);
    };
    match value.trim().to_lowercase().as_str() {
        "" | "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidConfig { key, value }),
    }
}
